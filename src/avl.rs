use crate::iter::{Direction, Iter};
use std::{
    borrow::Borrow,
    cmp::{max, min, Eq, Ord, Ordering, PartialEq, PartialOrd},
    default::Default,
    fmt::{self, Debug, Formatter},
    hash::{Hash, Hasher},
    ops::Bound,
    sync::Arc,
};

/// One entry of the tree. The entry is shared between every node
/// that carries it, so rotations never copy a key or a value, they
/// just bump a reference count.
pub(crate) type Elt<K, V> = Arc<(K, V)>;

pub(crate) struct Node<K, V> {
    pub(crate) elt: Elt<K, V>,
    pub(crate) left: Tree<K, V>,
    pub(crate) right: Tree<K, V>,
    size: usize,
    height: u16,
}

impl<K, V> Node<K, V> {
    pub(crate) fn key(&self) -> &K {
        &self.elt.0
    }

    pub(crate) fn child(&self, dir: Direction) -> &Tree<K, V> {
        match dir {
            Direction::Left => &self.left,
            Direction::Right => &self.right,
        }
    }
}

pub(crate) enum Tree<K, V> {
    Empty,
    Node(Arc<Node<K, V>>),
}

impl<K, V> Clone for Tree<K, V> {
    fn clone(&self) -> Self {
        match self {
            Tree::Empty => Tree::Empty,
            Tree::Node(n) => Tree::Node(Arc::clone(n)),
        }
    }
}

impl<K, V> Hash for Tree<K, V>
where
    K: Hash + Ord,
    V: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        for elt in self {
            elt.hash(state)
        }
    }
}

impl<K, V> Default for Tree<K, V> {
    fn default() -> Tree<K, V> {
        Tree::Empty
    }
}

impl<K, V> PartialEq for Tree<K, V>
where
    K: Ord,
    V: PartialEq,
{
    fn eq(&self, other: &Tree<K, V>) -> bool {
        self.len() == other.len() && self.into_iter().zip(other).all(|(e0, e1)| e0 == e1)
    }
}

impl<K, V> Eq for Tree<K, V>
where
    K: Ord,
    V: Eq,
{
}

impl<K, V> PartialOrd for Tree<K, V>
where
    K: Ord,
    V: PartialOrd,
{
    fn partial_cmp(&self, other: &Tree<K, V>) -> Option<Ordering> {
        self.into_iter().partial_cmp(other.into_iter())
    }
}

impl<K, V> Ord for Tree<K, V>
where
    K: Ord,
    V: Ord,
{
    fn cmp(&self, other: &Tree<K, V>) -> Ordering {
        self.into_iter().cmp(other.into_iter())
    }
}

impl<K, V> Debug for Tree<K, V>
where
    K: Debug + Ord,
    V: Debug,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_map().entries(self.into_iter()).finish()
    }
}

impl<'a, K, V> IntoIterator for &'a Tree<K, V>
where
    K: 'a + Ord,
    V: 'a,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.range(Bound::Unbounded, Bound::Unbounded)
    }
}

impl<K, V> Tree<K, V> {
    pub(crate) fn new() -> Self {
        Tree::Empty
    }

    pub(crate) fn is_empty(&self) -> bool {
        match self {
            Tree::Empty => true,
            Tree::Node(..) => false,
        }
    }

    pub(crate) fn len(&self) -> usize {
        match self {
            Tree::Empty => 0,
            Tree::Node(n) => n.size,
        }
    }

    pub(crate) fn height(&self) -> u16 {
        match self {
            Tree::Empty => 0,
            Tree::Node(n) => n.height,
        }
    }

    /// the height a node built from l and r would have, before any
    /// rotation
    fn combined_height(l: &Tree<K, V>, r: &Tree<K, V>) -> u16 {
        1 + max(l.height(), r.height())
    }

    fn create(l: &Tree<K, V>, elt: Elt<K, V>, r: &Tree<K, V>) -> Self {
        let n = Node {
            elt,
            left: l.clone(),
            right: r.clone(),
            size: 1 + l.len() + r.len(),
            height: Tree::combined_height(l, r),
        };
        Tree::Node(Arc::new(n))
    }

    // Every internal node built by insert and remove goes through
    // here. l and r may differ in height by at most 2.
    fn bal(l: &Tree<K, V>, elt: &Elt<K, V>, r: &Tree<K, V>) -> Self {
        let (hl, hr) = (l.height(), r.height());
        if hr > hl + 1 {
            match r {
                Tree::Empty => panic!("tree heights wrong"),
                Tree::Node(rn) => {
                    if Tree::combined_height(l, &rn.left) > rn.right.height() + 1 {
                        match &rn.left {
                            Tree::Empty => panic!("tree heights wrong"),
                            Tree::Node(rln) => Tree::create(
                                &Tree::create(l, elt.clone(), &rln.left),
                                rln.elt.clone(),
                                &Tree::create(&rln.right, rn.elt.clone(), &rn.right),
                            ),
                        }
                    } else {
                        Tree::create(
                            &Tree::create(l, elt.clone(), &rn.left),
                            rn.elt.clone(),
                            &rn.right,
                        )
                    }
                }
            }
        } else if hl > hr + 1 {
            match l {
                Tree::Empty => panic!("tree heights wrong"),
                Tree::Node(ln) => {
                    if Tree::combined_height(r, &ln.right) > ln.left.height() + 1 {
                        match &ln.right {
                            Tree::Empty => panic!("tree heights wrong"),
                            Tree::Node(lrn) => Tree::create(
                                &Tree::create(&ln.left, ln.elt.clone(), &lrn.left),
                                lrn.elt.clone(),
                                &Tree::create(&lrn.right, elt.clone(), r),
                            ),
                        }
                    } else {
                        Tree::create(
                            &ln.left,
                            ln.elt.clone(),
                            &Tree::create(&ln.right, elt.clone(), r),
                        )
                    }
                }
            }
        } else {
            Tree::create(l, elt.clone(), r)
        }
    }

    fn extreme(&self, dir: Direction) -> Option<&Elt<K, V>> {
        match self {
            Tree::Empty => None,
            Tree::Node(n) => {
                let mut tn = n;
                while let Tree::Node(c) = tn.child(dir) {
                    tn = c
                }
                Some(&tn.elt)
            }
        }
    }

    pub(crate) fn min_elt(&self) -> Option<&Elt<K, V>> {
        self.extreme(Direction::Left)
    }

    pub(crate) fn max_elt(&self) -> Option<&Elt<K, V>> {
        self.extreme(Direction::Right)
    }

    /// every entry in ascending key order
    pub(crate) fn entries(&self) -> Vec<(&K, &V)> {
        fn step<'a, K, V>(t: &'a Tree<K, V>, elts: &mut Vec<(&'a K, &'a V)>) {
            if let Tree::Node(n) = t {
                step(&n.left, elts);
                elts.push((&n.elt.0, &n.elt.1));
                step(&n.right, elts);
            }
        }
        let mut elts = Vec::with_capacity(self.len());
        step(self, &mut elts);
        elts
    }
}

impl<K, V> Tree<K, V>
where
    K: Ord,
{
    pub(crate) fn range<'a, Q>(&'a self, lbound: Bound<Q>, ubound: Bound<Q>) -> Iter<'a, Q, K, V>
    where
        Q: Ord,
        K: Borrow<Q>,
    {
        Iter::new(self, lbound, ubound)
    }

    // structured as a loop instead of recursion, lookups are the hot
    // path and never allocate
    fn get_gen<'a, Q, F, R>(&'a self, k: &Q, f: F) -> Option<R>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
        F: FnOnce(&'a (K, V)) -> R,
        R: 'a,
    {
        let mut t = self;
        loop {
            match t {
                Tree::Empty => break None,
                Tree::Node(tn) => match k.cmp(tn.key().borrow()) {
                    Ordering::Less => t = &tn.left,
                    Ordering::Greater => t = &tn.right,
                    Ordering::Equal => break Some(f(&*tn.elt)),
                },
            }
        }
    }

    pub(crate) fn get<'a, Q>(&'a self, k: &Q) -> Option<&'a V>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.get_gen(k, |(_, v)| v)
    }

    pub(crate) fn get_key<'a, Q>(&'a self, k: &Q) -> Option<&'a K>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.get_gen(k, |(k, _)| k)
    }

    pub(crate) fn get_full<'a, Q>(&'a self, k: &Q) -> Option<(&'a K, &'a V)>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.get_gen(k, |(k, v)| (k, v))
    }

    /// return the new tree, and the binding k replaced, if any
    pub(crate) fn insert(&self, k: K, v: V) -> (Self, Option<&(K, V)>) {
        match self {
            Tree::Empty => (
                Tree::create(&Tree::Empty, Arc::new((k, v)), &Tree::Empty),
                None,
            ),
            Tree::Node(tn) => match k.cmp(tn.key()) {
                Ordering::Less => {
                    let (l, prev) = tn.left.insert(k, v);
                    (Tree::bal(&l, &tn.elt, &tn.right), prev)
                }
                Ordering::Greater => {
                    let (r, prev) = tn.right.insert(k, v);
                    (Tree::bal(&tn.left, &tn.elt, &r), prev)
                }
                Ordering::Equal => (
                    Tree::bal(&tn.left, &Arc::new((k, v)), &tn.right),
                    Some(&*tn.elt),
                ),
            },
        }
    }

    // the tree without this node's own entry. The in order
    // predecessor takes its place, and is removed from the left
    // subtree by a real recursive remove.
    fn remove_root(tn: &Node<K, V>) -> Self {
        match tn.left.max_elt() {
            None => tn.right.clone(),
            Some(pred) => match tn.left.remove(&pred.0) {
                None => panic!("predecessor missing from its own subtree"),
                Some((l, _)) => Tree::bal(&l, pred, &tn.right),
            },
        }
    }

    /// return None if k isn't bound, otherwise the new tree and the
    /// removed binding.
    pub(crate) fn remove<Q>(&self, k: &Q) -> Option<(Self, &(K, V))>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        match self {
            Tree::Empty => None,
            Tree::Node(tn) => match k.cmp(tn.key().borrow()) {
                Ordering::Less => tn
                    .left
                    .remove(k)
                    .map(|(l, prev)| (Tree::bal(&l, &tn.elt, &tn.right), prev)),
                Ordering::Greater => tn
                    .right
                    .remove(k)
                    .map(|(r, prev)| (Tree::bal(&tn.left, &tn.elt, &r), prev)),
                Ordering::Equal => Some((Tree::remove_root(tn), &*tn.elt)),
            },
        }
    }

    /// One traversal read modify write. f gets the query, the data,
    /// and the current binding, and returns the new binding, or None
    /// to remove it. The key f returns must compare equal to q. The
    /// result is None if nothing changed, that is if q was unbound
    /// and f returned None.
    pub(crate) fn update<Q, D, F>(&self, q: Q, d: D, f: &mut F) -> Option<(Self, Option<&(K, V)>)>
    where
        Q: Ord,
        K: Borrow<Q>,
        F: FnMut(Q, D, Option<(&K, &V)>) -> Option<(K, V)>,
    {
        self.update_in(q, d, f, None, None)
    }

    // lower and upper are the nearest keys above the subtree on either
    // side, a new binding must land strictly between them
    fn update_in<'a, Q, D, F>(
        &'a self,
        q: Q,
        d: D,
        f: &mut F,
        lower: Option<&K>,
        upper: Option<&K>,
    ) -> Option<(Self, Option<&'a (K, V)>)>
    where
        Q: Ord,
        K: Borrow<Q>,
        F: FnMut(Q, D, Option<(&K, &V)>) -> Option<(K, V)>,
    {
        match self {
            Tree::Empty => f(q, d, None).map(|elt| {
                let fits = lower.map(|l| l < &elt.0).unwrap_or(true)
                    && upper.map(|u| &elt.0 < u).unwrap_or(true);
                if !fits {
                    panic!("update inserted a key that does not compare equal to the query")
                }
                (
                    Tree::create(&Tree::Empty, Arc::new(elt), &Tree::Empty),
                    None,
                )
            }),
            Tree::Node(tn) => match q.cmp(tn.key().borrow()) {
                Ordering::Less => tn
                    .left
                    .update_in(q, d, f, lower, Some(tn.key()))
                    .map(|(l, prev)| (Tree::bal(&l, &tn.elt, &tn.right), prev)),
                Ordering::Greater => tn
                    .right
                    .update_in(q, d, f, Some(tn.key()), upper)
                    .map(|(r, prev)| (Tree::bal(&tn.left, &tn.elt, &r), prev)),
                Ordering::Equal => {
                    let t = match f(q, d, Some((&tn.elt.0, &tn.elt.1))) {
                        None => Tree::remove_root(tn),
                        Some(elt) => {
                            if elt.0.cmp(tn.key()) != Ordering::Equal {
                                panic!("update replaced a binding with a different key")
                            }
                            Tree::bal(&tn.left, &Arc::new(elt), &tn.right)
                        }
                    };
                    Some((t, Some(&*tn.elt)))
                }
            },
        }
    }
}

impl<K, V> Tree<K, V>
where
    K: Ord + Debug,
    V: Debug,
{
    #[allow(dead_code)]
    pub(crate) fn invariant(&self) {
        fn in_range<K: Ord>(lower: Option<&K>, upper: Option<&K>, k: &K) -> bool {
            lower.map(|l| l < k).unwrap_or(true) && upper.map(|u| k < u).unwrap_or(true)
        }

        fn check<K, V>(t: &Tree<K, V>, lower: Option<&K>, upper: Option<&K>) -> (u16, usize)
        where
            K: Ord + Debug,
            V: Debug,
        {
            match t {
                Tree::Empty => (0, 0),
                Tree::Node(tn) => {
                    if !in_range(lower, upper, tn.key()) {
                        panic!(
                            "tree invariant violated lower\n{:#?}\n\nupper\n{:#?}\n\nkey\n{:#?}\n\ntree\n{:#?}",
                            lower,
                            upper,
                            tn.key(),
                            t
                        )
                    };
                    let (thl, ll) = check(&tn.left, lower, Some(tn.key()));
                    let (thr, lr) = check(&tn.right, Some(tn.key()), upper);
                    let th = 1 + max(thl, thr);
                    let (hl, hr) = (tn.left.height(), tn.right.height());
                    if thl != hl {
                        panic!("left node height is wrong")
                    };
                    if thr != hr {
                        panic!("right node height is wrong")
                    };
                    if th != t.height() {
                        panic!("node height is wrong {} vs {}", th, t.height())
                    };
                    if max(hl, hr) - min(hl, hr) > 1 {
                        panic!("tree is unbalanced {} vs {} tree: {:#?}", hl, hr, t)
                    };
                    let len = 1 + ll + lr;
                    if len != t.len() {
                        panic!("node size is wrong {} vs {}", len, t.len())
                    };
                    (th, len)
                }
            }
        }

        check(self, None, None);
    }
}
