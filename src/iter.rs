use crate::avl::{Node, Tree};
use arrayvec::ArrayVec;
use std::{borrow::Borrow, iter::FusedIterator, ops::Bound};

// An AVL tree of height h holds at least fib(h + 2) - 1 entries, so
// no tree that fits in a 64 bit address space is taller than 92. The
// cursor never holds more than height + 1 frames.
pub(crate) const MAX_DEPTH: usize = 128;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Direction {
    Left,
    Right,
}

impl Direction {
    fn flip(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Descend,
    PushChild,
    Emit,
    Ascend,
}

struct Frame<'a, K, V> {
    node: Option<&'a Node<K, V>>,
    phase: Phase,
}

impl<'a, K, V> Clone for Frame<'a, K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, K, V> Copy for Frame<'a, K, V> {}

impl<'a, K, V> Frame<'a, K, V> {
    fn descend(t: &'a Tree<K, V>) -> Self {
        let node = match t {
            Tree::Empty => None,
            Tree::Node(n) => Some(&**n),
        };
        Frame {
            node,
            phase: Phase::Descend,
        }
    }
}

/// A resumable in order walk over one version of a map.
///
/// The cursor keeps an explicit stack of frames instead of recursing,
/// so it can be suspended after every entry and holds at most
/// `height + 1` frames. It is primed on construction: unless the map
/// is empty the first entry is available immediately.
///
/// # Examples
/// ```
/// use self::immutable_avlmap::map::Map;
///
/// let m: Map<i32, i32> = (0..4).map(|k| (k, k * 10)).collect();
/// let mut c = m.cursor_rev();
/// let mut keys = Vec::new();
/// while !c.is_done() {
///     keys.push(*c.key().unwrap());
///     c.advance();
/// }
/// assert_eq!(keys, vec![3, 2, 1, 0]);
/// ```
pub struct Cursor<'a, K, V> {
    near: Direction,
    stack: ArrayVec<Frame<'a, K, V>, MAX_DEPTH>,
    current: Option<&'a (K, V)>,
}

impl<'a, K, V> Clone for Cursor<'a, K, V> {
    fn clone(&self) -> Self {
        Cursor {
            near: self.near,
            stack: self.stack.clone(),
            current: self.current,
        }
    }
}

impl<'a, K, V> Cursor<'a, K, V> {
    /// near is the child visited first, Left walks in ascending order
    pub(crate) fn new(t: &'a Tree<K, V>, near: Direction) -> Self {
        let mut stack = ArrayVec::new();
        stack.push(Frame::descend(t));
        let mut c = Cursor {
            near,
            stack,
            current: None,
        };
        c.advance();
        c
    }

    /// Start at the first entry in the walk's order that satisfies
    /// bound, Left treats it as a lower bound and Right as an upper
    /// bound. Costs one root to leaf descent.
    pub(crate) fn seek<Q>(t: &'a Tree<K, V>, near: Direction, bound: &Bound<Q>) -> Self
    where
        Q: Ord,
        K: Ord + Borrow<Q>,
    {
        let in_bound = |k: &K| match (near, bound) {
            (_, Bound::Unbounded) => true,
            (Direction::Left, Bound::Included(b)) => k.borrow() >= b,
            (Direction::Left, Bound::Excluded(b)) => k.borrow() > b,
            (Direction::Right, Bound::Included(b)) => k.borrow() <= b,
            (Direction::Right, Bound::Excluded(b)) => k.borrow() < b,
        };
        if let Bound::Unbounded = bound {
            return Cursor::new(t, near);
        }
        let mut stack = ArrayVec::new();
        let mut t = t;
        while let Tree::Node(n) = t {
            if in_bound(n.key()) {
                // n and everything on its far side is in the walk,
                // the near side still has to be searched
                stack.push(Frame {
                    node: Some(&**n),
                    phase: Phase::Emit,
                });
                t = n.child(near);
            } else {
                t = n.child(near.flip());
            }
        }
        let mut c = Cursor {
            near,
            stack,
            current: None,
        };
        c.advance();
        c
    }

    /// true when every entry has been produced
    pub fn is_done(&self) -> bool {
        self.stack.is_empty()
    }

    /// move to the next entry, or become done
    pub fn advance(&mut self) {
        while let Some(top) = self.stack.last_mut() {
            match (top.phase, top.node) {
                (Phase::Descend, None) => {
                    self.stack.pop();
                }
                (Phase::Descend, Some(_)) => top.phase = Phase::PushChild,
                (Phase::PushChild, Some(n)) => {
                    top.phase = Phase::Emit;
                    self.stack.push(Frame::descend(n.child(self.near)));
                }
                (Phase::Emit, Some(n)) => {
                    top.phase = Phase::Ascend;
                    self.current = Some(&*n.elt);
                    return;
                }
                (Phase::Ascend, Some(n)) => {
                    // replace, don't push, the stack stays bounded by
                    // the height of the tree
                    *top = Frame::descend(n.child(self.near.flip()));
                }
                (phase, None) => unreachable!("cursor frame in phase {:?} has no node", phase),
            }
        }
        self.current = None;
    }

    /// the current entry, None when done
    pub fn entry(&self) -> Option<(&'a K, &'a V)> {
        self.current.map(|(k, v)| (k, v))
    }

    /// the current key, None when done
    pub fn key(&self) -> Option<&'a K> {
        self.current.map(|(k, _)| k)
    }

    /// the current value, None when done
    pub fn value(&self) -> Option<&'a V> {
        self.current.map(|(_, v)| v)
    }

    fn clear(&mut self) {
        self.stack.clear();
        self.current = None;
    }
}

/// A double ended iterator over a range of a map, in key order.
///
/// The front walks up from the lower bound and the back walks down
/// from the upper bound, each with its own [`Cursor`]. The iterator
/// ends when they meet.
pub struct Iter<'a, Q, K, V>
where
    Q: Ord,
    K: 'a + Ord + Borrow<Q>,
    V: 'a,
{
    lbound: Bound<Q>,
    ubound: Bound<Q>,
    front: Cursor<'a, K, V>,
    back: Cursor<'a, K, V>,
    current: Option<&'a K>,
    current_rev: Option<&'a K>,
    remaining: usize,
}

impl<'a, Q, K, V> Iter<'a, Q, K, V>
where
    Q: Ord,
    K: 'a + Ord + Borrow<Q>,
    V: 'a,
{
    pub(crate) fn new(t: &'a Tree<K, V>, lbound: Bound<Q>, ubound: Bound<Q>) -> Self {
        let front = Cursor::seek(t, Direction::Left, &lbound);
        let back = Cursor::seek(t, Direction::Right, &ubound);
        Iter {
            lbound,
            ubound,
            front,
            back,
            current: None,
            current_rev: None,
            remaining: t.len(),
        }
    }

    fn above_lbound(&self, k: &K) -> bool {
        match self.lbound {
            Bound::Unbounded => true,
            Bound::Included(ref bound) => k.borrow() >= bound,
            Bound::Excluded(ref bound) => k.borrow() > bound,
        }
    }

    fn below_ubound(&self, k: &K) -> bool {
        match self.ubound {
            Bound::Unbounded => true,
            Bound::Included(ref bound) => k.borrow() <= bound,
            Bound::Excluded(ref bound) => k.borrow() < bound,
        }
    }
}

impl<'a, Q, K, V> Iterator for Iter<'a, Q, K, V>
where
    Q: Ord,
    K: 'a + Ord + Borrow<Q>,
    V: 'a,
{
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        let (k, v) = self.front.entry()?;
        let met = self.current_rev.map(|back| k >= back).unwrap_or(false);
        if met || !self.below_ubound(k) {
            self.front.clear();
            self.remaining = 0;
            return None;
        }
        self.current = Some(k);
        self.remaining -= 1;
        self.front.advance();
        Some((k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

impl<'a, Q, K, V> DoubleEndedIterator for Iter<'a, Q, K, V>
where
    Q: Ord,
    K: 'a + Ord + Borrow<Q>,
    V: 'a,
{
    fn next_back(&mut self) -> Option<Self::Item> {
        let (k, v) = self.back.entry()?;
        let met = self.current.map(|front| k <= front).unwrap_or(false);
        if met || !self.above_lbound(k) {
            self.back.clear();
            self.remaining = 0;
            return None;
        }
        self.current_rev = Some(k);
        self.remaining -= 1;
        self.back.advance();
        Some((k, v))
    }
}

impl<'a, Q, K, V> FusedIterator for Iter<'a, Q, K, V>
where
    Q: Ord,
    K: 'a + Ord + Borrow<Q>,
    V: 'a,
{
}

/// An iterator over the keys of a map, in ascending order.
pub struct Keys<'a, K: 'a + Ord, V: 'a>(pub(crate) Iter<'a, K, K, V>);

impl<'a, K: 'a + Ord, V: 'a> Iterator for Keys<'a, K, V> {
    type Item = &'a K;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, K: 'a + Ord, V: 'a> DoubleEndedIterator for Keys<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(k, _)| k)
    }
}

/// An iterator over the values of a map, in ascending key order.
pub struct Values<'a, K: 'a + Ord, V: 'a>(pub(crate) Iter<'a, K, K, V>);

impl<'a, K: 'a + Ord, V: 'a> Iterator for Values<'a, K, V> {
    type Item = &'a V;
    fn next(&mut self) -> Option<Self::Item> {
        self.0.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<'a, K: 'a + Ord, V: 'a> DoubleEndedIterator for Values<'a, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.0.next_back().map(|(_, v)| v)
    }
}
