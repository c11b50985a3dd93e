use crate::avl::Tree;
pub use crate::iter::{Cursor, Iter, Keys, Values};
use crate::iter::Direction;
use std::{
    borrow::Borrow,
    cmp::{Eq, Ord, Ordering, PartialEq, PartialOrd},
    default::Default,
    fmt::{self, Debug, Formatter},
    hash::{Hash, Hasher},
    iter::{FromIterator, Rev},
    ops::{Bound, Index},
};

/// A persistent ordered map, implemented as an AVL tree whose nodes
/// are never modified once built.
///
/// Every "modifying" method takes `&self` and returns a new map. The
/// new map shares every subtree that wasn't on the path to the
/// changed key with the old one, so an update allocates O(log(N))
/// nodes, and the old map remains valid, unchanged, and usable for
/// as long as you hold it. Cloning a map is O(1).
///
/// Entries are reference counted and shared between versions, so
/// neither the key nor the value type needs to implement `Clone`.
///
/// Because nodes are immutable, any number of threads can read the
/// same version at once without locking. Publishing the "latest"
/// version between threads is up to you, e.g. behind a `Mutex` or a
/// `RwLock`.
///
/// # Examples
/// ```
/// use std::string::String;
/// use self::immutable_avlmap::map::Map;
///
/// let m =
///    Map::new()
///    .insert(String::from("1"), 1)
///    .insert(String::from("2"), 2)
///    .insert(String::from("3"), 3);
///
/// assert_eq!(m.get("1"), Option::Some(&1));
/// assert_eq!(m.get("2"), Option::Some(&2));
/// assert_eq!(m.get("3"), Option::Some(&3));
/// assert_eq!(m.get("4"), Option::None);
///
/// let m2 = m.remove("2");
/// assert_eq!(m2.get("2"), Option::None);
/// assert_eq!(m.get("2"), Option::Some(&2));
///
/// for (k, v) in &m {
///   println!("key {}, val: {}", k, v)
/// }
/// ```
pub struct Map<K, V>(Tree<K, V>);

impl<K, V> Clone for Map<K, V> {
    fn clone(&self) -> Self {
        Map(self.0.clone())
    }
}

impl<K, V> Hash for Map<K, V>
where
    K: Hash + Ord,
    V: Hash,
{
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state)
    }
}

impl<K, V> Default for Map<K, V> {
    fn default() -> Map<K, V> {
        Map::new()
    }
}

impl<K, V> PartialEq for Map<K, V>
where
    K: Ord,
    V: PartialEq,
{
    fn eq(&self, other: &Map<K, V>) -> bool {
        self.0 == other.0
    }
}

impl<K, V> Eq for Map<K, V>
where
    K: Ord,
    V: Eq,
{
}

impl<K, V> PartialOrd for Map<K, V>
where
    K: Ord,
    V: PartialOrd,
{
    fn partial_cmp(&self, other: &Map<K, V>) -> Option<Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl<K, V> Ord for Map<K, V>
where
    K: Ord,
    V: Ord,
{
    fn cmp(&self, other: &Map<K, V>) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl<K, V> Debug for Map<K, V>
where
    K: Debug + Ord,
    V: Debug,
{
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl<'a, Q, K, V> Index<&'a Q> for Map<K, V>
where
    Q: ?Sized + Ord,
    K: Ord + Borrow<Q>,
{
    type Output = V;
    fn index(&self, k: &Q) -> &V {
        self.get(k).expect("element not found for key")
    }
}

impl<K, V> FromIterator<(K, V)> for Map<K, V>
where
    K: Ord,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Map::new().insert_many(iter)
    }
}

impl<'a, K, V> IntoIterator for &'a Map<K, V>
where
    K: 'a + Ord,
    V: 'a,
{
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, K, V>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<K, V> Map<K, V> {
    /// Create a new empty map
    pub fn new() -> Self {
        Map(Tree::new())
    }

    /// get the number of elements in the map O(1) time and space
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// true if the map has no elements
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// the height of the underlying tree, 0 for the empty map. At
    /// most about 1.44 * log2(len + 2).
    pub fn height(&self) -> usize {
        self.0.height() as usize
    }

    /// the binding with the smallest key, or None if the map is
    /// empty. Runs in log(N) time.
    ///
    /// # Examples
    /// ```
    /// use self::immutable_avlmap::map::Map;
    ///
    /// let m = Map::new().insert(2, "b").insert(1, "a").insert(3, "c");
    /// assert_eq!(m.min_entry(), Some((&1, &"a")));
    /// assert_eq!(m.max_entry(), Some((&3, &"c")));
    /// assert_eq!(Map::<i32, i32>::new().min_entry(), None);
    /// ```
    pub fn min_entry(&self) -> Option<(&K, &V)> {
        self.0.min_elt().map(|e| (&e.0, &e.1))
    }

    /// the binding with the largest key, or None if the map is
    /// empty. Runs in log(N) time.
    pub fn max_entry(&self) -> Option<(&K, &V)> {
        self.0.max_elt().map(|e| (&e.0, &e.1))
    }

    /// Every binding in ascending key order, collected eagerly into
    /// a vector. O(N) time and space; use `iter` to walk the map
    /// lazily.
    ///
    /// # Examples
    /// ```
    /// use self::immutable_avlmap::map::Map;
    ///
    /// let m = Map::new().insert(2, "b").insert(1, "a");
    /// assert_eq!(m.entries(), vec![(&1, &"a"), (&2, &"b")]);
    /// ```
    pub fn entries(&self) -> Vec<(&K, &V)> {
        self.0.entries()
    }
}

impl<K, V> Map<K, V>
where
    K: Ord,
{
    /// return a new map with (k, v) inserted into it. If k already
    /// exists in the old map, the new map will contain the new
    /// binding. Runs in log(N) time and space.
    pub fn insert(&self, k: K, v: V) -> Self {
        self.insert_full(k, v).0
    }

    /// like `insert`, but also return the value k was bound to in
    /// this map, if any.
    ///
    /// # Examples
    /// ```
    /// use self::immutable_avlmap::map::Map;
    ///
    /// let m0 = Map::new().insert("a", 1);
    /// let (m1, prev) = m0.insert_full("a", 2);
    /// assert_eq!(prev, Some(&1));
    /// assert_eq!(m1.get("a"), Some(&2));
    /// ```
    pub fn insert_full(&self, k: K, v: V) -> (Self, Option<&V>) {
        let (t, prev) = self.0.insert(k, v);
        (Map(t), prev.map(|(_, v)| v))
    }

    /// Insert every binding produced by elts, in order. Later
    /// duplicates replace earlier ones.
    ///
    /// # Examples
    /// ```
    /// use self::immutable_avlmap::map::Map;
    ///
    /// let v = vec![(1, 3), (10, 1), (-12, 2), (44, 0), (50, -1)];
    /// let m = Map::new().insert_many(v.iter().map(|(k, v)| (*k, *v)));
    ///
    /// for (k, v) in &v {
    ///   assert_eq!(m.get(k), Option::Some(v))
    /// }
    /// ```
    pub fn insert_many<E: IntoIterator<Item = (K, V)>>(&self, elts: E) -> Self {
        let mut t = self.0.clone();
        for (k, v) in elts {
            let (nt, _) = t.insert(k, v);
            t = nt;
        }
        Map(t)
    }

    /// return a new map with the binding for k, which can be any
    /// borrowed form of the key, removed. If k isn't bound the
    /// result shares everything with this map. Runs in log(N) time
    /// and space.
    pub fn remove<Q>(&self, k: &Q) -> Self
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.remove_full(k).0
    }

    /// like `remove`, but also return the removed binding.
    pub fn remove_full<Q>(&self, k: &Q) -> (Self, Option<(&K, &V)>)
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        match self.0.remove(k) {
            None => (self.clone(), None),
            Some((t, (k, v))) => (Map(t), Some((k, v))),
        }
    }

    /// return a new map with the binding for q updated to the
    /// result of f. f gets q, d, and the current binding, if any. If
    /// it returns None the binding is removed, otherwise the returned
    /// binding, whose key must compare equal to q, is inserted. Only
    /// one traversal of the tree is made. The second element of the
    /// result is the binding q had in this map, if any.
    ///
    /// # Panics
    /// if f returns a binding whose key would not sit where q does in
    /// the key order.
    ///
    /// # Examples
    /// ```
    /// use self::immutable_avlmap::map::Map;
    ///
    /// let (m, _) = Map::new().update(0, 0, &mut |k, d, _| Some((k, d)));
    /// let (m, _) = m.update(1, 1, &mut |k, d, _| Some((k, d)));
    /// let (m, _) = m.update(2, 2, &mut |k, d, _| Some((k, d)));
    /// assert_eq!(m.get(&0), Some(&0));
    /// assert_eq!(m.get(&1), Some(&1));
    /// assert_eq!(m.get(&2), Some(&2));
    ///
    /// let (m, _) = m.update(0, (), &mut |k, (), v| v.map(|(_, v)| (k, v + 1)));
    /// assert_eq!(m.get(&0), Some(&1));
    ///
    /// let (m, prev) = m.update(1, (), &mut |_, (), _| None);
    /// assert_eq!(prev, Some((&1, &1)));
    /// assert_eq!(m.get(&1), None);
    /// assert_eq!(m.get(&2), Some(&2));
    /// ```
    pub fn update<Q, D, F>(&self, q: Q, d: D, f: &mut F) -> (Self, Option<(&K, &V)>)
    where
        Q: Ord,
        K: Borrow<Q>,
        F: FnMut(Q, D, Option<(&K, &V)>) -> Option<(K, V)>,
    {
        match self.0.update(q, d, f) {
            None => (self.clone(), None),
            Some((t, prev)) => (Map(t), prev.map(|(k, v)| (k, v))),
        }
    }

    /// lookup the mapping for k. If it doesn't exist return
    /// None. Runs in log(N) time and constant space, where N is the
    /// size of the map.
    pub fn get<'a, Q>(&'a self, k: &Q) -> Option<&'a V>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.0.get(k)
    }

    /// lookup the mapping for k and return the key as it is stored
    /// in the map.
    pub fn get_key<'a, Q>(&'a self, k: &Q) -> Option<&'a K>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.0.get_key(k)
    }

    /// lookup the mapping for k, and return both the key and the
    /// value.
    pub fn get_full<'a, Q>(&'a self, k: &Q) -> Option<(&'a K, &'a V)>
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.0.get_full(k)
    }

    /// true if k is bound in the map
    pub fn contains_key<Q>(&self, k: &Q) -> bool
    where
        Q: ?Sized + Ord,
        K: Borrow<Q>,
    {
        self.0.get(k).is_some()
    }

    /// A resumable cursor over the map in ascending key order. Call
    /// `advance` to step it and `is_done` to test for the end. The
    /// cursor holds at most O(log(N)) state.
    pub fn cursor(&self) -> Cursor<'_, K, V> {
        Cursor::new(&self.0, Direction::Left)
    }

    /// like `cursor`, but in descending key order
    pub fn cursor_rev(&self) -> Cursor<'_, K, V> {
        Cursor::new(&self.0, Direction::Right)
    }

    /// iterate over every binding in ascending key order
    pub fn iter(&self) -> Iter<'_, K, K, V> {
        self.0.into_iter()
    }

    /// iterate over every binding in descending key order
    pub fn iter_rev(&self) -> Rev<Iter<'_, K, K, V>> {
        self.iter().rev()
    }

    /// iterate over the keys in ascending order
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    /// iterate over the values in ascending key order
    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }

    /// return an iterator over the subset of elements in the
    /// map that are within the specified range.
    ///
    /// The returned iterator runs in O(log(N) + M) time, and
    /// O(log(N)) space. N is the number of elements in the
    /// tree, and M is the number of elements you examine.
    ///
    /// if lbound >= ubound the returned iterator will be empty
    ///
    /// # Examples
    /// ```
    /// use std::ops::Bound::{Excluded, Included};
    /// use self::immutable_avlmap::map::Map;
    ///
    /// let m: Map<i32, ()> = (0..10).map(|k| (k, ())).collect();
    /// let ks: Vec<i32> = m.range(Included(3), Excluded(6)).map(|(k, _)| *k).collect();
    /// assert_eq!(ks, vec![3, 4, 5]);
    /// ```
    pub fn range<'a, Q>(&'a self, lbound: Bound<Q>, ubound: Bound<Q>) -> Iter<'a, Q, K, V>
    where
        Q: Ord,
        K: Borrow<Q>,
    {
        self.0.range(lbound, ubound)
    }
}

impl<K, V> Map<K, V>
where
    K: Ord + Debug,
    V: Debug,
{
    #[allow(dead_code)]
    pub(crate) fn invariant(&self) {
        self.0.invariant()
    }
}

#[cfg(feature = "serde")]
impl<K, V> serde::Serialize for Map<K, V>
where
    K: serde::Serialize + Ord,
    V: serde::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (k, v) in self {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
struct MapVisitor<K, V>(std::marker::PhantomData<(K, V)>);

#[cfg(feature = "serde")]
impl<'de, K, V> serde::de::Visitor<'de> for MapVisitor<K, V>
where
    K: serde::Deserialize<'de> + Ord,
    V: serde::Deserialize<'de>,
{
    type Value = Map<K, V>;

    fn expecting(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str("a map")
    }

    fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::MapAccess<'de>,
    {
        let mut t = Tree::new();
        while let Some((k, v)) = access.next_entry()? {
            let (nt, _) = t.insert(k, v);
            t = nt;
        }
        Ok(Map(t))
    }
}

#[cfg(feature = "serde")]
impl<'de, K, V> serde::Deserialize<'de> for Map<K, V>
where
    K: serde::Deserialize<'de> + Ord,
    V: serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_map(MapVisitor(std::marker::PhantomData))
    }
}
