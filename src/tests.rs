use crate::{avl::Tree, map::Map};
use std::{
    collections::{hash_map::DefaultHasher, BTreeMap},
    hash::{Hash, Hasher},
    ops::Bound::{self, Excluded, Included, Unbounded},
    thread,
};

macro_rules! tests {
    ($t:ident) => {
        paste::paste! {
            mod [<$t:lower>] {
                use crate::map::Map;
                use rand::Rng;
                use std::{collections::BTreeMap, fmt::Debug, ops::Bound::*};

                const STRSIZE: usize = 10;
                const SIZE: usize = 1000;

                trait Rand: Sized {
                    fn rand<R: Rng>(r: &mut R) -> Self;
                }

                impl Rand for String {
                    fn rand<R: Rng>(r: &mut R) -> Self {
                        let mut s = String::new();
                        for _ in 0..STRSIZE {
                            s.push(r.gen())
                        }
                        s
                    }
                }

                impl Rand for i32 {
                    fn rand<R: Rng>(r: &mut R) -> Self {
                        // keep the range small enough to get duplicates
                        r.gen_range(-2000..2000)
                    }
                }

                fn randvec<T: Rand>(len: usize) -> Vec<T> {
                    let mut rng = rand::thread_rng();
                    let mut v: Vec<T> = Vec::new();
                    for _ in 0..len {
                        v.push(T::rand(&mut rng))
                    }
                    v
                }

                fn model<T: Ord + Clone>(v: &[T]) -> BTreeMap<T, T> {
                    v.iter().map(|k| (k.clone(), k.clone())).collect()
                }

                fn height_bound(len: usize) -> usize {
                    (1.45 * ((len + 2) as f64).log2()).ceil() as usize
                }

                fn add<T: Ord + Clone + Debug>(v: &[T]) -> Map<T, T> {
                    let mut t = Map::new();
                    for k in v {
                        let len = t.len();
                        let present = t.contains_key(k);
                        t = t.insert(k.clone(), k.clone());
                        t.invariant();
                        assert_eq!(t.get(k), Some(k));
                        assert_eq!(t.len(), if present { len } else { len + 1 });
                        assert!(t.height() <= height_bound(t.len()));
                    }
                    t
                }

                #[test]
                fn test_insert_rand() {
                    let v = randvec::<$t>(SIZE);
                    let t = add(&v);
                    let m = model(&v);
                    assert_eq!(t.len(), m.len());
                    for k in &v {
                        assert_eq!(t.get(k), Some(k));
                    }
                }

                #[test]
                fn test_insert_remove_rand() {
                    let v = randvec::<$t>(SIZE);
                    let mut t = add(&v);
                    let mut m = model(&v);
                    for (i, k) in v.iter().enumerate() {
                        let len = t.len();
                        let present = m.remove(k).is_some();
                        t = t.remove(k);
                        t.invariant();
                        assert_eq!(t.get(k), None);
                        assert_eq!(t.len(), if present { len - 1 } else { len });
                        assert!(t.height() <= height_bound(t.len()));
                        if i % 10 == 0 {
                            let e: Vec<_> = t.entries().into_iter().map(|(k, _)| k.clone()).collect();
                            let me: Vec<_> = m.keys().cloned().collect();
                            assert_eq!(e, me);
                        }
                    }
                    assert!(t.is_empty());
                    assert_eq!(t.min_entry(), None);
                    assert_eq!(t.max_entry(), None);
                }

                #[test]
                fn test_entries_sorted() {
                    let v = randvec::<$t>(SIZE);
                    let t = add(&v);
                    let e = t.entries();
                    assert!(e.windows(2).all(|w| w[0].0 < w[1].0));
                    let m = model(&v);
                    assert!(e.into_iter().eq(m.iter()));
                    assert_eq!(t.min_entry(), m.iter().next());
                    assert_eq!(t.max_entry(), m.iter().next_back());
                }

                #[test]
                fn test_iter_agrees_with_entries() {
                    let v = randvec::<$t>(SIZE);
                    let t = add(&v);
                    let e = t.entries();
                    assert_eq!(t.iter().collect::<Vec<_>>(), e);
                    let mut rev = e.clone();
                    rev.reverse();
                    assert_eq!(t.iter_rev().collect::<Vec<_>>(), rev);

                    let mut c = t.cursor();
                    let mut from_cursor = Vec::new();
                    while !c.is_done() {
                        from_cursor.push(c.entry().unwrap());
                        c.advance();
                    }
                    assert_eq!(from_cursor, e);
                    assert_eq!(c.key(), None);

                    let mut c = t.cursor_rev();
                    let mut from_cursor = Vec::new();
                    while let Some(kv) = c.entry() {
                        from_cursor.push(kv);
                        c.advance();
                    }
                    assert!(c.is_done());
                    assert_eq!(from_cursor, rev);
                }

                #[test]
                fn test_iter_double_ended() {
                    let v = randvec::<$t>(SIZE);
                    let t = add(&v);
                    let e = t.entries();
                    let mut it = t.iter();
                    let (mut front, mut back) = (Vec::new(), Vec::new());
                    loop {
                        match it.next() {
                            None => break,
                            Some(kv) => front.push(kv),
                        }
                        match it.next_back() {
                            None => break,
                            Some(kv) => back.push(kv),
                        }
                    }
                    assert_eq!(it.next(), None);
                    assert_eq!(it.next_back(), None);
                    back.reverse();
                    front.extend(back);
                    assert_eq!(front, e);
                }

                #[test]
                fn test_range() {
                    let v = randvec::<$t>(SIZE);
                    let t = add(&v);
                    let m = model(&v);
                    let mut bounds = randvec::<$t>(20);
                    bounds.sort();
                    for w in bounds.windows(2) {
                        let (lo, hi) = (w[0].clone(), w[1].clone());
                        if lo == hi {
                            continue;
                        }
                        let cases = vec![
                            (Included(lo.clone()), Included(hi.clone())),
                            (Excluded(lo.clone()), Excluded(hi.clone())),
                            (Included(lo.clone()), Unbounded),
                            (Unbounded, Excluded(hi.clone())),
                        ];
                        for (l, u) in cases {
                            let got: Vec<_> = t.range(l.clone(), u.clone()).collect();
                            let want: Vec<_> = m.range((l.clone(), u.clone())).collect();
                            assert_eq!(got, want);
                            let got: Vec<_> = t.range(l.clone(), u.clone()).rev().collect();
                            let want: Vec<_> = m.range((l, u)).rev().collect();
                            assert_eq!(got, want);
                        }
                        // inverted bounds are empty
                        assert_eq!(t.range(Included(hi.clone()), Included(lo.clone())).next(), None);
                    }
                }

                #[test]
                fn test_persistence() {
                    let v = randvec::<$t>(SIZE / 4);
                    let mut versions = vec![Map::new()];
                    let mut models = vec![BTreeMap::new()];
                    for k in &v {
                        let t = versions.last().unwrap().insert(k.clone(), k.clone());
                        let mut m = models.last().unwrap().clone();
                        m.insert(k.clone(), k.clone());
                        versions.push(t);
                        models.push(m);
                    }
                    for k in &v {
                        let t = versions.last().unwrap().remove(k);
                        let mut m = models.last().unwrap().clone();
                        m.remove(k);
                        versions.push(t);
                        models.push(m);
                    }
                    // every old version still reads exactly as it did
                    for (t, m) in versions.iter().zip(&models) {
                        t.invariant();
                        assert_eq!(t.len(), m.len());
                        assert!(t.iter().eq(m.iter()));
                    }
                    assert!(versions.last().unwrap().is_empty());
                }
            }
        }
    };
}

tests!(i32);
tests!(String);

fn build(keys: &[i32]) -> Map<i32, i32> {
    let mut m = Map::new();
    for k in keys {
        m = m.insert(*k, k * 10);
        m.invariant();
    }
    m
}

#[test]
fn test_scenario() {
    let m = build(&[5, 3, 8, 1, 4, 7, 9, 2, 6, 0]);
    let expected: Vec<(i32, i32)> = (0..10).map(|k| (k, k * 10)).collect();
    let got: Vec<(i32, i32)> = m.entries().into_iter().map(|(k, v)| (*k, *v)).collect();
    assert_eq!(got, expected);

    let m2 = m.remove(&5);
    m2.invariant();
    assert_eq!(m2.get(&5), None);
    assert_eq!(m2.len(), 9);
    let keys: Vec<i32> = m2.iter_rev().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec![9, 8, 7, 6, 4, 3, 2, 1, 0]);

    // the old version is untouched
    assert_eq!(m.get(&5), Some(&50));
    assert_eq!(m.len(), 10);
    m.invariant();
}

#[test]
fn test_sequential_inserts_stay_balanced() {
    let asc = build(&(0..1000).collect::<Vec<_>>());
    let desc = build(&(0..1000).rev().collect::<Vec<_>>());
    // 1000 entries fit in a perfect tree of height 10, AVL allows a
    // little slack on top of that
    assert!(asc.height() <= 14);
    assert!(desc.height() <= 14);
    assert_eq!(asc, desc);
    assert_eq!(asc.min_entry(), Some((&0, &0)));
    assert_eq!(asc.max_entry(), Some((&999, &9990)));
}

#[test]
fn test_replace_keeps_len() {
    let m = build(&[1, 2, 3]);
    let (m2, prev) = m.insert_full(2, 200);
    m2.invariant();
    assert_eq!(prev, Some(&20));
    assert_eq!(m2.len(), 3);
    assert_eq!(m2.get(&2), Some(&200));
    assert_eq!(m.get(&2), Some(&20));
    let (_, prev) = m.insert_full(4, 40);
    assert_eq!(prev, None);
}

#[test]
fn test_remove_absent_is_noop() {
    let m = build(&[1, 2, 3, 4, 5]);
    let (m2, prev) = m.remove_full(&42);
    assert_eq!(prev, None);
    assert_eq!(m2, m);
    assert_eq!(m2.len(), 5);
    assert_eq!(Map::<i32, i32>::new().remove(&1).len(), 0);
    let (_, prev) = m.remove_full(&3);
    assert_eq!(prev, Some((&3, &30)));
}

#[test]
fn test_tree_remove() {
    let mut t = Tree::new();
    for k in 0..100 {
        let (nt, _) = t.insert(k * 2, ());
        t = nt;
    }
    assert!(t.remove(&51).is_none());
    let (t2, elt) = t.remove(&50).unwrap();
    assert_eq!(elt.0, 50);
    t2.invariant();
    assert_eq!(t2.len(), 99);
    match (&t, &t2) {
        (Tree::Node(a), Tree::Node(b)) => assert!(!std::sync::Arc::ptr_eq(a, b)),
        _ => panic!("tree is empty"),
    }
}

#[test]
fn test_update() {
    let m = build(&[1, 2, 3]);
    let (m1, prev) = m.update(2, 5, &mut |k, d, cur| cur.map(|(_, v)| (k, v + d)));
    m1.invariant();
    assert_eq!(prev, Some((&2, &20)));
    assert_eq!(m1.get(&2), Some(&25));

    // absent key, f declines, nothing changes
    let (m2, prev) = m.update(7, (), &mut |_, (), _| None);
    assert_eq!(prev, None);
    assert_eq!(m2, m);

    // absent key, f inserts
    let (m3, _) = m.update(7, 70, &mut |k, d, _| Some((k, d)));
    m3.invariant();
    assert_eq!(m3.get(&7), Some(&70));
    assert_eq!(m3.len(), 4);

    // present key, f removes
    let (m4, prev) = m3.update(1, (), &mut |_, (), _| None);
    m4.invariant();
    assert_eq!(prev, Some((&1, &10)));
    assert_eq!(m4.get(&1), None);
    assert_eq!(m4.len(), 3);
}

#[test]
fn test_update_removes_internal_nodes() {
    let mut m = build(&(0..200).collect::<Vec<_>>());
    for k in (0..200).step_by(3) {
        let (nm, prev) = m.update(k, (), &mut |_, (), _| None);
        assert_eq!(prev.map(|(k, _)| *k), Some(k));
        nm.invariant();
        m = nm;
    }
    assert_eq!(m.len(), 200 - 67);
}

#[test]
#[should_panic(expected = "update replaced a binding with a different key")]
fn test_update_rejects_changed_key() {
    let m = build(&[1, 2, 3]);
    m.update(2, (), &mut |_, (), _| Some((100, 0)));
}

#[test]
#[should_panic(expected = "update inserted a key that does not compare equal to the query")]
fn test_update_rejects_misplaced_insert() {
    let m = build(&[1, 3, 5]);
    m.update(4, (), &mut |_, (), _| Some((0, 0)));
}

#[test]
fn test_update_insert_between_neighbours() {
    let m = build(&[1, 3, 5]);
    let (m, prev) = m.update(4, 40, &mut |k, d, _| Some((k, d)));
    assert_eq!(prev, None);
    m.invariant();
    assert_eq!(m.keys().copied().collect::<Vec<_>>(), vec![1, 3, 4, 5]);
    assert_eq!(m.get(&3), Some(&30));
}

#[test]
fn test_empty_map() {
    let m: Map<i32, i32> = Map::new();
    assert!(m.is_empty());
    assert_eq!(m.len(), 0);
    assert_eq!(m.height(), 0);
    assert_eq!(m.get(&0), None);
    assert_eq!(m.min_entry(), None);
    assert_eq!(m.max_entry(), None);
    assert!(m.entries().is_empty());
    assert!(m.cursor().is_done());
    assert!(m.cursor_rev().is_done());
    assert_eq!(m.cursor().key(), None);
    assert_eq!(m.iter().next(), None);
    assert_eq!(m.iter().next_back(), None);
    assert_eq!(m.range(Included(0), Included(10)).next(), None);
}

#[test]
fn test_cursor_is_primed() {
    let m = build(&[2, 1, 3]);
    let c = m.cursor();
    assert!(!c.is_done());
    assert_eq!(c.key(), Some(&1));
    assert_eq!(c.value(), Some(&10));
    let c = m.cursor_rev();
    assert_eq!(c.entry(), Some((&3, &30)));
}

#[test]
fn test_range_bounds() {
    let m = build(&(0..20).collect::<Vec<_>>());
    let keys = |l: Bound<i32>, u: Bound<i32>| -> Vec<i32> { m.range(l, u).map(|(k, _)| *k).collect() };
    assert_eq!(keys(Included(5), Included(8)), vec![5, 6, 7, 8]);
    assert_eq!(keys(Excluded(5), Excluded(8)), vec![6, 7]);
    assert_eq!(keys(Excluded(18), Unbounded), vec![19]);
    assert_eq!(keys(Unbounded, Excluded(2)), vec![0, 1]);
    assert_eq!(keys(Included(-10), Included(-1)), Vec::<i32>::new());
    assert_eq!(keys(Included(100), Unbounded), Vec::<i32>::new());
    assert_eq!(keys(Excluded(5), Excluded(5)), Vec::<i32>::new());
    assert_eq!(keys(Included(5), Included(5)), vec![5]);
    assert_eq!(keys(Included(9), Included(3)), Vec::<i32>::new());
    let rev: Vec<i32> = m.range(Included(5), Included(8)).rev().map(|(k, _)| *k).collect();
    assert_eq!(rev, vec![8, 7, 6, 5]);
}

#[test]
fn test_keys_values() {
    let m = build(&[3, 1, 2]);
    assert_eq!(m.keys().collect::<Vec<_>>(), vec![&1, &2, &3]);
    assert_eq!(m.values().rev().collect::<Vec<_>>(), vec![&30, &20, &10]);
}

#[test]
fn test_borrowed_lookup() {
    let m: Map<String, usize> = ["a", "b", "c"]
        .iter()
        .enumerate()
        .map(|(i, s)| (s.to_string(), i))
        .collect();
    assert_eq!(m.get("b"), Some(&1));
    assert_eq!(m.get_key("c").map(|s| s.as_str()), Some("c"));
    assert_eq!(m.get_full("a"), Some((&"a".to_string(), &0)));
    assert!(m.contains_key("a"));
    assert!(!m.contains_key("z"));
    assert_eq!(m["c"], 2);
    let m = m.remove("b");
    assert_eq!(m.get("b"), None);
}

#[test]
#[should_panic(expected = "element not found for key")]
fn test_index_missing() {
    let m = build(&[1]);
    let _ = m[&2];
}

#[test]
fn test_values_need_not_be_clone() {
    #[derive(Debug, PartialEq)]
    struct Opaque(u32);

    let m = Map::new().insert(1, Opaque(1)).insert(2, Opaque(2));
    let m2 = m.insert(1, Opaque(10)).remove(&2);
    assert_eq!(m.get(&1), Some(&Opaque(1)));
    assert_eq!(m2.get(&1), Some(&Opaque(10)));
    assert_eq!(m2.get(&2), None);
}

#[test]
fn test_eq_hash_order_independent() {
    fn hash<T: Hash>(t: &T) -> u64 {
        let mut h = DefaultHasher::new();
        t.hash(&mut h);
        h.finish()
    }
    let a = build(&[1, 2, 3, 4, 5, 6, 7]);
    let b = build(&[7, 6, 5, 4, 3, 2, 1]);
    assert_eq!(a, b);
    assert_eq!(hash(&a), hash(&b));
    let c = b.insert(4, 0);
    assert_ne!(a, c);
    assert!(c < a);
    assert_eq!(format!("{:?}", build(&[2, 1])), "{1: 10, 2: 20}");
}

#[test]
fn test_concurrent_readers() {
    fn send_sync<T: Send + Sync>() {}
    send_sync::<Map<String, Vec<u8>>>();

    let m = build(&(0..1000).collect::<Vec<_>>());
    let threads: Vec<_> = (0..4)
        .map(|i| {
            let m = m.clone();
            thread::spawn(move || {
                for k in (i..1000).step_by(4) {
                    assert_eq!(m.get(&k), Some(&(k * 10)));
                }
                m.iter().count()
            })
        })
        .collect();
    // writers derive new versions while the readers run
    let mut w = m.clone();
    for k in 0..500 {
        w = w.remove(&k);
    }
    for th in threads {
        assert_eq!(th.join().unwrap(), 1000);
    }
    assert_eq!(w.len(), 500);
    assert_eq!(m.len(), 1000);
}

#[test]
fn test_model_random_ops() {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let mut m = Map::new();
    let mut model = BTreeMap::new();
    for _ in 0..5000 {
        let k: u16 = rng.gen_range(0..512);
        if rng.gen_bool(0.6) {
            m = m.insert(k, k as u32);
            model.insert(k, k as u32);
        } else {
            m = m.remove(&k);
            model.remove(&k);
        }
        assert_eq!(m.len(), model.len());
    }
    m.invariant();
    assert!(m.iter().eq(model.iter()));
    assert!(m.iter_rev().eq(model.iter().rev()));
}

#[cfg(feature = "serde")]
#[test]
fn test_serde_round_trip() {
    let m = build(&[3, 1, 2]);
    let json = serde_json::to_string(&m).unwrap();
    assert_eq!(json, r#"{"1":10,"2":20,"3":30}"#);
    let m2: Map<i32, i32> = serde_json::from_str(&json).unwrap();
    m2.invariant();
    assert_eq!(m, m2);
}
