use crate::utils;
use immutable_avlmap::map::Map;
use std::{
    cmp::min,
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

fn bench_add(len: usize) -> (Map<i64, i64>, Arc<Vec<i64>>, Duration) {
    let mut m = Map::new();
    let data = utils::randvec::<i64>(num_cpus::get(), len);
    let begin = Instant::now();
    for k in &data {
        m = m.insert(*k, *k)
    }
    (m, Arc::new(data), begin.elapsed())
}

fn bench_find(m: &Map<i64, i64>, d: &[i64]) -> Duration {
    let begin = Instant::now();
    for k in d {
        m.get(k).unwrap();
    }
    begin.elapsed()
}

// every thread reads the same version, no locks
fn bench_find_par(m: &Map<i64, i64>, d: &Arc<Vec<i64>>) -> Duration {
    let n = num_cpus::get();
    let chunk = d.len() / n + 1;
    let begin = Instant::now();
    let threads: Vec<_> = (0..n)
        .map(|i| {
            let (m, d) = (m.clone(), Arc::clone(d));
            thread::spawn(move || {
                let p = min(d.len(), i * chunk);
                for k in &d[p..min(d.len(), p + chunk)] {
                    m.get(k).unwrap();
                }
            })
        })
        .collect();
    for th in threads {
        th.join().unwrap();
    }
    begin.elapsed()
}

fn bench_iter(m: &Map<i64, i64>) -> Duration {
    let begin = Instant::now();
    assert_eq!(m.iter().count(), m.len());
    begin.elapsed()
}

fn bench_remove(m: &Map<i64, i64>, d: &[i64]) -> Duration {
    let mut m = m.clone();
    let begin = Instant::now();
    for k in d {
        m = m.remove(k)
    }
    begin.elapsed()
}

pub(crate) fn run(size: usize) {
    let (m, d, add) = bench_add(size);
    let find = bench_find(&m, &d);
    let find_par = bench_find_par(&m, &d);
    let iter = bench_iter(&m);
    let rm = bench_remove(&m, &d);
    println!(
        "add: {}ns, find: {}ns, find_par: {}ns, iter: {}ns, remove: {}ns",
        utils::to_ns_per(add, size),
        utils::to_ns_per(find, size),
        utils::to_ns_per(find_par, size),
        utils::to_ns_per(iter, size),
        utils::to_ns_per(rm, size)
    );
}
