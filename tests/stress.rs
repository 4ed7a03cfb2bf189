use std::sync::Arc;
use std::thread;

use forgetting_map::ForgettingMap;
use rand::Rng;

#[test]
#[cfg_attr(miri, ignore)]
fn concurrent_distinct_adds_fill_to_exact_size() {
    let map = Arc::new(ForgettingMap::new(8000));

    let mut handles = vec![];
    for t in 0..8u64 {
        let m = map.clone();
        handles.push(thread::spawn(move || {
            for i in 0..1000 {
                let key = t * 1000 + i;
                m.add(key, key * 2);
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    // No insert was lost or duplicated.
    assert_eq!(map.len(), 8000);
    for key in 0..8000u64 {
        assert_eq!(map.find(&key), Some(key * 2));
    }
}

#[test]
#[cfg_attr(miri, ignore)]
fn concurrent_adds_to_full_map_hold_capacity() {
    let capacity = 100u64;
    let map = Arc::new(ForgettingMap::new(capacity as usize));
    for i in 0..capacity {
        map.add(i, i);
    }

    let mut handles = vec![];
    for t in 0..8u64 {
        let m = map.clone();
        handles.push(thread::spawn(move || {
            for i in 0..100 {
                let key = capacity + t * 100 + i;
                m.add(key, key);
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(map.len(), capacity as usize);
}

#[test]
#[cfg_attr(miri, ignore)]
fn concurrent_finds_all_hit() {
    let map = Arc::new(ForgettingMap::new(1000));
    for i in 0..1000u64 {
        map.add(i, i * 2);
    }

    let mut handles = vec![];
    for _ in 0..8 {
        let m = map.clone();
        handles.push(thread::spawn(move || {
            for i in 0..1000u64 {
                assert_eq!(m.find(&i), Some(i * 2));
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(map.len(), 1000);
}

#[test]
#[cfg_attr(miri, ignore)]
fn concurrent_hits_steer_a_later_eviction() {
    let capacity = 100u64;
    let map = Arc::new(ForgettingMap::new(capacity as usize));
    for i in 0..capacity {
        map.add(i, i);
    }

    // Every key except 0 gets hammered from all threads.
    let mut handles = vec![];
    for _ in 0..8 {
        let m = map.clone();
        handles.push(thread::spawn(move || {
            for i in 1..capacity {
                let _ = m.find(&i);
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    map.add(capacity, capacity);

    assert!(!map.contains_key(&0));
    assert!(map.contains_key(&capacity));
    assert_eq!(map.len(), capacity as usize);
}

#[test]
#[cfg_attr(miri, ignore)]
fn mixed_readers_and_writers() {
    let capacity = 512usize;
    let map = Arc::new(ForgettingMap::new(capacity));
    for i in 0..capacity as u64 {
        map.add(i, i);
    }

    let mut handles = vec![];

    for _ in 0..4 {
        let m = map.clone();
        handles.push(thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for _ in 0..10_000 {
                let key = rng.gen_range(0..2048u64);
                let _ = m.find(&key);
            }
        }));
    }

    for _ in 0..2 {
        let m = map.clone();
        handles.push(thread::spawn(move || {
            let mut rng = rand::thread_rng();
            for _ in 0..2_000 {
                let key = rng.gen_range(0..2048u64);
                m.add(key, key);
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    // The map started full; updates and evict-then-insert both leave the
    // size pinned at capacity.
    assert_eq!(map.len(), capacity);
}

#[test]
#[cfg_attr(miri, ignore)]
fn add_is_linearizable_for_racing_duplicates() {
    let map = Arc::new(ForgettingMap::new(64));

    // Every thread inserts the same small key set; the map must end up with
    // one association per key.
    let mut handles = vec![];
    for t in 0..8u64 {
        let m = map.clone();
        handles.push(thread::spawn(move || {
            for round in 0..50 {
                for key in 0..16u64 {
                    m.add(key, t * 1000 + round);
                }
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(map.len(), 16);
    for key in 0..16u64 {
        assert!(map.contains_key(&key));
    }
}
