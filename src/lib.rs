//! A fixed-capacity concurrent map that forgets its least-used entry.
//!
//! The map never grows past the capacity it was built with. Once full,
//! adding a new key evicts the association with the lowest lookup count, so
//! popularity rather than recency decides what survives.
//!
//! # Features
//!
//! - **Fixed footprint**: the bucket table is sized once at construction and
//!   never rehashed or resized.
//! - **Least-used eviction**: every successful `find` bumps an atomic usage
//!   counter; a full-map insert removes the entry with the globally lowest
//!   count, breaking ties in favor of the earliest-seen entry.
//! - **Concurrent**: `add` is linearizable behind a single exclusive
//!   critical section; `find` takes only the read side of the guard and
//!   bumps counters lock-free, so lookups never serialize against each
//!   other.
//! - **Flexible hashing**: any `BuildHasher` can be supplied; the default is
//!   `foldhash`.
//!
//! # Example
//!
//! ```rust
//! use forgetting_map::ForgettingMap;
//!
//! let map = ForgettingMap::new(2);
//! map.add(1, "one");
//! map.add(2, "two");
//!
//! // A hit raises the entry's eviction priority.
//! assert_eq!(map.find(&1), Some("one"));
//!
//! // The map is full, so the least-used entry (key 2) makes way.
//! map.add(3, "three");
//! assert_eq!(map.find(&2), None);
//! assert_eq!(map.find(&3), Some("three"));
//! assert_eq!(map.len(), 2);
//! ```

#![warn(missing_docs)]

mod association;
mod map;

pub use map::ForgettingMap;
