use std::borrow::Borrow;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::Ordering;

use foldhash::fast::FixedState;
use parking_lot::RwLock;
use portable_atomic::AtomicUsize;

use crate::association::Association;

/// A bucket slot: empty, or the head of an owned chain.
type Link<K, V> = Option<Box<Association<K, V>>>;

/// A fixed-capacity map that evicts its least-used entry when full.
///
/// The table holds exactly `capacity` buckets for its whole lifetime; keys
/// hash to a bucket and collisions chain off it in insertion order. Every
/// successful [`find`](Self::find) bumps the entry's usage counter, and when
/// an insert would exceed capacity the entry with the globally lowest count
/// is removed to make room.
///
/// All operations take `&self` and the map is safe to share across threads:
/// [`add`](Self::add) runs under an exclusive critical section and is
/// linearizable, while [`find`](Self::find) only takes the read side of the
/// guard and bumps counters with lock-free atomics, so lookups never
/// serialize against each other.
pub struct ForgettingMap<K, V, S = FixedState> {
    buckets: RwLock<Box<[Link<K, V>]>>,
    count: AtomicUsize,
    capacity: usize,
    hasher: S,
}

impl<K, V> ForgettingMap<K, V, FixedState>
where
    K: Hash + Eq + Clone,
{
    /// Creates an empty map that holds at most `capacity` entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use forgetting_map::ForgettingMap;
    ///
    /// let map: ForgettingMap<u64, String> = ForgettingMap::new(128);
    /// assert_eq!(map.capacity(), 128);
    /// assert!(map.is_empty());
    /// ```
    pub fn new(capacity: usize) -> Self {
        Self::with_hasher(capacity, FixedState::default())
    }
}

impl<K, V, S> ForgettingMap<K, V, S>
where
    K: Hash + Eq + Clone,
    S: BuildHasher,
{
    /// Creates an empty map with the given capacity and hash builder.
    ///
    /// The bucket a key maps to depends only on the key's value and the
    /// hasher state fixed here, so it is stable for the map's lifetime.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_hasher(capacity: usize, hasher: S) -> Self {
        assert!(capacity > 0, "capacity must be at least 1");

        let mut buckets = Vec::with_capacity(capacity);
        for _ in 0..capacity {
            buckets.push(None);
        }

        Self {
            buckets: RwLock::new(buckets.into_boxed_slice()),
            count: AtomicUsize::new(0),
            capacity,
            hasher,
        }
    }

    /// Maximum number of entries the map will hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of distinct keys currently stored.
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// Returns `true` if the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a reference to the map's hash builder.
    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    #[inline]
    fn bucket_index<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Hash + ?Sized,
    {
        (self.hasher.hash_one(key) % self.capacity as u64) as usize
    }

    /// Inserts or updates an entry.
    ///
    /// If the key is already present only its content is replaced; the usage
    /// counter and chain position stay as they are and the size does not
    /// change. If the key is new and the map is full, the entry with the
    /// lowest usage count anywhere in the table is evicted first. Among tied
    /// counts the entry encountered earliest in the scan (lowest bucket
    /// index, then closest to the chain head) is the victim.
    ///
    /// The whole operation runs under one exclusive critical section, so
    /// concurrent `add` calls behave as if executed in some serial order:
    /// two threads racing on the same new key cannot both insert it, and a
    /// full map cannot be pushed past capacity.
    pub fn add(&self, key: K, content: V) {
        let mut buckets = self.buckets.write();
        let index = self.bucket_index(&key);

        // Existing key: overwrite in place.
        let mut cursor = buckets[index].as_deref_mut();
        while let Some(node) = cursor {
            if node.key() == &key {
                node.set_content(content);
                return;
            }
            cursor = node.next_mut();
        }

        // New key into a full table: make room first. The scan cannot come
        // up empty because count == capacity > 0 here.
        if self.count.load(Ordering::Relaxed) == self.capacity {
            if let Some((victim_bucket, victim)) = Self::least_used(&buckets) {
                Self::unlink(&mut buckets[victim_bucket], &victim);
                self.count.fetch_sub(1, Ordering::Relaxed);
            }
        }

        // Append at the chain tail, or install as the bucket head.
        let mut link = &mut buckets[index];
        while let Some(node) = link {
            link = node.next_link();
        }
        *link = Some(Box::new(Association::new(key, content)));
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Looks up a key, bumping its usage counter on a hit.
    ///
    /// Returns a clone of the stored content, or `None` if the key is not
    /// present; absence is a normal outcome, not an error. Each successful
    /// call raises the entry's eviction priority by exactly one and leaves
    /// every other entry's counter alone.
    pub fn find<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let buckets = self.buckets.read();
        let node = Self::chain_find(&buckets[self.bucket_index(key)], key)?;
        node.touch();
        Some(node.content().clone())
    }

    /// Reads a key's content without bumping its usage counter.
    ///
    /// Useful for diagnostics that must not distort eviction priority.
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let buckets = self.buckets.read();
        let node = Self::chain_find(&buckets[self.bucket_index(key)], key)?;
        Some(node.content().clone())
    }

    /// Returns `true` if the key is present. Does not bump the usage
    /// counter.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let buckets = self.buckets.read();
        Self::chain_find(&buckets[self.bucket_index(key)], key).is_some()
    }

    /// Walks one chain head to tail looking for an equal key.
    fn chain_find<'a, Q>(bucket: &'a Link<K, V>, key: &Q) -> Option<&'a Association<K, V>>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        let mut cursor = bucket.as_deref();
        while let Some(node) = cursor {
            if node.key().borrow() == key {
                return Some(node);
            }
            cursor = node.next();
        }
        None
    }

    /// Finds the globally least-used entry: every bucket in ascending index
    /// order, every chain head to tail. Strict less-than keeps the
    /// first-encountered entry as the victim among tied counts.
    fn least_used(buckets: &[Link<K, V>]) -> Option<(usize, K)> {
        let mut victim: Option<(u64, usize, K)> = None;

        for (index, bucket) in buckets.iter().enumerate() {
            let mut cursor = bucket.as_deref();
            while let Some(node) = cursor {
                let used = node.used_count();
                let beats = match &victim {
                    Some((least, _, _)) => used < *least,
                    None => true,
                };
                if beats {
                    victim = Some((used, index, node.key().clone()));
                }
                cursor = node.next();
            }
        }

        victim.map(|(_, index, key)| (index, key))
    }

    /// Unlinks the association with the given key from a chain, fixing up
    /// the bucket head or the predecessor's link.
    fn unlink(link: &mut Link<K, V>, key: &K) -> Option<Box<Association<K, V>>> {
        let mut link = link;
        loop {
            let found = match link.as_ref() {
                None => return None,
                Some(node) => node.key() == key,
            };
            if found {
                let mut node = link.take().expect("link checked Some above");
                *link = node.take_next();
                return Some(node);
            }
            link = link.as_mut().expect("link checked Some above").next_link();
        }
    }
}

impl<K, V, S> Drop for ForgettingMap<K, V, S> {
    fn drop(&mut self) {
        // Unlink chains iteratively; dropping a long chain through the
        // owned `next` links would recurse once per node.
        let buckets = self.buckets.get_mut();
        for bucket in buckets.iter_mut() {
            let mut cursor = bucket.take();
            while let Some(mut node) = cursor {
                cursor = node.take_next();
            }
        }
    }
}

impl<K, V, S> fmt::Debug for ForgettingMap<K, V, S>
where
    K: fmt::Debug,
    V: fmt::Debug,
{
    // Dumps every bucket chain as (key, content, used) triples.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let buckets = self.buckets.read();

        let mut chains: Vec<Vec<(&K, &V, u64)>> = Vec::with_capacity(buckets.len());
        for bucket in buckets.iter() {
            let mut chain = Vec::new();
            let mut cursor = bucket.as_deref();
            while let Some(node) = cursor {
                chain.push((node.key(), node.content(), node.used_count()));
                cursor = node.next();
            }
            chains.push(chain);
        }

        f.debug_struct("ForgettingMap")
            .field("capacity", &self.capacity)
            .field("len", &self.count.load(Ordering::Relaxed))
            .field("buckets", &chains)
            .finish()
    }
}
