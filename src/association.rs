use std::sync::atomic::Ordering;

use portable_atomic::AtomicU64;

/// One stored key/value pair: the key, its content, the usage counter that
/// drives eviction priority, and the owned link to the next association in
/// the bucket chain.
///
/// The key is immutable once set. Content is overwritten in place when the
/// same key is re-added. Chain links are mutated only by the table while it
/// holds exclusive structural access; the usage counter is the one field
/// that may be bumped concurrently, which is why it is atomic.
#[derive(Debug)]
pub(crate) struct Association<K, V> {
    key: K,
    content: V,
    used: AtomicU64,
    next: Option<Box<Association<K, V>>>,
}

impl<K, V> Association<K, V> {
    pub(crate) fn new(key: K, content: V) -> Self {
        Self {
            key,
            content,
            used: AtomicU64::new(0),
            next: None,
        }
    }

    pub(crate) fn key(&self) -> &K {
        &self.key
    }

    pub(crate) fn content(&self) -> &V {
        &self.content
    }

    /// Overwrites the content in place. Usage count and chain position are
    /// untouched.
    pub(crate) fn set_content(&mut self, content: V) {
        self.content = content;
    }

    /// Atomically bumps the usage counter, returning the new count.
    ///
    /// Relaxed suffices: the counter is a statistic, and every read that
    /// decides an eviction happens under the table's exclusive guard.
    pub(crate) fn touch(&self) -> u64 {
        self.used.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn used_count(&self) -> u64 {
        self.used.load(Ordering::Relaxed)
    }

    pub(crate) fn next(&self) -> Option<&Association<K, V>> {
        self.next.as_deref()
    }

    pub(crate) fn next_mut(&mut self) -> Option<&mut Association<K, V>> {
        self.next.as_deref_mut()
    }

    /// The raw tail link, for appending and unlinking.
    pub(crate) fn next_link(&mut self) -> &mut Option<Box<Association<K, V>>> {
        &mut self.next
    }

    pub(crate) fn take_next(&mut self) -> Option<Box<Association<K, V>>> {
        self.next.take()
    }
}
