use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, info};

use crate::position::PositionSample;
use crate::storage::{KeyValueStore, StorageError};

pub const PENDING_KEY: &str = "pending_positions";
pub const DEFAULT_CAPACITY: usize = 100;

/// Queue shared between the capture worker, the sync engine and status readers.
pub type SharedQueue = Arc<Mutex<DurableQueue>>;

/// A contiguous run of queued samples, starting at sequence number `start`.
#[derive(Debug, Clone)]
pub struct Batch {
    pub start: u64,
    pub samples: Vec<PositionSample>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn end(&self) -> u64 {
        self.start + self.samples.len() as u64
    }

    pub fn truncate_before(&mut self, end: u64) {
        let keep = end.saturating_sub(self.start).min(self.samples.len() as u64);
        self.samples.truncate(keep as usize);
    }
}

/// Queue length readable without taking the queue lock, which may be held across a store write.
#[derive(Debug, Clone, Default)]
pub struct PendingCount(Arc<AtomicUsize>);

impl PendingCount {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self, len: usize) {
        self.0.store(len, Ordering::Release);
    }
}

/// Bounded FIFO of undelivered samples, mirrored to a [`KeyValueStore`] on every mutation.
///
/// The in-memory contents are authoritative. A failed write is reported to the caller but the
/// mutation still stands, so the current process keeps working off the in-memory state.
pub struct DurableQueue {
    store: Arc<dyn KeyValueStore>,
    capacity: usize,
    items: VecDeque<PositionSample>,
    // sequence number of `items[0]`; bumped on every pop from the front
    head_seq: u64,
    pending: PendingCount,
}

impl DurableQueue {
    pub fn new(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
            items: VecDeque::new(),
            head_seq: 0,
            pending: PendingCount::default(),
        }
    }

    pub fn into_shared(self) -> SharedQueue {
        Arc::new(Mutex::new(self))
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn pending_count(&self) -> PendingCount {
        self.pending.clone()
    }

    /// Sequence number of the oldest entry.
    pub fn head_seq(&self) -> u64 {
        self.head_seq
    }

    /// Sequence number one past the newest entry.
    pub fn tail_seq(&self) -> u64 {
        self.head_seq + self.items.len() as u64
    }

    pub fn samples(&self) -> impl Iterator<Item = &PositionSample> {
        self.items.iter()
    }

    pub fn append(&mut self, sample: PositionSample) -> Result<(), StorageError> {
        while self.items.len() >= self.capacity {
            self.items.pop_front();
            self.head_seq += 1;
            debug!("Pending queue full ({}), evicted oldest sample", self.capacity);
        }
        self.items.push_back(sample);
        self.pending.set(self.items.len());
        self.persist()
    }

    /// Copies up to `max` samples from the front without removing them.
    pub fn drain_batch(&self, max: usize) -> Batch {
        Batch {
            start: self.head_seq,
            samples: self.items.iter().take(max).cloned().collect(),
        }
    }

    pub fn remove_delivered(&mut self, count: usize) -> Result<(), StorageError> {
        let count = count.min(self.items.len());
        if count == 0 {
            return Ok(());
        }
        self.items.drain(..count);
        self.head_seq += count as u64;
        self.pending.set(self.items.len());
        self.persist()
    }

    /// Removes whatever part of `batch` is still queued. Entries evicted since the batch was
    /// taken are skipped, entries appended after it are kept.
    pub fn acknowledge(&mut self, batch: &Batch) -> Result<(), StorageError> {
        if batch.end() <= self.head_seq {
            return Ok(());
        }
        let still_queued = batch.end() - self.head_seq.max(batch.start);
        self.remove_delivered(still_queued as usize)
    }

    /// Replaces the in-memory contents with whatever the store holds.
    pub fn load_from_storage(&mut self) -> Result<usize, StorageError> {
        let loaded: Vec<PositionSample> = match self.store.get(PENDING_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes)?,
            None => Vec::new(),
        };

        let skip = loaded.len().saturating_sub(self.capacity);
        self.items = loaded.into_iter().skip(skip).collect();
        self.head_seq = 0;
        self.pending.set(self.items.len());

        if !self.items.is_empty() {
            info!("Loaded {} pending samples from storage", self.items.len());
        }
        Ok(self.items.len())
    }

    pub fn clear(&mut self) -> Result<(), StorageError> {
        self.head_seq += self.items.len() as u64;
        self.items.clear();
        self.pending.set(0);
        self.store.remove(PENDING_KEY)
    }

    fn persist(&self) -> Result<(), StorageError> {
        if self.items.is_empty() {
            return self.store.remove(PENDING_KEY);
        }
        let bytes = serde_json::to_vec(&self.items)?;
        self.store.set(PENDING_KEY, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::{RawFix, VehicleId};
    use crate::storage::{FileStore, MemoryStore};
    use chrono::{TimeZone, Utc};

    fn sample(i: u32) -> PositionSample {
        let ts = Utc.timestamp_opt(1_700_000_000 + i as i64, 0).unwrap();
        let fix = RawFix::new(45.0 + i as f64 * 1e-5, 5.0, ts);
        PositionSample::from_fix(VehicleId::new("bus-3"), &fix)
    }

    fn queue_with(store: Arc<dyn KeyValueStore>, n: u32, capacity: usize) -> DurableQueue {
        let mut queue = DurableQueue::new(store, capacity);
        for i in 1..=n {
            queue.append(sample(i)).unwrap();
        }
        queue
    }

    #[test]
    fn test_overflow_keeps_most_recent() {
        let queue = queue_with(Arc::new(MemoryStore::new()), 105, 100);

        assert_eq!(queue.size(), 100);
        let kept: Vec<_> = queue.samples().cloned().collect();
        let expected: Vec<_> = (6..=105).map(sample).collect();
        assert_eq!(kept, expected);
    }

    #[test]
    fn test_drain_batch_does_not_remove() {
        let queue = queue_with(Arc::new(MemoryStore::new()), 15, 100);

        let batch = queue.drain_batch(10);
        assert_eq!(batch.len(), 10);
        assert_eq!(batch.samples[0], sample(1));
        assert_eq!(queue.size(), 15);
    }

    #[test]
    fn test_remove_delivered_from_front() {
        let mut queue = queue_with(Arc::new(MemoryStore::new()), 15, 100);

        queue.remove_delivered(10).unwrap();
        assert_eq!(queue.size(), 5);
        assert_eq!(queue.drain_batch(1).samples[0], sample(11));

        queue.remove_delivered(50).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_acknowledge_after_eviction() {
        let mut queue = queue_with(Arc::new(MemoryStore::new()), 5, 5);
        let batch = queue.drain_batch(3);

        // Two appends push samples 1 and 2 out while the batch is in flight.
        queue.append(sample(6)).unwrap();
        queue.append(sample(7)).unwrap();

        queue.acknowledge(&batch).unwrap();
        let left: Vec<_> = queue.samples().cloned().collect();
        assert_eq!(left, vec![sample(4), sample(5), sample(6), sample(7)]);
    }

    #[test]
    fn test_acknowledge_fully_evicted_batch_is_noop() {
        let mut queue = queue_with(Arc::new(MemoryStore::new()), 2, 2);
        let batch = queue.drain_batch(2);
        queue.append(sample(3)).unwrap();
        queue.append(sample(4)).unwrap();

        queue.acknowledge(&batch).unwrap();
        assert_eq!(queue.size(), 2);
    }

    #[test]
    fn test_round_trip_through_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path().to_path_buf()));
        let original = queue_with(store, 25, 100);
        let expected: Vec<_> = original.samples().cloned().collect();

        let reopened: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path().to_path_buf()));
        let mut restored = DurableQueue::new(reopened, 100);
        assert_eq!(restored.load_from_storage().unwrap(), 25);

        let actual: Vec<_> = restored.samples().cloned().collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_load_from_empty_store() {
        let mut queue = DurableQueue::new(Arc::new(MemoryStore::new()), 10);
        assert_eq!(queue.load_from_storage().unwrap(), 0);
    }

    #[test]
    fn test_load_trims_to_capacity() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        queue_with(store.clone(), 30, 100);

        let mut smaller = DurableQueue::new(store, 10);
        assert_eq!(smaller.load_from_storage().unwrap(), 10);
        assert_eq!(smaller.drain_batch(1).samples[0], sample(21));
    }

    #[test]
    fn test_storage_failure_keeps_memory_state() {
        let store = Arc::new(MemoryStore::new());
        let mut queue = DurableQueue::new(store.clone(), 10);
        queue.append(sample(1)).unwrap();

        store.set_read_only(true);
        assert!(queue.append(sample(2)).is_err());
        assert_eq!(queue.size(), 2);

        store.set_read_only(false);
        let mut restored = DurableQueue::new(store, 10);
        assert_eq!(restored.load_from_storage().unwrap(), 1);
    }

    #[test]
    fn test_clear_removes_persisted_copy() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut queue = queue_with(store.clone(), 3, 10);

        queue.clear().unwrap();
        assert!(queue.is_empty());
        assert_eq!(store.get(PENDING_KEY).unwrap(), None);
    }

    #[test]
    fn test_pending_count_follows_every_mutation() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut queue = queue_with(store.clone(), 12, 10);
        let pending = queue.pending_count();
        assert_eq!(pending.get(), 10);

        queue.remove_delivered(4).unwrap();
        assert_eq!(pending.get(), 6);

        let mut reloaded = DurableQueue::new(store, 10);
        let reloaded_pending = reloaded.pending_count();
        reloaded.load_from_storage().unwrap();
        assert_eq!(reloaded_pending.get(), 6);

        queue.clear().unwrap();
        assert_eq!(pending.get(), 0);
    }
}
