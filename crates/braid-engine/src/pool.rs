//! Transaction pool seam
//!
//! The engine drains a batch of pending transactions into every event it
//! creates. Pool contents and ordering policy are external concerns; the
//! engine only consumes whatever the pool hands it.

use braid_core::error::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Supplier of pending transactions for new events
pub trait TransactionPool: Send {
    /// Drain the next batch of pending transactions, in pool-defined order.
    /// May be empty.
    fn pending_transactions(&mut self) -> Result<Vec<Vec<u8>>>;

    /// Whether system transactions (e.g. state-signature payloads) are
    /// waiting. Consulted by the freeze-status creation rule.
    fn has_system_transactions(&self) -> bool;
}

/// Shared in-memory transaction queue
///
/// Clonable handle over a mutex-protected queue: the gossip/application side
/// submits, the creation worker drains. Suitable for nodes that keep their
/// pool in process.
#[derive(Clone, Default)]
pub struct PendingTransactionQueue {
    queue: Arc<Mutex<VecDeque<Vec<u8>>>>,
    system_pending: Arc<AtomicBool>,
    batch_limit: usize,
}

impl PendingTransactionQueue {
    pub fn new(batch_limit: usize) -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::new())),
            system_pending: Arc::new(AtomicBool::new(false)),
            batch_limit,
        }
    }

    /// Submit a transaction for inclusion in a future event
    pub fn submit(&self, transaction: Vec<u8>) {
        self.queue.lock().push_back(transaction);
    }

    /// Flag or clear pending system transactions
    pub fn set_system_pending(&self, pending: bool) {
        self.system_pending.store(pending, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl TransactionPool for PendingTransactionQueue {
    fn pending_transactions(&mut self) -> Result<Vec<Vec<u8>>> {
        let mut queue = self.queue.lock();
        let limit = if self.batch_limit == 0 {
            queue.len()
        } else {
            self.batch_limit.min(queue.len())
        };
        Ok(queue.drain(..limit).collect())
    }

    fn has_system_transactions(&self) -> bool {
        self.system_pending.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_drains_in_order() {
        let mut pool = PendingTransactionQueue::new(0);
        pool.submit(b"a".to_vec());
        pool.submit(b"b".to_vec());

        let batch = pool.pending_transactions().unwrap();
        assert_eq!(batch, vec![b"a".to_vec(), b"b".to_vec()]);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_batch_limit_leaves_remainder() {
        let mut pool = PendingTransactionQueue::new(2);
        for i in 0u8..5 {
            pool.submit(vec![i]);
        }

        let batch = pool.pending_transactions().unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(pool.len(), 3);
    }

    #[test]
    fn test_system_pending_flag() {
        let pool = PendingTransactionQueue::new(0);
        assert!(!pool.has_system_transactions());

        pool.set_system_pending(true);
        assert!(pool.has_system_transactions());
    }
}
