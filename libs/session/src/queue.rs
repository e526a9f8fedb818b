//! Session queue order
//!
//! The ordering of auto-managed transfers. Shared by the session and its
//! transfers but only ever touched from tasks running on the session
//! executor, so the lock is never contended.

use crate::types::InfoHash;
use parking_lot::Mutex;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct QueueOrder {
    order: Arc<Mutex<Vec<InfoHash>>>,
}

impl QueueOrder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of `hash`, or -1 when it is not queued
    pub fn position(&self, hash: &InfoHash) -> i32 {
        self.order
            .lock()
            .iter()
            .position(|h| h == hash)
            .map_or(-1, |p| p as i32)
    }

    /// Append at the bottom unless already queued
    pub fn enter(&self, hash: InfoHash) {
        let mut order = self.order.lock();
        if !order.contains(&hash) {
            order.push(hash);
        }
    }

    pub fn leave(&self, hash: &InfoHash) {
        self.order.lock().retain(|h| h != hash);
    }

    /// Move a queued entry to `position`, clamped to the queue bounds
    pub fn move_to(&self, hash: &InfoHash, position: i32) {
        let mut order = self.order.lock();
        let Some(current) = order.iter().position(|h| h == hash) else {
            return;
        };
        let entry = order.remove(current);
        let target = position.clamp(0, order.len() as i32) as usize;
        order.insert(target, entry);
    }

    pub fn len(&self) -> usize {
        self.order.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<InfoHash> {
        self.order.lock().clone()
    }
}
