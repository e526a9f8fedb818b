//! Session
//!
//! Owner context for transfers. The session owns one executor thread and
//! the strong reference of every transfer it added; callers only ever see
//! [`TransferHandle`]s. Removing a transfer destroys its actor, after which
//! every outstanding handle degrades to defaults.
//!
//! The transfer map lock is taken on caller threads only. It may be held
//! across a blocking call into the executor since no executor task ever
//! takes it.

use crate::error::{Result, SessionError};
use crate::handle::TransferHandle;
use crate::queue::QueueOrder;
use crate::transfer::Transfer;
use crate::types::{InfoHash, TransferParams};

use actor_dispatch::{
    ActorOwner, DispatchMetrics, DispatchStats, Executor, ExecutorConfig, ThreadExecutor,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

struct Entry {
    owner: ActorOwner<Transfer>,
    handle: TransferHandle,
}

pub struct Session {
    executor: Arc<ThreadExecutor>,
    queue: QueueOrder,
    transfers: Mutex<HashMap<InfoHash, Entry>>,
}

impl Session {
    /// Start a session with its own executor thread
    pub fn new(config: ExecutorConfig) -> Result<Self> {
        let executor = ThreadExecutor::spawn(config)?;
        Ok(Self {
            executor,
            queue: QueueOrder::new(),
            transfers: Mutex::new(HashMap::new()),
        })
    }

    /// Add a transfer. Auto-managed transfers join the bottom of the queue.
    pub fn add_transfer(&self, params: TransferParams) -> Result<TransferHandle> {
        params
            .validate()
            .map_err(|reason| SessionError::InvalidParams { reason })?;
        if !self.executor.is_running() {
            return Err(SessionError::ShutDown);
        }

        let mut transfers = self.transfers.lock();
        let info_hash = params.info_hash();
        if transfers.contains_key(&info_hash) {
            warn!(info_hash = %info_hash, "Transfer already in session");
            return Err(SessionError::Duplicate { info_hash });
        }

        let (info, settings) = params.into_info();
        let transfer = Transfer::new(info.clone(), settings, self.queue.clone());
        let executor: Arc<dyn Executor> = self.executor.clone();
        let owner = ActorOwner::new(transfer, executor);

        owner.actor_ref().call(|t| t.enter_queue())?;

        let handle = TransferHandle::new(owner.handle(), &info);
        info!(
            info_hash = %info_hash,
            actor_id = %owner.id(),
            name = %info.name,
            pieces = info.num_pieces(),
            "Transfer added"
        );
        transfers.insert(info_hash, Entry { owner, handle: handle.clone() });
        Ok(handle)
    }

    /// Remove and destroy the transfer `handle` refers to. Returns false if
    /// it is not (or no longer) part of this session.
    pub fn remove_transfer(&self, handle: &TransferHandle) -> bool {
        let mut transfers = self.transfers.lock();
        let matches = transfers
            .get(&handle.info_hash())
            .is_some_and(|entry| entry.owner.id() == handle.id());
        if !matches {
            return false;
        }
        let Some(entry) = transfers.remove(&handle.info_hash()) else {
            return false;
        };

        if let Err(e) = entry.owner.actor_ref().into_call(|t| t.detach()) {
            debug!(info_hash = %handle.info_hash(), error = %e, "Could not leave queue on removal");
        }
        entry.owner.destroy();

        info!(info_hash = %handle.info_hash(), actor_id = %handle.id(), "Transfer removed");
        true
    }

    pub fn find_transfer(&self, info_hash: &InfoHash) -> Option<TransferHandle> {
        self.transfers
            .lock()
            .get(info_hash)
            .map(|entry| entry.handle.clone())
    }

    /// Handles of every transfer, in queue order first, then the rest
    pub fn transfers(&self) -> Vec<TransferHandle> {
        let transfers = self.transfers.lock();
        let queued = self.queue.snapshot();

        let mut handles: Vec<TransferHandle> = queued
            .iter()
            .filter_map(|hash| transfers.get(hash))
            .map(|entry| entry.handle.clone())
            .collect();
        let mut rest: Vec<TransferHandle> = transfers
            .iter()
            .filter(|(hash, _)| !queued.contains(hash))
            .map(|(_, entry)| entry.handle.clone())
            .collect();
        rest.sort_by_key(|h| h.info_hash());
        handles.extend(rest);
        handles
    }

    pub fn len(&self) -> usize {
        self.transfers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        self.executor.metrics()
    }

    pub fn stats(&self) -> DispatchStats {
        self.executor.stats()
    }

    pub fn executor(&self) -> &Arc<ThreadExecutor> {
        &self.executor
    }

    /// Destroy every transfer and stop the executor after it drains
    pub fn shutdown(&self) {
        let entries: Vec<Entry> = self.transfers.lock().drain().map(|(_, e)| e).collect();
        let count = entries.len();
        for entry in entries {
            entry.owner.destroy();
        }
        self.executor.shutdown();
        info!(executor = %self.executor.name(), transfers = count, "Session shut down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.executor.is_running() {
            self.shutdown();
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("executor", &self.executor.name())
            .field("transfers", &self.len())
            .finish()
    }
}
