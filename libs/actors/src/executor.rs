//! Executors
//!
//! An executor runs submitted tasks one at a time on the thread that owns the
//! actors bound to it. The dispatch core only consumes the [`Executor`]
//! contract; [`ThreadExecutor`] is the stock implementation backed by one
//! named OS thread and an unbounded `crossbeam-channel` queue.
//!
//! Guarantees of the contract:
//! - tasks from one submitting thread run in submission order
//! - no two tasks on the same executor ever run concurrently

use crate::completion::WakeBoard;
use crate::error::{DispatchError, Result};
use crate::metrics::{DispatchMetrics, DispatchStats};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Unit of work accepted by an executor
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Single-threaded FIFO task runner
pub trait Executor: Send + Sync + 'static {
    /// Executor name for diagnostics
    fn name(&self) -> &str;

    /// Queue a task. Fails once the executor stopped accepting work; the
    /// task is dropped without running in that case.
    fn submit(&self, task: Task) -> Result<()>;

    /// Board a blocking call on this executor waits on
    fn completion_board(&self) -> Arc<WakeBoard>;

    /// Whether the current thread is the executor's own thread
    fn is_executor_thread(&self) -> bool;
}

/// Granularity of the mutex/condition pair blocking callers wait on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStrategy {
    /// Fresh board per blocking call; a completion wakes only its caller
    #[default]
    PerCall,
    /// One board per executor; every completion wakes all blocked callers
    PerExecutor,
}

/// Executor construction settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub thread_name: String,
    pub wait_strategy: WaitStrategy,
    pub stack_size: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            thread_name: "actor-executor".to_string(),
            wait_strategy: WaitStrategy::default(),
            stack_size: None,
        }
    }
}

impl ExecutorConfig {
    pub fn named(thread_name: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
            ..Self::default()
        }
    }

    pub fn with_wait_strategy(mut self, wait_strategy: WaitStrategy) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }
}

/// Executor backed by a dedicated OS thread
pub struct ThreadExecutor {
    name: String,
    wait_strategy: WaitStrategy,

    /// `None` once shut down
    sender: RwLock<Option<Sender<Task>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,

    /// Present only for `WaitStrategy::PerExecutor`
    shared_board: Option<Arc<WakeBoard>>,
    metrics: Arc<DispatchMetrics>,
}

impl ThreadExecutor {
    /// Start the executor thread
    pub fn spawn(config: ExecutorConfig) -> Result<Arc<Self>> {
        let (sender, receiver) = unbounded::<Task>();
        let metrics = Arc::new(DispatchMetrics::default());

        let mut builder = thread::Builder::new().name(config.thread_name.clone());
        if let Some(stack_size) = config.stack_size {
            builder = builder.stack_size(stack_size);
        }

        let worker_name = config.thread_name.clone();
        let worker_metrics = Arc::clone(&metrics);
        let worker = builder
            .spawn(move || run_worker(worker_name, receiver, worker_metrics))
            .map_err(|source| DispatchError::Spawn {
                name: config.thread_name.clone(),
                source,
            })?;

        let shared_board = match config.wait_strategy {
            WaitStrategy::PerCall => None,
            WaitStrategy::PerExecutor => Some(Arc::new(WakeBoard::new(Arc::clone(&metrics)))),
        };

        info!(
            executor = %config.thread_name,
            wait_strategy = ?config.wait_strategy,
            "Executor thread spawned"
        );

        Ok(Arc::new(Self {
            name: config.thread_name,
            wait_strategy: config.wait_strategy,
            sender: RwLock::new(Some(sender)),
            worker_id: worker.thread().id(),
            worker: Mutex::new(Some(worker)),
            shared_board,
            metrics,
        }))
    }

    pub fn wait_strategy(&self) -> WaitStrategy {
        self.wait_strategy
    }

    /// Shared metrics handle
    pub fn metrics(&self) -> Arc<DispatchMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn stats(&self) -> DispatchStats {
        self.metrics.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.sender.read().is_some()
    }

    /// Stop accepting tasks, run everything already queued, then join the
    /// thread. Called from the executor thread itself it only stops intake.
    pub fn shutdown(&self) {
        let Some(sender) = self.sender.write().take() else {
            return;
        };
        drop(sender);

        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        if thread::current().id() == self.worker_id {
            debug!(executor = %self.name, "Shutdown from executor thread, detaching worker");
            return;
        }

        if worker.join().is_err() {
            warn!(executor = %self.name, "Executor thread terminated abnormally");
        }
    }
}

impl Executor for ThreadExecutor {
    fn name(&self) -> &str {
        &self.name
    }

    fn submit(&self, task: Task) -> Result<()> {
        let sender = self.sender.read();
        let Some(sender) = sender.as_ref() else {
            self.metrics.record_refused();
            debug!(executor = %self.name, "Task refused: executor shut down");
            return Err(DispatchError::executor_closed(&self.name));
        };

        match sender.send(task) {
            Ok(()) => {
                self.metrics.record_submitted();
                Ok(())
            }
            Err(_) => {
                self.metrics.record_refused();
                debug!(executor = %self.name, "Task refused: executor queue disconnected");
                Err(DispatchError::executor_closed(&self.name))
            }
        }
    }

    fn completion_board(&self) -> Arc<WakeBoard> {
        match &self.shared_board {
            Some(board) => Arc::clone(board),
            None => Arc::new(WakeBoard::new(Arc::clone(&self.metrics))),
        }
    }

    fn is_executor_thread(&self) -> bool {
        thread::current().id() == self.worker_id
    }
}

impl Drop for ThreadExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for ThreadExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadExecutor")
            .field("name", &self.name)
            .field("wait_strategy", &self.wait_strategy)
            .field("running", &self.is_running())
            .finish()
    }
}

/// Executor thread main loop. Ends once every sender is gone and the queue
/// is drained.
fn run_worker(name: String, receiver: Receiver<Task>, metrics: Arc<DispatchMetrics>) {
    let started = Instant::now();
    debug!(executor = %name, "Executor loop entered");

    for task in receiver.iter() {
        let outcome = panic::catch_unwind(AssertUnwindSafe(task));
        metrics.record_executed();

        if let Err(payload) = outcome {
            metrics.record_panic();
            error!(
                executor = %name,
                panic = %panic_message(payload.as_ref()),
                "Task panicked on executor thread"
            );
        }
    }

    info!(
        executor = %name,
        tasks_executed = metrics.tasks_executed.load(std::sync::atomic::Ordering::Relaxed),
        uptime_ms = started.elapsed().as_millis(),
        "Executor thread stopped"
    );
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
