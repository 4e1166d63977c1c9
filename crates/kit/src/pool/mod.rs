//! Bounded worker pool for per-component builds
//!
//! The pool keeps a fixed number of pre-warmed execution units. A single
//! coordinator task owns all pool state (the unit table, the idle queue, the
//! pending queue and the in-flight replies); callers reach it through a
//! command channel and units through an event channel, so no state is shared
//! and nothing is locked.
//!
//! Pending tasks are dispatched strictly in submission order as units free
//! up. A task that fails only fails its own handle. A unit that crashes is
//! discarded and replaced, so the pool size never changes.

pub mod task;
pub mod unit;

use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::build::BuildConfig;

pub use task::{Task, TaskError, TaskHandle, TaskId, TaskReport};
pub use unit::{UnitId, UnitStatus};

use task::{TaskEnvelope, TaskReply};
use unit::{UnitEvent, UnitHandle};

/// The per-component build operation run inside each unit
pub trait BuildUnit: Send + Sync + 'static {
    fn build(
        &self,
        component: &str,
        config: &BuildConfig,
    ) -> impl Future<Output = anyhow::Result<()>> + Send;
}

/// Batch-level failures
#[derive(Error, Debug)]
pub enum PoolError {
    #[error(
        "{} of {} component builds failed: {}",
        .failures.len(),
        .total,
        summarize(.failures)
    )]
    Batch {
        total: usize,
        failures: Vec<TaskError>,
        completed: Vec<TaskReport>,
    },

    #[error("Worker pool is shut down")]
    Closed,
}

fn summarize(failures: &[TaskError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Snapshot of pool bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Total units; constant for the pool's lifetime
    pub size: usize,
    pub idle: usize,
    pub busy: usize,
    /// Accepted tasks waiting for a unit
    pub queued: usize,
    /// Units replaced after a crash
    pub replaced: usize,
}

/// Outcome of a batch where every task succeeded
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub completed: Vec<TaskReport>,
    pub duration_ms: u64,
}

enum PoolCommand {
    Submit { task: Task, reply: TaskReply },
    Stats(oneshot::Sender<PoolStats>),
    Shutdown(oneshot::Sender<()>),
}

/// Handle to a running worker pool
pub struct WorkerPool {
    commands: mpsc::UnboundedSender<PoolCommand>,
    coordinator: Option<JoinHandle<()>>,
    size: usize,
}

impl WorkerPool {
    /// Start a pool of `max_units` units (at least one), each built by
    /// `factory`. Must be called from within a tokio runtime.
    pub fn new<F, U>(factory: F, max_units: usize) -> Self
    where
        F: Fn() -> U + Send + 'static,
        U: BuildUnit,
    {
        let size = max_units.max(1);
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();

        let spawn: SpawnUnit = Box::new(move |id, events| unit::spawn(id, factory(), events));
        let coordinator = Coordinator::new(spawn, size, events);
        info!(size, "worker pool started");

        let handle = tokio::spawn(coordinator.run(command_rx, event_rx));

        Self {
            commands,
            coordinator: Some(handle),
            size,
        }
    }

    /// Number of units the pool maintains
    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue a task; the handle resolves when it completes or fails
    pub fn submit(&self, task: Task) -> TaskHandle {
        let (reply, rx) = oneshot::channel();
        let component = task.component.clone();
        // A closed pool drops `reply`, which resolves the handle as PoolClosed.
        let _ = self.commands.send(PoolCommand::Submit { task, reply });
        TaskHandle::new(component, rx)
    }

    pub async fn stats(&self) -> Result<PoolStats, PoolError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(PoolCommand::Stats(tx))
            .map_err(|_| PoolError::Closed)?;
        rx.await.map_err(|_| PoolError::Closed)
    }

    /// Run every task, wait for all of them to settle, then tear the pool
    /// down. Fails with [`PoolError::Batch`] if any task failed; tasks that
    /// succeeded are listed either way.
    pub async fn run_all(self, tasks: Vec<Task>) -> Result<BatchReport, PoolError> {
        let started = Instant::now();
        let total = tasks.len();
        let handles: Vec<TaskHandle> = tasks.into_iter().map(|t| self.submit(t)).collect();

        let mut completed = Vec::new();
        let mut failures = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(report) => completed.push(report),
                Err(err) => failures.push(err),
            }
        }

        self.destroy().await;

        if failures.is_empty() {
            Ok(BatchReport {
                completed,
                duration_ms: started.elapsed().as_millis() as u64,
            })
        } else {
            error!(failed = failures.len(), total, "batch finished with failures");
            Err(PoolError::Batch {
                total,
                failures,
                completed,
            })
        }
    }

    /// Terminate every unit. Unfinished tasks resolve as `PoolClosed`.
    pub async fn destroy(mut self) {
        let (ack, done) = oneshot::channel();
        if self.commands.send(PoolCommand::Shutdown(ack)).is_ok() {
            let _ = done.await;
        }
        if let Some(coordinator) = self.coordinator.take() {
            let _ = coordinator.await;
        }
        debug!("worker pool destroyed");
    }
}

type SpawnUnit = Box<dyn Fn(UnitId, mpsc::UnboundedSender<UnitEvent>) -> UnitHandle + Send>;

struct Pending {
    id: TaskId,
    task: Task,
    reply: TaskReply,
}

struct InFlight {
    component: String,
    reply: TaskReply,
    started: Instant,
}

/// Sole owner of pool state
struct Coordinator {
    spawn: SpawnUnit,
    events: mpsc::UnboundedSender<UnitEvent>,
    units: HashMap<UnitId, UnitHandle>,
    idle: VecDeque<UnitId>,
    pending: VecDeque<Pending>,
    in_flight: HashMap<TaskId, InFlight>,
    next_unit: u64,
    next_task: u64,
    replaced: usize,
}

impl Coordinator {
    fn new(spawn: SpawnUnit, size: usize, events: mpsc::UnboundedSender<UnitEvent>) -> Self {
        let mut coordinator = Self {
            spawn,
            events,
            units: HashMap::with_capacity(size),
            idle: VecDeque::with_capacity(size),
            pending: VecDeque::new(),
            in_flight: HashMap::new(),
            next_unit: 0,
            next_task: 0,
            replaced: 0,
        };
        for _ in 0..size {
            coordinator.spawn_unit();
        }
        coordinator
    }

    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<PoolCommand>,
        mut events: mpsc::UnboundedReceiver<UnitEvent>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(PoolCommand::Submit { task, reply }) => {
                        self.enqueue(task, reply);
                        self.dispatch();
                    }
                    Some(PoolCommand::Stats(reply)) => {
                        let _ = reply.send(self.stats());
                    }
                    Some(PoolCommand::Shutdown(ack)) => {
                        self.terminate();
                        let _ = ack.send(());
                        return;
                    }
                    None => {
                        self.terminate();
                        return;
                    }
                },
                Some(event) = events.recv() => {
                    self.handle_event(event);
                    self.dispatch();
                }
            }
            self.check_invariants();
        }
    }

    fn spawn_unit(&mut self) -> UnitId {
        let id = UnitId(self.next_unit);
        self.next_unit += 1;

        let handle = (self.spawn)(id, self.events.clone());
        self.units.insert(id, handle);
        self.idle.push_back(id);
        debug!(unit = %id, "unit started");
        id
    }

    fn enqueue(&mut self, task: Task, reply: TaskReply) {
        let id = TaskId(self.next_task);
        self.next_task += 1;
        debug!(%id, component = %task.component, "task queued");
        self.pending.push_back(Pending { id, task, reply });
    }

    /// Bind pending tasks to idle units, oldest task first
    fn dispatch(&mut self) {
        while !self.pending.is_empty() {
            let Some(unit_id) = self.idle.pop_front() else {
                break;
            };
            let Some(pending) = self.pending.pop_front() else {
                self.idle.push_front(unit_id);
                break;
            };
            self.bind(unit_id, pending);
        }
    }

    fn bind(&mut self, unit_id: UnitId, pending: Pending) {
        let envelope = TaskEnvelope {
            task: pending.id,
            component: pending.task.component.clone(),
            config: Arc::clone(&pending.task.config),
        };

        let sent = match self.units.get_mut(&unit_id) {
            Some(unit) => match unit.send(envelope) {
                Ok(()) => {
                    unit.status = UnitStatus::Busy;
                    unit.current_task = Some(pending.id);
                    true
                }
                Err(_) => false,
            },
            None => false,
        };

        if !sent {
            warn!(unit = %unit_id, "unit stopped accepting work, replacing it");
            self.pending.push_front(pending);
            self.replace(unit_id);
            return;
        }

        debug!(unit = %unit_id, task = %pending.id, component = %pending.task.component, "task dispatched");
        self.in_flight.insert(
            pending.id,
            InFlight {
                component: pending.task.component,
                reply: pending.reply,
                started: Instant::now(),
            },
        );
    }

    fn handle_event(&mut self, event: UnitEvent) {
        match event {
            UnitEvent::Completed {
                unit,
                task,
                outcome,
            } => {
                if let Some(flight) = self.in_flight.remove(&task) {
                    let duration_ms = flight.started.elapsed().as_millis() as u64;
                    let result = match outcome {
                        Ok(()) => {
                            info!(component = %flight.component, %unit, duration_ms, "component built");
                            Ok(TaskReport {
                                component: flight.component,
                                unit,
                                duration_ms,
                            })
                        }
                        Err(message) => {
                            error!(component = %flight.component, %unit, error = %message, "component build failed");
                            Err(TaskError::Application {
                                component: flight.component,
                                message,
                            })
                        }
                    };
                    let _ = flight.reply.send(result);
                }
                self.release(unit);
            }
            UnitEvent::Crashed { unit, task, reason } => {
                warn!(%unit, %reason, "build unit crashed, spawning replacement");
                if let Some(flight) = self.in_flight.remove(&task) {
                    let _ = flight.reply.send(Err(TaskError::UnitCrash {
                        component: flight.component,
                        unit,
                        reason,
                    }));
                }
                self.replace(unit);
            }
        }
    }

    fn release(&mut self, unit_id: UnitId) {
        if let Some(unit) = self.units.get_mut(&unit_id) {
            unit.status = UnitStatus::Idle;
            unit.current_task = None;
            self.idle.push_back(unit_id);
        }
    }

    fn replace(&mut self, dead: UnitId) {
        if let Some(handle) = self.units.remove(&dead) {
            debug!(unit = %handle.id, task = ?handle.current_task, "terminating unit");
            handle.terminate();
        }
        self.idle.retain(|id| *id != dead);
        let fresh = self.spawn_unit();
        self.replaced += 1;
        debug!(dead = %dead, fresh = %fresh, "unit replaced");
    }

    fn terminate(&mut self) {
        for (_, handle) in self.units.drain() {
            handle.terminate();
        }
        self.idle.clear();
        // Dropping the replies resolves their handles as PoolClosed.
        self.pending.clear();
        self.in_flight.clear();
    }

    fn stats(&self) -> PoolStats {
        let busy = self
            .units
            .values()
            .filter(|u| u.status == UnitStatus::Busy)
            .count();
        PoolStats {
            size: self.units.len(),
            idle: self.idle.len(),
            busy,
            queued: self.pending.len(),
            replaced: self.replaced,
        }
    }

    fn check_invariants(&self) {
        debug_assert!(self.idle.iter().all(|id| self
            .units
            .get(id)
            .is_some_and(|u| u.status == UnitStatus::Idle && u.current_task.is_none())));
        debug_assert_eq!(self.stats().busy + self.idle.len(), self.units.len());
    }
}
