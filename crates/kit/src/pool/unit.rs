//! Execution units
//!
//! A unit is a long-lived tokio task with its own inbox. It runs one build at
//! a time and reports every outcome to the coordinator over the event
//! channel. Each build runs in its own spawned task so a panic is caught at
//! the task boundary; the unit then reports itself crashed and exits, and the
//! coordinator replaces it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::trace;

use super::task::{TaskEnvelope, TaskId};
use super::BuildUnit;

/// Identifier of one execution unit; replacements get fresh ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unit-{}", self.0)
    }
}

/// Status of an execution unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    Idle,
    Busy,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
        }
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Messages from units to the coordinator
#[derive(Debug)]
pub(crate) enum UnitEvent {
    Completed {
        unit: UnitId,
        task: TaskId,
        outcome: Result<(), String>,
    },
    Crashed {
        unit: UnitId,
        task: TaskId,
        reason: String,
    },
}

/// Coordinator-side record of one unit
#[derive(Debug)]
pub(crate) struct UnitHandle {
    pub id: UnitId,
    pub status: UnitStatus,
    pub current_task: Option<TaskId>,
    inbox: mpsc::UnboundedSender<TaskEnvelope>,
    join: JoinHandle<()>,
}

impl UnitHandle {
    /// Hand a task to the unit; gives the envelope back if the unit is gone
    pub fn send(&self, envelope: TaskEnvelope) -> Result<(), TaskEnvelope> {
        self.inbox.send(envelope).map_err(|e| e.0)
    }

    /// Stop the unit unconditionally
    pub fn terminate(self) {
        self.join.abort();
    }
}

/// Start a unit and return its handle
pub(crate) fn spawn<U: BuildUnit>(
    id: UnitId,
    unit: U,
    events: mpsc::UnboundedSender<UnitEvent>,
) -> UnitHandle {
    let (inbox, rx) = mpsc::unbounded_channel();
    let join = tokio::spawn(run_unit(id, Arc::new(unit), rx, events));

    UnitHandle {
        id,
        status: UnitStatus::Idle,
        current_task: None,
        inbox,
        join,
    }
}

async fn run_unit<U: BuildUnit>(
    id: UnitId,
    unit: Arc<U>,
    mut inbox: mpsc::UnboundedReceiver<TaskEnvelope>,
    events: mpsc::UnboundedSender<UnitEvent>,
) {
    while let Some(TaskEnvelope {
        task,
        component,
        config,
    }) = inbox.recv().await
    {
        trace!(unit = %id, %task, component = %component, "unit picked up task");

        let worker = Arc::clone(&unit);
        let mut job = AbortOnDrop(tokio::spawn(async move {
            worker.build(&component, &config).await
        }));

        let event = match (&mut job.0).await {
            Ok(outcome) => UnitEvent::Completed {
                unit: id,
                task,
                outcome: outcome.map_err(|e| format!("{:#}", e)),
            },
            Err(err) => {
                let _ = events.send(UnitEvent::Crashed {
                    unit: id,
                    task,
                    reason: crash_reason(err),
                });
                return;
            }
        };

        if events.send(event).is_err() {
            return;
        }
    }
}

/// Terminating a unit also stops the build it is running
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

fn crash_reason(err: JoinError) -> String {
    if !err.is_panic() {
        return "build task was cancelled".to_string();
    }

    let payload = err.into_panic();
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
