//! Tasks, their results, and the handle a submitter awaits

use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::oneshot;

use super::unit::UnitId;
use crate::build::BuildConfig;

/// Identifier assigned to a task when the pool accepts it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(pub u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// One unit of build work: a component plus the shared build settings
#[derive(Debug, Clone)]
pub struct Task {
    pub component: String,
    pub config: Arc<BuildConfig>,
}

impl Task {
    pub fn new(component: impl Into<String>, config: Arc<BuildConfig>) -> Self {
        Self {
            component: component.into(),
            config,
        }
    }
}

/// Message sent from the coordinator into a unit
#[derive(Debug, Clone)]
pub(crate) struct TaskEnvelope {
    pub task: TaskId,
    pub component: String,
    pub config: Arc<BuildConfig>,
}

/// Successful completion of one task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskReport {
    pub component: String,
    pub unit: UnitId,
    pub duration_ms: u64,
}

/// Why a single task did not complete
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The build itself returned an error
    #[error("{component}: {message}")]
    Application { component: String, message: String },

    /// The unit running the build died; it has been replaced
    #[error("{component}: build unit {unit} crashed: {reason}")]
    UnitCrash {
        component: String,
        unit: UnitId,
        reason: String,
    },

    #[error("{component}: worker pool shut down before the task finished")]
    PoolClosed { component: String },
}

impl TaskError {
    pub fn component(&self) -> &str {
        match self {
            Self::Application { component, .. }
            | Self::UnitCrash { component, .. }
            | Self::PoolClosed { component } => component,
        }
    }
}

pub(crate) type TaskReply = oneshot::Sender<Result<TaskReport, TaskError>>;

/// Resolves once the pool reports the task's outcome
#[derive(Debug)]
pub struct TaskHandle {
    component: String,
    rx: oneshot::Receiver<Result<TaskReport, TaskError>>,
}

impl TaskHandle {
    pub(crate) fn new(
        component: String,
        rx: oneshot::Receiver<Result<TaskReport, TaskError>>,
    ) -> Self {
        Self { component, rx }
    }

    pub fn component(&self) -> &str {
        &self.component
    }
}

impl Future for TaskHandle {
    type Output = Result<TaskReport, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(TaskError::PoolClosed {
                component: this.component.clone(),
            })),
            Poll::Pending => Poll::Pending,
        }
    }
}
