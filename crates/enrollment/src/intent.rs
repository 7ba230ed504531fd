//! Durable intents and the sink they are queued into.
//!
//! Every seat mutation first hands an [`Intent`] to an [`IntentSink`] and only
//! touches memory once the sink acknowledged it. The persistence worker on the
//! other side of the sink replays intents against the database.

use crate::types::{CourseId, DepartmentId, GroupId, StudentId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// One mutation, carrying just enough to replay it in the backing store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Intent {
    Enroll {
        student: StudentId,
        course: CourseId,
        group: GroupId,
        /// The student went into the waitlist rather than a registered seat
        reserved: bool,
    },
    Disenroll {
        student: StudentId,
        course: CourseId,
    },
    ChangeGroup {
        student: StudentId,
        course: CourseId,
        /// The destination group
        group: GroupId,
    },
    UpdateCapacity {
        course: CourseId,
        group: GroupId,
        new_capacity: usize,
        /// Students moved from the waitlist head into registered seats, in order
        promoted: Vec<StudentId>,
    },
}

/// An intent together with the department used as a routing hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedIntent {
    pub department: DepartmentId,
    pub intent: Intent,
}

/// Errors that can occur while queueing an intent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The transport towards the persistence worker is gone
    #[error("intent channel closed")]
    Closed,

    /// The caller cancelled before the intent was acknowledged
    #[error("cancelled before the intent was queued")]
    Cancelled,

    /// The transport or storage refused the intent
    #[error("intent rejected: {reason}")]
    Rejected { reason: String },
}

/// Records a mutation intent durably before it becomes visible in memory.
///
/// Once `enqueue` returns `Ok`, the intent is treated as permanently recorded.
/// Implementations decide whether to honour `cancel`; the engine never polls it.
#[async_trait]
pub trait IntentSink: Send + Sync {
    async fn enqueue(
        &self,
        cancel: &CancellationToken,
        department: DepartmentId,
        intent: Intent,
    ) -> Result<(), SinkError>;
}

/// Sink backed by a bounded tokio channel.
///
/// A full channel applies backpressure to the caller, which is holding the
/// section and student locks while it waits.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<RoutedIntent>,
}

impl ChannelSink {
    /// Creates a sink and the receiver the persistence side drains.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<RoutedIntent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl IntentSink for ChannelSink {
    async fn enqueue(
        &self,
        cancel: &CancellationToken,
        department: DepartmentId,
        intent: Intent,
    ) -> Result<(), SinkError> {
        let routed = RoutedIntent { department, intent };
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SinkError::Cancelled),
            sent = self.sender.send(routed) => sent.map_err(|_| SinkError::Closed),
        }
    }
}
