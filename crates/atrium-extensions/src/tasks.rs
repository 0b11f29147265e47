//! In-flight task registry
//!
//! Long-running mutations register here and receive a cancellation token.
//! Cancelling only interrupts the waiting portion of a task; backend
//! mutations already issued are not rolled back.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio_util::sync::CancellationToken;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub id: Uuid,
    pub label: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug)]
struct Entry {
    info: TaskInfo,
    token: CancellationToken,
}

#[derive(Debug, Default, Clone)]
pub struct TaskRegistry {
    entries: Arc<Mutex<HashMap<Uuid, Entry>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task; it is removed when the returned guard drops
    pub fn register(&self, label: impl Into<String>) -> TaskGuard {
        let info = TaskInfo {
            id: Uuid::new_v4(),
            label: label.into(),
            started_at: Utc::now(),
        };
        let token = CancellationToken::new();
        debug!("Task started: {} ({})", info.label, info.id);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                info.id,
                Entry {
                    info: info.clone(),
                    token: token.clone(),
                },
            );
        TaskGuard {
            id: info.id,
            token,
            entries: self.entries.clone(),
        }
    }

    /// Cancel every registered task; returns how many were cancelled
    pub fn cancel_all(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for entry in entries.values() {
            debug!("Cancelling task: {}", entry.info.label);
            entry.token.cancel();
        }
        entries.len()
    }

    pub fn in_flight(&self) -> Vec<TaskInfo> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mut tasks: Vec<TaskInfo> = entries.values().map(|e| e.info.clone()).collect();
        tasks.sort_by_key(|t| t.started_at);
        tasks
    }
}

/// Registration handle for one in-flight task
pub struct TaskGuard {
    id: Uuid,
    token: CancellationToken,
    entries: Arc<Mutex<HashMap<Uuid, Entry>>>,
}

impl TaskGuard {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TaskGuard {
    fn drop(&mut self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
