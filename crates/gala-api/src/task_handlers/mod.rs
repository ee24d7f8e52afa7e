//! Background task dispatch.
//!
//! [`TaskContext`] implements [`TaskHandlerContext`] so the worker pool can
//! route claimed tasks back into the application without a strong reference
//! cycle: the queue holds a `Weak<TaskContext>` and upgrades it per task.

mod index_batch;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use gala_core::models::{Task, TaskType};
use gala_worker::TaskHandlerContext;

use crate::state::TaskContext;

#[async_trait]
impl TaskHandlerContext for TaskContext {
    async fn dispatch_task(self: Arc<Self>, task: &Task) -> Result<serde_json::Value> {
        match task.task_type {
            TaskType::IndexBatch => index_batch::run(self, task).await,
        }
    }
}
