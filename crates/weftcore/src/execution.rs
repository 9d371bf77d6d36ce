use crate::services::Services;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub type ExecutionId = Uuid;

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Paused,
}

impl ExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutionStatus::Completed | ExecutionStatus::Failed | ExecutionStatus::Cancelled
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Pending => "pending",
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
            ExecutionStatus::Paused => "paused",
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-run mutable state shared by reference with every node invocation.
pub struct ExecutionContext {
    pub execution_id: ExecutionId,
    pub services: Services,
    pub user_id: Option<String>,
    /// Cancellation is checked by the engine at node boundaries and honored
    /// by long-running handlers mid-call.
    pub cancellation: CancellationToken,
    variables: RwLock<HashMap<String, Value>>,
}

impl ExecutionContext {
    pub fn new(services: Services, user_id: Option<String>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            services,
            user_id,
            cancellation: CancellationToken::new(),
            variables: RwLock::new(HashMap::new()),
        }
    }

    pub fn get_variable(&self, name: &str) -> Option<Value> {
        self.variables
            .read()
            .expect("variables lock poisoned")
            .get(name)
            .cloned()
    }

    pub fn set_variable(&self, name: impl Into<String>, value: Value) {
        self.variables
            .write()
            .expect("variables lock poisoned")
            .insert(name.into(), value);
    }

    pub fn variables(&self) -> HashMap<String, Value> {
        self.variables
            .read()
            .expect("variables lock poisoned")
            .clone()
    }
}
