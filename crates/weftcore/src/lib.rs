//! Core abstractions for the weft workflow engine.
//!
//! This crate provides the definition types, the node handler contract, the
//! per-run execution context, and the external service interfaces that all
//! other components depend on.

pub mod condition;
mod error;
mod events;
mod execution;
mod node;
mod services;
pub mod value;
mod workflow;

pub use condition::ConditionOperator;
pub use error::{EngineError, NodeError, ServiceError, WorkflowError};
pub use events::{EventBus, ExecutionEvent};
pub use execution::{ExecutionContext, ExecutionId, ExecutionStatus};
pub use node::{parse_config, NodeHandler};
pub use services::{
    AgentRecord, AgentStore, ChatCompletion, ChatMessage, CompletionRequest, CompletionResponse,
    DocumentSearch, MessageRole, SearchHit, SearchQuery, Services, TokenUsage,
};
pub use workflow::{
    ConditionRule, EdgeData, EdgeType, NodeData, NodePort, NodeType, Position, WorkflowDefinition,
    WorkflowEdge, WorkflowNode, WorkflowVariable,
};

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
