use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Node {node_id} failed: {source}")]
    Node {
        node_id: String,
        #[source]
        source: NodeError,
    },

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Missing required input: {0}")]
    MissingInput(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Service not available: {0}")]
    ServiceUnavailable(&'static str),

    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Cancelled")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Workflow not found: {0}")]
    NotFound(String),

    #[error("Invalid workflow: {0}")]
    Invalid(String),

    #[error("Cyclic dependency detected")]
    CyclicDependency,

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    #[error("Invalid edge {edge_id}: {reason}")]
    InvalidEdge { edge_id: String, reason: String },
}

#[derive(Error, Debug, Clone)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Request failed: {0}")]
    Failed(String),
}
