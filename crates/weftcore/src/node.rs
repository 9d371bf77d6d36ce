use crate::error::NodeError;
use crate::execution::ExecutionContext;
use crate::workflow::NodeType;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Uniform execution contract implemented by every node handler.
///
/// Handlers validate their own configuration and input at the top of
/// `execute` and never swallow errors; the engine logs the failing node id
/// and aborts the run.
#[async_trait]
pub trait NodeHandler: Send + Sync {
    fn node_type(&self) -> NodeType;

    /// Run the node against its upstream input. The returned value is
    /// memoized by the engine and fed to downstream nodes.
    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError>;
}

/// Deserialize a node's free-form config into the handler's typed shape.
/// Missing required fields and unknown enum variants surface as
/// configuration errors before any external call is made.
pub fn parse_config<T: DeserializeOwned>(config: &Value) -> Result<T, NodeError> {
    serde_json::from_value(config.clone()).map_err(|e| NodeError::Configuration(e.to_string()))
}
