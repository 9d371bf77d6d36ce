use crate::error::WorkflowError;
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Complete workflow definition as stored by the surrounding application.
///
/// The engine only reads it; ownership stays with the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub id: String,
    pub workflow_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub version: u32,
    pub is_published: bool,
    pub nodes: Vec<WorkflowNode>,
    pub edges: Vec<WorkflowEdge>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<WorkflowVariable>,
}

impl WorkflowDefinition {
    pub fn find_node(&self, node_id: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    /// Node ids that never appear as an edge target, in declaration order.
    pub fn start_nodes(&self) -> Vec<&WorkflowNode> {
        let targets: HashSet<&str> = self.edges.iter().map(|e| e.target.as_str()).collect();
        self.nodes
            .iter()
            .filter(|n| !targets.contains(n.id.as_str()))
            .collect()
    }

    /// Edges whose target is `node_id`, in declaration order.
    pub fn incoming_edges(&self, node_id: &str) -> Vec<&WorkflowEdge> {
        self.edges.iter().filter(|e| e.target == node_id).collect()
    }

    /// Edges whose source is `node_id`, in declaration order.
    pub fn outgoing_edges(&self, node_id: &str) -> Vec<&WorkflowEdge> {
        self.edges.iter().filter(|e| e.source == node_id).collect()
    }

    /// Validate the definition before execution: unique node ids, no dangling
    /// edge endpoints, no cycles. Run once at load time so traversal never has
    /// to deal with a partially broken graph.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                return Err(WorkflowError::Invalid(format!(
                    "duplicate node id: {}",
                    node.id
                )));
            }
        }

        let mut graph = DiGraph::<&str, ()>::new();
        let mut indices = HashMap::new();
        for node in &self.nodes {
            let idx = graph.add_node(node.id.as_str());
            indices.insert(node.id.as_str(), idx);
        }

        for edge in &self.edges {
            let from = indices.get(edge.source.as_str()).ok_or_else(|| {
                WorkflowError::InvalidEdge {
                    edge_id: edge.id.clone(),
                    reason: format!("source node '{}' does not exist", edge.source),
                }
            })?;
            let to = indices.get(edge.target.as_str()).ok_or_else(|| {
                WorkflowError::InvalidEdge {
                    edge_id: edge.id.clone(),
                    reason: format!("target node '{}' does not exist", edge.target),
                }
            })?;
            graph.add_edge(*from, *to, ());
        }

        if toposort(&graph, None).is_err() {
            return Err(WorkflowError::CyclicDependency);
        }

        Ok(())
    }
}

/// A typed unit of work within a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowNode {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub position: Position,
    pub data: NodeData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    pub label: String,
    /// Node-type-specific settings. Validated by the handler, not the engine.
    #[serde(default = "empty_config")]
    pub config: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Declared ports are descriptive metadata only; execution does not
    /// enforce arity beyond "zero or more incoming edges".
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<NodePort>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<NodePort>,
}

fn empty_config() -> Value {
    Value::Object(serde_json::Map::new())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePort {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

/// Layout position in the visual editor. Ignored by execution.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Directed data-flow link from one node's output to another node's input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    /// Sub-port addressing on the source node, e.g. a conditional's
    /// "true"/"false" output ports.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(rename = "type", default)]
    pub edge_type: EdgeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<EdgeData>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    #[default]
    Default,
    Conditional,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionRule>,
}

/// Field/operator/value rule attached to a conditional edge.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionRule {
    #[serde(default)]
    pub field: String,
    pub operator: crate::condition::ConditionOperator,
    #[serde(default)]
    pub value: Value,
}

/// Declared workflow variable. Defaults seed the run's variable map.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowVariable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Closed enumeration of node kinds. Only a subset has built-in handlers;
/// the rest must be registered explicitly or fail at node construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    UserInput,
    FileUpload,
    ApiTrigger,
    WebhookReceiver,
    LlmAgent,
    RagSearch,
    DeepResearch,
    WebSearch,
    TextProcessor,
    JsonParser,
    PromptTemplate,
    DataMapper,
    Conditional,
    Loop,
    Parallel,
    Sequential,
    Wait,
    HttpRequest,
    DatabaseQuery,
    Response,
    WebhookSender,
    EmailSender,
    Notification,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::UserInput => "user_input",
            NodeType::FileUpload => "file_upload",
            NodeType::ApiTrigger => "api_trigger",
            NodeType::WebhookReceiver => "webhook_receiver",
            NodeType::LlmAgent => "llm_agent",
            NodeType::RagSearch => "rag_search",
            NodeType::DeepResearch => "deep_research",
            NodeType::WebSearch => "web_search",
            NodeType::TextProcessor => "text_processor",
            NodeType::JsonParser => "json_parser",
            NodeType::PromptTemplate => "prompt_template",
            NodeType::DataMapper => "data_mapper",
            NodeType::Conditional => "conditional",
            NodeType::Loop => "loop",
            NodeType::Parallel => "parallel",
            NodeType::Sequential => "sequential",
            NodeType::Wait => "wait",
            NodeType::HttpRequest => "http_request",
            NodeType::DatabaseQuery => "database_query",
            NodeType::Response => "response",
            NodeType::WebhookSender => "webhook_sender",
            NodeType::EmailSender => "email_sender",
            NodeType::Notification => "notification",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
