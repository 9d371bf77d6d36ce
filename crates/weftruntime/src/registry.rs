use std::collections::HashMap;
use std::sync::Arc;
use weftcore::{NodeError, NodeHandler, NodeType, WorkflowError, WorkflowNode};

/// Factory trait for creating node handler instances bound to a node's
/// id and config.
pub trait NodeFactory: Send + Sync {
    fn node_type(&self) -> NodeType;

    /// Construct a handler for the given node. Config content is validated
    /// by the handler at execute time, not here.
    fn create(&self, node: &WorkflowNode) -> Result<Box<dyn NodeHandler>, NodeError>;

    fn metadata(&self) -> FactoryMetadata {
        FactoryMetadata::default()
    }
}

/// Metadata about a registered node kind, surfaced by tooling.
#[derive(Debug, Clone)]
pub struct FactoryMetadata {
    pub description: String,
    pub category: String,
}

impl Default for FactoryMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            category: "general".to_string(),
        }
    }
}

/// Registry of available node kinds.
///
/// An explicit object rather than process-wide state: construct one at
/// application start, register extensions, and hand it to the manager.
pub struct NodeRegistry {
    factories: HashMap<NodeType, Arc<dyn NodeFactory>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory, replacing any previous one for the same kind.
    pub fn register(&mut self, factory: Arc<dyn NodeFactory>) {
        let node_type = factory.node_type();
        tracing::info!("Registering node type: {}", node_type);
        self.factories.insert(node_type, factory);
    }

    /// Create a handler for a node. Kinds declared in the enumeration but
    /// never registered fail here.
    pub fn create_node(&self, node: &WorkflowNode) -> Result<Box<dyn NodeHandler>, WorkflowError> {
        let factory = self
            .factories
            .get(&node.node_type)
            .ok_or_else(|| WorkflowError::UnknownNodeType(node.node_type.to_string()))?;

        factory
            .create(node)
            .map_err(|e| WorkflowError::Invalid(format!("Failed to create node: {}", e)))
    }

    pub fn contains(&self, node_type: NodeType) -> bool {
        self.factories.contains_key(&node_type)
    }

    pub fn list_node_types(&self) -> Vec<NodeType> {
        let mut types: Vec<NodeType> = self.factories.keys().copied().collect();
        types.sort_by_key(|t| t.as_str());
        types
    }

    pub fn get_metadata(&self, node_type: NodeType) -> Option<FactoryMetadata> {
        self.factories.get(&node_type).map(|f| f.metadata())
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
