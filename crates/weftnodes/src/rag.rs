use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use weftcore::value::stringify;
use weftcore::{
    parse_config, ExecutionContext, NodeError, NodeHandler, NodeType, SearchQuery, WorkflowNode,
};
use weftruntime::{FactoryMetadata, NodeFactory};

/// Similarity search over a document collection.
pub struct RagSearchNode {
    node_id: String,
    config: Value,
}

impl RagSearchNode {
    pub fn new(node: &WorkflowNode) -> Self {
        Self {
            node_id: node.id.clone(),
            config: node.data.config.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RagSearchConfig {
    collection_id: String,
    #[serde(default = "default_top_k")]
    top_k: usize,
    #[serde(default = "default_similarity_threshold")]
    similarity_threshold: f64,
}

fn default_top_k() -> usize {
    5
}

fn default_similarity_threshold() -> f64 {
    0.7
}

#[async_trait]
impl NodeHandler for RagSearchNode {
    fn node_type(&self) -> NodeType {
        NodeType::RagSearch
    }

    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let config: RagSearchConfig = parse_config(&self.config)?;
        if input.is_null() {
            return Err(NodeError::MissingInput("input".to_string()));
        }

        let documents = ctx
            .services
            .documents
            .as_ref()
            .ok_or(NodeError::ServiceUnavailable("document search"))?;

        // Accept a plain string, a {query} object, or anything stringifiable.
        let query = match &input {
            Value::String(s) => s.clone(),
            Value::Object(o) => match o.get("query").and_then(Value::as_str) {
                Some(q) => q.to_string(),
                None => stringify(&input),
            },
            other => stringify(other),
        };

        tracing::debug!(
            node_id = %self.node_id,
            collection_id = %config.collection_id,
            top_k = config.top_k,
            "Searching documents"
        );

        let hits = documents
            .search(SearchQuery {
                collection_id: config.collection_id,
                query: query.clone(),
                top_k: config.top_k,
                similarity_threshold: config.similarity_threshold,
                user_id: ctx.user_id.clone(),
            })
            .await?;

        let results: Vec<Value> = hits
            .iter()
            .map(|hit| {
                json!({
                    "content": hit.content,
                    "metadata": hit.metadata,
                    "similarity": hit.similarity,
                    "documentId": hit.document_id,
                })
            })
            .collect();

        Ok(json!({
            "query": query,
            "count": results.len(),
            "results": results,
        }))
    }
}

pub struct RagSearchNodeFactory;

impl NodeFactory for RagSearchNodeFactory {
    fn node_type(&self) -> NodeType {
        NodeType::RagSearch
    }

    fn create(&self, node: &WorkflowNode) -> Result<Box<dyn NodeHandler>, NodeError> {
        Ok(Box::new(RagSearchNode::new(node)))
    }

    fn metadata(&self) -> FactoryMetadata {
        FactoryMetadata {
            description: "Similarity search over a document collection".to_string(),
            category: "ai".to_string(),
        }
    }
}
