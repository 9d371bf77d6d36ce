//! Shared fixtures: definition builders and mock service implementations.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use weftcore::{
    AgentRecord, AgentStore, ChatCompletion, CompletionRequest, CompletionResponse,
    DocumentSearch, EdgeType, MessageRole, NodeData, NodeType, Position, SearchHit, SearchQuery,
    ServiceError, TokenUsage, WorkflowDefinition, WorkflowEdge, WorkflowNode,
};

pub fn node(id: &str, node_type: NodeType, config: Value) -> WorkflowNode {
    WorkflowNode {
        id: id.to_string(),
        node_type,
        position: Position::default(),
        data: NodeData {
            label: id.to_string(),
            config,
            description: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
        },
    }
}

pub fn edge(id: &str, source: &str, target: &str) -> WorkflowEdge {
    edge_with_handle(id, source, target, None)
}

pub fn edge_with_handle(
    id: &str,
    source: &str,
    target: &str,
    source_handle: Option<&str>,
) -> WorkflowEdge {
    WorkflowEdge {
        id: id.to_string(),
        source: source.to_string(),
        target: target.to_string(),
        source_handle: source_handle.map(String::from),
        target_handle: None,
        edge_type: EdgeType::Default,
        data: None,
    }
}

pub fn definition(nodes: Vec<WorkflowNode>, edges: Vec<WorkflowEdge>) -> WorkflowDefinition {
    WorkflowDefinition {
        id: "wf-1".to_string(),
        workflow_id: "wf-1".to_string(),
        name: "test workflow".to_string(),
        description: None,
        version: 1,
        is_published: true,
        nodes,
        edges,
        variables: Vec::new(),
    }
}

/// Agent store backed by a fixed map.
pub struct StaticAgents {
    agents: HashMap<String, AgentRecord>,
}

impl StaticAgents {
    pub fn with_agent(agent: AgentRecord) -> Self {
        let mut agents = HashMap::new();
        agents.insert(agent.id.clone(), agent);
        Self { agents }
    }
}

pub fn helper_agent() -> AgentRecord {
    AgentRecord {
        id: "helper".to_string(),
        name: "Helper".to_string(),
        model_id: "test-model-small".to_string(),
        system_prompt: Some("You are helpful.".to_string()),
        temperature: Some(0.2),
        max_tokens: Some(256),
    }
}

#[async_trait]
impl AgentStore for StaticAgents {
    async fn get_agent(&self, agent_id: &str) -> Result<AgentRecord, ServiceError> {
        self.agents
            .get(agent_id)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound(format!("agent {}", agent_id)))
    }
}

/// Completion service that echoes the conversation back.
pub struct EchoLlm;

#[async_trait]
impl ChatCompletion for EchoLlm {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, ServiceError> {
        let user_turn = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        Ok(CompletionResponse {
            content: format!("echo: {}", user_turn),
            model: request.model_id,
            usage: Some(TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
        })
    }
}

/// Document search returning canned hits.
pub struct CannedSearch {
    pub hits: Vec<SearchHit>,
}

impl CannedSearch {
    pub fn two_hits() -> Self {
        Self {
            hits: vec![
                SearchHit {
                    document_id: "doc-1".to_string(),
                    content: "Paris is the capital of France.".to_string(),
                    similarity: 0.93,
                    metadata: json!({"source": "geo.md"}),
                },
                SearchHit {
                    document_id: "doc-2".to_string(),
                    content: "France is in Europe.".to_string(),
                    similarity: 0.81,
                    metadata: json!({"source": "geo.md"}),
                },
            ],
        }
    }
}

#[async_trait]
impl DocumentSearch for CannedSearch {
    async fn search(&self, query: SearchQuery) -> Result<Vec<SearchHit>, ServiceError> {
        Ok(self
            .hits
            .iter()
            .filter(|h| h.similarity >= query.similarity_threshold)
            .take(query.top_k)
            .cloned()
            .collect())
    }
}
