//! External collaborator contracts injected into each run.
//!
//! The concrete implementations (agent store, LLM gateway, vector search)
//! live outside this workspace; handlers only see these traits.

use crate::error::ServiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// Capability bag wired into the execution context. Every handle is optional;
/// a handler that needs an absent capability fails its node.
#[derive(Clone, Default)]
pub struct Services {
    pub agents: Option<Arc<dyn AgentStore>>,
    pub llm: Option<Arc<dyn ChatCompletion>>,
    pub documents: Option<Arc<dyn DocumentSearch>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agents(mut self, agents: Arc<dyn AgentStore>) -> Self {
        self.agents = Some(agents);
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn ChatCompletion>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_documents(mut self, documents: Arc<dyn DocumentSearch>) -> Self {
        self.documents = Some(documents);
        self
    }
}

/// Lookup of agent configurations by id.
#[async_trait]
pub trait AgentStore: Send + Sync {
    async fn get_agent(&self, agent_id: &str) -> Result<AgentRecord, ServiceError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRecord {
    pub id: String,
    pub name: String,
    pub model_id: String,
    pub system_prompt: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Chat-completion capability.
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model_id: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// Acting user, forwarded for attribution and quota checks.
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    pub model: String,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Similarity search over a document collection.
#[async_trait]
pub trait DocumentSearch: Send + Sync {
    async fn search(&self, query: SearchQuery) -> Result<Vec<SearchHit>, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub collection_id: String,
    pub query: String,
    pub top_k: usize,
    pub similarity_threshold: f64,
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub document_id: String,
    pub content: String,
    pub similarity: f64,
    #[serde(default)]
    pub metadata: Value,
}
