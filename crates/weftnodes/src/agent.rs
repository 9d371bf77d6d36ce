use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use weftcore::value::stringify;
use weftcore::{
    parse_config, ChatMessage, CompletionRequest, ExecutionContext, MessageRole, NodeError,
    NodeHandler, NodeType, WorkflowNode,
};
use weftruntime::{FactoryMetadata, NodeFactory};

/// Calls the chat-completion service with an agent's model and sampling
/// parameters. The agent configuration itself lives in an external store.
pub struct LlmAgentNode {
    node_id: String,
    config: Value,
}

impl LlmAgentNode {
    pub fn new(node: &WorkflowNode) -> Self {
        Self {
            node_id: node.id.clone(),
            config: node.data.config.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmAgentConfig {
    agent_id: String,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    temperature: Option<f64>,
    #[serde(default)]
    max_tokens: Option<u32>,
}

#[async_trait]
impl NodeHandler for LlmAgentNode {
    fn node_type(&self) -> NodeType {
        NodeType::LlmAgent
    }

    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let config: LlmAgentConfig = parse_config(&self.config)?;
        if input.is_null() {
            return Err(NodeError::MissingInput("input".to_string()));
        }

        let agents = ctx
            .services
            .agents
            .as_ref()
            .ok_or(NodeError::ServiceUnavailable("agent store"))?;
        let llm = ctx
            .services
            .llm
            .as_ref()
            .ok_or(NodeError::ServiceUnavailable("chat completion"))?;

        let agent = agents.get_agent(&config.agent_id).await?;
        tracing::debug!(
            node_id = %self.node_id,
            agent_id = %agent.id,
            model_id = %agent.model_id,
            "Calling LLM agent"
        );

        let mut messages = Vec::new();
        if let Some(system) = config.system_prompt.or(agent.system_prompt) {
            messages.push(ChatMessage {
                role: MessageRole::System,
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: MessageRole::User,
            content: stringify(&input),
        });

        let response = llm
            .complete(CompletionRequest {
                model_id: agent.model_id,
                messages,
                temperature: config.temperature.or(agent.temperature),
                max_tokens: config.max_tokens.or(agent.max_tokens),
                user_id: ctx.user_id.clone(),
            })
            .await?;

        Ok(json!({
            "content": response.content,
            "model": response.model,
            "usage": response.usage,
        }))
    }
}

pub struct LlmAgentNodeFactory;

impl NodeFactory for LlmAgentNodeFactory {
    fn node_type(&self) -> NodeType {
        NodeType::LlmAgent
    }

    fn create(&self, node: &WorkflowNode) -> Result<Box<dyn NodeHandler>, NodeError> {
        Ok(Box::new(LlmAgentNode::new(node)))
    }

    fn metadata(&self) -> FactoryMetadata {
        FactoryMetadata {
            description: "Runs a chat completion through a configured agent".to_string(),
            category: "ai".to_string(),
        }
    }
}
