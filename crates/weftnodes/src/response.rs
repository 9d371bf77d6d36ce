use crate::interpolate::substitute_refs;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use weftcore::value::stringify;
use weftcore::{parse_config, ExecutionContext, NodeError, NodeHandler, NodeType, WorkflowNode};
use weftruntime::{FactoryMetadata, NodeFactory};

/// Terminal node: formats the final value and wraps it with run metadata.
/// Accepts any input.
pub struct ResponseNode {
    config: Value,
}

impl ResponseNode {
    pub fn new(node: &WorkflowNode) -> Self {
        Self {
            config: node.data.config.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ResponseConfig {
    format: ResponseFormat,
    template: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
enum ResponseFormat {
    #[default]
    Json,
    Text,
    Template,
    Markdown,
}

#[async_trait]
impl NodeHandler for ResponseNode {
    fn node_type(&self) -> NodeType {
        NodeType::Response
    }

    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let config: ResponseConfig = parse_config(&self.config)?;

        let content = match config.format {
            ResponseFormat::Json => input,
            ResponseFormat::Text => Value::String(stringify(&input)),
            ResponseFormat::Template => {
                let template = config.template.unwrap_or_default();
                Value::String(substitute_refs(&template, "data", &input, ctx))
            }
            ResponseFormat::Markdown => Value::String(to_markdown(&input)),
        };

        Ok(json!({
            "format": config.format,
            "content": content,
            "metadata": {
                "executionId": ctx.execution_id,
                "timestamp": Utc::now().to_rfc3339(),
                "userId": ctx.user_id,
            },
        }))
    }
}

fn to_markdown(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| format!("{}. {}", i + 1, stringify(item)))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(fields) => fields
            .iter()
            .map(|(key, val)| format!("**{}**: {}", key, stringify(val)))
            .collect::<Vec<_>>()
            .join("\n"),
        other => stringify(other),
    }
}

pub struct ResponseNodeFactory;

impl NodeFactory for ResponseNodeFactory {
    fn node_type(&self) -> NodeType {
        NodeType::Response
    }

    fn create(&self, node: &WorkflowNode) -> Result<Box<dyn NodeHandler>, NodeError> {
        Ok(Box::new(ResponseNode::new(node)))
    }

    fn metadata(&self) -> FactoryMetadata {
        FactoryMetadata {
            description: "Formats the workflow's terminal value".to_string(),
            category: "output".to_string(),
        }
    }
}
