use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use weftcore::{parse_config, ExecutionContext, NodeError, NodeHandler, NodeType, WorkflowNode};
use weftruntime::{FactoryMetadata, NodeFactory};

/// Entry node: passes the upstream value through, falling back to the
/// configured default, and applies optional validation rules.
pub struct UserInputNode {
    node_id: String,
    config: Value,
}

impl UserInputNode {
    pub fn new(node: &WorkflowNode) -> Self {
        Self {
            node_id: node.id.clone(),
            config: node.data.config.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UserInputConfig {
    input_type: Option<String>,
    default_value: Option<Value>,
    validation: Option<ValidationRules>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ValidationRules {
    required: bool,
    min_length: Option<usize>,
    max_length: Option<usize>,
}

#[async_trait]
impl NodeHandler for UserInputNode {
    fn node_type(&self) -> NodeType {
        NodeType::UserInput
    }

    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let config: UserInputConfig = parse_config(&self.config)?;
        tracing::debug!(
            node_id = %self.node_id,
            input_type = config.input_type.as_deref().unwrap_or("text"),
            "Resolving user input"
        );

        let value = if input.is_null() {
            config.default_value.unwrap_or_else(|| Value::String(String::new()))
        } else {
            input
        };

        if let Some(rules) = &config.validation {
            if rules.required && is_blank(&value) {
                return Err(NodeError::MissingInput("input is required".to_string()));
            }
            if let Some(text) = value.as_str() {
                let length = text.chars().count();
                if let Some(min) = rules.min_length {
                    if length < min {
                        return Err(NodeError::InvalidInput(format!(
                            "input is shorter than minimum length {}",
                            min
                        )));
                    }
                }
                if let Some(max) = rules.max_length {
                    if length > max {
                        return Err(NodeError::InvalidInput(format!(
                            "input is longer than maximum length {}",
                            max
                        )));
                    }
                }
            }
        }

        Ok(value)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

pub struct UserInputNodeFactory;

impl NodeFactory for UserInputNodeFactory {
    fn node_type(&self) -> NodeType {
        NodeType::UserInput
    }

    fn create(&self, node: &WorkflowNode) -> Result<Box<dyn NodeHandler>, NodeError> {
        Ok(Box::new(UserInputNode::new(node)))
    }

    fn metadata(&self) -> FactoryMetadata {
        FactoryMetadata {
            description: "Accepts and validates the run's entry input".to_string(),
            category: "input".to_string(),
        }
    }
}
