use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use weftcore::value::stringify;
use weftcore::{parse_config, ExecutionContext, NodeError, NodeHandler, NodeType, WorkflowNode};
use weftruntime::{FactoryMetadata, NodeFactory};

/// Substitutes declared variables into a prompt template.
pub struct PromptTemplateNode {
    node_id: String,
    config: Value,
}

impl PromptTemplateNode {
    pub fn new(node: &WorkflowNode) -> Self {
        Self {
            node_id: node.id.clone(),
            config: node.data.config.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptTemplateConfig {
    template: String,
    #[serde(default)]
    variables: Vec<String>,
}

#[async_trait]
impl NodeHandler for PromptTemplateNode {
    fn node_type(&self) -> NodeType {
        NodeType::PromptTemplate
    }

    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let config: PromptTemplateConfig = parse_config(&self.config)?;
        tracing::debug!(node_id = %self.node_id, "Rendering prompt template");

        let mut rendered = config.template;
        for (index, name) in config.variables.iter().enumerate() {
            // A variable resolves from the input object, or the whole input
            // for the first variable of a scalar input, then the run's
            // variable map, then empty string.
            let value = match &input {
                Value::Object(fields) => fields.get(name).cloned(),
                other if index == 0 && !other.is_null() => Some(other.clone()),
                _ => None,
            };
            let value = value
                .or_else(|| ctx.get_variable(name))
                .map(|v| stringify(&v))
                .unwrap_or_default();

            let pattern = Regex::new(&format!(r"\{{\{{\s*{}\s*\}}\}}", regex::escape(name)))
                .map_err(|e| NodeError::Configuration(format!("invalid variable name: {}", e)))?;
            rendered = pattern
                .replace_all(&rendered, regex::NoExpand(value.as_str()))
                .into_owned();
        }

        Ok(Value::String(rendered))
    }
}

pub struct PromptTemplateNodeFactory;

impl NodeFactory for PromptTemplateNodeFactory {
    fn node_type(&self) -> NodeType {
        NodeType::PromptTemplate
    }

    fn create(&self, node: &WorkflowNode) -> Result<Box<dyn NodeHandler>, NodeError> {
        Ok(Box::new(PromptTemplateNode::new(node)))
    }

    fn metadata(&self) -> FactoryMetadata {
        FactoryMetadata {
            description: "Substitutes variables into a prompt template".to_string(),
            category: "transform".to_string(),
        }
    }
}
