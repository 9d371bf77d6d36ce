use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use weftcore::condition::{evaluate, ConditionOperator};
use weftcore::value::resolve_path;
use weftcore::{parse_config, ExecutionContext, NodeError, NodeHandler, NodeType, WorkflowNode};
use weftruntime::{FactoryMetadata, NodeFactory};

/// Evaluates a field/operator/value rule against the input and reports the
/// taken output port. Downstream edges with matching source handles carry
/// the branch selection.
pub struct ConditionalNode {
    node_id: String,
    config: Value,
}

impl ConditionalNode {
    pub fn new(node: &WorkflowNode) -> Self {
        Self {
            node_id: node.id.clone(),
            config: node.data.config.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConditionalConfig {
    /// Dotted path into the input; empty means the whole input.
    #[serde(default)]
    field: String,
    operator: ConditionOperator,
    #[serde(default)]
    value: Value,
}

#[async_trait]
impl NodeHandler for ConditionalNode {
    fn node_type(&self) -> NodeType {
        NodeType::Conditional
    }

    async fn execute(&self, input: Value, _ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let config: ConditionalConfig = parse_config(&self.config)?;

        let field_value = resolve_path(&input, &config.field);
        let condition_met = evaluate(field_value, config.operator, &config.value);
        tracing::debug!(
            node_id = %self.node_id,
            operator = %config.operator,
            condition_met,
            "Evaluated condition"
        );

        let field_value = field_value.cloned().unwrap_or(Value::Null);
        Ok(json!({
            "input": input,
            "conditionMet": condition_met,
            "field": config.field,
            "fieldValue": field_value,
            "expectedValue": config.value,
            "outputPort": if condition_met { "true" } else { "false" },
        }))
    }
}

pub struct ConditionalNodeFactory;

impl NodeFactory for ConditionalNodeFactory {
    fn node_type(&self) -> NodeType {
        NodeType::Conditional
    }

    fn create(&self, node: &WorkflowNode) -> Result<Box<dyn NodeHandler>, NodeError> {
        Ok(Box::new(ConditionalNode::new(node)))
    }

    fn metadata(&self) -> FactoryMetadata {
        FactoryMetadata {
            description: "Routes execution along a true/false branch".to_string(),
            category: "logic".to_string(),
        }
    }
}
