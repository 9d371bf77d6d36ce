use crate::interpolate::substitute_refs;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tokio::time::{sleep, Duration};
use weftcore::{parse_config, ExecutionContext, NodeError, NodeHandler, NodeType, WorkflowNode};
use weftruntime::{FactoryMetadata, NodeFactory};

const WRITE_METHODS: [&str; 3] = ["POST", "PUT", "PATCH"];
const ALLOWED_METHODS: [&str; 7] = ["GET", "POST", "PUT", "PATCH", "DELETE", "HEAD", "OPTIONS"];

/// Outbound HTTP request with URL templating and a hard per-call timeout.
pub struct HttpRequestNode {
    node_id: String,
    config: Value,
    client: reqwest::Client,
}

impl HttpRequestNode {
    pub fn new(node: &WorkflowNode) -> Self {
        Self {
            node_id: node.id.clone(),
            config: node.data.config.clone(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HttpRequestConfig {
    url: String,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    headers: HashMap<String, String>,
    /// Milliseconds before the in-flight request is aborted.
    #[serde(default = "default_timeout_ms")]
    timeout: u64,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

#[async_trait]
impl NodeHandler for HttpRequestNode {
    fn node_type(&self) -> NodeType {
        NodeType::HttpRequest
    }

    async fn execute(&self, input: Value, ctx: &ExecutionContext) -> Result<Value, NodeError> {
        let config: HttpRequestConfig = parse_config(&self.config)?;

        let method = config.method.to_uppercase();
        if !ALLOWED_METHODS.contains(&method.as_str()) {
            return Err(NodeError::Configuration(format!(
                "Unsupported method: {}",
                config.method
            )));
        }
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|e| NodeError::Configuration(format!("Unsupported method: {}", e)))?;

        let url = substitute_refs(&config.url, "input", &input, ctx);
        tracing::debug!(node_id = %self.node_id, %method, %url, "Sending HTTP request");

        let mut request = self.client.request(method.clone(), &url);
        for (name, value) in &config.headers {
            request = request.header(name, value);
        }
        if WRITE_METHODS.contains(&method.as_str()) {
            request = request.json(&input);
        }

        let round_trip = async {
            let response = request
                .send()
                .await
                .map_err(|e| NodeError::ExecutionFailed(format!("HTTP request failed: {}", e)))?;

            let status = response.status();
            let headers: Map<String, Value> = response
                .headers()
                .iter()
                .map(|(k, v)| {
                    (
                        k.to_string(),
                        Value::String(v.to_str().unwrap_or_default().to_string()),
                    )
                })
                .collect();

            let is_json = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|ct| ct.contains("application/json"));

            let body = response
                .text()
                .await
                .map_err(|e| NodeError::ExecutionFailed(format!("Failed to read response: {}", e)))?;
            let data = if is_json {
                serde_json::from_str(&body).unwrap_or(Value::String(body))
            } else {
                Value::String(body)
            };

            Ok(json!({
                "status": status.as_u16(),
                "statusText": status.canonical_reason().unwrap_or_default(),
                "headers": headers,
                "data": data,
                "success": status.is_success(),
            }))
        };

        // Dropping the round trip aborts the in-flight request.
        tokio::select! {
            result = round_trip => result,
            _ = sleep(Duration::from_millis(config.timeout)) => Err(NodeError::Timeout(config.timeout)),
            _ = ctx.cancellation.cancelled() => Err(NodeError::Cancelled),
        }
    }
}

pub struct HttpRequestNodeFactory;

impl NodeFactory for HttpRequestNodeFactory {
    fn node_type(&self) -> NodeType {
        NodeType::HttpRequest
    }

    fn create(&self, node: &WorkflowNode) -> Result<Box<dyn NodeHandler>, NodeError> {
        Ok(Box::new(HttpRequestNode::new(node)))
    }

    fn metadata(&self) -> FactoryMetadata {
        FactoryMetadata {
            description: "Makes an outbound HTTP request".to_string(),
            category: "http".to_string(),
        }
    }
}
