//! End-to-end workflow runs through the execution manager with the built-in
//! handlers.

mod support;

use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use support::{definition, edge, edge_with_handle, helper_agent, node, EchoLlm, StaticAgents};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use weftcore::{NodeType, Services};
use weftnodes::register_builtin;
use weftruntime::{ExecutionManager, NodeRegistry};

fn manager_with(services: Services) -> ExecutionManager {
    let mut registry = NodeRegistry::new();
    register_builtin(&mut registry);
    ExecutionManager::new(Arc::new(registry), services)
}

#[tokio::test]
async fn question_pipeline_formats_the_terminal_response() {
    let manager = manager_with(Services::new());
    let def = definition(
        vec![
            node("1", NodeType::UserInput, json!({})),
            node(
                "2",
                NodeType::PromptTemplate,
                json!({"template": "Q: {{q}}", "variables": ["q"]}),
            ),
            node("3", NodeType::Response, json!({"format": "text"})),
        ],
        vec![edge("e1", "1", "2"), edge("e2", "2", "3")],
    );

    let outcome = manager
        .execute_workflow(def, json!("capital of France"), Some("user-9".to_string()))
        .await
        .unwrap();

    assert_eq!(outcome.result["format"], json!("text"));
    assert_eq!(outcome.result["content"], json!("Q: capital of France"));
    assert_eq!(outcome.result["metadata"]["userId"], json!("user-9"));

    // Intermediate results stay observable on the finished engine.
    let engine = manager.get_execution(outcome.execution_id).unwrap();
    let results = engine.node_results();
    assert_eq!(results["1"], json!("capital of France"));
    assert_eq!(results["2"], json!("Q: capital of France"));
    assert_eq!(results["3"], outcome.result);
}

#[tokio::test]
async fn conditional_branch_runs_only_the_matching_target() {
    let manager = manager_with(Services::new());
    let def = definition(
        vec![
            node("in", NodeType::UserInput, json!({})),
            node(
                "cond",
                NodeType::Conditional,
                json!({"field": "", "operator": "contains", "value": "urgent"}),
            ),
            node(
                "hot",
                NodeType::Response,
                json!({"format": "template", "template": "escalate: {{data.input}}"}),
            ),
            node(
                "cold",
                NodeType::Response,
                json!({"format": "template", "template": "queue: {{data.input}}"}),
            ),
        ],
        vec![
            edge("e1", "in", "cond"),
            edge_with_handle("e2", "cond", "hot", Some("true")),
            edge_with_handle("e3", "cond", "cold", Some("false")),
        ],
    );

    let outcome = manager
        .execute_workflow(def, json!("this is urgent"), None)
        .await
        .unwrap();

    // Only the matching branch executed, so its output is the sole terminal.
    assert_eq!(outcome.result["content"], json!("escalate: this is urgent"));

    let engine = manager.get_execution(outcome.execution_id).unwrap();
    let results = engine.node_results();
    assert_eq!(results["cond"]["conditionMet"], json!(true));
    assert!(results.contains_key("hot"));
    assert!(!results.contains_key("cold"));
}

#[tokio::test]
async fn agent_pipeline_flows_through_services() {
    let services = Services::new()
        .with_agents(Arc::new(StaticAgents::with_agent(helper_agent())))
        .with_llm(Arc::new(EchoLlm));
    let manager = manager_with(services);

    let def = definition(
        vec![
            node("in", NodeType::UserInput, json!({})),
            node("ask", NodeType::LlmAgent, json!({"agentId": "helper"})),
            node("out", NodeType::Response, json!({})),
        ],
        vec![edge("e1", "in", "ask"), edge("e2", "ask", "out")],
    );

    let outcome = manager
        .execute_workflow(def, json!("hello"), None)
        .await
        .unwrap();
    assert_eq!(outcome.result["content"]["content"], json!("echo: hello"));
    assert_eq!(
        outcome.result["content"]["model"],
        json!("test-model-small")
    );
}

#[tokio::test]
async fn handler_failure_aborts_the_whole_run() {
    let manager = manager_with(Services::new());
    let def = definition(
        vec![
            node("in", NodeType::UserInput, json!({})),
            // No template configured: fails before anything downstream runs.
            node("tpl", NodeType::PromptTemplate, json!({})),
            node("out", NodeType::Response, json!({})),
        ],
        vec![edge("e1", "in", "tpl"), edge("e2", "tpl", "out")],
    );

    let err = manager
        .execute_workflow(def, json!("x"), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("tpl"));
    assert!(err.to_string().contains("Configuration error"));
}

async fn spawn_http_server(response: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}/", addr)
}

/// Accepts connections but never answers.
async fn spawn_silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            held.push(socket);
        }
    });
    format!("http://{}/", addr)
}

#[tokio::test]
async fn http_request_parses_json_responses() {
    let url = spawn_http_server(
        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 11\r\nConnection: close\r\n\r\n{\"ok\":true}",
    )
    .await;
    let manager = manager_with(Services::new());

    let def = definition(
        vec![node(
            "get",
            NodeType::HttpRequest,
            json!({"url": url, "method": "GET", "timeout": 2000}),
        )],
        vec![],
    );

    let outcome = manager
        .execute_workflow(def, json!(null), None)
        .await
        .unwrap();
    assert_eq!(outcome.result["status"], json!(200));
    assert_eq!(outcome.result["statusText"], json!("OK"));
    assert_eq!(outcome.result["success"], json!(true));
    assert_eq!(outcome.result["data"], json!({"ok": true}));
}

#[tokio::test]
async fn http_request_times_out_with_explicit_message() {
    let url = spawn_silent_server().await;
    let manager = manager_with(Services::new());

    let def = definition(
        vec![node(
            "get",
            NodeType::HttpRequest,
            json!({"url": url, "timeout": 50}),
        )],
        vec![],
    );

    let started = Instant::now();
    let err = manager
        .execute_workflow(def, json!(null), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("timeout after 50ms"));
    assert!(started.elapsed() < Duration::from_millis(2000));
}

#[tokio::test]
async fn http_request_substitutes_url_templates() {
    let url = spawn_http_server(
        "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: 7\r\nConnection: close\r\n\r\nmissing",
    )
    .await;
    let manager = manager_with(Services::new());

    let def = definition(
        vec![
            node("in", NodeType::UserInput, json!({})),
            node(
                "get",
                NodeType::HttpRequest,
                json!({"url": format!("{}items/{{{{input.id}}}}", url), "timeout": 2000}),
            ),
        ],
        vec![edge("e1", "in", "get")],
    );

    let outcome = manager
        .execute_workflow(def, json!({"id": 42}), None)
        .await
        .unwrap();
    // Non-2xx responses are data, not errors.
    assert_eq!(outcome.result["status"], json!(404));
    assert_eq!(outcome.result["success"], json!(false));
    assert_eq!(outcome.result["data"], json!("missing"));
}

#[tokio::test]
async fn http_request_rejects_unknown_methods() {
    let manager = manager_with(Services::new());
    let def = definition(
        vec![node(
            "get",
            NodeType::HttpRequest,
            json!({"url": "http://127.0.0.1:1/", "method": "BREW"}),
        )],
        vec![],
    );

    let err = manager
        .execute_workflow(def, json!(null), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Unsupported method: BREW"));
}
