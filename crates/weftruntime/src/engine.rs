use crate::registry::NodeRegistry;
use chrono::Utc;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::Instant;
use weftcore::condition;
use weftcore::value::resolve_path;
use weftcore::{
    EngineError, EventBus, ExecutionContext, ExecutionEvent, ExecutionId, ExecutionStatus,
    NodeError, Services, WorkflowDefinition, WorkflowEdge, WorkflowNode,
};

/// Executes a single workflow run.
///
/// Traversal is dependency-driven: a node runs once every incoming edge has
/// resolved, so fan-in nodes see all of their upstream results and a node is
/// executed at most once per run regardless of how many paths reach it.
/// Nodes within one run execute sequentially; concurrency across runs is the
/// manager's concern.
pub struct WorkflowEngine {
    definition: Arc<WorkflowDefinition>,
    registry: Arc<NodeRegistry>,
    event_bus: Arc<EventBus>,
    context: ExecutionContext,
    status: RwLock<ExecutionStatus>,
    node_results: RwLock<HashMap<String, Value>>,
    finished_at: RwLock<Option<Instant>>,
}

impl WorkflowEngine {
    pub fn new(
        definition: Arc<WorkflowDefinition>,
        registry: Arc<NodeRegistry>,
        event_bus: Arc<EventBus>,
        services: Services,
        user_id: Option<String>,
    ) -> Self {
        Self {
            definition,
            registry,
            event_bus,
            context: ExecutionContext::new(services, user_id),
            status: RwLock::new(ExecutionStatus::Pending),
            node_results: RwLock::new(HashMap::new()),
            finished_at: RwLock::new(None),
        }
    }

    pub fn execution_id(&self) -> ExecutionId {
        self.context.execution_id
    }

    pub fn definition(&self) -> &WorkflowDefinition {
        &self.definition
    }

    pub fn status(&self) -> ExecutionStatus {
        *self.status.read().expect("status lock poisoned")
    }

    /// Snapshot of the per-node results memoized so far. Observable while the
    /// run is still in flight.
    pub fn node_results(&self) -> HashMap<String, Value> {
        self.node_results
            .read()
            .expect("results lock poisoned")
            .clone()
    }

    pub(crate) fn finished_at(&self) -> Option<Instant> {
        *self.finished_at.read().expect("finished lock poisoned")
    }

    /// Request cancellation. Honored at the next node boundary and inside
    /// handlers that watch the token.
    pub fn cancel(&self) {
        self.context.cancellation.cancel();
    }

    /// Run the workflow to completion against `input` and return the
    /// aggregated terminal result.
    pub async fn execute(&self, input: Value) -> Result<Value, EngineError> {
        let started = Instant::now();
        self.set_status(ExecutionStatus::Running);

        for variable in &self.definition.variables {
            if let Some(default) = &variable.default_value {
                self.context.set_variable(&variable.name, default.clone());
            }
        }

        tracing::info!(
            execution_id = %self.execution_id(),
            workflow_id = %self.definition.workflow_id,
            "Starting workflow execution"
        );
        self.event_bus.emit(ExecutionEvent::RunStarted {
            execution_id: self.execution_id(),
            workflow_id: self.definition.workflow_id.clone(),
            timestamp: Utc::now(),
        });

        let outcome = self.run(&input).await;

        let status = match &outcome {
            Ok(_) => ExecutionStatus::Completed,
            Err(EngineError::Cancelled) => ExecutionStatus::Cancelled,
            Err(_) => ExecutionStatus::Failed,
        };
        self.set_status(status);
        *self.finished_at.write().expect("finished lock poisoned") = Some(Instant::now());

        let duration_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(_) => tracing::info!(
                execution_id = %self.execution_id(),
                duration_ms,
                "Workflow execution completed"
            ),
            Err(e) => tracing::error!(
                execution_id = %self.execution_id(),
                duration_ms,
                error = %e,
                "Workflow execution finished with {}", status
            ),
        }
        self.event_bus.emit(ExecutionEvent::RunFinished {
            execution_id: self.execution_id(),
            status,
            duration_ms,
            timestamp: Utc::now(),
        });

        outcome
    }

    async fn run(&self, run_input: &Value) -> Result<Value, EngineError> {
        // Resolution state for this run. An edge is resolved once its source
        // has completed (activity decided by routing) or been skipped
        // (inactive). node_results doubles as the completed set.
        let mut skipped: HashSet<String> = HashSet::new();
        let mut edge_active: HashMap<String, bool> = HashMap::new();

        loop {
            if self.context.cancellation.is_cancelled() {
                return Err(EngineError::Cancelled);
            }

            let marked = self.mark_skipped(&mut skipped, &mut edge_active);

            let ready: Vec<&WorkflowNode> = self
                .definition
                .nodes
                .iter()
                .filter(|n| !self.is_resolved(&n.id, &skipped))
                .filter(|n| self.is_ready(n, &skipped, &edge_active))
                .collect();

            if ready.is_empty() {
                if marked {
                    continue;
                }
                break;
            }

            for node in ready {
                if self.context.cancellation.is_cancelled() {
                    return Err(EngineError::Cancelled);
                }
                self.execute_node(node, run_input, &mut edge_active).await?;
            }
        }

        Ok(self.terminal_result(&edge_active))
    }

    fn set_status(&self, status: ExecutionStatus) {
        *self.status.write().expect("status lock poisoned") = status;
    }

    fn is_completed(&self, node_id: &str) -> bool {
        self.node_results
            .read()
            .expect("results lock poisoned")
            .contains_key(node_id)
    }

    fn is_resolved(&self, node_id: &str, skipped: &HashSet<String>) -> bool {
        skipped.contains(node_id) || self.is_completed(node_id)
    }

    /// A pending node is ready when every incoming edge is resolved and it
    /// either has no incoming edges (start node) or at least one active one.
    fn is_ready(
        &self,
        node: &WorkflowNode,
        skipped: &HashSet<String>,
        edge_active: &HashMap<String, bool>,
    ) -> bool {
        let incoming = self.definition.incoming_edges(&node.id);
        if incoming.is_empty() {
            return true;
        }
        let all_resolved = incoming
            .iter()
            .all(|e| self.is_resolved(&e.source, skipped));
        all_resolved
            && incoming
                .iter()
                .any(|e| edge_active.get(&e.id).copied().unwrap_or(false))
    }

    /// Mark nodes whose incoming edges all resolved inactive: they are not on
    /// any taken branch. Their outgoing edges resolve as inactive too, which
    /// may cascade further skips on the next pass.
    fn mark_skipped(
        &self,
        skipped: &mut HashSet<String>,
        edge_active: &mut HashMap<String, bool>,
    ) -> bool {
        let mut marked = false;
        for node in &self.definition.nodes {
            if self.is_resolved(&node.id, skipped) {
                continue;
            }
            let incoming = self.definition.incoming_edges(&node.id);
            if incoming.is_empty() {
                continue;
            }
            let all_resolved = incoming
                .iter()
                .all(|e| self.is_resolved(&e.source, skipped));
            let none_active = incoming
                .iter()
                .all(|e| !edge_active.get(&e.id).copied().unwrap_or(false));
            if all_resolved && none_active {
                tracing::debug!(node_id = %node.id, "Skipping node on pruned branch");
                skipped.insert(node.id.clone());
                for edge in self.definition.outgoing_edges(&node.id) {
                    edge_active.insert(edge.id.clone(), false);
                }
                self.event_bus.emit(ExecutionEvent::NodeSkipped {
                    execution_id: self.execution_id(),
                    node_id: node.id.clone(),
                    timestamp: Utc::now(),
                });
                marked = true;
            }
        }
        marked
    }

    async fn execute_node(
        &self,
        node: &WorkflowNode,
        run_input: &Value,
        edge_active: &mut HashMap<String, bool>,
    ) -> Result<(), EngineError> {
        let input = self.prepare_node_input(node, run_input, edge_active);
        let handler = self.registry.create_node(node)?;

        tracing::debug!(
            node_id = %node.id,
            node_type = %node.node_type,
            "Executing node"
        );
        self.event_bus.emit(ExecutionEvent::NodeStarted {
            execution_id: self.execution_id(),
            node_id: node.id.clone(),
            node_type: node.node_type.to_string(),
            timestamp: Utc::now(),
        });

        let started = Instant::now();
        let result = handler.execute(input, &self.context).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match result {
            Ok(value) => {
                tracing::info!(node_id = %node.id, duration_ms, "Node completed");
                self.event_bus.emit(ExecutionEvent::NodeCompleted {
                    execution_id: self.execution_id(),
                    node_id: node.id.clone(),
                    duration_ms,
                    timestamp: Utc::now(),
                });

                for edge in self.definition.outgoing_edges(&node.id) {
                    edge_active.insert(edge.id.clone(), follow_edge(edge, &value));
                }
                self.node_results
                    .write()
                    .expect("results lock poisoned")
                    .insert(node.id.clone(), value);
                Ok(())
            }
            Err(NodeError::Cancelled) => Err(EngineError::Cancelled),
            Err(e) => {
                tracing::error!(node_id = %node.id, error = %e, "Node execution failed");
                self.event_bus.emit(ExecutionEvent::NodeFailed {
                    execution_id: self.execution_id(),
                    node_id: node.id.clone(),
                    error: e.to_string(),
                    timestamp: Utc::now(),
                });
                Err(EngineError::Node {
                    node_id: node.id.clone(),
                    source: e,
                })
            }
        }
    }

    /// Start nodes receive the run's top-level input. Every other node gets
    /// its active upstream results in edge declaration order, unwrapped to a
    /// single value when only one edge delivered.
    fn prepare_node_input(
        &self,
        node: &WorkflowNode,
        run_input: &Value,
        edge_active: &HashMap<String, bool>,
    ) -> Value {
        let incoming = self.definition.incoming_edges(&node.id);
        if incoming.is_empty() {
            return run_input.clone();
        }
        let results = self.node_results.read().expect("results lock poisoned");
        let mut inputs: Vec<Value> = incoming
            .iter()
            .filter(|e| edge_active.get(&e.id).copied().unwrap_or(false))
            .filter_map(|e| results.get(&e.source).cloned())
            .collect();
        if inputs.len() == 1 {
            inputs.pop().expect("length checked")
        } else {
            Value::Array(inputs)
        }
    }

    /// Aggregate of the terminal nodes: completed nodes with no active
    /// outgoing edge, in declaration order. Empty runs produce an empty
    /// array.
    fn terminal_result(&self, edge_active: &HashMap<String, bool>) -> Value {
        let results = self.node_results.read().expect("results lock poisoned");
        let mut finals: Vec<Value> = self
            .definition
            .nodes
            .iter()
            .filter(|n| results.contains_key(&n.id))
            .filter(|n| {
                self.definition
                    .outgoing_edges(&n.id)
                    .iter()
                    .all(|e| !edge_active.get(&e.id).copied().unwrap_or(false))
            })
            .map(|n| results[&n.id].clone())
            .collect();
        if finals.len() == 1 {
            finals.pop().expect("length checked")
        } else {
            Value::Array(finals)
        }
    }
}

/// Downstream routing policy: a plain edge is always followed. An edge with a
/// source handle is followed only when the source result's `outputPort`
/// matches (conditional true/false branching). An edge carrying a condition
/// rule is followed only when the rule holds against the source result.
fn follow_edge(edge: &WorkflowEdge, result: &Value) -> bool {
    if let Some(handle) = &edge.source_handle {
        if let Some(port) = result.get("outputPort").and_then(Value::as_str) {
            if handle != port {
                return false;
            }
        }
    }
    if let Some(rule) = edge.data.as_ref().and_then(|d| d.condition.as_ref()) {
        let field_value = resolve_path(result, &rule.field);
        return condition::evaluate(field_value, rule.operator, &rule.value);
    }
    true
}
