use crate::engine::WorkflowEngine;
use crate::registry::NodeRegistry;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use weftcore::{
    EngineError, EventBus, ExecutionEvent, ExecutionId, Services, WorkflowDefinition,
};

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub execution_id: ExecutionId,
    pub result: Value,
}

/// Configuration for the execution manager.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// How long finished runs stay observable before the sweep evicts them.
    pub retain_finished: Duration,
    pub event_buffer_size: usize,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            retain_finished: Duration::from_secs(300),
            event_buffer_size: 1000,
        }
    }
}

/// Owns the registry of concurrently live engine instances keyed by
/// execution id. Runs are independent; each engine has its own context and
/// result memo.
pub struct ExecutionManager {
    registry: Arc<NodeRegistry>,
    services: Services,
    event_bus: Arc<EventBus>,
    executions: RwLock<HashMap<ExecutionId, Arc<WorkflowEngine>>>,
    config: ManagerConfig,
}

impl ExecutionManager {
    pub fn new(registry: Arc<NodeRegistry>, services: Services) -> Self {
        Self::with_config(registry, services, ManagerConfig::default())
    }

    pub fn with_config(
        registry: Arc<NodeRegistry>,
        services: Services,
        config: ManagerConfig,
    ) -> Self {
        Self {
            registry,
            services,
            event_bus: Arc::new(EventBus::new(config.event_buffer_size)),
            executions: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn registry(&self) -> &Arc<NodeRegistry> {
        &self.registry
    }

    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<ExecutionEvent> {
        self.event_bus.subscribe()
    }

    /// Validate the definition, register a fresh engine, and run it to
    /// completion. The engine is registered before the run starts so
    /// `get_execution` observes in-flight runs.
    pub async fn execute_workflow(
        &self,
        definition: WorkflowDefinition,
        input: Value,
        user_id: Option<String>,
    ) -> Result<ExecutionOutcome, EngineError> {
        definition.validate()?;

        let engine = Arc::new(WorkflowEngine::new(
            Arc::new(definition),
            Arc::clone(&self.registry),
            Arc::clone(&self.event_bus),
            self.services.clone(),
            user_id,
        ));
        let execution_id = engine.execution_id();

        self.sweep();
        self.executions
            .write()
            .expect("executions lock poisoned")
            .insert(execution_id, Arc::clone(&engine));

        let result = engine.execute(input).await?;

        Ok(ExecutionOutcome {
            execution_id,
            result,
        })
    }

    /// Look up a live or recently finished run.
    pub fn get_execution(&self, execution_id: ExecutionId) -> Option<Arc<WorkflowEngine>> {
        self.executions
            .read()
            .expect("executions lock poisoned")
            .get(&execution_id)
            .cloned()
    }

    /// Request cancellation of a run. Returns false when the id is unknown.
    /// The engine observes the token at its next node boundary.
    pub fn cancel_execution(&self, execution_id: ExecutionId) -> bool {
        match self.get_execution(execution_id) {
            Some(engine) => {
                tracing::info!(%execution_id, "Cancelling execution");
                engine.cancel();
                true
            }
            None => false,
        }
    }

    /// Drop a run from the registry. Returns false when the id is unknown.
    pub fn remove_execution(&self, execution_id: ExecutionId) -> bool {
        self.executions
            .write()
            .expect("executions lock poisoned")
            .remove(&execution_id)
            .is_some()
    }

    pub fn execution_count(&self) -> usize {
        self.executions
            .read()
            .expect("executions lock poisoned")
            .len()
    }

    /// Evict finished runs past their retention window. Called on every new
    /// run so the registry cannot grow without bound in a long-lived process.
    fn sweep(&self) {
        let retain = self.config.retain_finished;
        let mut executions = self.executions.write().expect("executions lock poisoned");
        executions.retain(|id, engine| {
            let expired = engine
                .finished_at()
                .map(|at| at.elapsed() > retain)
                .unwrap_or(false);
            if expired {
                tracing::debug!(execution_id = %id, "Evicting finished execution");
            }
            !expired
        });
    }
}
