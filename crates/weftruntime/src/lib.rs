//! Workflow execution runtime
//!
//! This crate provides the engine that runs a single workflow, the node
//! registry/factory, and the manager that tracks concurrently live runs.

mod engine;
mod manager;
mod registry;

pub use engine::WorkflowEngine;
pub use manager::{ExecutionManager, ExecutionOutcome, ManagerConfig};
pub use registry::{FactoryMetadata, NodeFactory, NodeRegistry};
