//! Built-in node handlers
//!
//! The seven node kinds with built-in handlers; every other declared kind
//! must be registered explicitly through the registry.

mod agent;
mod conditional;
mod http;
mod input;
mod interpolate;
mod rag;
mod response;
mod template;

pub use agent::LlmAgentNode;
pub use conditional::ConditionalNode;
pub use http::HttpRequestNode;
pub use input::UserInputNode;
pub use rag::RagSearchNode;
pub use response::ResponseNode;
pub use template::PromptTemplateNode;

use std::sync::Arc;
use weftruntime::NodeRegistry;

/// Register all built-in node kinds with a registry.
pub fn register_builtin(registry: &mut NodeRegistry) {
    registry.register(Arc::new(input::UserInputNodeFactory));
    registry.register(Arc::new(agent::LlmAgentNodeFactory));
    registry.register(Arc::new(rag::RagSearchNodeFactory));
    registry.register(Arc::new(template::PromptTemplateNodeFactory));
    registry.register(Arc::new(conditional::ConditionalNodeFactory));
    registry.register(Arc::new(http::HttpRequestNodeFactory));
    registry.register(Arc::new(response::ResponseNodeFactory));
}
