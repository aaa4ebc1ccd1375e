//! LLM gateway adapters.

pub mod anthropic;
pub mod mock;

pub use anthropic::{AnthropicConfig, AnthropicGateway};
pub use mock::MockGateway;
