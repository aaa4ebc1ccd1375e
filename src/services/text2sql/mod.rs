//! Text2SQL agent: question -> validated SQL -> result -> answer.

pub mod agent;
pub mod formatter;
pub mod pipeline;
pub mod prompts;

pub use agent::{Text2SqlAgent, TEXT2SQL_AGENT_NAME};
pub use formatter::AnswerFormatter;
pub use pipeline::{
    Answer, PipelineOutcome, PipelineRun, PipelineSettings, PipelineState, Text2SqlPipeline,
};
