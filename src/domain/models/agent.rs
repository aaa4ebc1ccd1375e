//! Agent capability descriptors.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::category::TaskCategory;
use crate::domain::ports::Agent;

/// What an agent says about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentCapabilities {
    pub name: String,
    pub description: String,
    pub categories: Vec<TaskCategory>,
    pub input_format: String,
    pub output_format: String,
}

/// Registry entry for one agent.
///
/// Built once during start-up and never modified after the registry is frozen.
#[derive(Clone)]
pub struct AgentDescriptor {
    pub name: String,
    pub description: String,
    /// Categories the agent accepts, in addition to its own `agent:<name>`.
    pub categories: BTreeSet<TaskCategory>,
    /// Higher wins when several agents accept a category.
    pub priority: u32,
    pub handle: Arc<dyn Agent>,
}

impl AgentDescriptor {
    /// Describe `handle` from its capabilities with the given priority.
    pub fn from_agent(handle: Arc<dyn Agent>, priority: u32) -> Self {
        let capabilities = handle.capabilities();
        Self {
            name: capabilities.name,
            description: capabilities.description,
            categories: capabilities.categories.into_iter().collect(),
            priority,
            handle,
        }
    }

    pub fn accepts(&self, category: &TaskCategory) -> bool {
        match category {
            TaskCategory::Agent(name) if *name == self.name => true,
            other => self.categories.contains(other),
        }
    }

    pub fn info(&self) -> AgentInfo {
        AgentInfo {
            name: self.name.clone(),
            description: self.description.clone(),
            categories: self.categories.iter().cloned().collect(),
            priority: self.priority,
        }
    }
}

impl fmt::Debug for AgentDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentDescriptor")
            .field("name", &self.name)
            .field("categories", &self.categories)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Serializable view of a descriptor, without the handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
    pub categories: Vec<TaskCategory>,
    pub priority: u32,
}
