//! Agent registry.
//!
//! Agents are registered through [`AgentRegistryBuilder`] during start-up.
//! [`AgentRegistryBuilder::build`] freezes the set into an [`AgentRegistry`]
//! that has no mutation API and is shared through `Arc`.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use crate::domain::errors::ConfigurationError;
use crate::domain::models::{AgentDescriptor, TaskCategory};
use crate::domain::ports::Agent;

/// Collects agent descriptors before the registry is frozen.
#[derive(Debug, Default)]
pub struct AgentRegistryBuilder {
    agents: Vec<AgentDescriptor>,
}

impl AgentRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a descriptor.
    ///
    /// # Errors
    /// Returns a [`ConfigurationError`] for an empty or duplicate name, or a
    /// descriptor that accepts no categories.
    pub fn register(&mut self, descriptor: AgentDescriptor) -> Result<&mut Self, ConfigurationError> {
        let name = descriptor.name.trim();
        if name.is_empty() {
            return Err(ConfigurationError::InvalidAgent {
                name: descriptor.name.clone(),
                reason: "agent name must not be empty".to_string(),
            });
        }
        if descriptor.categories.is_empty() {
            return Err(ConfigurationError::InvalidAgent {
                name: descriptor.name.clone(),
                reason: "agent must accept at least one task category".to_string(),
            });
        }
        if self.agents.iter().any(|a| a.name == descriptor.name) {
            return Err(ConfigurationError::DuplicateAgent(descriptor.name));
        }

        debug!(
            agent = %descriptor.name,
            priority = descriptor.priority,
            categories = ?descriptor.categories,
            "Registered agent"
        );
        self.agents.push(descriptor);
        Ok(self)
    }

    /// Register an agent described by its own capabilities.
    pub fn register_agent(
        &mut self,
        agent: Arc<dyn Agent>,
        priority: u32,
    ) -> Result<&mut Self, ConfigurationError> {
        self.register(AgentDescriptor::from_agent(agent, priority))
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Freeze the registry.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::EmptyRegistry`] when nothing was registered.
    pub fn build(self) -> Result<AgentRegistry, ConfigurationError> {
        if self.agents.is_empty() {
            return Err(ConfigurationError::EmptyRegistry);
        }

        let mut agents = self.agents;
        agents.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.name.cmp(&b.name)));
        Ok(AgentRegistry { agents })
    }
}

/// Immutable set of registered agents, kept in priority order.
#[derive(Debug)]
pub struct AgentRegistry {
    agents: Vec<AgentDescriptor>,
}

impl AgentRegistry {
    pub fn builder() -> AgentRegistryBuilder {
        AgentRegistryBuilder::new()
    }

    /// Agents accepting `category`, highest priority first, ties by name.
    pub fn resolve(&self, category: &TaskCategory) -> Vec<&AgentDescriptor> {
        self.agents.iter().filter(|a| a.accepts(category)).collect()
    }

    /// The agent that would handle `category`.
    pub fn select(&self, category: &TaskCategory) -> Option<&AgentDescriptor> {
        self.agents.iter().find(|a| a.accepts(category))
    }

    /// All agents in priority order.
    pub fn all(&self) -> &[AgentDescriptor] {
        &self.agents
    }

    pub fn get(&self, name: &str) -> Option<&AgentDescriptor> {
        self.agents.iter().find(|a| a.name == name)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Categories accepted by at least one agent.
    pub fn categories(&self) -> HashSet<TaskCategory> {
        self.agents
            .iter()
            .flat_map(|a| {
                a.categories
                    .iter()
                    .cloned()
                    .chain(std::iter::once(TaskCategory::Agent(a.name.clone())))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use async_trait::async_trait;

    use super::*;
    use crate::domain::models::{AgentCapabilities, AgentResponse, Question};

    struct StubAgent;

    #[async_trait]
    impl Agent for StubAgent {
        fn name(&self) -> &str {
            "stub"
        }

        fn capabilities(&self) -> AgentCapabilities {
            AgentCapabilities {
                name: "stub".into(),
                description: "stub agent".into(),
                categories: vec![TaskCategory::Sql],
                input_format: "text".into(),
                output_format: "text".into(),
            }
        }

        async fn run(&self, _question: &Question) -> AgentResponse {
            AgentResponse::unrouted("stub")
        }

        async fn health_check(&self) -> bool {
            true
        }
    }

    fn descriptor(name: &str, priority: u32, categories: &[TaskCategory]) -> AgentDescriptor {
        AgentDescriptor {
            name: name.to_string(),
            description: String::new(),
            categories: categories.iter().cloned().collect::<BTreeSet<_>>(),
            priority,
            handle: Arc::new(StubAgent),
        }
    }

    #[test]
    fn test_empty_registry_is_rejected() {
        let err = AgentRegistry::builder().build().unwrap_err();
        assert_eq!(err, ConfigurationError::EmptyRegistry);
    }

    #[test]
    fn test_duplicate_and_invalid_descriptors() {
        let mut builder = AgentRegistry::builder();
        builder.register(descriptor("a", 1, &[TaskCategory::Sql])).unwrap();

        let dup = builder.register(descriptor("a", 2, &[TaskCategory::Query])).unwrap_err();
        assert_eq!(dup, ConfigurationError::DuplicateAgent("a".into()));

        let empty_name = builder.register(descriptor("  ", 1, &[TaskCategory::Sql])).unwrap_err();
        assert!(matches!(empty_name, ConfigurationError::InvalidAgent { .. }));

        let no_categories = builder.register(descriptor("b", 1, &[])).unwrap_err();
        assert!(matches!(no_categories, ConfigurationError::InvalidAgent { .. }));
    }

    #[test]
    fn test_resolve_orders_by_priority_then_name() {
        let mut builder = AgentRegistry::builder();
        builder
            .register(descriptor("zeta", 10, &[TaskCategory::Sql]))
            .unwrap()
            .register(descriptor("alpha", 10, &[TaskCategory::Sql]))
            .unwrap()
            .register(descriptor("top", 50, &[TaskCategory::Sql, TaskCategory::Query]))
            .unwrap()
            .register(descriptor("other", 99, &[TaskCategory::Database]))
            .unwrap();
        let registry = builder.build().unwrap();

        let names: Vec<_> = registry
            .resolve(&TaskCategory::Sql)
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        assert_eq!(names, vec!["top", "alpha", "zeta"]);
        assert_eq!(registry.select(&TaskCategory::Query).map(|a| a.name.as_str()), Some("top"));
        assert!(registry.resolve(&TaskCategory::Unknown).is_empty());
    }

    #[test]
    fn test_agent_category_addresses_one_agent() {
        let mut builder = AgentRegistry::builder();
        builder
            .register(descriptor("text2sql", 1, &[TaskCategory::Sql]))
            .unwrap()
            .register(descriptor("reporter", 99, &[TaskCategory::Sql]))
            .unwrap();
        let registry = builder.build().unwrap();

        let resolved = registry.resolve(&TaskCategory::Agent("text2sql".into()));
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].name, "text2sql");
        assert!(registry.resolve(&TaskCategory::Agent("missing".into())).is_empty());
        assert!(registry.categories().contains(&TaskCategory::Agent("reporter".into())));
    }

    #[test]
    fn test_register_agent_uses_capabilities() {
        let mut builder = AgentRegistry::builder();
        builder.register_agent(Arc::new(StubAgent), 7).unwrap();
        let registry = builder.build().unwrap();

        let stub = registry.get("stub").unwrap();
        assert_eq!(stub.priority, 7);
        assert!(stub.accepts(&TaskCategory::Sql));
    }
}
