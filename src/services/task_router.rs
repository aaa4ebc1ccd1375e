//! Keyword-based question classification.
//!
//! Rules are evaluated in a fixed order: priority descending, then longer
//! keyword first, then keyword lexical order, then declaration order. The
//! first matching rule decides the category; no match yields
//! [`TaskCategory::Unknown`].

use crate::domain::errors::ConfigurationError;
use crate::domain::models::{Config, MatchMode, Question, RoutingRule, TaskCategory};

/// Outcome of classifying a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: TaskCategory,
    /// The rule that matched, if any.
    pub matched_rule: Option<RoutingRule>,
}

/// Immutable, ordered routing rule set.
#[derive(Debug, Clone)]
pub struct TaskRouter {
    rules: Vec<RoutingRule>,
    mode: MatchMode,
}

impl TaskRouter {
    /// Build a router from rules in declaration order.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::InvalidRoutingRule`] for an empty keyword
    /// or a keyword declared twice with different targets.
    pub fn new(rules: Vec<RoutingRule>, mode: MatchMode) -> Result<Self, ConfigurationError> {
        for (i, rule) in rules.iter().enumerate() {
            if rule.keyword.is_empty() {
                return Err(ConfigurationError::InvalidRoutingRule(
                    "keyword must not be empty".to_string(),
                ));
            }
            if let TaskCategory::Agent(name) = &rule.category {
                if name.is_empty() {
                    return Err(ConfigurationError::InvalidRoutingRule(format!(
                        "rule '{}' names an empty agent",
                        rule.keyword
                    )));
                }
            }
            let conflict = rules[..i]
                .iter()
                .find(|earlier| earlier.keyword == rule.keyword && earlier.category != rule.category);
            if let Some(earlier) = conflict {
                return Err(ConfigurationError::InvalidRoutingRule(format!(
                    "keyword '{}' maps to both '{}' and '{}'",
                    rule.keyword, earlier.category, rule.category
                )));
            }
        }

        // Stable sort keeps declaration order as the last tie-breaker.
        let mut rules = rules;
        rules.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| b.keyword.len().cmp(&a.keyword.len()))
                .then_with(|| a.keyword.cmp(&b.keyword))
        });

        Ok(Self { rules, mode })
    }

    /// Build the rule set from `task_routing` (priority 0) followed by the
    /// explicit `routing.rules` list.
    pub fn from_config(config: &Config) -> Result<Self, ConfigurationError> {
        let mapped = config
            .task_routing
            .iter()
            .map(|(keyword, target)| RoutingRule::new(keyword, TaskCategory::from_target(target), 0));
        let explicit = config.routing.rules.iter().map(|rule| {
            RoutingRule::new(&rule.keyword, TaskCategory::from_target(&rule.target), rule.priority)
        });

        Self::new(mapped.chain(explicit).collect(), config.routing.match_mode)
    }

    pub fn classify(&self, question: &Question) -> Classification {
        self.classify_text(&question.normalized_text())
    }

    /// Classify already lower-cased text.
    pub fn classify_text(&self, normalized_text: &str) -> Classification {
        match self.rules.iter().find(|r| r.matches(normalized_text, self.mode)) {
            Some(rule) => Classification {
                category: rule.category.clone(),
                matched_rule: Some(rule.clone()),
            },
            None => Classification {
                category: TaskCategory::Unknown,
                matched_rule: None,
            },
        }
    }

    /// Rules in evaluation order.
    pub fn rules(&self) -> &[RoutingRule] {
        &self.rules
    }

    pub const fn match_mode(&self) -> MatchMode {
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RoutingRuleConfig;

    fn router(rules: &[(&str, &str, i32)]) -> TaskRouter {
        TaskRouter::new(
            rules
                .iter()
                .map(|(k, t, p)| RoutingRule::new(k, TaskCategory::from_target(t), *p))
                .collect(),
            MatchMode::Substring,
        )
        .unwrap()
    }

    #[test]
    fn test_no_match_is_unknown() {
        let router = router(&[("how many", "text2sql", 0)]);
        let result = router.classify(&Question::new("Tell me a joke"));
        assert_eq!(result.category, TaskCategory::Unknown);
        assert!(result.matched_rule.is_none());
    }

    #[test]
    fn test_case_insensitive_match() {
        let router = router(&[("how many", "text2sql", 0)]);
        let result = router.classify(&Question::new("HOW MANY users are there?"));
        assert_eq!(result.category, TaskCategory::Agent("text2sql".into()));
    }

    #[test]
    fn test_priority_beats_length() {
        let router = router(&[("how many users", "query", 0), ("users", "database", 5)]);
        let result = router.classify_text("how many users are there?");
        assert_eq!(result.category, TaskCategory::Database);
    }

    #[test]
    fn test_longer_keyword_wins_at_equal_priority() {
        let router = router(&[("users", "database", 0), ("how many users", "query", 0)]);
        assert_eq!(router.classify_text("how many users?").category, TaskCategory::Query);
        assert_eq!(router.rules()[0].keyword, "how many users");
    }

    #[test]
    fn test_lexical_order_breaks_remaining_ties() {
        let router = router(&[("show", "database", 0), ("list", "query", 0)]);
        assert_eq!(router.classify_text("list and show").category, TaskCategory::Query);
    }

    #[test]
    fn test_whole_word_mode() {
        let router = TaskRouter::new(
            vec![RoutingRule::new("sql", TaskCategory::Sql, 0)],
            MatchMode::WholeWord,
        )
        .unwrap();
        assert_eq!(router.classify_text("is mysql up?").category, TaskCategory::Unknown);
        assert_eq!(router.classify_text("write some sql").category, TaskCategory::Sql);
    }

    #[test]
    fn test_invalid_rules() {
        let empty = TaskRouter::new(
            vec![RoutingRule::new("  ", TaskCategory::Sql, 0)],
            MatchMode::Substring,
        );
        assert!(matches!(empty, Err(ConfigurationError::InvalidRoutingRule(_))));

        let conflicting = TaskRouter::new(
            vec![
                RoutingRule::new("count", TaskCategory::Sql, 0),
                RoutingRule::new("COUNT", TaskCategory::Query, 3),
            ],
            MatchMode::Substring,
        );
        assert!(matches!(conflicting, Err(ConfigurationError::InvalidRoutingRule(_))));
    }

    #[test]
    fn test_from_config_merges_both_sources() {
        let mut config = Config::default();
        config.task_routing.insert("how many".into(), "text2sql".into());
        config.routing.rules.push(RoutingRuleConfig {
            keyword: "revenue".into(),
            target: "sql".into(),
            priority: 10,
        });

        let router = TaskRouter::from_config(&config).unwrap();
        assert_eq!(router.rules().len(), 2);
        assert_eq!(router.rules()[0].keyword, "revenue");
        assert_eq!(
            router.classify_text("how many orders?").category,
            TaskCategory::Agent("text2sql".into())
        );
    }
}
