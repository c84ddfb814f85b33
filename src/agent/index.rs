use std::collections::HashMap;

use super::Agent;
use crate::domain::LlmError;

/// Named agents with an optional default
#[derive(Debug, Clone, Default)]
pub struct AgentIndex {
    agents: HashMap<String, Agent>,
    default: Option<String>,
}

impl AgentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an agent
    pub fn add(&mut self, name: impl Into<String>, agent: Agent, is_default: bool) {
        let name = name.into();
        if is_default {
            self.default = Some(name.clone());
        }
        self.agents.insert(name, agent);
    }

    /// Remove an agent; removing the default leaves the index without one
    pub fn remove(&mut self, name: &str) -> Result<Agent, LlmError> {
        let agent = self.agents.remove(name).ok_or_else(|| not_found(name))?;

        if self.default.as_deref() == Some(name) {
            self.default = None;
        }

        Ok(agent)
    }

    pub fn set_default(&mut self, name: &str) -> Result<(), LlmError> {
        if !self.agents.contains_key(name) {
            return Err(not_found(name));
        }

        self.default = Some(name.to_string());
        Ok(())
    }

    pub fn default_agent(&self) -> Option<&Agent> {
        self.default.as_ref().and_then(|name| self.agents.get(name))
    }

    pub fn get(&self, name: &str) -> Option<&Agent> {
        self.agents.get(name)
    }

    /// The agents for `names`, in order; unknown names are skipped
    pub fn find<S: AsRef<str>>(&self, names: &[S]) -> Vec<&Agent> {
        names
            .iter()
            .filter_map(|name| self.agents.get(name.as_ref()))
            .collect()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

fn not_found(name: &str) -> LlmError {
    LlmError::configuration(format!("Agent '{}' not found in the index", name))
}
