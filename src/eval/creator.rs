//! Agent creation for eval runs.

use crate::agents::AnyAgent;

/// Creates an agent for the purposes of eval.
///
/// Eval runs must never mutate or alias the application's live agent, so
/// they go through a creator instead of borrowing the root directly.
pub trait AgentCreator: Send + Sync {
    /// Returns an agent instance to be used for an eval run.
    fn create_agent(&self) -> AnyAgent;
}

/// An [`AgentCreator`] that always returns a copy of a fixed root agent.
pub struct IdentityAgentCreator {
    root_agent: AnyAgent,
}

impl IdentityAgentCreator {
    pub fn new(root_agent: AnyAgent) -> Self {
        Self { root_agent }
    }
}

impl AgentCreator for IdentityAgentCreator {
    /// Returns an independent deep copy of the root agent, names intact.
    fn create_agent(&self) -> AnyAgent {
        self.root_agent.clone()
    }
}
