//! Loop composite agent - repeats its children up to an iteration cap.

use async_trait::async_trait;

use super::{
    clone_children, AgentConfig, AgentContext, AgentError, AgentKind, AgentOutput, AnyAgent,
    BaseAgent, IncludeContents,
};

/// Runs its sub-agents in order, repeatedly, threading output forward
/// between steps and across iterations. Stops after `max_iterations`
/// passes (falling back to the configured default when unset).
#[derive(Debug, Clone)]
pub struct LoopAgent {
    config: AgentConfig,
    max_iterations: Option<u32>,
    sub_agents: Vec<AnyAgent>,
    parent: Option<String>,
}

impl LoopAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            max_iterations: None,
            sub_agents: Vec::new(),
            parent: None,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    pub fn with_sub_agents(mut self, sub_agents: Vec<AnyAgent>) -> Self {
        self.sub_agents = sub_agents;
        let name = self.config.name.clone();
        for child in &mut self.sub_agents {
            child.set_parent(&name);
        }
        self
    }

    pub fn max_iterations(&self) -> Option<u32> {
        self.max_iterations
    }

    /// Clone this agent under a new (or suffix-derived) name.
    pub fn clone_agent(&self, new_name: Option<&str>) -> Self {
        let config = self.config.for_clone(new_name);
        let sub_agents = clone_children(&self.sub_agents, &config.name);
        Self {
            config,
            max_iterations: self.max_iterations,
            sub_agents,
            parent: None,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: &str) {
        self.parent = Some(parent.to_string());
    }
}

#[async_trait]
impl BaseAgent for LoopAgent {
    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Loop
    }

    fn sub_agents(&self) -> &[AnyAgent] {
        &self.sub_agents
    }

    fn parent_agent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    async fn run(&self, prompt: &str, ctx: &AgentContext) -> Result<AgentOutput, AgentError> {
        if self.sub_agents.is_empty() {
            return Err(AgentError::NoSubAgents(self.name().to_string()));
        }

        let max_iterations = self
            .max_iterations
            .unwrap_or(ctx.config.max_iterations)
            .max(1);

        let mut current = prompt.to_string();
        for iteration in 0..max_iterations {
            tracing::debug!(
                agent = %self.name(),
                iteration = iteration + 1,
                max_iterations,
                "loop iteration"
            );
            for child in &self.sub_agents {
                let child_prompt = match child.include_contents() {
                    IncludeContents::Default => current.as_str(),
                    IncludeContents::None => prompt,
                };
                let output = child.run(child_prompt, ctx).await?;
                current = output.text;
            }
        }

        Ok(AgentOutput {
            agent: self.name().to_string(),
            text: current,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agents::LlmAgent;
    use crate::config::Config;
    use crate::llm::testing::{FailingClient, ScriptedClient};

    fn test_ctx(llm: Arc<ScriptedClient>) -> AgentContext {
        AgentContext::new(
            Config::new("test-key".to_string(), "test-model".to_string()),
            llm,
        )
    }

    #[tokio::test]
    async fn repeats_children_up_to_max_iterations() {
        let llm = Arc::new(ScriptedClient::new(["v1", "v2", "v3"]));
        let ctx = test_ctx(llm.clone());

        let agent = LoopAgent::new(AgentConfig::new("refiner"))
            .with_max_iterations(3)
            .with_sub_agents(vec![LlmAgent::new(AgentConfig::new("improve")).into()]);

        let output = agent.run("seed", &ctx).await.expect("run");

        assert_eq!(output.text, "v3");
        assert_eq!(
            llm.prompts(),
            vec!["seed".to_string(), "v1".to_string(), "v2".to_string()]
        );
    }

    #[tokio::test]
    async fn falls_back_to_configured_iteration_cap() {
        let llm = Arc::new(ScriptedClient::new(["a", "b"]));
        let mut config = Config::new("test-key".to_string(), "test-model".to_string());
        config.max_iterations = 2;
        let ctx = AgentContext::new(config, llm.clone());

        let agent = LoopAgent::new(AgentConfig::new("refiner"))
            .with_sub_agents(vec![LlmAgent::new(AgentConfig::new("improve")).into()]);

        let output = agent.run("seed", &ctx).await.expect("run");

        assert_eq!(output.text, "b");
        assert_eq!(llm.prompts().len(), 2);
    }

    #[tokio::test]
    async fn fails_without_children() {
        let ctx = AgentContext::new(
            Config::new("test-key".to_string(), "test-model".to_string()),
            Arc::new(FailingClient),
        );

        let agent = LoopAgent::new(AgentConfig::new("empty"));
        let err = agent.run("seed", &ctx).await.expect_err("should fail");

        assert!(matches!(err, AgentError::NoSubAgents(name) if name == "empty"));
    }
}
