//! Sequential composite agent - runs its children in order.

use async_trait::async_trait;

use super::{
    clone_children, AgentConfig, AgentContext, AgentError, AgentKind, AgentOutput, AnyAgent,
    BaseAgent, IncludeContents,
};

/// Runs each sub-agent in order, feeding the previous child's output into
/// the next child's prompt. A child configured with
/// [`IncludeContents::None`] receives the original request instead.
#[derive(Debug, Clone)]
pub struct SequentialAgent {
    config: AgentConfig,
    sub_agents: Vec<AnyAgent>,
    parent: Option<String>,
}

impl SequentialAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            sub_agents: Vec::new(),
            parent: None,
        }
    }

    pub fn with_sub_agents(mut self, sub_agents: Vec<AnyAgent>) -> Self {
        self.sub_agents = sub_agents;
        let name = self.config.name.clone();
        for child in &mut self.sub_agents {
            child.set_parent(&name);
        }
        self
    }

    /// Clone this agent under a new (or suffix-derived) name.
    pub fn clone_agent(&self, new_name: Option<&str>) -> Self {
        let config = self.config.for_clone(new_name);
        let sub_agents = clone_children(&self.sub_agents, &config.name);
        Self {
            config,
            sub_agents,
            parent: None,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: &str) {
        self.parent = Some(parent.to_string());
    }
}

#[async_trait]
impl BaseAgent for SequentialAgent {
    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Sequential
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

        let mut current = prompt.to_string();
        for child in &self.sub_agents {
            let child_prompt = match child.include_contents() {
                IncludeContents::Default => current.as_str(),
                IncludeContents::None => prompt,
            };
            tracing::debug!(agent = %self.name(), child = %child.name(), "sequential step");
            let output = child.run(child_prompt, ctx).await?;
            current = output.text;
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
    use crate::llm::testing::ScriptedClient;

    fn test_ctx(llm: Arc<ScriptedClient>) -> AgentContext {
        AgentContext::new(
            Config::new("test-key".to_string(), "test-model".to_string()),
            llm,
        )
    }

    #[tokio::test]
    async fn threads_each_output_into_the_next_child() {
        let llm = Arc::new(ScriptedClient::new(["draft", "polished"]));
        let ctx = test_ctx(llm.clone());

        let agent = SequentialAgent::new(AgentConfig::new("pipeline")).with_sub_agents(vec![
            LlmAgent::new(AgentConfig::new("writer")).into(),
            LlmAgent::new(AgentConfig::new("editor")).into(),
        ]);

        let output = agent.run("topic", &ctx).await.expect("run");

        assert_eq!(output.agent, "pipeline");
        assert_eq!(output.text, "polished");
        assert_eq!(llm.prompts(), vec!["topic".to_string(), "draft".to_string()]);
    }

    #[tokio::test]
    async fn child_without_contents_sees_the_original_request() {
        let llm = Arc::new(ScriptedClient::new(["draft", "independent"]));
        let ctx = test_ctx(llm.clone());

        let agent = SequentialAgent::new(AgentConfig::new("pipeline")).with_sub_agents(vec![
            LlmAgent::new(AgentConfig::new("writer")).into(),
            LlmAgent::new(
                AgentConfig::new("isolated").with_include_contents(IncludeContents::None),
            )
            .into(),
        ]);

        agent.run("topic", &ctx).await.expect("run");

        assert_eq!(llm.prompts(), vec!["topic".to_string(), "topic".to_string()]);
    }

    #[tokio::test]
    async fn fails_without_children() {
        let ctx = AgentContext::new(
            Config::new("test-key".to_string(), "test-model".to_string()),
            Arc::new(crate::llm::testing::FailingClient),
        );

        let agent = SequentialAgent::new(AgentConfig::new("empty"));
        let err = agent.run("topic", &ctx).await.expect_err("should fail");

        assert!(matches!(err, AgentError::NoSubAgents(name) if name == "empty"));
    }
}
