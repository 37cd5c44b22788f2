//! Parallel composite agent - fans its children out concurrently.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Semaphore;

use super::{
    clone_children, AgentConfig, AgentContext, AgentError, AgentKind, AgentOutput, AnyAgent,
    BaseAgent,
};

/// Runs every sub-agent concurrently against the same prompt, bounded by
/// the configured parallelism. Outputs are joined in child order, so the
/// result is deterministic regardless of completion order.
#[derive(Debug, Clone)]
pub struct ParallelAgent {
    config: AgentConfig,
    sub_agents: Vec<AnyAgent>,
    parent: Option<String>,
}

impl ParallelAgent {
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
impl BaseAgent for ParallelAgent {
    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Parallel
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

        let semaphore = Arc::new(Semaphore::new(ctx.config.max_parallelism));
        tracing::debug!(
            agent = %self.name(),
            children = self.sub_agents.len(),
            parallelism = ctx.config.max_parallelism,
            "parallel fan-out"
        );

        let runs = self.sub_agents.iter().map(|child| {
            let semaphore = Arc::clone(&semaphore);
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore closed");
                child.run(prompt, ctx).await
            }
        });

        let results = futures::future::join_all(runs).await;
        let mut parts = Vec::with_capacity(results.len());
        for result in results {
            parts.push(result?.text);
        }

        Ok(AgentOutput {
            agent: self.name().to_string(),
            text: parts.join("\n\n"),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::agents::LlmAgent;
    use crate::config::Config;
    use crate::llm::testing::ScriptedClient;
    use crate::llm::{ChatMessage, ChatResponse, LlmClient};

    fn test_ctx(llm: Arc<dyn LlmClient>) -> AgentContext {
        AgentContext::new(
            Config::new("test-key".to_string(), "test-model".to_string()),
            llm,
        )
    }

    #[tokio::test]
    async fn joins_outputs_in_child_order() {
        let llm = Arc::new(ScriptedClient::new(["one", "two", "three"]));
        let ctx = test_ctx(llm);

        let agent = ParallelAgent::new(AgentConfig::new("fanout")).with_sub_agents(vec![
            LlmAgent::new(AgentConfig::new("a")).into(),
            LlmAgent::new(AgentConfig::new("b")).into(),
            LlmAgent::new(AgentConfig::new("c")).into(),
        ]);

        let output = agent.run("same prompt", &ctx).await.expect("run");

        assert_eq!(output.text, "one\n\ntwo\n\nthree");
    }

    /// Records the highest number of in-flight calls it ever saw.
    struct ConcurrencyProbe {
        current: AtomicUsize,
        peak: Mutex<usize>,
    }

    #[async_trait]
    impl LlmClient for ConcurrencyProbe {
        async fn chat_completion(
            &self,
            _model: &str,
            _messages: &[ChatMessage],
        ) -> anyhow::Result<ChatResponse> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            {
                let mut peak = self.peak.lock().unwrap();
                if now > *peak {
                    *peak = now;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(ChatResponse {
                content: Some("ok".to_string()),
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn respects_the_parallelism_bound() {
        let probe = Arc::new(ConcurrencyProbe {
            current: AtomicUsize::new(0),
            peak: Mutex::new(0),
        });
        let mut config = Config::new("test-key".to_string(), "test-model".to_string());
        config.max_parallelism = 2;
        let ctx = AgentContext::new(config, probe.clone());

        let children = (0..6)
            .map(|i| LlmAgent::new(AgentConfig::new(format!("child{}", i))).into())
            .collect();
        let agent = ParallelAgent::new(AgentConfig::new("bounded")).with_sub_agents(children);

        agent.run("go", &ctx).await.expect("run");

        assert!(*probe.peak.lock().unwrap() <= 2);
    }

    #[tokio::test]
    async fn fails_without_children() {
        let ctx = test_ctx(Arc::new(crate::llm::testing::FailingClient));

        let agent = ParallelAgent::new(AgentConfig::new("empty"));
        let err = agent.run("go", &ctx).await.expect_err("should fail");

        assert!(matches!(err, AgentError::NoSubAgents(name) if name == "empty"));
    }
}
