//! Leaf LLM agent - issues a single chat completion.

use async_trait::async_trait;

use crate::llm::ChatMessage;

use super::{
    clone_children, AgentConfig, AgentContext, AgentError, AgentKind, AgentOutput, AnyAgent,
    BaseAgent,
};

/// Agent backed directly by a chat model.
///
/// Sub-agents on a leaf are allowed (they act as transfer targets for
/// composites that own this agent) but the leaf itself never runs them.
#[derive(Debug, Clone)]
pub struct LlmAgent {
    config: AgentConfig,
    model: Option<String>,
    sub_agents: Vec<AnyAgent>,
    parent: Option<String>,
}

impl LlmAgent {
    pub fn new(config: AgentConfig) -> Self {
        Self {
            config,
            model: None,
            sub_agents: Vec::new(),
            parent: None,
        }
    }

    /// Pin this agent to a specific model instead of the configured default.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
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

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    /// Clone this agent under a new (or suffix-derived) name.
    pub fn clone_agent(&self, new_name: Option<&str>) -> Self {
        let config = self.config.for_clone(new_name);
        let sub_agents = clone_children(&self.sub_agents, &config.name);
        Self {
            config,
            model: self.model.clone(),
            sub_agents,
            parent: None,
        }
    }

    pub(crate) fn set_parent(&mut self, parent: &str) {
        self.parent = Some(parent.to_string());
    }

    /// System prompt assembled from the global and per-agent instructions.
    fn build_system_prompt(&self) -> String {
        let mut parts = Vec::new();
        if !self.config.global_instruction.is_empty() {
            parts.push(self.config.global_instruction.as_str());
        }
        if !self.config.instruction.is_empty() {
            parts.push(self.config.instruction.as_str());
        }
        parts.join("\n\n")
    }
}

#[async_trait]
impl BaseAgent for LlmAgent {
    fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn kind(&self) -> AgentKind {
        AgentKind::Llm
    }

    fn sub_agents(&self) -> &[AnyAgent] {
        &self.sub_agents
    }

    fn parent_agent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    async fn run(&self, prompt: &str, ctx: &AgentContext) -> Result<AgentOutput, AgentError> {
        let model = self.model.as_deref().unwrap_or(&ctx.config.default_model);
        tracing::debug!(agent = %self.name(), model, "running llm agent");

        let mut messages = Vec::with_capacity(2);
        let system_prompt = self.build_system_prompt();
        if !system_prompt.is_empty() {
            messages.push(ChatMessage::system(system_prompt));
        }
        messages.push(ChatMessage::user(prompt));

        let response = ctx
            .llm
            .chat_completion(model, &messages)
            .await
            .map_err(|source| AgentError::Llm {
                agent: self.name().to_string(),
                source,
            })?;

        match response.content {
            Some(text) if !text.is_empty() => Ok(AgentOutput {
                agent: self.name().to_string(),
                text,
            }),
            _ => Err(AgentError::EmptyResponse(self.name().to_string())),
        }
    }
}
