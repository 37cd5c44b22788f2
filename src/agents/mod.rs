//! Hierarchical agent runtime.
//!
//! Agents come in four variants: a leaf [`LlmAgent`] that issues a single
//! chat completion, and three composites ([`SequentialAgent`],
//! [`ParallelAgent`], [`LoopAgent`]) that coordinate an ordered list of
//! sub-agents. All variants share the same scalar configuration
//! ([`AgentConfig`]) and support cloning under a new name: scalars are
//! copied verbatim, the parent link is severed, and children are rebuilt
//! as clones re-parented to the new agent.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::Config;
use crate::llm::LlmClient;

mod leaf;
mod loop_agent;
mod parallel;
mod sequential;

pub use leaf::LlmAgent;
pub use loop_agent::LoopAgent;
pub use parallel::ParallelAgent;
pub use sequential::SequentialAgent;

/// Suffix appended when a clone is not given an explicit name.
const CLONE_NAME_SUFFIX: &str = "_clone";

/// How much of the surrounding conversation an agent receives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncludeContents {
    /// The agent sees the output threaded to it by its parent.
    #[default]
    Default,
    /// The agent only ever sees the original request.
    None,
}

/// Concrete agent variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Llm,
    Sequential,
    Parallel,
    Loop,
}

/// Scalar configuration shared by every agent variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Agent identifier, fixed at construction or clone time.
    pub name: String,
    pub description: String,
    pub instruction: String,
    pub global_instruction: String,
    pub disallow_transfer_to_parent: bool,
    pub disallow_transfer_to_peers: bool,
    pub include_contents: IncludeContents,
}

impl AgentConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            instruction: String::new(),
            global_instruction: String::new(),
            disallow_transfer_to_parent: false,
            disallow_transfer_to_peers: false,
            include_contents: IncludeContents::Default,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = instruction.into();
        self
    }

    pub fn with_global_instruction(mut self, global_instruction: impl Into<String>) -> Self {
        self.global_instruction = global_instruction.into();
        self
    }

    pub fn with_disallow_transfer_to_parent(mut self, disallow: bool) -> Self {
        self.disallow_transfer_to_parent = disallow;
        self
    }

    pub fn with_disallow_transfer_to_peers(mut self, disallow: bool) -> Self {
        self.disallow_transfer_to_peers = disallow;
        self
    }

    pub fn with_include_contents(mut self, include_contents: IncludeContents) -> Self {
        self.include_contents = include_contents;
        self
    }

    /// Configuration for a clone: same scalars, explicit or suffixed name.
    fn for_clone(&self, new_name: Option<&str>) -> Self {
        let name = new_name
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}{}", self.name, CLONE_NAME_SUFFIX));
        Self {
            name,
            ..self.clone()
        }
    }
}

/// Shared execution context passed to every agent.
#[derive(Clone)]
pub struct AgentContext {
    pub config: Config,
    pub llm: Arc<dyn LlmClient>,
}

impl AgentContext {
    pub fn new(config: Config, llm: Arc<dyn LlmClient>) -> Self {
        Self { config, llm }
    }
}

/// Final output of an agent run.
#[derive(Debug, Clone, Serialize)]
pub struct AgentOutput {
    /// Name of the agent that produced the text.
    pub agent: String,
    /// Response text.
    pub text: String,
}

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("LLM request failed for agent `{agent}`: {source}")]
    Llm {
        agent: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("agent `{0}` returned an empty response")]
    EmptyResponse(String),

    #[error("agent `{0}` has no sub-agents to run")]
    NoSubAgents(String),
}

/// Behavior common to every agent variant.
#[async_trait]
pub trait BaseAgent: Send + Sync {
    fn config(&self) -> &AgentConfig;
    fn kind(&self) -> AgentKind;
    fn sub_agents(&self) -> &[AnyAgent];
    /// Name of the composite that owns this agent, if any.
    fn parent_agent(&self) -> Option<&str>;

    fn name(&self) -> &str {
        &self.config().name
    }

    fn description(&self) -> &str {
        &self.config().description
    }

    fn instruction(&self) -> &str {
        &self.config().instruction
    }

    fn global_instruction(&self) -> &str {
        &self.config().global_instruction
    }

    fn include_contents(&self) -> IncludeContents {
        self.config().include_contents
    }

    /// Run the agent against a prompt.
    async fn run(&self, prompt: &str, ctx: &AgentContext) -> Result<AgentOutput, AgentError>;
}

/// An agent of any variant, owned as a value in the agent tree.
#[derive(Debug, Clone)]
pub enum AnyAgent {
    Llm(LlmAgent),
    Sequential(SequentialAgent),
    Parallel(ParallelAgent),
    Loop(LoopAgent),
}

impl AnyAgent {
    /// Clone this agent (and, recursively, its children) under a new name.
    ///
    /// Without an explicit name the clone is named `<original>_clone`;
    /// repeated calls yield the same name, not a deduplicated one.
    pub fn clone_agent(&self, new_name: Option<&str>) -> AnyAgent {
        match self {
            AnyAgent::Llm(a) => AnyAgent::Llm(a.clone_agent(new_name)),
            AnyAgent::Sequential(a) => AnyAgent::Sequential(a.clone_agent(new_name)),
            AnyAgent::Parallel(a) => AnyAgent::Parallel(a.clone_agent(new_name)),
            AnyAgent::Loop(a) => AnyAgent::Loop(a.clone_agent(new_name)),
        }
    }

    pub(crate) fn set_parent(&mut self, parent: &str) {
        match self {
            AnyAgent::Llm(a) => a.set_parent(parent),
            AnyAgent::Sequential(a) => a.set_parent(parent),
            AnyAgent::Parallel(a) => a.set_parent(parent),
            AnyAgent::Loop(a) => a.set_parent(parent),
        }
    }
}

#[async_trait]
impl BaseAgent for AnyAgent {
    fn config(&self) -> &AgentConfig {
        match self {
            AnyAgent::Llm(a) => a.config(),
            AnyAgent::Sequential(a) => a.config(),
            AnyAgent::Parallel(a) => a.config(),
            AnyAgent::Loop(a) => a.config(),
        }
    }

    fn kind(&self) -> AgentKind {
        match self {
            AnyAgent::Llm(a) => a.kind(),
            AnyAgent::Sequential(a) => a.kind(),
            AnyAgent::Parallel(a) => a.kind(),
            AnyAgent::Loop(a) => a.kind(),
        }
    }

    fn sub_agents(&self) -> &[AnyAgent] {
        match self {
            AnyAgent::Llm(a) => a.sub_agents(),
            AnyAgent::Sequential(a) => a.sub_agents(),
            AnyAgent::Parallel(a) => a.sub_agents(),
            AnyAgent::Loop(a) => a.sub_agents(),
        }
    }

    fn parent_agent(&self) -> Option<&str> {
        match self {
            AnyAgent::Llm(a) => a.parent_agent(),
            AnyAgent::Sequential(a) => a.parent_agent(),
            AnyAgent::Parallel(a) => a.parent_agent(),
            AnyAgent::Loop(a) => a.parent_agent(),
        }
    }

    async fn run(&self, prompt: &str, ctx: &AgentContext) -> Result<AgentOutput, AgentError> {
        match self {
            AnyAgent::Llm(a) => a.run(prompt, ctx).await,
            AnyAgent::Sequential(a) => a.run(prompt, ctx).await,
            AnyAgent::Parallel(a) => a.run(prompt, ctx).await,
            AnyAgent::Loop(a) => a.run(prompt, ctx).await,
        }
    }
}

impl From<LlmAgent> for AnyAgent {
    fn from(agent: LlmAgent) -> Self {
        AnyAgent::Llm(agent)
    }
}

impl From<SequentialAgent> for AnyAgent {
    fn from(agent: SequentialAgent) -> Self {
        AnyAgent::Sequential(agent)
    }
}

impl From<ParallelAgent> for AnyAgent {
    fn from(agent: ParallelAgent) -> Self {
        AnyAgent::Parallel(agent)
    }
}

impl From<LoopAgent> for AnyAgent {
    fn from(agent: LoopAgent) -> Self {
        AnyAgent::Loop(agent)
    }
}

/// Clone every child under a new parent, applying the default name suffix.
pub(crate) fn clone_children(children: &[AnyAgent], parent: &str) -> Vec<AnyAgent> {
    children
        .iter()
        .map(|child| {
            let mut cloned = child.clone_agent(None);
            cloned.set_parent(parent);
            cloned
        })
        .collect()
}
