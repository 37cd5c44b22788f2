//! # Persona Agent
//!
//! A persona generator web service backed by a hierarchical LLM agent
//! runtime.
//!
//! This library provides:
//! - An HTTP form that turns an industry + product description into a
//!   marketing persona via an LLM agent
//! - An agent runtime with leaf and composite (sequential, parallel,
//!   loop) agents and name-suffixed cloning
//! - A local eval service that replays recorded cases against a copy of
//!   an agent with bounded parallelism
//!
//! ## Architecture
//!
//! 1. `GET /` serves the form; `POST /` builds a fixed two-line prompt
//!    from the submitted fields
//! 2. The prompt runs through the persona agent, a leaf [`agents::LlmAgent`]
//! 3. The agent calls the configured model via [`llm::OpenRouterClient`]
//!    and the rendered page echoes the inputs and the generated profile
//!
//! ## Example
//!
//! ```rust,ignore
//! use persona_agent::{api, config::Config};
//!
//! let config = Config::from_env()?;
//! api::serve(config).await?;
//! ```

pub mod agents;
pub mod api;
pub mod config;
pub mod eval;
pub mod llm;

pub use config::Config;
