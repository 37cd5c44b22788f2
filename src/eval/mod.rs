//! Local agent evaluation.
//!
//! Replays recorded eval cases against a fresh copy of a root agent:
//! - [`AgentCreator`] / [`IdentityAgentCreator`] produce the agent under
//!   eval without handing out the live root instance.
//! - [`EvalSetsManager`] stores eval sets (in memory).
//! - [`LocalEvalService`] fans eval cases out with bounded parallelism and
//!   reports per-case results as they complete. A failing case never
//!   affects its siblings.
//!
//! Metric evaluation/scoring is intentionally not part of this module.

use thiserror::Error;

mod creator;
mod service;
mod sets;

pub use creator::{AgentCreator, IdentityAgentCreator};
pub use service::{
    InferenceConfig, InferenceRequest, InferenceResult, InferenceStatus, LocalEvalService,
    EVAL_SESSION_ID_PREFIX,
};
pub use sets::{EvalCase, EvalSet, EvalSetsManager, InMemoryEvalSetsManager};

#[derive(Debug, Error)]
pub enum EvalError {
    #[error("Eval set with id {eval_set_id} not found for app {app_name}")]
    EvalSetNotFound {
        app_name: String,
        eval_set_id: String,
    },
}
