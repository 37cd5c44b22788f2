//! Eval set storage (in-memory, non-persistent).

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// A single recorded eval conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalCase {
    pub eval_id: String,
    /// Ordered user turns replayed against the agent.
    pub conversation: Vec<String>,
}

/// A named collection of eval cases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalSet {
    pub eval_set_id: String,
    pub eval_cases: Vec<EvalCase>,
}

/// Storage interface for eval sets, keyed by app name and set id.
#[async_trait]
pub trait EvalSetsManager: Send + Sync {
    async fn get_eval_set(&self, app_name: &str, eval_set_id: &str) -> Option<EvalSet>;
    async fn save_eval_set(&self, app_name: &str, eval_set: EvalSet);
}

#[derive(Clone, Default)]
pub struct InMemoryEvalSetsManager {
    sets: Arc<RwLock<HashMap<(String, String), EvalSet>>>,
}

impl InMemoryEvalSetsManager {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EvalSetsManager for InMemoryEvalSetsManager {
    async fn get_eval_set(&self, app_name: &str, eval_set_id: &str) -> Option<EvalSet> {
        self.sets
            .read()
            .await
            .get(&(app_name.to_string(), eval_set_id.to_string()))
            .cloned()
    }

    async fn save_eval_set(&self, app_name: &str, eval_set: EvalSet) {
        self.sets.write().await.insert(
            (app_name.to_string(), eval_set.eval_set_id.clone()),
            eval_set,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let manager = InMemoryEvalSetsManager::new();
        manager
            .save_eval_set(
                "persona_app",
                EvalSet {
                    eval_set_id: "smoke".to_string(),
                    eval_cases: vec![EvalCase {
                        eval_id: "case1".to_string(),
                        conversation: vec!["hello".to_string()],
                    }],
                },
            )
            .await;

        let loaded = manager
            .get_eval_set("persona_app", "smoke")
            .await
            .expect("set exists");
        assert_eq!(loaded.eval_cases.len(), 1);
        assert_eq!(loaded.eval_cases[0].eval_id, "case1");
    }

    #[tokio::test]
    async fn get_unknown_set_returns_none() {
        let manager = InMemoryEvalSetsManager::new();
        assert!(manager.get_eval_set("persona_app", "missing").await.is_none());

        manager
            .save_eval_set(
                "persona_app",
                EvalSet {
                    eval_set_id: "smoke".to_string(),
                    eval_cases: Vec::new(),
                },
            )
            .await;
        // Same set id under a different app is still unknown.
        assert!(manager.get_eval_set("other_app", "smoke").await.is_none());
    }
}
