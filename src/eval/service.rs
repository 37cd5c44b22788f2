//! Local eval service - bounded-parallel inference over eval cases.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::agents::{AgentContext, AnyAgent, BaseAgent};

use super::{AgentCreator, EvalCase, EvalError, EvalSetsManager};

/// Prefix marking sessions created by eval runs.
pub const EVAL_SESSION_ID_PREFIX: &str = "___eval___session___";

fn default_session_id() -> String {
    format!("{}{}", EVAL_SESSION_ID_PREFIX, Uuid::new_v4())
}

/// Tuning knobs for an inference run.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Maximum number of eval cases run concurrently.
    pub max_inference_parallelism: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            max_inference_parallelism: 4,
        }
    }
}

/// Request to run inference over an eval set.
#[derive(Debug, Clone)]
pub struct InferenceRequest {
    pub app_name: String,
    pub eval_set_id: String,
    /// Run only these cases when non-empty.
    pub eval_case_ids: Vec<String>,
    pub inference_config: InferenceConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InferenceStatus {
    Success,
    Failure,
}

/// Outcome of running one eval case.
#[derive(Debug, Clone, Serialize)]
pub struct InferenceResult {
    pub app_name: String,
    pub eval_set_id: String,
    pub eval_case_id: String,
    pub session_id: String,
    pub status: InferenceStatus,
    /// One agent response per conversation turn (empty on failure).
    pub inferences: Vec<String>,
    pub error_message: Option<String>,
    pub finished_at: DateTime<Utc>,
}

type SessionIdSupplier = Arc<dyn Fn() -> String + Send + Sync>;

/// Runs evals locally against agents produced by an [`AgentCreator`].
pub struct LocalEvalService {
    agent_creator: Arc<dyn AgentCreator>,
    eval_sets: Arc<dyn EvalSetsManager>,
    context: AgentContext,
    session_id_supplier: SessionIdSupplier,
    cancel: CancellationToken,
}

impl LocalEvalService {
    pub fn new(
        agent_creator: Arc<dyn AgentCreator>,
        eval_sets: Arc<dyn EvalSetsManager>,
        context: AgentContext,
    ) -> Self {
        Self {
            agent_creator,
            eval_sets,
            context,
            session_id_supplier: Arc::new(default_session_id),
            cancel: CancellationToken::new(),
        }
    }

    /// Override how session ids are generated (used by tests).
    pub fn with_session_id_supplier(
        mut self,
        supplier: impl Fn() -> String + Send + Sync + 'static,
    ) -> Self {
        self.session_id_supplier = Arc::new(supplier);
        self
    }

    /// Token that aborts the in-flight inference run when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run inference for the requested eval cases.
    ///
    /// Results are delivered on the returned channel in completion order,
    /// not case order. A failing case is reported with
    /// [`InferenceStatus::Failure`] and never affects its siblings.
    pub async fn perform_inference(
        &self,
        request: InferenceRequest,
    ) -> Result<mpsc::Receiver<InferenceResult>, EvalError> {
        let eval_set = self
            .eval_sets
            .get_eval_set(&request.app_name, &request.eval_set_id)
            .await
            .ok_or_else(|| EvalError::EvalSetNotFound {
                app_name: request.app_name.clone(),
                eval_set_id: request.eval_set_id.clone(),
            })?;

        let mut eval_cases = eval_set.eval_cases;
        if !request.eval_case_ids.is_empty() {
            eval_cases.retain(|case| request.eval_case_ids.contains(&case.eval_id));
        }

        tracing::info!(
            app_name = %request.app_name,
            eval_set_id = %request.eval_set_id,
            cases = eval_cases.len(),
            parallelism = request.inference_config.max_inference_parallelism,
            "starting eval inference"
        );

        // One agent per request; each case runs against its own copy.
        let root_agent = self.agent_creator.create_agent();
        let semaphore = Arc::new(Semaphore::new(
            request.inference_config.max_inference_parallelism.max(1),
        ));
        let (tx, rx) = mpsc::channel(eval_cases.len().max(1));

        let session_ids: Vec<String> = eval_cases
            .iter()
            .map(|_| (self.session_id_supplier)())
            .collect();
        let context = self.context.clone();
        let cancel = self.cancel.clone();
        let app_name = request.app_name;
        let eval_set_id = request.eval_set_id;

        tokio::spawn(async move {
            let mut runs = FuturesUnordered::new();
            for (case, session_id) in eval_cases.into_iter().zip(session_ids) {
                let agent = root_agent.clone();
                let context = context.clone();
                let semaphore = Arc::clone(&semaphore);
                let app_name = app_name.clone();
                let eval_set_id = eval_set_id.clone();
                runs.push(async move {
                    let _permit = semaphore.acquire().await.expect("semaphore closed");
                    run_single_case(app_name, eval_set_id, case, session_id, agent, context).await
                });
            }

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("eval inference cancelled");
                        break;
                    }
                    next = runs.next() => match next {
                        Some(result) => {
                            if tx.send(result).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    },
                }
            }
        });

        Ok(rx)
    }
}

async fn run_single_case(
    app_name: String,
    eval_set_id: String,
    case: EvalCase,
    session_id: String,
    agent: AnyAgent,
    context: AgentContext,
) -> InferenceResult {
    let mut inferences = Vec::with_capacity(case.conversation.len());

    for turn in &case.conversation {
        match agent.run(turn, &context).await {
            Ok(output) => inferences.push(output.text),
            Err(e) => {
                // A failing case must not affect other inferences.
                tracing::error!(
                    eval_case_id = %case.eval_id,
                    "Inference failed for eval case: {}",
                    e
                );
                return InferenceResult {
                    app_name,
                    eval_set_id,
                    eval_case_id: case.eval_id,
                    session_id,
                    status: InferenceStatus::Failure,
                    inferences: Vec::new(),
                    error_message: Some(e.to_string()),
                    finished_at: Utc::now(),
                };
            }
        }
    }

    InferenceResult {
        app_name,
        eval_set_id,
        eval_case_id: case.eval_id,
        session_id,
        status: InferenceStatus::Success,
        inferences,
        error_message: None,
        finished_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::agents::{AgentConfig, LlmAgent};
    use crate::config::Config;
    use crate::eval::{EvalSet, IdentityAgentCreator, InMemoryEvalSetsManager};
    use crate::llm::{ChatMessage, ChatResponse, LlmClient};

    /// Echoes prompts back, failing on any that contain "boom".
    struct EchoClient;

    #[async_trait]
    impl LlmClient for EchoClient {
        async fn chat_completion(
            &self,
            _model: &str,
            messages: &[ChatMessage],
        ) -> anyhow::Result<ChatResponse> {
            let prompt = &messages.last().expect("user message").content;
            if prompt.contains("boom") {
                return Err(anyhow::anyhow!("synthetic failure"));
            }
            Ok(ChatResponse {
                content: Some(format!("echo: {}", prompt)),
                usage: None,
            })
        }
    }

    async fn service_with_cases(cases: Vec<EvalCase>) -> LocalEvalService {
        let manager = Arc::new(InMemoryEvalSetsManager::new());
        manager
            .save_eval_set(
                "persona_app",
                EvalSet {
                    eval_set_id: "smoke".to_string(),
                    eval_cases: cases,
                },
            )
            .await;

        let context = AgentContext::new(
            Config::new("test-key".to_string(), "test-model".to_string()),
            Arc::new(EchoClient),
        );
        let root = LlmAgent::new(AgentConfig::new("eval_target"));
        LocalEvalService::new(
            Arc::new(IdentityAgentCreator::new(root.into())),
            manager,
            context,
        )
    }

    fn case(id: &str, turns: &[&str]) -> EvalCase {
        EvalCase {
            eval_id: id.to_string(),
            conversation: turns.iter().map(|t| t.to_string()).collect(),
        }
    }

    async fn collect(mut rx: mpsc::Receiver<InferenceResult>) -> Vec<InferenceResult> {
        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }

    fn request(case_ids: &[&str]) -> InferenceRequest {
        InferenceRequest {
            app_name: "persona_app".to_string(),
            eval_set_id: "smoke".to_string(),
            eval_case_ids: case_ids.iter().map(|id| id.to_string()).collect(),
            inference_config: InferenceConfig::default(),
        }
    }

    #[tokio::test]
    async fn unknown_eval_set_is_a_not_found_error() {
        let service = service_with_cases(Vec::new()).await;

        let err = service
            .perform_inference(InferenceRequest {
                eval_set_id: "missing".to_string(),
                ..request(&[])
            })
            .await
            .expect_err("should fail");

        assert!(matches!(
            err,
            EvalError::EvalSetNotFound { eval_set_id, .. } if eval_set_id == "missing"
        ));
    }

    #[tokio::test]
    async fn runs_every_case_and_collects_turn_outputs() {
        let service = service_with_cases(vec![
            case("case1", &["hello"]),
            case("case2", &["guten tag", "noch einmal"]),
        ])
        .await;

        let rx = service.perform_inference(request(&[])).await.expect("start");
        let mut results = collect(rx).await;
        results.sort_by(|a, b| a.eval_case_id.cmp(&b.eval_case_id));

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].status, InferenceStatus::Success);
        assert_eq!(results[0].inferences, vec!["echo: hello".to_string()]);
        assert_eq!(results[1].inferences.len(), 2);
        assert!(results
            .iter()
            .all(|r| r.session_id.starts_with(EVAL_SESSION_ID_PREFIX)));
    }

    #[tokio::test]
    async fn case_filter_limits_the_run() {
        let service = service_with_cases(vec![
            case("case1", &["one"]),
            case("case2", &["two"]),
            case("case3", &["three"]),
        ])
        .await;

        let rx = service
            .perform_inference(request(&["case2"]))
            .await
            .expect("start");
        let results = collect(rx).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].eval_case_id, "case2");
    }

    #[tokio::test]
    async fn failing_case_does_not_affect_siblings() {
        let service = service_with_cases(vec![
            case("good", &["hello"]),
            case("bad", &["boom"]),
        ])
        .await;

        let rx = service.perform_inference(request(&[])).await.expect("start");
        let mut results = collect(rx).await;
        results.sort_by(|a, b| a.eval_case_id.cmp(&b.eval_case_id));

        let bad = &results[0];
        assert_eq!(bad.eval_case_id, "bad");
        assert_eq!(bad.status, InferenceStatus::Failure);
        assert!(bad.inferences.is_empty());
        assert!(bad
            .error_message
            .as_deref()
            .unwrap_or_default()
            .contains("synthetic failure"));

        let good = &results[1];
        assert_eq!(good.status, InferenceStatus::Success);
        assert_eq!(good.inferences, vec!["echo: hello".to_string()]);
    }

    #[tokio::test]
    async fn custom_session_id_supplier_is_used() {
        let counter = Arc::new(AtomicUsize::new(0));
        let counter_for_supplier = Arc::clone(&counter);
        let service = service_with_cases(vec![case("case1", &["hello"])])
            .await
            .with_session_id_supplier(move || {
                format!(
                    "session-{}",
                    counter_for_supplier.fetch_add(1, Ordering::SeqCst)
                )
            });

        let rx = service.perform_inference(request(&[])).await.expect("start");
        let results = collect(rx).await;

        assert_eq!(results[0].session_id, "session-0");
    }
}
