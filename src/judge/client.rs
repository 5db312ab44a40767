//! OpenAI-compatible judge client with automatic retry for transient errors.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{Judge, JudgeError, PromptTemplates, RetryConfig};
use crate::config::ApiConfig;

/// HTTP judge speaking the OpenAI chat-completion protocol.
///
/// Each grading call renders a prompt template into a single user message
/// and asks for one output token, so a well-behaved endpoint can only reply
/// `0` or `1`.
pub struct OpenAiJudge {
    client: Client,
    api: ApiConfig,
    templates: PromptTemplates,
    retry_config: RetryConfig,
}

impl OpenAiJudge {
    /// Create a judge with the default retry configuration.
    pub fn new(api: ApiConfig, templates: PromptTemplates) -> Self {
        Self::with_retry_config(api, templates, RetryConfig::default())
    }

    /// Create a judge with a custom retry configuration.
    pub fn with_retry_config(
        api: ApiConfig,
        templates: PromptTemplates,
        retry_config: RetryConfig,
    ) -> Self {
        let client = Client::builder()
            .timeout(retry_config.request_timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api,
            templates,
            retry_config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.api.base_url.trim_end_matches('/'))
    }

    /// Execute a single request without retry.
    async fn execute_request(&self, prompt: &str) -> Result<String, JudgeError> {
        let request = ChatRequest {
            model: self.api.model.clone(),
            messages: vec![ChatRequestMessage {
                role: "user",
                content: prompt,
            }],
            temperature: self.api.temperature,
            // One token is enough for a 0/1 verdict and keeps the judge from
            // rambling past it.
            max_tokens: 1,
        };

        let response = match self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api.key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                if e.is_timeout() {
                    return Err(JudgeError::timeout(format!("request timeout: {}", e)));
                } else if e.is_connect() {
                    return Err(JudgeError::network(format!("connection failed: {}", e)));
                } else {
                    return Err(JudgeError::network(format!("request failed: {}", e)));
                }
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            // An oversized prompt comes back as a context-length complaint;
            // surface the prompt size so the data problem is visible.
            if body.contains("maximum context length") || body.contains("tokens") {
                tracing::warn!(
                    prompt_chars = prompt.len(),
                    "judge rejected request, possible context overflow: {}",
                    body
                );
            }
            return Err(JudgeError::from_status(status.as_u16(), &body));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            JudgeError::parse(format!("failed to parse response: {}, body: {}", e, body))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| JudgeError::parse("no choices in response".to_string()))?;

        Ok(super::clean_verdict(&choice.message.content.unwrap_or_default()))
    }

    /// Execute a request with bounded exponential backoff.
    async fn execute_with_retry(&self, prompt: &str) -> Result<String, JudgeError> {
        let mut attempt = 0;

        loop {
            match self.execute_request(prompt).await {
                Ok(verdict) => {
                    if attempt > 0 {
                        tracing::info!("judge call succeeded after {} retries", attempt);
                    }
                    return Ok(verdict);
                }
                Err(error) => {
                    let should_retry = self.retry_config.should_retry(&error)
                        && attempt < self.retry_config.max_retries;

                    if !should_retry {
                        tracing::error!(
                            "judge call failed after {} retries: {}",
                            attempt,
                            error
                        );
                        return Err(error);
                    }

                    let delay = self.retry_config.delay_for(attempt);
                    tracing::warn!(
                        "judge retry {}/{} in {:?}: {}",
                        attempt + 1,
                        self.retry_config.max_retries,
                        delay,
                        error
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[async_trait]
impl Judge for OpenAiJudge {
    async fn grade_answer(
        &self,
        question: &str,
        gold_answer: &str,
        predicted_answer: &str,
    ) -> Result<String, JudgeError> {
        let prompt = self
            .templates
            .render_answer(question, gold_answer, predicted_answer);
        self.execute_with_retry(&prompt).await
    }

    async fn grade_query(
        &self,
        question: &str,
        gold_query: &str,
        predicted_query: &str,
    ) -> Result<String, JudgeError> {
        let prompt = self
            .templates
            .render_query(question, gold_query, predicted_query);
        self.execute_with_retry(&prompt).await
    }
}

/// Chat-completion request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: String,
    messages: Vec<ChatRequestMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

/// Chat-completion response body, reduced to what the judge needs.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::JudgeErrorKind;
    use axum::{routing::post, Json, Router};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn test_judge(base_url: String, retries: u32) -> OpenAiJudge {
        let api = ApiConfig {
            key: "EMPTY".to_string(),
            base_url,
            model: "qwen3-4b".to_string(),
            temperature: 0.3,
        };
        let templates = PromptTemplates::from_strings(
            "{question}|{gold_answer}|{predicted_answer}",
            "{question}|{gold_query}|{predicted_query}",
        );
        OpenAiJudge::with_retry_config(
            api,
            templates,
            RetryConfig {
                max_retries: retries,
                base_delay: Duration::from_millis(1),
                jitter: Duration::from_millis(1),
                request_timeout: Duration::from_secs(5),
            },
        )
    }

    fn verdict_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    /// Serve a chat-completions endpoint that fails `failures` times with
    /// HTTP 500 before answering "1".
    async fn spawn_flaky_endpoint(failures: u32) -> (String, Arc<AtomicU32>) {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let app = Router::new().route(
            "/v1/chat/completions",
            post(move |_body: Json<serde_json::Value>| {
                let n = seen.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < failures {
                        Err(axum::http::StatusCode::INTERNAL_SERVER_ERROR)
                    } else {
                        Ok(Json(verdict_body("1")))
                    }
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/v1", addr), calls)
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let (base_url, calls) = spawn_flaky_endpoint(2).await;
        let judge = test_judge(base_url, 5);

        let verdict = judge.grade_answer("q", "gold", "pred").await.unwrap();
        assert_eq!(verdict, "1");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion_surfaces_last_error() {
        let (base_url, calls) = spawn_flaky_endpoint(u32::MAX).await;
        let judge = test_judge(base_url, 2);

        let err = judge.grade_answer("q", "gold", "pred").await.unwrap_err();
        assert_eq!(err.kind, JudgeErrorKind::ServerError);
        // Initial attempt plus two retries.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fenced_verdict_is_cleaned() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(verdict_body("```0```")) }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let judge = test_judge(format!("http://{}/v1", addr), 0);
        let verdict = judge.grade_query("q", "gold", "pred").await.unwrap();
        assert_eq!(verdict, "0");
    }

    #[tokio::test]
    async fn test_unresponsive_endpoint_consumes_retries() {
        // Accept connections but never answer; each attempt must hit the
        // request deadline instead of blocking forever.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut sockets = Vec::new();
            loop {
                if let Ok((socket, _)) = listener.accept().await {
                    sockets.push(socket);
                }
            }
        });

        let api = ApiConfig {
            key: "EMPTY".to_string(),
            base_url: format!("http://{}/v1", addr),
            model: "qwen3-4b".to_string(),
            temperature: 0.3,
        };
        let templates = PromptTemplates::from_strings("{question}", "{question}");
        let judge = OpenAiJudge::with_retry_config(
            api,
            templates,
            RetryConfig {
                max_retries: 1,
                base_delay: Duration::from_millis(1),
                jitter: Duration::from_millis(1),
                request_timeout: Duration::from_millis(100),
            },
        );

        let start = std::time::Instant::now();
        let err = judge.grade_answer("q", "gold", "pred").await.unwrap_err();
        assert!(matches!(
            err.kind,
            JudgeErrorKind::Timeout | JudgeErrorKind::Network
        ));
        // Two attempts at 100ms each plus backoff, not an unbounded hang.
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_connection_refused_is_a_network_error() {
        // Port 1 should refuse immediately.
        let judge = test_judge("http://127.0.0.1:1/v1".to_string(), 0);
        let err = judge.grade_answer("q", "gold", "pred").await.unwrap_err();
        assert!(matches!(
            err.kind,
            JudgeErrorKind::Network | JudgeErrorKind::Timeout
        ));
    }
}
