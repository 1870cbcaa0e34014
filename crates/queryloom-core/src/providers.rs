//! Repair engine implementations.
//!
//! `MockRepairEngine` is always available and drives the loop tests.
//! `HttpRepairEngine` (behind the `http` feature) speaks the
//! OpenAI-compatible chat-completions protocol, which covers OpenAI itself
//! plus Ollama, vLLM, and the other servers that mimic it.

use async_trait::async_trait;

use crate::validate::{RepairEngine, TableShape, ValidationStage};

/// Scripted engine for tests: serves `responses` round-robin.
pub struct MockRepairEngine {
    pub responses: Vec<String>,
    response_idx: std::sync::atomic::AtomicUsize,
}

impl MockRepairEngine {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses,
            response_idx: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn always(response: &str) -> Self {
        Self::new(vec![response.to_string()])
    }
}

#[async_trait]
impl RepairEngine for MockRepairEngine {
    async fn repair(
        &self,
        _sql: &str,
        _stage: ValidationStage,
        _error: &str,
        _tables: &[TableShape],
    ) -> anyhow::Result<String> {
        let idx = self
            .response_idx
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(self
            .responses
            .get(idx % self.responses.len())
            .cloned()
            .unwrap_or_else(|| "SELECT 1".to_string()))
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Deterministic repair prompt shared by the HTTP engines.
///
/// Carries the failing statement, the stage and message it failed with,
/// and the table shapes the statement must stay inside.
pub fn repair_prompt(
    sql: &str,
    stage: ValidationStage,
    error: &str,
    tables: &[TableShape],
) -> String {
    let mut schema = String::new();
    for table in tables {
        let columns = table
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.source_type))
            .collect::<Vec<_>>()
            .join(", ");
        schema.push_str(&format!("- {}({})\n", table.table_name, columns));
    }
    format!(
        "The following SQL statement failed {stage} validation.\n\
         Validator error: {error}\n\
         Available tables:\n{schema}\
         Rewrite the statement so it validates. Reply with the corrected SQL only, no commentary.\n\n\
         ```sql\n{sql}\n```"
    )
}

/// Strip Markdown fences and surrounding commentary from a model reply,
/// keeping the SQL.
pub fn extract_sql(reply: &str) -> String {
    let trimmed = reply.trim();
    if let Some(start) = trimmed.find("```") {
        let fenced = &trimmed[start + 3..];
        let fenced = fenced.strip_prefix("sql").unwrap_or(fenced);
        let fenced = fenced.trim_start();
        if let Some(end) = fenced.find("```") {
            return fenced[..end].trim().to_string();
        }
        return fenced.trim().to_string();
    }
    trimmed.to_string()
}

/// OpenAI-compatible chat-completions repair engine.
#[cfg(feature = "http")]
pub struct HttpRepairEngine {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl HttpRepairEngine {
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }
}

#[cfg(feature = "http")]
#[async_trait]
impl RepairEngine for HttpRepairEngine {
    async fn repair(
        &self,
        sql: &str,
        stage: ValidationStage,
        error: &str,
        tables: &[TableShape],
    ) -> anyhow::Result<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {
                    "role": "system",
                    "content": "You repair SQL statements. Reply with the corrected SQL only."
                },
                {
                    "role": "user",
                    "content": repair_prompt(sql, stage, error, tables)
                }
            ]
        });

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("failed to reach repair endpoint at {url}: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("repair endpoint http error {status}: {text}"));
        }

        #[derive(serde::Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }
        #[derive(serde::Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }
        #[derive(serde::Deserialize)]
        struct ChatMessage {
            content: String,
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("repair endpoint returned invalid JSON: {e}"))?;
        let reply = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| anyhow::anyhow!("repair endpoint returned no choices"))?;
        Ok(extract_sql(&reply))
    }

    fn name(&self) -> &str {
        "http"
    }
}

/// Select a repair engine from string configuration.
pub fn create_engine(
    kind: &str,
    config: &std::collections::HashMap<String, String>,
) -> anyhow::Result<Box<dyn RepairEngine>> {
    match kind {
        #[cfg(feature = "http")]
        "http" => {
            let endpoint = config
                .get("endpoint")
                .ok_or_else(|| anyhow::anyhow!("http repair engine requires endpoint"))?;
            let model = config
                .get("model")
                .map(|s| s.as_str())
                .unwrap_or("gpt-4o-mini");
            let mut engine = HttpRepairEngine::new(endpoint, model);
            if let Some(key) = config.get("api_key") {
                engine = engine.with_api_key(key);
            }
            Ok(Box::new(engine))
        }
        "mock" => {
            let response = config
                .get("response")
                .map(|s| s.as_str())
                .unwrap_or("SELECT 1");
            Ok(Box::new(MockRepairEngine::always(response)))
        }
        _ => Err(anyhow::anyhow!("Unknown repair engine: {kind}")),
    }
}
