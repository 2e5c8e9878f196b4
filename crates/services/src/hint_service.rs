use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::HintError;

pub const DEFAULT_HINT_TIMEOUT: Duration = Duration::from_secs(20);

const DEFAULT_SYSTEM_PROMPT: &str = "أنت معلم خبير في القدرات العامة (القوت). اشرح السؤال للطالب ووضح العلاقة المنطقية أو طريقة الحل بأسلوب مشجع ومبسط باللهجة السعودية. لا تعط الإجابة النهائية مباشرة، بل قدّم تلميحاً قوياً يساعده على الاستنتاج.";

/// Source of hints for a single question.
#[async_trait]
pub trait HintProvider: Send + Sync {
    /// Ask for a hint about `question` given its visible `options`.
    ///
    /// # Errors
    ///
    /// Returns `HintError` if the provider is disabled or the request fails.
    async fn ask_hint(&self, question: &str, options: &[String]) -> Result<String, HintError>;
}

#[derive(Clone, Debug)]
pub struct HintConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub timeout: Duration,
}

impl HintConfig {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: api_key.into(),
            model: "gpt-4o-mini".into(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            timeout: DEFAULT_HINT_TIMEOUT,
        }
    }

    /// Read `QUIZ_AI_*` variables. `None` when no API key is set.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let api_key = env::var("QUIZ_AI_API_KEY").ok()?;
        if api_key.trim().is_empty() {
            return None;
        }
        let mut config = Self::new(api_key);
        if let Ok(base_url) = env::var("QUIZ_AI_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(model) = env::var("QUIZ_AI_MODEL") {
            config.model = model;
        }
        if let Some(secs) = env::var("QUIZ_AI_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
        {
            config.timeout = Duration::from_secs(secs);
        }
        Some(config)
    }
}

/// Hint provider backed by an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct HintService {
    client: Client,
    config: Option<HintConfig>,
}

impl HintService {
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(HintConfig::from_env())
    }

    #[must_use]
    pub fn new(config: Option<HintConfig>) -> Self {
        let client = config
            .as_ref()
            .and_then(|c| Client::builder().timeout(c.timeout).build().ok())
            .unwrap_or_default();
        Self { client, config }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::new(None)
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Timeout the runner should apply around each request.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.config
            .as_ref()
            .map_or(DEFAULT_HINT_TIMEOUT, |c| c.timeout)
    }
}

fn user_prompt(question: &str, options: &[String]) -> String {
    format!("السؤال: {question}\nالخيارات: {}", options.join(" - "))
}

#[async_trait]
impl HintProvider for HintService {
    async fn ask_hint(&self, question: &str, options: &[String]) -> Result<String, HintError> {
        let config = self.config.as_ref().ok_or(HintError::Disabled)?;

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: config.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt(question, options),
                },
            ],
            temperature: 0.7,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(HintError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or(HintError::EmptyResponse)?;

        Ok(content)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
