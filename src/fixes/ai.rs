//! AI fix generation
//!
//! The [`AiFixProvider`] trait is the boundary to an external language
//! model; [`ChatFixProvider`] implements it against an OpenAI-compatible
//! chat endpoint. The [`AiFixGenerator`] wraps a provider, validates
//! every proposal, and caps confidence at Medium.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::AiConfig;
use crate::errors::ProviderError;
use crate::models::{Confidence, Fix, FixType, Issue};

use super::FixGenerator;

/// Lines of surrounding source handed to the provider on each side
const CONTEXT_RADIUS: usize = 5;

/// A fix proposal coming back from the provider, before validation
#[derive(Debug, Clone, Deserialize)]
pub struct ProposedFix {
    /// Target line; defaults to the issue's line when omitted
    #[serde(default)]
    pub line: Option<usize>,

    pub fixed_code: String,

    #[serde(default)]
    pub explanation: String,

    #[serde(default)]
    pub env_vars_needed: Vec<String>,

    #[serde(default)]
    pub confidence: Option<Confidence>,
}

/// Boundary to the external AI fix provider
#[async_trait]
pub trait AiFixProvider: Send + Sync {
    /// Whether credentials and endpoint are present
    fn is_configured(&self) -> bool;

    /// Propose a fix for one issue.
    ///
    /// `Ok(None)` means the provider answered but had no usable fix for
    /// this issue; `Err` means the provider itself is unreachable or
    /// misconfigured.
    async fn propose_fix(
        &self,
        issue: &Issue,
        context: &str,
    ) -> Result<Option<ProposedFix>, ProviderError>;
}

/// AI-path fix generator wrapping a provider
pub struct AiFixGenerator {
    provider: Arc<dyn AiFixProvider>,
}

impl AiFixGenerator {
    pub fn new(provider: Arc<dyn AiFixProvider>) -> Self {
        Self { provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_configured()
    }
}

#[async_trait]
impl FixGenerator for AiFixGenerator {
    fn provenance(&self) -> FixType {
        FixType::AiGenerated
    }

    async fn generate(
        &self,
        issues: &[Issue],
        source: &str,
        filename: &str,
    ) -> Result<Vec<Fix>, ProviderError> {
        if !self.provider.is_configured() {
            return Err(ProviderError::Misconfigured(
                "AI fix provider has no API key".to_string(),
            ));
        }

        let line_count = source.lines().count();
        let mut fixes = Vec::new();

        for issue in issues {
            let context = source_context(source, issue.line, CONTEXT_RADIUS);
            let proposed = match self.provider.propose_fix(issue, &context).await? {
                Some(p) => p,
                None => continue,
            };

            let line = proposed.line.unwrap_or(issue.line);

            // Invalid proposals are dropped one by one, never the batch
            if line == 0 || line > line_count {
                log::warn!(
                    "Dropping AI fix for {}: line {} is outside the source ({} lines)",
                    filename,
                    line,
                    line_count
                );
                continue;
            }
            if proposed.fixed_code.trim().is_empty() {
                log::warn!("Dropping AI fix for {}:{}: empty replacement", filename, line);
                continue;
            }

            // AI fixes never exceed Medium confidence
            let confidence = proposed
                .confidence
                .unwrap_or(Confidence::Medium)
                .min(Confidence::Medium);

            fixes.push(Fix {
                line,
                original_code: issue.matched.clone(),
                fixed_code: proposed.fixed_code,
                explanation: if proposed.explanation.is_empty() {
                    format!("AI-suggested fix for: {}", issue.message)
                } else {
                    proposed.explanation
                },
                confidence,
                fix_type: FixType::AiGenerated,
                env_vars_needed: proposed.env_vars_needed.into_iter().collect(),
                applied: false,
            });
        }

        Ok(fixes)
    }
}

/// The issue's line with `radius` lines on each side
fn source_context(source: &str, line: usize, radius: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let start = line.saturating_sub(radius + 1);
    let end = (line + radius).min(lines.len());
    if start >= end {
        return String::new();
    }
    lines[start..end].join("\n")
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Fix provider backed by an OpenAI-compatible chat endpoint
pub struct ChatFixProvider {
    client: reqwest::Client,
    config: AiConfig,
    api_key: Option<String>,
}

impl ChatFixProvider {
    pub fn new(config: AiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("AI_API_KEY").ok());

        Self {
            client,
            config,
            api_key,
        }
    }

    fn fix_prompt(&self, issue: &Issue, context: &str) -> String {
        format!(
            "You are a code security and quality expert. Fix this code issue:\n\n\
             - Type: {}\n\
             - Severity: {}\n\
             - Message: {}\n\
             - Line: {}\n\
             - Problematic code: `{}`\n\n\
             Code context:\n```\n{}\n```\n\n\
             Make the minimal change that fixes the issue and keeps the same \
             functionality. Respond with ONLY a JSON object:\n\
             {{\"fixed_code\": \"corrected code for the flagged line\", \
             \"explanation\": \"what was fixed\", \
             \"env_vars_needed\": [\"NAMES\"], \
             \"confidence\": \"HIGH|MEDIUM|LOW\"}}",
            issue.kind, issue.severity, issue.message, issue.line, issue.matched, context
        )
    }
}

#[async_trait]
impl AiFixProvider for ChatFixProvider {
    fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|key| !key.is_empty())
    }

    async fn propose_fix(
        &self,
        issue: &Issue,
        context: &str,
    ) -> Result<Option<ProposedFix>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::Misconfigured("missing API key".to_string()))?;

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: "You are a helpful assistant that fixes code quality and security issues."
                        .to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: self.fix_prompt(issue, context),
                },
            ],
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| ProviderError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "provider returned status {}",
                response.status()
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Malformed(err.to_string()))?;

        let content = match chat.choices.first() {
            Some(choice) => choice.message.content.as_str(),
            None => return Ok(None),
        };

        // Model output may wrap the JSON in prose or code fences
        let Some(json) = extract_json(content) else {
            log::warn!("Provider response for line {} had no JSON object", issue.line);
            return Ok(None);
        };

        match serde_json::from_str::<ProposedFix>(json) {
            Ok(fix) => Ok(Some(fix)),
            Err(err) => {
                log::warn!("Unparseable provider fix for line {}: {}", issue.line, err);
                Ok(None)
            }
        }
    }
}

fn extract_json(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end > start {
        Some(&content[start..=end])
    } else {
        None
    }
}
