//! Pluggable stimulus classifier: turns free text into a [`Classification`]
//! by calling out to an LLM chat endpoint, or a caller-supplied classifier
//! endpoint. §4.7 / §6.
//!
//! Grounded in the teacher's sibling `beagle-llm` crate's direct Anthropic
//! client (`reqwest::Client` + `x-api-key`/`anthropic-version` headers,
//! `messages` body shape) -- the teacher itself has no remote classifier of
//! its own, so this module borrows from the pack rather than the teacher.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::EngineError;

const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const EXCERPT_MAX_CHARS: usize = 200;

/// The result of classifying a single piece of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub intensity: f64,
    pub confidence: f64,
    pub reason: String,
}

impl Classification {
    /// The zero-confidence, zero-intensity classification returned whenever
    /// the remote call fails, times out, or returns something unparsable, or
    /// whose label/confidence doesn't clear the configured bar -- callers
    /// never have to branch on classifier failure. §4.7 invariant: failures
    /// are neutral, not propagated.
    #[must_use]
    pub fn neutral(reason: impl Into<String>) -> Self {
        Self {
            label: "neutral".to_string(),
            intensity: 0.0,
            confidence: 0.0,
            reason: reason.into(),
        }
    }
}

/// Which hosted chat API to call, when routing through a hosted model
/// rather than a caller-supplied `classifier_url`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAi,
}

/// Auto-detect the provider from a model name: `claude*` is Anthropic,
/// everything else is treated as an OpenAI-compatible chat endpoint.
#[must_use]
fn detect_provider(model: &str) -> Provider {
    if model.starts_with("claude") {
        Provider::Anthropic
    } else {
        Provider::OpenAi
    }
}

/// OpenAI "reasoning" models reject a `temperature` field; matched by the
/// same model-name-prefix convention the teacher pack uses for request
/// shaping.
#[must_use]
fn is_reasoning_model(model: &str) -> bool {
    ["o1", "o3", "o4", "gpt-5"].iter().any(|prefix| model.starts_with(prefix))
}

#[derive(Debug, Clone)]
pub struct ClassifierOptions {
    /// API key for the hosted-model path. Required unless `classifier_url`
    /// is set.
    pub api_key: Option<String>,
    /// Base URL for an OpenAI-compatible endpoint.
    pub base_url: String,
    pub model: String,
    /// Explicit provider override; auto-detected from `model` when `None`.
    pub provider: Option<Provider>,
    /// A caller-supplied classifier endpoint. When set, takes priority over
    /// the hosted-model path: `{text, role}` is POSTed as JSON and the
    /// response is parsed directly as a [`Classification`].
    pub classifier_url: Option<String>,
    /// Closed label set. When non-empty, a classification whose label
    /// isn't a member is treated as neutral.
    pub emotion_labels: Vec<String>,
    pub confidence_min: f64,
    pub timeout_ms: u64,
    /// JSONL audit log of every classification attempt, appended to.
    pub classification_log_path: Option<PathBuf>,
}

impl Default for ClassifierOptions {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: "claude-haiku-4-5".to_string(),
            provider: None,
            classifier_url: None,
            emotion_labels: Vec::new(),
            confidence_min: 0.5,
            timeout_ms: 10_000,
            classification_log_path: None,
        }
    }
}

/// Anything that can turn text into a [`Classification`]. `role` names the
/// speaker (`"user"` or `"agent"`) so an endpoint can weight classification
/// by who produced the text.
pub trait Classifier {
    async fn classify(&self, text: &str, role: &str) -> Classification;
}

pub struct HttpClassifier {
    http: reqwest::Client,
    options: ClassifierOptions,
}

impl HttpClassifier {
    /// Build a classifier from `options`. `ConfigError` if neither
    /// `classifier_url` nor `api_key` is set -- there would be nowhere to
    /// send a classification request.
    pub fn new(options: ClassifierOptions) -> Result<Self, EngineError> {
        if options.classifier_url.is_none() && options.api_key.is_none() {
            return Err(EngineError::config(
                "classifier requires either classifier_url or api_key",
            ));
        }
        Ok(Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_millis(options.timeout_ms))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            options,
        })
    }

    fn prompt(text: &str, role: &str) -> String {
        format!(
            "Classify the emotional content of the following message, spoken by the {role}. \
             Respond with a fenced json code block containing exactly these keys: \
             label (a single lowercase word), intensity (0 to 1), confidence (0 to 1), \
             reason (a short phrase). Message:\n\n{text}"
        )
    }

    async fn call_custom_endpoint(&self, url: &str, text: &str, role: &str) -> Result<Classification, EngineError> {
        let response = self
            .http
            .post(url)
            .json(&json!({ "text": text, "role": role }))
            .send()
            .await
            .map_err(|e| EngineError::classifier("custom classifier request failed", Some(e.to_string())))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| EngineError::classifier("custom classifier response was not json", Some(e.to_string())))?;

        if !status.is_success() {
            return Err(EngineError::classifier(
                format!("custom classifier returned {status}"),
                Some(payload.to_string()),
            ));
        }

        classification_from_value(&payload)
    }

    async fn call_anthropic(&self, api_key: &str, text: &str, role: &str) -> Result<String, EngineError> {
        let body = json!({
            "model": self.options.model,
            "max_tokens": 256,
            "messages": [{
                "role": "user",
                "content": Self::prompt(text, role),
            }],
        });

        let response = self
            .http
            .post(ANTHROPIC_URL)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::classifier("anthropic request failed", Some(e.to_string())))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| EngineError::classifier("anthropic response was not json", Some(e.to_string())))?;

        if !status.is_success() {
            return Err(EngineError::classifier(
                format!("anthropic returned {status}"),
                Some(payload.to_string()),
            ));
        }

        payload
            .get("content")
            .and_then(Value::as_array)
            .and_then(|blocks| blocks.first())
            .and_then(|block| block.get("text"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| EngineError::classifier("anthropic response missing content[0].text", None))
    }

    async fn call_openai(&self, api_key: &str, text: &str, role: &str) -> Result<String, EngineError> {
        let mut body = json!({
            "model": self.options.model,
            "messages": [{
                "role": "user",
                "content": Self::prompt(text, role),
            }],
        });
        if !is_reasoning_model(&self.options.model) {
            body["temperature"] = json!(0.2);
        }

        let url = format!("{}/chat/completions", self.options.base_url.trim_end_matches('/'));
        let response = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::classifier("openai request failed", Some(e.to_string())))?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| EngineError::classifier("openai response was not json", Some(e.to_string())))?;

        if !status.is_success() {
            return Err(EngineError::classifier(
                format!("openai returned {status}"),
                Some(payload.to_string()),
            ));
        }

        payload
            .get("choices")
            .and_then(Value::as_array)
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("message"))
            .and_then(|message| message.get("content"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| EngineError::classifier("openai response missing choices[0].message.content", None))
    }

    async fn call(&self, text: &str, role: &str) -> Result<Classification, EngineError> {
        if let Some(url) = &self.options.classifier_url {
            return self.call_custom_endpoint(url, text, role).await;
        }

        let provider = self.options.provider.unwrap_or_else(|| detect_provider(&self.options.model));
        let api_key = self
            .options
            .api_key
            .as_deref()
            .ok_or_else(|| EngineError::config("no api_key configured for hosted classifier"))?;

        let raw = match provider {
            Provider::Anthropic => self.call_anthropic(api_key, text, role).await?,
            Provider::OpenAi => self.call_openai(api_key, text, role).await?,
        };
        parse_fenced_json(&raw)
    }

    /// Reject a classification whose label falls outside the configured
    /// `emotion_labels` set (when non-empty) or whose confidence misses the
    /// bar, replacing it with neutral in either case.
    fn gate(&self, classification: Classification) -> Classification {
        if classification.confidence < self.options.confidence_min {
            debug!(
                confidence = classification.confidence,
                threshold = self.options.confidence_min,
                "classification below confidence threshold, treating as neutral"
            );
            return Classification::neutral("below confidence threshold");
        }
        if !self.options.emotion_labels.is_empty() && !self.options.emotion_labels.contains(&classification.label) {
            debug!(label = %classification.label, "classification label outside configured set, treating as neutral");
            return Classification::neutral("label outside configured emotion set");
        }
        classification
    }

    fn excerpt(text: &str) -> String {
        if text.chars().count() <= EXCERPT_MAX_CHARS {
            text.to_string()
        } else {
            text.chars().take(EXCERPT_MAX_CHARS).collect()
        }
    }

    fn log(&self, text: &str, classification: &Classification, success: bool) {
        let Some(log_path) = &self.options.classification_log_path else {
            return;
        };
        let entry = json!({
            "timestamp": Utc::now().to_rfc3339(),
            "excerpt": Self::excerpt(text),
            "success": success,
            "classification": classification,
        });
        if let Err(e) = append_jsonl(log_path, &entry) {
            warn!(path = %log_path.display(), error = %e, "failed writing classification log");
        }
    }
}

fn classification_from_value(value: &Value) -> Result<Classification, EngineError> {
    let label = value
        .get("label")
        .and_then(Value::as_str)
        .ok_or_else(|| EngineError::classifier("classifier json missing label", Some(value.to_string())))?
        .to_lowercase();
    let intensity = value.get("intensity").and_then(Value::as_f64).unwrap_or(0.0).clamp(0.0, 1.0);
    let confidence = value.get("confidence").and_then(Value::as_f64).unwrap_or(0.0).clamp(0.0, 1.0);
    let reason = value.get("reason").and_then(Value::as_str).unwrap_or("").to_string();

    Ok(Classification {
        label,
        intensity,
        confidence,
        reason,
    })
}

fn append_jsonl(path: &Path, value: &Value) -> std::io::Result<()> {
    use std::fs::OpenOptions;
    use std::io::Write as _;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{value}")
}

impl Classifier for HttpClassifier {
    async fn classify(&self, text: &str, role: &str) -> Classification {
        match self.call(text, role).await {
            Ok(classification) => {
                let gated = self.gate(classification);
                self.log(text, &gated, gated.label != "neutral");
                gated
            }
            Err(e) => {
                warn!(error = %e, "classifier call failed, returning neutral classification");
                let neutral = Classification::neutral(e.to_string());
                self.log(text, &neutral, false);
                neutral
            }
        }
    }
}

/// Extract and parse a fenced ```json ... ``` block (or, failing that, the
/// whole body) out of a free-form model response.
fn parse_fenced_json(raw: &str) -> Result<Classification, EngineError> {
    let json_str = extract_fenced_block(raw).unwrap_or(raw);
    let value: Value = serde_json::from_str(json_str.trim())
        .map_err(|e| EngineError::classifier(format!("could not parse classifier json: {e}"), Some(raw.to_string())))?;
    classification_from_value(&value)
}

fn extract_fenced_block(raw: &str) -> Option<&str> {
    let start = raw.find("```json").map(|i| i + "```json".len()).or_else(|| raw.find("```").map(|i| i + "```".len()))?;
    let rest = &raw[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_anthropic_from_model_prefix() {
        assert_eq!(detect_provider("claude-haiku-4-5"), Provider::Anthropic);
        assert_eq!(detect_provider("gpt-4o"), Provider::OpenAi);
    }

    #[test]
    fn reasoning_models_are_recognized_by_prefix() {
        assert!(is_reasoning_model("o1-preview"));
        assert!(is_reasoning_model("o3-mini"));
        assert!(is_reasoning_model("gpt-5"));
        assert!(!is_reasoning_model("gpt-4o"));
        assert!(!is_reasoning_model("claude-haiku-4-5"));
    }

    #[test]
    fn new_without_url_or_key_is_config_error() {
        let options = ClassifierOptions {
            api_key: None,
            classifier_url: None,
            ..ClassifierOptions::default()
        };
        assert!(HttpClassifier::new(options).is_err());
    }

    #[test]
    fn new_with_api_key_succeeds() {
        let options = ClassifierOptions {
            api_key: Some("test-key".to_string()),
            ..ClassifierOptions::default()
        };
        assert!(HttpClassifier::new(options).is_ok());
    }

    #[test]
    fn parses_fenced_json_block() {
        let raw = "here you go:\n```json\n{\"label\": \"Happy\", \"intensity\": 0.7, \"confidence\": 0.9, \"reason\": \"praise\"}\n```\nthanks";
        let c = parse_fenced_json(raw).unwrap();
        assert_eq!(c.label, "happy");
        assert!((c.intensity - 0.7).abs() < 1e-9);
        assert!((c.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn parses_bare_json_without_fence() {
        let raw = "{\"label\": \"sad\", \"intensity\": 0.4, \"confidence\": 0.8, \"reason\": \"loss\"}";
        let c = parse_fenced_json(raw).unwrap();
        assert_eq!(c.label, "sad");
    }

    #[test]
    fn missing_label_is_classifier_error() {
        let raw = "```json\n{\"intensity\": 0.4}\n```";
        assert!(parse_fenced_json(raw).is_err());
    }

    #[test]
    fn unparsable_text_is_classifier_error() {
        assert!(parse_fenced_json("not json at all").is_err());
    }

    #[test]
    fn out_of_range_intensity_is_clamped() {
        let raw = "{\"label\": \"happy\", \"intensity\": 5.0, \"confidence\": -1.0}";
        let c = parse_fenced_json(raw).unwrap();
        assert!((c.intensity - 1.0).abs() < 1e-9);
        assert!((c.confidence - 0.0).abs() < 1e-9);
    }

    #[test]
    fn neutral_classification_has_zero_confidence() {
        let c = Classification::neutral("timed out");
        assert_eq!(c.label, "neutral");
        assert!((c.confidence - 0.0).abs() < 1e-9);
    }

    #[test]
    fn gate_rejects_label_outside_configured_set() {
        let options = ClassifierOptions {
            api_key: Some("test-key".to_string()),
            emotion_labels: vec!["happy".to_string(), "sad".to_string()],
            confidence_min: 0.0,
            ..ClassifierOptions::default()
        };
        let classifier = HttpClassifier::new(options).unwrap();
        let out_of_set = Classification {
            label: "zorbulated".to_string(),
            intensity: 0.8,
            confidence: 0.9,
            reason: "test".to_string(),
        };
        let gated = classifier.gate(out_of_set);
        assert_eq!(gated.label, "neutral");
    }

    #[test]
    fn gate_rejects_below_confidence_threshold() {
        let options = ClassifierOptions {
            api_key: Some("test-key".to_string()),
            confidence_min: 0.8,
            ..ClassifierOptions::default()
        };
        let classifier = HttpClassifier::new(options).unwrap();
        let low_confidence = Classification {
            label: "happy".to_string(),
            intensity: 0.8,
            confidence: 0.2,
            reason: "test".to_string(),
        };
        assert_eq!(classifier.gate(low_confidence).label, "neutral");
    }

    #[test]
    fn excerpt_truncates_long_text() {
        let long = "a".repeat(500);
        let excerpt = HttpClassifier::excerpt(&long);
        assert_eq!(excerpt.chars().count(), EXCERPT_MAX_CHARS);
    }

    #[tokio::test]
    async fn jsonl_log_entry_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("classifications.jsonl");
        let options = ClassifierOptions {
            api_key: Some("test-key".to_string()),
            classification_log_path: Some(log_path.clone()),
            ..ClassifierOptions::default()
        };
        let classifier = HttpClassifier::new(options).unwrap();
        classifier.log("hello", &Classification::neutral("test"), false);

        let contents = std::fs::read_to_string(&log_path).unwrap();
        let parsed: Value = serde_json::from_str(contents.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["classification"]["label"], "neutral");
        assert_eq!(parsed["success"], false);
    }
}
