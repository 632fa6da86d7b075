use base64::prelude::*;
use comparator_run_model::CompletionStats;
use serde::{Deserialize, Serialize};

use crate::{KEEP_ALIVE_HOLD, KEEP_ALIVE_RELEASE};

/// Request body for `POST /api/generate`
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    /// Images attached to the prompt, base64-encoded
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    pub stream: bool,
    /// How long the daemon should keep the model loaded after this request, in seconds
    ///
    /// See [KEEP_ALIVE_HOLD] and [KEEP_ALIVE_RELEASE].
    pub keep_alive: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerateOptions>,
}

impl GenerateRequest {
    /// Build a streaming generation request for one prompt execution.
    ///
    /// An empty or whitespace-only user prompt is sent as a single space, which the daemon
    /// accepts where an empty string is rejected. The model is held loaded across the run.
    pub fn streaming(
        model: impl Into<String>,
        system: &str,
        prompt: &str,
        image: &[u8],
        options: GenerateOptions,
    ) -> Self {
        let prompt = if prompt.trim().is_empty() {
            " ".to_string()
        } else {
            prompt.to_string()
        };

        Self {
            model: model.into(),
            system: (!system.is_empty()).then(|| system.to_string()),
            prompt: Some(prompt),
            images: vec![BASE64_STANDARD.encode(image)],
            stream: true,
            keep_alive: KEEP_ALIVE_HOLD,
            options: Some(options),
        }
    }

    /// Build the request that releases the model's resources by dropping its keep-alive to zero.
    pub fn unload(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            prompt: None,
            images: Vec::new(),
            stream: false,
            keep_alive: KEEP_ALIVE_RELEASE,
            options: None,
        }
    }
}

/// Sampling options forwarded to the daemon with a generation request
#[derive(Debug, Clone, Copy, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub seed: u32,
}

/// One chunk of a streamed generation
///
/// Every chunk carries a text fragment. The six timing/count fields are present on the final
/// chunk only, where `done` is `true`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateChunk {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    pub total_duration: Option<u64>,
    pub load_duration: Option<u64>,
    pub prompt_eval_count: Option<u64>,
    pub prompt_eval_duration: Option<u64>,
    pub eval_count: Option<u64>,
    pub eval_duration: Option<u64>,
}

impl GenerateChunk {
    /// The completion statistics carried on the terminal chunk
    ///
    /// Present only when the daemon reported all six fields.
    pub fn completion_stats(&self) -> Option<CompletionStats> {
        Some(CompletionStats {
            total_duration: self.total_duration?,
            load_duration: self.load_duration?,
            prompt_eval_count: self.prompt_eval_count?,
            prompt_eval_duration: self.prompt_eval_duration?,
            eval_count: self.eval_count?,
            eval_duration: self.eval_duration?,
        })
    }
}

/// One chunk of a streamed model pull
#[derive(Debug, Clone, Deserialize)]
pub struct PullChunk {
    /// Progress section, e.g. `pulling manifest` or the terminal `success`
    pub status: String,
    pub digest: Option<String>,
    pub total: Option<u64>,
    pub completed: Option<u64>,
}

impl PullChunk {
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// An installed model as reported by `GET /api/tags`
#[derive(Debug, Clone, Deserialize)]
pub struct ModelInfo {
    /// The full model identifier including the tag, e.g. `llava:7b`
    pub model: String,
    /// Size on disk in bytes
    pub size: u64,
    /// Last modification time, RFC 3339
    pub modified_at: String,
}

impl ModelInfo {
    /// The model name without its tag, used for allow-list matching
    pub fn base_name(&self) -> &str {
        self.model.split(':').next().unwrap_or(&self.model)
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelsResponse {
    pub models: Vec<ModelInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn intermediate_chunk_has_no_stats() {
        let chunk: GenerateChunk =
            serde_json::from_str(r#"{"model":"llava:7b","response":"The","done":false}"#).unwrap();

        assert_eq!("The", chunk.response);
        assert!(!chunk.done);
        assert_eq!(None, chunk.completion_stats());
    }

    #[test]
    fn terminal_chunk_carries_the_full_record() {
        let chunk: GenerateChunk = serde_json::from_str(
            r#"{
                "model": "llava:7b",
                "response": "",
                "done": true,
                "total_duration": 7000000000,
                "load_duration": 5000000000,
                "prompt_eval_count": 34,
                "prompt_eval_duration": 500000000,
                "eval_count": 120,
                "eval_duration": 1500000000
            }"#,
        )
        .unwrap();

        let stats = chunk.completion_stats().expect("stats should be present");
        assert_eq!(5_000_000_000, stats.load_duration);
        assert_eq!(120, stats.eval_count);
    }

    #[test]
    fn empty_prompt_is_sent_as_a_single_space() {
        let request = GenerateRequest::streaming(
            "llava:7b",
            "You are terse.",
            "   ",
            &[1, 2, 3],
            GenerateOptions {
                temperature: 0.0,
                seed: 42,
            },
        );

        assert_eq!(Some(" ".to_string()), request.prompt);
        assert_eq!(KEEP_ALIVE_HOLD, request.keep_alive);
    }

    #[test]
    fn unload_request_releases_keep_alive() {
        let request = GenerateRequest::unload("llava:7b");
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(
            serde_json::json!({
                "model": "llava:7b",
                "stream": false,
                "keep_alive": 0
            }),
            value,
            "prompt, system, images and options are omitted entirely"
        );
    }

    #[test]
    fn base_name_strips_the_tag() {
        let info = ModelInfo {
            model: "llava:7b".to_string(),
            size: 4_000_000_000,
            modified_at: "2024-05-01T10:00:00Z".to_string(),
        };
        assert_eq!("llava", info.base_name());
    }
}
