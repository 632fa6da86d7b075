use anyhow::Context;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Format used for the [RunRecord::date] stamp.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A complete comparison run
///
/// One image executed against a set of models, each with the same ordered list of prompt
/// templates. There is a single active run per session and it is replaced wholesale when a new
/// comparison starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    /// The time the run started, formatted with [DATE_FORMAT]
    pub date: String,
    /// The file name of the image shared by every generation in the run
    pub image_name: String,
    /// The original image bytes
    ///
    /// Carried in the artifact as a base64 string so that a saved run can be re-opened with the
    /// image intact.
    #[serde(with = "image_data_base64")]
    pub image_data: Vec<u8>,
    /// One entry per model, in execution order
    pub models: Vec<ModelRun>,
}

/// The executions of every selected prompt against one model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelRun {
    /// The model identifier, as known to the serving daemon (e.g. `llava:7b`)
    pub name: String,
    /// One entry per prompt, in execution order
    pub prompts: Vec<PromptRun>,
}

/// A single prompt executed against a single model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PromptRun {
    /// The prompt template name, copied at execution time rather than linked to the library
    pub prompt: String,
    /// The streamed response text
    ///
    /// Grows as fragments arrive and is whitespace-trimmed once the generation completes with
    /// statistics. A generation that ends in an error keeps the text accumulated so far,
    /// untrimmed.
    pub response: String,
    /// Completion statistics, present only once the stream signalled completion
    ///
    /// Serialized as an empty object while absent, which is distinct from a present record with
    /// zeroed fields.
    #[serde(with = "done_stats")]
    pub done: Option<CompletionStats>,
    /// The failure message when the generation call failed
    ///
    /// Mutually exclusive with [PromptRun::done].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Timing and token counts reported on the final chunk of a generation stream
///
/// Copied verbatim from the serving daemon's terminal event. All durations are in nanoseconds.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionStats {
    pub total_duration: u64,
    pub load_duration: u64,
    pub prompt_eval_count: u64,
    pub prompt_eval_duration: u64,
    pub eval_count: u64,
    pub eval_duration: u64,
}

impl CompletionStats {
    /// Generated tokens per second, derived on demand
    ///
    /// Returns `0.0` when no eval time was recorded rather than dividing by zero.
    pub fn tokens_per_second(&self) -> f64 {
        if self.eval_duration == 0 {
            return 0.0;
        }
        self.eval_count as f64 / self.eval_duration as f64 * 1e9
    }
}

impl RunRecord {
    /// Start a fresh run record for the given image
    ///
    /// Stamps the record with the current local time.
    pub fn start(image_name: impl Into<String>, image_data: Vec<u8>) -> Self {
        Self::start_at(
            image_name,
            image_data,
            chrono::Local::now().format(DATE_FORMAT).to_string(),
        )
    }

    /// Start a fresh run record with an explicit date stamp
    pub fn start_at(image_name: impl Into<String>, image_data: Vec<u8>, date: String) -> Self {
        Self {
            date,
            image_name: image_name.into(),
            image_data,
            models: Vec::new(),
        }
    }

    /// Append a new model run, which becomes the target for subsequent prompt executions
    pub fn begin_model(&mut self, name: impl Into<String>) -> &mut ModelRun {
        self.models.push(ModelRun {
            name: name.into(),
            prompts: Vec::new(),
        });
        self.models.last_mut().expect("model run was just appended")
    }

    /// Compute a fingerprint for this run
    ///
    /// The fingerprint identifies the shape of a run: the image name plus the model names and
    /// prompt labels in execution order. It is used for artifact and test data naming. It is
    /// computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.image_name.as_bytes());
        for model in &self.models {
            Digest::update(&mut hasher, model.name.as_bytes());
            for prompt in &model.prompts {
                Digest::update(&mut hasher, prompt.prompt.as_bytes());
            }
        }

        format!("{:x}", hasher.finalize())
    }
}

impl ModelRun {
    /// Append a prompt execution with an empty response and no outcome yet
    pub fn begin_prompt(&mut self, label: impl Into<String>) -> &mut PromptRun {
        self.prompts.push(PromptRun {
            prompt: label.into(),
            response: String::new(),
            done: None,
            error: None,
        });
        self.prompts
            .last_mut()
            .expect("prompt run was just appended")
    }
}

impl PromptRun {
    /// Append one streamed fragment to the response text
    ///
    /// Fragments are concatenated raw, in arrival order. Trimming happens once on completion.
    pub fn append_chunk(&mut self, text: &str) {
        self.response.push_str(text);
    }

    /// Mark this prompt as completed, trimming the response and recording the statistics
    ///
    /// Completing a prompt that already completed or errored is a contract violation and is
    /// ignored, so an errored prompt can never gain statistics afterwards.
    pub fn complete_with_stats(&mut self, stats: CompletionStats) {
        if self.is_terminal() {
            return;
        }
        self.response = self.response.trim().to_string();
        self.done = Some(stats);
    }

    /// Mark this prompt as failed with the given message
    ///
    /// The response text accumulated so far is left untouched. This state is terminal.
    pub fn complete_with_error(&mut self, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.error = Some(message.into());
    }

    /// Whether this prompt reached one of the two terminal states
    pub fn is_terminal(&self) -> bool {
        self.done.is_some() || self.error.is_some()
    }
}

/// File name for a run artifact
///
/// Matches the download name offered by the dashboard: the date stamp with spaces replaced by
/// underscores.
pub fn artifact_file_name(record: &RunRecord) -> String {
    format!("vision-comparator_{}.json", record.date.replace(' ', "_"))
}

/// Serialize the run record to a writer
pub fn store_run_record<W: Write>(record: &RunRecord, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, record)?;
    Ok(())
}

/// Write the run record into `dir`, named by [artifact_file_name]
pub fn write_run_artifact(record: &RunRecord, dir: &Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create artifact directory: {}", dir.display()))?;
    let path = dir.join(artifact_file_name(record));
    let mut file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create artifact file: {}", path.display()))?;
    store_run_record(record, &mut file)?;
    Ok(path)
}

/// Load a run record from a reader
pub fn load_run_record<R: Read>(reader: R) -> anyhow::Result<RunRecord> {
    let reader = std::io::BufReader::new(reader);
    let record: RunRecord = serde_json::from_reader(reader)?;
    Ok(record)
}

/// Load a run record from an artifact file
pub fn load_run_artifact(path: &Path) -> anyhow::Result<RunRecord> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open artifact file: {}", path.display()))?;
    load_run_record(file)
}

mod image_data_base64 {
    use base64::prelude::*;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64_STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        BASE64_STANDARD
            .decode(encoded)
            .map_err(serde::de::Error::custom)
    }
}

mod done_stats {
    //! The artifact encodes "no statistics" as an empty `done` object, not as `null` and not as
    //! a zeroed record.

    use super::CompletionStats;
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<CompletionStats>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(stats) => stats.serialize(serializer),
            None => serializer.serialize_map(Some(0))?.end(),
        }
    }

    #[derive(Deserialize)]
    struct MaybeStats {
        total_duration: Option<u64>,
        load_duration: Option<u64>,
        prompt_eval_count: Option<u64>,
        prompt_eval_duration: Option<u64>,
        eval_count: Option<u64>,
        eval_duration: Option<u64>,
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<CompletionStats>, D::Error> {
        let maybe = MaybeStats::deserialize(deserializer)?;
        Ok(match maybe {
            MaybeStats {
                total_duration: Some(total_duration),
                load_duration: Some(load_duration),
                prompt_eval_count: Some(prompt_eval_count),
                prompt_eval_duration: Some(prompt_eval_duration),
                eval_count: Some(eval_count),
                eval_duration: Some(eval_duration),
            } => Some(CompletionStats {
                total_duration,
                load_duration,
                prompt_eval_count,
                prompt_eval_duration,
                eval_count,
                eval_duration,
            }),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn stats(load_duration: u64, eval_count: u64, eval_duration: u64) -> CompletionStats {
        CompletionStats {
            total_duration: load_duration + eval_duration,
            load_duration,
            prompt_eval_count: 12,
            prompt_eval_duration: 80_000_000,
            eval_count,
            eval_duration,
        }
    }

    #[test]
    fn response_is_trimmed_concatenation_of_chunks() {
        let mut record = RunRecord::start_at("cat.png", vec![1, 2], "2024-05-01 10:00:00".into());
        let prompt = record.begin_model("llava:7b").begin_prompt("Describe");

        prompt.append_chunk("  The image ");
        prompt.append_chunk("shows a cat");
        prompt.append_chunk(".\n");
        prompt.complete_with_stats(stats(1, 2, 3));

        assert_eq!("The image shows a cat.", prompt.response);
    }

    #[test]
    fn completing_twice_keeps_the_first_stats() {
        let mut record = RunRecord::start_at("cat.png", vec![], "2024-05-01 10:00:00".into());
        let prompt = record.begin_model("llava:7b").begin_prompt("Describe");

        prompt.complete_with_stats(stats(1, 2, 3));
        prompt.complete_with_stats(stats(9, 9, 9));

        assert_eq!(Some(stats(1, 2, 3)), prompt.done);
    }

    #[test]
    fn errored_prompt_never_gains_stats() {
        let mut record = RunRecord::start_at("cat.png", vec![], "2024-05-01 10:00:00".into());
        let prompt = record.begin_model("llava:7b").begin_prompt("Describe");

        prompt.append_chunk("partial ");
        prompt.complete_with_error("model connection reset");
        prompt.complete_with_stats(stats(1, 2, 3));

        assert_eq!(None, prompt.done);
        assert_eq!(Some("model connection reset".to_string()), prompt.error);
        // An error leaves the response untrimmed.
        assert_eq!("partial ", prompt.response);
    }

    #[test]
    fn tokens_per_second_guards_division_by_zero() {
        assert_eq!(0.0, stats(0, 50, 0).tokens_per_second());

        let one_second = stats(0, 120, 1_000_000_000);
        assert_eq!(120.0, one_second.tokens_per_second());
    }

    #[test]
    fn fingerprint_tracks_run_shape() {
        let mut a = RunRecord::start_at("cat.png", vec![], "2024-05-01 10:00:00".into());
        a.begin_model("llava:7b").begin_prompt("Describe");

        let mut b = RunRecord::start_at("cat.png", vec![], "2025-01-01 00:00:00".into());
        b.begin_model("llava:7b").begin_prompt("Describe");

        // The date is not part of the fingerprint, the shape is.
        assert_eq!(a.fingerprint(), b.fingerprint());

        b.begin_model("moondream:latest");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
