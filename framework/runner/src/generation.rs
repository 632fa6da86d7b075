use crate::executor::Executor;
use comparator_core::prelude::GenerationError;
use comparator_run_model::CompletionStats;
use ollama_client::{GenerateOptions, GenerateStream, OllamaClient};
use std::sync::Arc;

/// One parameterised generation at the model-serving boundary
#[derive(Debug, Clone, Copy)]
pub struct GenerationRequest<'a> {
    pub model: &'a str,
    pub system: &'a str,
    pub prompt: &'a str,
    pub image: &'a [u8],
    pub temperature: f32,
    pub seed: u32,
}

/// The events produced by one generation
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// An incremental text fragment, in arrival order
    Fragment(String),
    /// The terminal event carrying the completion statistics
    Completed(CompletionStats),
}

/// A cooperative sequence of generation events, consumed synchronously to completion
///
/// A well-behaved source yields any number of fragments terminated by exactly one
/// [GenerationEvent::Completed], or ends early with a [GenerationError] instead. The two
/// outcomes are mutually exclusive and each is terminal.
pub trait GenerationEvents {
    /// The next event, or `None` when the stream is exhausted
    fn next_event(&mut self) -> Result<Option<GenerationEvent>, GenerationError>;
}

/// The contract the comparison executor requires from a model-serving client
pub trait ModelService {
    type Events: GenerationEvents;

    /// Start one streamed generation
    fn start_generation(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<Self::Events, GenerationError>;

    /// Send the fire-and-forget signal releasing a model's resources
    ///
    /// There is no acknowledgement to track and failures must not fail the run.
    fn release_model(&self, model: &str);
}

/// [ModelService] implementation backed by the local serving daemon
pub struct OllamaService {
    client: OllamaClient,
    executor: Arc<Executor>,
}

impl OllamaService {
    pub fn new(client: OllamaClient, executor: Arc<Executor>) -> Self {
        Self { client, executor }
    }
}

impl ModelService for OllamaService {
    type Events = OllamaGenerationEvents;

    fn start_generation(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<Self::Events, GenerationError> {
        let wire = ollama_client::GenerateRequest::streaming(
            request.model,
            request.system,
            request.prompt,
            request.image,
            GenerateOptions {
                temperature: request.temperature,
                seed: request.seed,
            },
        );

        let stream = self
            .executor
            .execute_in_place(self.client.generate_stream(&wire))
            .map_err(|e| GenerationError::new(e.to_string()))?;

        Ok(OllamaGenerationEvents {
            stream,
            executor: self.executor.clone(),
            pending_completion: None,
        })
    }

    fn release_model(&self, model: &str) {
        self.executor.execute_in_place(self.client.unload_model(model));
    }
}

/// Adapts the daemon's chunk stream to the synchronous event sequence
///
/// The daemon's terminal chunk can carry both a final text fragment and the statistics; the
/// fragment is handed out first and the completion event follows on the next pull.
pub struct OllamaGenerationEvents {
    stream: GenerateStream,
    executor: Arc<Executor>,
    pending_completion: Option<CompletionStats>,
}

impl GenerationEvents for OllamaGenerationEvents {
    fn next_event(&mut self) -> Result<Option<GenerationEvent>, GenerationError> {
        if let Some(stats) = self.pending_completion.take() {
            return Ok(Some(GenerationEvent::Completed(stats)));
        }

        match self.executor.execute_in_place(self.stream.next_chunk()) {
            Ok(Some(chunk)) if chunk.done => {
                let stats = chunk.completion_stats().ok_or_else(|| {
                    GenerationError::new("terminal chunk carried no completion statistics")
                })?;

                if chunk.response.is_empty() {
                    Ok(Some(GenerationEvent::Completed(stats)))
                } else {
                    self.pending_completion = Some(stats);
                    Ok(Some(GenerationEvent::Fragment(chunk.response)))
                }
            }
            Ok(Some(chunk)) => Ok(Some(GenerationEvent::Fragment(chunk.response))),
            Ok(None) => Ok(None),
            Err(e) => Err(GenerationError::new(e.to_string())),
        }
    }
}
