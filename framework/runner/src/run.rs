use crate::context::SessionContext;
use crate::generation::{GenerationEvent, GenerationEvents, GenerationRequest, ModelService};
use comparator_run_model::{PromptRun, RunRecord};
use prompt_store::PromptTemplate;

/// Hooks into the progress of a comparison run
///
/// Implemented by whatever surface is rendering the run; every hook has an empty default so an
/// observer only implements what it shows.
pub trait RunObserver {
    fn on_model_start(&mut self, _model: &str) {}

    fn on_prompt_start(&mut self, _template: &PromptTemplate) {}

    /// Called once per streamed fragment, in arrival order
    fn on_fragment(&mut self, _text: &str) {}

    /// Called after the prompt reached a terminal state, completed or errored
    fn on_prompt_end(&mut self, _prompt_run: &PromptRun, _seed: u32, _temperature: f32) {}
}

/// Observer that renders nothing, for embedding and tests
#[derive(Debug, Default)]
pub struct SilentObserver;

impl RunObserver for SilentObserver {}

/// Execute a full comparison: every prompt against every model, strictly sequentially
///
/// The template texts are copied into the requests at execution time, so later library edits do
/// not affect a finished record. A failed generation is captured on its prompt run and the
/// comparison carries on with the next prompt and model; nothing aborts the run and nothing is
/// retried. After the last model the release signal is sent for it, fire-and-forget.
///
/// The finished record is owned by the session; the returned reference borrows it from there.
pub fn execute_comparison<'s, S, O>(
    service: &S,
    session: &'s mut SessionContext,
    image_name: &str,
    image_data: Vec<u8>,
    models: &[String],
    templates: &[PromptTemplate],
    observer: &mut O,
) -> &'s RunRecord
where
    S: ModelService,
    O: RunObserver,
{
    let seed = session.resolve_seed();
    let temperature = session.sampling().temperature();

    let mut record = RunRecord::start(image_name, image_data);
    let image = record.image_data.clone();
    let mut active_model = None;

    for model_name in models {
        observer.on_model_start(model_name);
        active_model = Some(model_name.clone());

        let model_run = record.begin_model(model_name);
        for template in templates {
            observer.on_prompt_start(template);
            let prompt_run = model_run.begin_prompt(&template.name);

            let request = GenerationRequest {
                model: model_name,
                system: &template.system,
                prompt: &template.prompt,
                image: &image,
                temperature,
                seed,
            };

            match service.start_generation(&request) {
                Ok(mut events) => drive_generation(&mut events, prompt_run, observer),
                Err(e) => {
                    log::error!(
                        "Generation failed to start for model {} prompt {}: {}",
                        model_name,
                        template.name,
                        e
                    );
                    prompt_run.complete_with_error(e.message());
                }
            }

            observer.on_prompt_end(prompt_run, seed, temperature);
        }
    }

    if let Some(model) = active_model {
        service.release_model(&model);
    }

    session.set_run(record)
}

fn drive_generation<E, O>(events: &mut E, prompt_run: &mut PromptRun, observer: &mut O)
where
    E: GenerationEvents,
    O: RunObserver,
{
    loop {
        match events.next_event() {
            Ok(Some(GenerationEvent::Fragment(text))) => {
                prompt_run.append_chunk(&text);
                observer.on_fragment(&text);
            }
            Ok(Some(GenerationEvent::Completed(stats))) => {
                prompt_run.complete_with_stats(stats);
                return;
            }
            Ok(None) => {
                // The daemon contract promises exactly one terminal outcome; a stream that just
                // ends has broken it.
                prompt_run
                    .complete_with_error("generation stream ended without completion statistics");
                return;
            }
            Err(e) => {
                log::error!("Generation failed: {}", e);
                prompt_run.complete_with_error(e.message());
                return;
            }
        }
    }
}
