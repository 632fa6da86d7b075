use anyhow::Context;
use std::future::Future;

/// Drives the async client from the synchronous comparison loop.
///
/// A comparison proceeds strictly sequentially, model by model and prompt by prompt, so there is
/// never more than one generation in flight and the runtime is only ever driven from here.
#[derive(Debug)]
pub struct Executor {
    runtime: tokio::runtime::Runtime,
}

impl Executor {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            runtime: tokio::runtime::Runtime::new().context("Failed to create Tokio runtime")?,
        })
    }

    /// Run async code in place, blocking until it completes.
    pub fn execute_in_place<F: Future>(&self, fut: F) -> F::Output {
        self.runtime.block_on(fut)
    }
}
