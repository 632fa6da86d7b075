use comparator_core::prelude::SamplingOptions;
use comparator_run_model::RunRecord;

/// Session-scoped state for the comparison surface
///
/// Passed explicitly to the functions that need it rather than living in ambient global state.
/// The current run is owned here and replaced wholesale when a new comparison starts; the last
/// resolved seed is kept so the user can re-run with it on demand.
#[derive(Debug, Default)]
pub struct SessionContext {
    sampling: SamplingOptions,
    last_seed: Option<u32>,
    run: Option<RunRecord>,
}

impl SessionContext {
    pub fn new(sampling: SamplingOptions) -> Self {
        Self {
            sampling,
            last_seed: None,
            run: None,
        }
    }

    pub fn sampling(&self) -> SamplingOptions {
        self.sampling
    }

    /// Resolve the seed for a new run and remember it as the last seed
    pub fn resolve_seed(&mut self) -> u32 {
        let seed = self.sampling.resolve_seed();
        self.last_seed = Some(seed);
        seed
    }

    /// The seed used by the most recent run, if any
    pub fn last_seed(&self) -> Option<u32> {
        self.last_seed
    }

    /// Pin the sampling seed to the last resolved one
    ///
    /// Does nothing when no run has resolved a seed yet.
    pub fn use_last_seed(&mut self) {
        if let Some(seed) = self.last_seed {
            self.sampling = SamplingOptions::new(self.sampling.temperature(), seed as i64);
        }
    }

    /// Replace the session's run with a finished one
    pub fn set_run(&mut self, run: RunRecord) -> &RunRecord {
        self.run = Some(run);
        self.run.as_ref().expect("run was just set")
    }

    pub fn run(&self) -> Option<&RunRecord> {
        self.run.as_ref()
    }

    pub fn take_run(&mut self) -> Option<RunRecord> {
        self.run.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comparator_core::prelude::RANDOM_SEED;
    use pretty_assertions::assert_eq;

    #[test]
    fn a_random_seed_is_resolved_once_and_reusable() {
        let mut session = SessionContext::new(SamplingOptions::new(0.2, RANDOM_SEED));

        let seed = session.resolve_seed();
        assert_eq!(Some(seed), session.last_seed());

        // Pinning turns the sentinel into the concrete seed for the next run.
        session.use_last_seed();
        assert_eq!(seed as i64, session.sampling().seed());
        assert_eq!(seed, session.resolve_seed());
    }

    #[test]
    fn a_fixed_seed_is_kept_as_the_last_seed() {
        let mut session = SessionContext::new(SamplingOptions::new(0.0, 7));

        assert_eq!(7, session.resolve_seed());
        assert_eq!(Some(7), session.last_seed());
    }
}
