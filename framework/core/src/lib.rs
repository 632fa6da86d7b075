mod error;
mod sampling;

pub mod prelude {
    pub use crate::error::GenerationError;
    pub use crate::sampling::{SamplingOptions, RANDOM_SEED};
}
