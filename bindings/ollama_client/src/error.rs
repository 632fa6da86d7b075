use thiserror::Error;

#[derive(Error, Debug)]
pub enum OllamaError {
    /// The daemon rejected the request or failed part way through a stream.
    ///
    /// Carries the daemon's own message, which is what gets recorded against the prompt run.
    #[error("{message}")]
    Api { message: String },

    #[error("Failed to reach the serving daemon: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed response from the serving daemon: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid daemon URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}
