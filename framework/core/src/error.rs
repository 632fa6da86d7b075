/// Error raised when a generation request against the serving daemon fails.
///
/// This is terminal for the prompt execution that raised it. The prompt records the message and
/// the run carries on with the next prompt or model. A generation either ends with completion
/// statistics or with this error, never both.
#[derive(derive_more::Error, derive_more::Display, Debug, Clone)]
#[display("{msg}")]
pub struct GenerationError {
    msg: String,
}

impl GenerationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }

    pub fn message(&self) -> &str {
        &self.msg
    }
}
