use crate::types::ShaderStage;

/// Every failure the canvas core can produce.
///
/// The `Display` text is the diagnostic handed to the host; setup variants
/// are fatal for the session being built, `Draw` only affects one frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CanvasError {
    #[error("graphics context unavailable: {reason}")]
    ContextUnavailable { reason: String },
    #[error("an error occurred compiling the {stage} shader:\n{log}")]
    ShaderCompile { stage: ShaderStage, log: String },
    #[error("unable to link the shader program:\n{log}")]
    ProgramLink { log: String },
    #[error("attribute `{name}` is not declared by the vertex shader; the quad cannot be bound")]
    BufferBinding { name: String },
    #[error("frame draw failed: {reason}")]
    Draw { reason: String },
}

impl CanvasError {
    pub(crate) fn context(reason: impl Into<String>) -> Self {
        CanvasError::ContextUnavailable {
            reason: reason.into(),
        }
    }

    pub(crate) fn link(log: impl Into<String>) -> Self {
        CanvasError::ProgramLink { log: log.into() }
    }

    pub(crate) fn draw(reason: impl Into<String>) -> Self {
        CanvasError::Draw {
            reason: reason.into(),
        }
    }

    /// Whether the error ends the session it came from.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CanvasError::Draw { .. })
    }
}

/// Destination for diagnostics; the core reports here instead of returning
/// errors past its boundary.
pub trait ErrorSink {
    fn report(&mut self, error: &CanvasError);
}

impl ErrorSink for Vec<CanvasError> {
    fn report(&mut self, error: &CanvasError) {
        self.push(error.clone());
    }
}

impl<F> ErrorSink for F
where
    F: FnMut(&CanvasError),
{
    fn report(&mut self, error: &CanvasError) {
        self(error)
    }
}

/// Sink that forwards every diagnostic to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&mut self, error: &CanvasError) {
        if error.is_fatal() {
            tracing::error!("{error}");
        } else {
            tracing::warn!("{error}");
        }
    }
}
