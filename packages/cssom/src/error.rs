use thiserror::Error;

/// Exceptions raised by the emulated engine, named after their DOM counterparts
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("SyntaxError: {message}")]
    Syntax { message: String },

    #[error("IndexSizeError: index {index} is out of range for {len} rules")]
    IndexSize { index: usize, len: usize },
}

impl EngineError {
    pub fn syntax(message: impl Into<String>) -> Self {
        EngineError::Syntax {
            message: message.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
