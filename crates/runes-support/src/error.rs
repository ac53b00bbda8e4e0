use ordinals::RuneId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum RunesError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("arithmetic overflow in u128")]
    OverflowU128,
    #[error("balance underflow for rune {0}")]
    Underflow(RuneId),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("store error: {0}")]
    Store(String),
}

pub type RunesResult<T> = Result<T, RunesError>;

impl RunesError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
