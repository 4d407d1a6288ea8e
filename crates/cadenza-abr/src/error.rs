use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AbrError {
    /// The coordinator was disposed; it accepts no further calls.
    #[error("ABR coordinator has been disposed")]
    Disposed,
}

pub type AbrResult<T> = Result<T, AbrError>;
