use thiserror::Error;

/// User-facing failure taxonomy surfaced to the display layer. Every remote,
/// decode, or input failure is folded into one of these before the UI sees it.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("Please enter a valid keyword")]
    InvalidKeyword,

    #[error("Unfortunately, we find nothing for you.")]
    MovieNotFound,

    #[error("Please make sure your phone is connected to the internet.")]
    NoInternet,

    #[error("Oops... something wrong happened")]
    UnknownError,
}
