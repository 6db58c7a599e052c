use thiserror::Error;

use salon_shared::Username;

/// Errors produced by the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// `next()` was called on a search cursor with no qualifying message left.
    #[error("Search cursor exhausted: no further messages involve '{0}'")]
    CursorExhausted(Username),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StoreError>;
