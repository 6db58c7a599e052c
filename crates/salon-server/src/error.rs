use thiserror::Error;

use salon_shared::Username;

/// Errors produced by the mediation layer.
///
/// The only failure mode of the in-memory core is a poisoned lock, which
/// means another caller panicked mid-update and the guarded state can no
/// longer be trusted.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A user's state lock was poisoned.
    #[error("User state lock poisoned for '{0}'")]
    UserStatePoisoned(Username),

    /// The server registry lock was poisoned.
    #[error("Server state lock poisoned")]
    ServerStatePoisoned,
}

pub type Result<T> = std::result::Result<T, ServerError>;
