//! # salon-shared
//!
//! Leaf vocabulary shared by every Salon crate: usernames, message ids,
//! the immutable [`Message`] record, and display constants.

pub mod constants;
pub mod message;
pub mod types;

pub use message::Message;
pub use types::{MessageId, Username};
