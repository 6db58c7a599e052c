//! # salon-server
//!
//! The mediation layer of Salon. A [`ChatServer`] owns the user registry
//! and the per-user block lists, and every message exchange or retraction
//! passes through it, so fan-out, block enforcement, and undo live in one
//! place. [`User`] handles delegate sends to the server and own their
//! history and undo snapshot.

pub mod config;
pub mod notify;
pub mod server;
pub mod user;

mod error;

pub use config::ServerConfig;
pub use error::ServerError;
pub use notify::{ConsoleNotifier, MemoryNotifier, Notification, Notifier};
pub use server::ChatServer;
pub use user::User;
