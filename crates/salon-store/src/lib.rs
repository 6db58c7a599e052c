//! # salon-store
//!
//! The in-memory data layer of Salon: each user's append-only message
//! [`History`], the single-slot undo [`SentSnapshot`], and the
//! [`SearchCursor`] over a history.
//!
//! Everything here is plain owned state with no persistence and no I/O.
//! Messages are shared across histories behind `Arc`, so removing one from
//! a history never touches another history's copy.

pub mod cursor;
pub mod history;
pub mod snapshot;

mod error;

pub use cursor::SearchCursor;
pub use error::StoreError;
pub use history::History;
pub use snapshot::SentSnapshot;
