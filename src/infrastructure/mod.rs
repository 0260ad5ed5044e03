//! Infrastructure layer providing external service integrations.
//!
//! Session persistence, the registration backend's HTTP API, reading
//! upload files and the system clipboard.

pub mod persistence;
pub mod api;
pub mod documents;
pub mod clipboard;

pub use persistence::*;
pub use api::*;
pub use documents::*;
pub use clipboard::*;
