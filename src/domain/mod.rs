//! Domain layer: the registration record and the pure rules around it.
//!
//! Nothing in here performs I/O. Step gating, the payment lifecycle and the
//! mapping onto the registration backend's request contract all live here
//! so they can be tested without storage or network.

pub mod models;
pub mod documents;
pub mod validation;
pub mod submission;
pub mod errors;

pub use models::*;
pub use documents::*;
pub use validation::*;
pub use submission::*;
pub use errors::*;
