//! Application layer managing state and business workflows.
//!
//! This module coordinates between the domain layer and presentation layer:
//! the persisted field store, the wizard's navigation and payment workflow,
//! and the terminal's interaction state.

pub mod store;
pub mod wizard;
pub mod state;

pub use store::*;
pub use wizard::*;
pub use state::*;
