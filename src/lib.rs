//! bnreg - Business Name Registration
//!
//! A terminal wizard that walks an applicant through registering a business
//! name: checking name availability, collecting applicant and business
//! details and documents, paying the fee and submitting the application.
//! Progress is saved after every change so the wizard can be resumed.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;
pub mod config;
pub mod telemetry;
pub mod error;

pub use domain::*;
pub use application::*;
