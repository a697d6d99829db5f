//! Shared types and domain logic for the LivFlow store operations platform
//!
//! This crate holds everything that must behave identically on the server and
//! in the browser (via WASM): recipe costing, ingredient payload parsing, the
//! stock reconciliation planner and field validation. It performs no I/O.

pub mod costing;
pub mod models;
pub mod payload;
pub mod reconciliation;
pub mod types;
pub mod validation;

pub use costing::*;
pub use models::*;
pub use payload::*;
pub use reconciliation::*;
pub use types::*;
pub use validation::*;
