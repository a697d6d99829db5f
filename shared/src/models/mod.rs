//! Domain models for the LivFlow store operations platform

mod ingredient;
mod ledger;
mod recipe;

pub use ingredient::*;
pub use ledger::*;
pub use recipe::*;
