//! Business logic services for the LivFlow store operations server

pub mod ingredient;
pub mod inventory;
pub mod ledger;
pub mod reconciliation;
pub mod recipe;
pub mod store;

pub use ingredient::IngredientService;
pub use inventory::InventoryService;
pub use ledger::LedgerService;
pub use recipe::RecipeService;
pub use store::StoreService;
