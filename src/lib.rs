// src/lib.rs
//
// Coeur métier d'une station-service multi-tenant : cuves et ledger de
// stock, registre de prix, relais d'équipe et dépotages. La couche
// d'exposition (HTTP, jobs) vit ailleurs ; ici, uniquement les règles,
// les repositories et les services transactionnels.

pub mod common;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

pub use common::{context::OperationContext, error::AppError};
pub use config::AppState;
