// src/models/finance.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// --- Enums (mappés sur Postgres) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "type_transaction", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeTransaction {
    Recette,
    Depense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "finance_statut", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinanceStatut {
    Provisoire,
    Confirmee,
}

// Écriture financière postée par le coeur station vers le module
// comptable. Clé d'idempotence : (source_type, source_id) unique,
// un relais ou un dépotage transféré poste exactement une écriture.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStation {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub station_id: Uuid,

    pub type_transaction: TypeTransaction,

    pub source_type: String,
    pub source_id: Uuid,

    pub montant: Decimal,
    pub date: DateTime<Utc>,

    pub finance_statut: FinanceStatut,

    pub created_at: DateTime<Utc>,
}
