// src/models/tenancy.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Frontière d'isolation : toute entité du coeur appartient à exactement
// un tenant. Un tenant n'est jamais supprimé, seulement désactivé.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: Uuid,
    pub nom: String,
    pub actif: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub nom: String,
    pub adresse: String,
    pub region: Option<String>,

    // Tolérance d'écart de caisse (en devise) appliquée à la validation
    // des relais : |écart| > seuil_tolerance ⇒ validation refusée.
    pub seuil_tolerance: Decimal,

    pub active: bool,
    pub created_at: DateTime<Utc>,
}
