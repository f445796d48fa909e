// src/models/pompe.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::common::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "type_pompe", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypePompe {
    Simple,
    Mixte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "face_pompe", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FacePompe {
    A,
    B,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Pompe {
    pub id: Uuid,
    pub station_id: Uuid,

    // Référence physique (ex: P1, Ilot A), unique par station
    pub reference: String,

    pub type_pompe: TypePompe,
    pub actif: bool,
    pub created_at: DateTime<Utc>,
}

// Un compteur par (pompe, produit, face). `index_courant` est un compteur
// cumulatif jamais décroissant : c'est la source des volumes de relais.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct IndexPompe {
    pub id: Uuid,
    pub pompe_id: Uuid,
    pub produit_id: Uuid,
    pub face: FacePompe,
    pub index_initial: Decimal,
    pub index_courant: Decimal,
    pub actif: bool,
    pub created_at: DateTime<Utc>,
}

impl IndexPompe {
    /// Contrôle de relevé : un compteur ne recule jamais.
    pub fn verifier_releve(&self, nouvelle_valeur: Decimal) -> Result<(), AppError> {
        if nouvelle_valeur < self.index_courant {
            return Err(AppError::Validation(format!(
                "Relevé incohérent : {} < index courant {}.",
                nouvelle_valeur, self.index_courant
            )));
        }
        Ok(())
    }
}
