// src/models/produit.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// --- Catalogue carburant ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProduitCarburant {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub code: String,
    pub nom: String,

    // Seuil critique en pourcentage de la capacité totale utilisable
    pub seuil_critique_percent: Decimal,

    pub actif: bool,
    pub created_at: DateTime<Utc>,
}

// --- Prix versionné ---
// Au plus une ligne active par (tenant, station, produit) ; l'activation
// d'un nouveau prix ferme la précédente (date_fin).

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PrixCarburant {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub station_id: Uuid,
    pub produit_id: Uuid,
    pub prix_unitaire: Decimal,
    pub date_debut: DateTime<Utc>,
    pub date_fin: Option<DateTime<Utc>>,
    pub actif: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// --- Payloads ---

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NouveauProduit {
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 50))]
    pub nom: String,
    pub seuil_critique_percent: Decimal,
}

impl NouveauProduit {
    pub fn valider(&self) -> Result<(), AppError> {
        self.validate()?;

        if self.seuil_critique_percent < Decimal::ZERO
            || self.seuil_critique_percent > Decimal::from(100)
        {
            return Err(AppError::Validation(
                "Le seuil critique doit être un pourcentage entre 0 et 100.".into(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NouveauPrix {
    pub produit_id: Uuid,
    pub prix_unitaire: Decimal,
}

impl NouveauPrix {
    pub fn valider(&self) -> Result<(), AppError> {
        if self.prix_unitaire <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Le prix unitaire doit être strictement positif.".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seuil_critique_borne_entre_0_et_100() {
        let mut payload = NouveauProduit {
            code: "GASOIL".into(),
            nom: "Gasoil".into(),
            seuil_critique_percent: Decimal::from(10),
        };
        assert!(payload.valider().is_ok());

        payload.seuil_critique_percent = Decimal::from(120);
        assert!(matches!(
            payload.valider(),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn prix_unitaire_strictement_positif() {
        let payload = NouveauPrix {
            produit_id: Uuid::new_v4(),
            prix_unitaire: Decimal::ZERO,
        };
        assert!(payload.valider().is_err());
    }
}
