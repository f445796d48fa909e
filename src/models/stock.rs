// src/models/stock.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::common::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "type_mouvement", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TypeMouvement {
    Entree,
    Sortie,
}

impl TypeMouvement {
    pub fn as_str(self) -> &'static str {
        match self {
            TypeMouvement::Entree => "ENTREE",
            TypeMouvement::Sortie => "SORTIE",
        }
    }
}

// Écriture immuable du livre des mouvements. `stock_actuel` de la cuve
// est la projection incrémentale de ce livre : chaque mutation du stock
// est appariée à une ligne ici, dans la même transaction.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct MouvementStock {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub station_id: Uuid,
    pub cuve_id: Uuid,
    pub type_mouvement: TypeMouvement,

    // Toujours strictement positive ; le sens est porté par le type.
    pub quantite: Decimal,

    // Traçabilité de l'événement d'origine (RELAIS, DEPOTAGE...)
    pub source_type: String,
    pub source_id: Uuid,

    pub date_mouvement: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Applique un mouvement au stock d'une cuve et retourne le nouveau stock.
/// C'est la seule arithmétique autorisée sur `stock_actuel` ; le service
/// l'exécute sous verrou ligne puis persiste le résultat.
pub fn appliquer_mouvement(
    stock_actuel: Decimal,
    type_mouvement: TypeMouvement,
    quantite: Decimal,
    produit_code: &str,
) -> Result<Decimal, AppError> {
    if quantite <= Decimal::ZERO {
        return Err(AppError::Validation(
            "La quantité d'un mouvement doit être strictement positive.".into(),
        ));
    }

    match type_mouvement {
        TypeMouvement::Entree => Ok(stock_actuel + quantite),
        TypeMouvement::Sortie => {
            if stock_actuel < quantite {
                return Err(AppError::InsufficientStock {
                    produit: produit_code.to_string(),
                    disponible: stock_actuel,
                    demande: quantite,
                });
            }
            Ok(stock_actuel - quantite)
        }
    }
}
