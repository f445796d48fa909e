// src/common/error.rs

use rust_decimal::Decimal;
use thiserror::Error;

// Taxonomie des erreurs du coeur station.
// Les erreurs "métier" portent un message lisible destiné à l'appelant ;
// les erreurs techniques (sqlx, anyhow) sont converties via `#[from]`.
#[derive(Debug, Error)]
pub enum AppError {
    // Entrée client malformée (index négatif, fin < début, champ manquant...)
    #[error("Erreur de validation : {0}")]
    Validation(String),

    #[error("Erreur de validation des champs")]
    ValidationErrors(#[from] validator::ValidationErrors),

    // Mauvaise utilisation d'une machine à états (cuve, relais, dépotage)
    #[error("Transition invalide : {de} → {vers}")]
    InvalidTransition { de: &'static str, vers: &'static str },

    // Règle métier violée (prix actif manquant, écart hors tolérance,
    // produit en double, chevauchement de relais...)
    #[error("Règle métier : {0}")]
    BusinessRule(String),

    #[error("Stock insuffisant pour {produit} : disponible {disponible}, demandé {demande}")]
    InsufficientStock {
        produit: String,
        disponible: Decimal,
        demande: Decimal,
    },

    #[error("Seuil critique atteint pour {produit} : opération bloquée")]
    CriticalStockBlock { produit: String },

    #[error("Aucune cuve ACTIVE pour {0}")]
    NoActiveTank(String),

    #[error("Aucune cuve disponible pour ce dépotage")]
    MissingTank,

    #[error("Action non autorisée pour le rôle {0}")]
    PermissionDenied(&'static str),

    #[error("{0} introuvable")]
    NotFound(&'static str),

    #[error("Erreur de base de données")]
    Database(#[from] sqlx::Error),

    // Variante générique pour tout le reste ; `anyhow` conserve le contexte.
    #[error("Erreur interne")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Vrai si l'erreur relève d'une correction côté appelant (pas de retry).
    pub fn est_erreur_client(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::ValidationErrors(_)
                | AppError::InvalidTransition { .. }
                | AppError::BusinessRule(_)
                | AppError::PermissionDenied(_)
        )
    }
}
