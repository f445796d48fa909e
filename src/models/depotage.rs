// src/models/depotage.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// --- Statut du dépotage ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "depotage_statut", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DepotageStatut {
    Brouillon,
    Soumis,
    Confirme,
    Transfere,
}

impl DepotageStatut {
    pub fn as_str(self) -> &'static str {
        match self {
            DepotageStatut::Brouillon => "BROUILLON",
            DepotageStatut::Soumis => "SOUMIS",
            DepotageStatut::Confirme => "CONFIRME",
            DepotageStatut::Transfere => "TRANSFERE",
        }
    }

    pub fn transitions(self) -> &'static [DepotageStatut] {
        use DepotageStatut::*;
        match self {
            Brouillon => &[Soumis],
            Soumis => &[Confirme],
            Confirme => &[Transfere],
            Transfere => &[],
        }
    }

    pub fn exiger_transition(self, cible: DepotageStatut) -> Result<(), AppError> {
        if self.transitions().contains(&cible) {
            Ok(())
        } else {
            Err(AppError::InvalidTransition {
                de: self.as_str(),
                vers: cible.as_str(),
            })
        }
    }
}

// --- Dépotage (événement physique de livraison) ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Depotage {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub station_id: Uuid,
    pub cuve_id: Uuid,

    pub fournisseur: String,
    pub date_depotage: DateTime<Utc>,

    pub quantite_commandee: Option<Decimal>,
    pub quantite_livree: Decimal,
    pub quantite_acceptee: Decimal,

    pub jauge_avant: Decimal,
    pub jauge_apres: Decimal,

    // Calculé : jauge_apres - jauge_avant. Peut diverger de la quantité
    // acceptée ; cette divergence est le signal d'audit, pas une erreur.
    pub variation_cuve: Decimal,

    pub prix_unitaire: Decimal,
    pub montant_total: Decimal,

    pub bon_livraison_numero: Option<String>,

    pub stock_applique: bool,
    pub statut: DepotageStatut,

    pub created_by: Option<Uuid>,
    pub validated_by: Option<Uuid>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Depotage {
    pub fn verifier_mutable(&self) -> Result<(), AppError> {
        if self.stock_applique {
            return Err(AppError::BusinessRule(
                "Le stock de ce dépotage a déjà été appliqué : enregistrement verrouillé.".into(),
            ));
        }
        if self.statut != DepotageStatut::Brouillon {
            return Err(AppError::BusinessRule(
                "Modification impossible : dépotage non en brouillon.".into(),
            ));
        }
        Ok(())
    }

    /// Garde d'idempotence du transfert : une réinvocation échoue
    /// explicitement, jamais silencieusement.
    pub fn verifier_transferable(&self) -> Result<(), AppError> {
        self.statut.exiger_transition(DepotageStatut::Transfere)?;
        if self.stock_applique {
            return Err(AppError::BusinessRule(
                "Le stock a déjà été appliqué pour ce dépotage.".into(),
            ));
        }
        Ok(())
    }
}

// --- Payload ---

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NouveauDepotage {
    pub cuve_id: Uuid,

    #[validate(length(min = 1, max = 150))]
    pub fournisseur: String,

    pub date_depotage: DateTime<Utc>,

    pub quantite_commandee: Option<Decimal>,
    pub quantite_livree: Decimal,
    pub quantite_acceptee: Decimal,

    pub jauge_avant: Decimal,
    pub jauge_apres: Decimal,

    pub prix_unitaire: Decimal,

    #[validate(length(max = 100))]
    pub bon_livraison_numero: Option<String>,
}

impl NouveauDepotage {
    pub fn valider(&self) -> Result<(), AppError> {
        self.validate()?;

        if self.quantite_livree <= Decimal::ZERO {
            return Err(AppError::Validation(
                "La quantité livrée doit être strictement positive.".into(),
            ));
        }

        if self.quantite_acceptee <= Decimal::ZERO {
            return Err(AppError::Validation(
                "La quantité acceptée doit être strictement positive.".into(),
            ));
        }

        if self.quantite_acceptee > self.quantite_livree {
            return Err(AppError::Validation(
                "La quantité acceptée ne peut pas dépasser la quantité livrée.".into(),
            ));
        }

        if self.jauge_avant < Decimal::ZERO {
            return Err(AppError::Validation(
                "La jauge avant ne peut pas être négative.".into(),
            ));
        }

        if self.jauge_apres < self.jauge_avant {
            return Err(AppError::Validation(
                "La jauge après dépotage ne peut pas être inférieure à la jauge avant.".into(),
            ));
        }

        if self.prix_unitaire <= Decimal::ZERO {
            return Err(AppError::Validation(
                "Le prix unitaire doit être strictement positif.".into(),
            ));
        }

        Ok(())
    }

    /// Calculé à la création et recalculé à chaque mise à jour
    /// pré-confirmation.
    pub fn variation_cuve(&self) -> Decimal {
        self.jauge_apres - self.jauge_avant
    }

    pub fn montant_total(&self) -> Decimal {
        self.quantite_acceptee * self.prix_unitaire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> NouveauDepotage {
        NouveauDepotage {
            cuve_id: Uuid::new_v4(),
            fournisseur: "Total Distribution".into(),
            date_depotage: Utc::now(),
            quantite_commandee: Some(Decimal::from(10_000)),
            quantite_livree: Decimal::from(10_000),
            quantite_acceptee: Decimal::from(9_800),
            jauge_avant: Decimal::from(2_000),
            jauge_apres: Decimal::from(11_750),
            prix_unitaire: Decimal::from(450),
            bon_livraison_numero: Some("BL-2025-0042".into()),
        }
    }

    #[test]
    fn chaine_de_statuts() {
        use DepotageStatut::*;
        assert!(Brouillon.exiger_transition(Soumis).is_ok());
        assert!(Soumis.exiger_transition(Confirme).is_ok());
        assert!(Confirme.exiger_transition(Transfere).is_ok());

        assert!(Brouillon.exiger_transition(Confirme).is_err());
        assert!(Soumis.exiger_transition(Transfere).is_err());
        assert!(Transfere.exiger_transition(Brouillon).is_err());
    }

    #[test]
    fn acceptee_superieure_a_livree_rejetee() {
        let mut p = payload();
        p.quantite_livree = Decimal::from(10_000);
        p.quantite_acceptee = Decimal::from(10_500);
        assert!(matches!(p.valider(), Err(AppError::Validation(_))));
    }

    #[test]
    fn jauge_apres_inferieure_rejetee() {
        let mut p = payload();
        p.jauge_apres = Decimal::from(1_500);
        assert!(matches!(p.valider(), Err(AppError::Validation(_))));
    }

    #[test]
    fn variation_et_montant_calcules() {
        let p = payload();
        assert_eq!(p.variation_cuve(), Decimal::from(9_750));
        assert_eq!(p.montant_total(), Decimal::from(4_410_000));
    }

    #[test]
    fn transfert_deja_applique_echoue_explicitement() {
        let mut d = Depotage {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            station_id: Uuid::new_v4(),
            cuve_id: Uuid::new_v4(),
            fournisseur: "X".into(),
            date_depotage: Utc::now(),
            quantite_commandee: None,
            quantite_livree: Decimal::from(100),
            quantite_acceptee: Decimal::from(100),
            jauge_avant: Decimal::ZERO,
            jauge_apres: Decimal::from(100),
            variation_cuve: Decimal::from(100),
            prix_unitaire: Decimal::from(500),
            montant_total: Decimal::from(50_000),
            bon_livraison_numero: None,
            stock_applique: false,
            statut: DepotageStatut::Confirme,
            created_by: None,
            validated_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(d.verifier_transferable().is_ok());

        d.stock_applique = true;
        assert!(matches!(
            d.verifier_transferable(),
            Err(AppError::BusinessRule(_))
        ));
    }
}
