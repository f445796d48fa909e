// src/models/cuve.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::common::error::AppError;

// --- Statut opérationnel d'une cuve ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "cuve_statut", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CuveStatut {
    Standby,
    Active,
    EnDepotage,
    Maintenance,
    HorsService,
}

impl CuveStatut {
    pub fn as_str(self) -> &'static str {
        match self {
            CuveStatut::Standby => "STANDBY",
            CuveStatut::Active => "ACTIVE",
            CuveStatut::EnDepotage => "EN_DEPOTAGE",
            CuveStatut::Maintenance => "MAINTENANCE",
            CuveStatut::HorsService => "HORS_SERVICE",
        }
    }

    // Table de transitions unique, consommée par le chemin de mutation
    // et par les tests. Toute transition absente est interdite.
    pub fn transitions(self) -> &'static [CuveStatut] {
        use CuveStatut::*;
        match self {
            Standby => &[Active, EnDepotage, Maintenance, HorsService],
            Active => &[Standby, Maintenance, HorsService],
            EnDepotage => &[Standby],
            Maintenance => &[Standby, HorsService],
            HorsService => &[Standby],
        }
    }

    pub fn peut_transiter_vers(self, cible: CuveStatut) -> bool {
        self.transitions().contains(&cible)
    }

    /// Statuts dont le stock compte dans le total exploitable.
    pub fn est_utilisable(self) -> bool {
        matches!(self, CuveStatut::Active | CuveStatut::Standby)
    }
}

// --- Cuve ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Cuve {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub station_id: Uuid,
    pub produit_id: Uuid,
    pub reference: String,
    pub capacite_max: Decimal,

    // Projection matérialisée du livre des mouvements ; toute mutation
    // passe par un mouvement dans la même transaction (invariant ≥ 0).
    pub stock_actuel: Decimal,

    pub seuil_alerte: Decimal,
    pub statut: CuveStatut,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Cuve {
    /// Garde supplémentaire à l'entrée en ACTIVE : stock non nul et
    /// re-vérification défensive de l'état source (les états bloquants
    /// repassent par STANDBY, la table l'impose déjà).
    pub fn verifier_activation(&self) -> Result<(), AppError> {
        if matches!(
            self.statut,
            CuveStatut::HorsService | CuveStatut::EnDepotage | CuveStatut::Maintenance
        ) {
            return Err(AppError::BusinessRule(format!(
                "La cuve {} doit repasser par STANDBY avant activation.",
                self.reference
            )));
        }

        if self.stock_actuel <= Decimal::ZERO {
            return Err(AppError::BusinessRule(format!(
                "Impossible d'activer la cuve {} : stock nul.",
                self.reference
            )));
        }

        Ok(())
    }

    pub fn utilisable_pour_depotage(&self) -> bool {
        self.statut.est_utilisable()
    }
}

/// Planifie l'activation d'une cuve : valide la transition et la garde
/// d'activation, puis retourne les cuves soeurs (même station, même produit)
/// actuellement ACTIVE à basculer en STANDBY dans la même transaction.
pub fn planifier_activation(cuve: &Cuve, voisines: &[Cuve]) -> Result<Vec<Uuid>, AppError> {
    if !cuve.statut.peut_transiter_vers(CuveStatut::Active) {
        return Err(AppError::InvalidTransition {
            de: cuve.statut.as_str(),
            vers: CuveStatut::Active.as_str(),
        });
    }

    cuve.verifier_activation()?;

    let a_basculer = voisines
        .iter()
        .filter(|v| v.id != cuve.id && v.statut == CuveStatut::Active)
        .map(|v| v.id)
        .collect();

    Ok(a_basculer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cuve(statut: CuveStatut, stock: i64) -> Cuve {
        Cuve {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            station_id: Uuid::new_v4(),
            produit_id: Uuid::new_v4(),
            reference: "C1".into(),
            capacite_max: Decimal::from(20_000),
            stock_actuel: Decimal::from(stock),
            seuil_alerte: Decimal::from(1_000),
            statut,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn table_de_transitions_conforme() {
        use CuveStatut::*;

        assert!(Standby.peut_transiter_vers(Active));
        assert!(Standby.peut_transiter_vers(EnDepotage));
        assert!(Standby.peut_transiter_vers(Maintenance));
        assert!(Standby.peut_transiter_vers(HorsService));

        assert!(Active.peut_transiter_vers(Standby));
        assert!(Active.peut_transiter_vers(Maintenance));
        assert!(Active.peut_transiter_vers(HorsService));
        assert!(!Active.peut_transiter_vers(EnDepotage));

        assert!(EnDepotage.peut_transiter_vers(Standby));
        assert!(!EnDepotage.peut_transiter_vers(Active));

        assert!(Maintenance.peut_transiter_vers(Standby));
        assert!(Maintenance.peut_transiter_vers(HorsService));
        assert!(!Maintenance.peut_transiter_vers(Active));

        assert!(HorsService.peut_transiter_vers(Standby));
        assert!(!HorsService.peut_transiter_vers(Active));
    }

    #[test]
    fn activation_refusee_si_stock_nul() {
        let c = cuve(CuveStatut::Standby, 0);
        let err = planifier_activation(&c, &[]).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[test]
    fn activation_bascule_la_cuve_active_en_standby() {
        let mut voisine = cuve(CuveStatut::Active, 4_000);
        let c = cuve(CuveStatut::Standby, 100);
        voisine.station_id = c.station_id;
        voisine.produit_id = c.produit_id;

        let a_basculer = planifier_activation(&c, std::slice::from_ref(&voisine)).unwrap();
        assert_eq!(a_basculer, vec![voisine.id]);
    }

    #[test]
    fn activation_depuis_hors_service_interdite() {
        let c = cuve(CuveStatut::HorsService, 500);
        let err = planifier_activation(&c, &[]).unwrap_err();
        assert!(matches!(
            err,
            AppError::InvalidTransition {
                de: "HORS_SERVICE",
                vers: "ACTIVE"
            }
        ));
    }
}
