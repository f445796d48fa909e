// src/common/context.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::error::AppError;

// Rôles issus du référentiel comptes. Le coeur station n'en consomme
// qu'un sous-ensemble, mais le type couvre tout le référentiel pour que
// la couche HTTP puisse transmettre n'importe quel acteur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Superadmin,
    AdminTenantStation,
    Gerant,
    Superviseur,
    Pompiste,
    Caissier,
}

impl UserRole {
    pub fn as_str(self) -> &'static str {
        match self {
            UserRole::Superadmin => "SUPERADMIN",
            UserRole::AdminTenantStation => "ADMIN_TENANT_STATION",
            UserRole::Gerant => "GERANT",
            UserRole::Superviseur => "SUPERVISEUR",
            UserRole::Pompiste => "POMPISTE",
            UserRole::Caissier => "CAISSIER",
        }
    }
}

// Les commandes exposées par le coeur. La table rôle → action remplace
// les contrôles de rôle dispersés dans les anciennes vues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStation {
    CreerRelais,
    ModifierRelais,
    SupprimerRelais,
    SoumettreRelais,
    ValiderRelais,
    TransfererRelais,
    AnnulerRelais,
    CreerDepotage,
    ModifierDepotage,
    SoumettreDepotage,
    ConfirmerDepotage,
    TransfererDepotage,
    ChangerStatutCuve,
    ActiverPrix,
    DesactiverProduit,
    ReleverIndex,
}

impl UserRole {
    /// Table de capacités : un rôle donné est-il autorisé à exécuter l'action ?
    pub fn autorise(self, action: ActionStation) -> bool {
        use ActionStation::*;
        use UserRole::*;

        // Les administrateurs passent partout.
        if matches!(self, Superadmin | AdminTenantStation) {
            return true;
        }

        match action {
            CreerRelais | SoumettreRelais | ReleverIndex => {
                matches!(self, Pompiste | Superviseur)
            }
            ModifierRelais | SupprimerRelais | AnnulerRelais => {
                matches!(self, Superviseur | Gerant)
            }
            ValiderRelais => matches!(self, Superviseur),
            TransfererRelais => matches!(self, Gerant),
            CreerDepotage | ModifierDepotage | SoumettreDepotage => {
                matches!(self, Pompiste | Superviseur)
            }
            ConfirmerDepotage | TransfererDepotage => matches!(self, Gerant),
            ChangerStatutCuve => matches!(self, Superviseur | Gerant),
            ActiverPrix | DesactiverProduit => matches!(self, Gerant),
        }
    }
}

// Contexte d'exécution passé explicitement à chaque commande du coeur.
// Le coeur ne lit jamais d'état ambiant (pas de request.user implicite) :
// la couche HTTP résout l'acteur et la portée, puis construit ce contexte.
#[derive(Debug, Clone, Copy)]
pub struct OperationContext {
    pub tenant_id: Uuid,
    pub station_id: Uuid,
    pub actor_id: Uuid,
    pub role: UserRole,
}

impl OperationContext {
    pub fn new(tenant_id: Uuid, station_id: Uuid, actor_id: Uuid, role: UserRole) -> Self {
        Self {
            tenant_id,
            station_id,
            actor_id,
            role,
        }
    }

    /// Rejette l'appel si le rôle du contexte n'est pas capable de l'action.
    pub fn exiger(&self, action: ActionStation) -> Result<(), AppError> {
        if self.role.autorise(action) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(self.role.as_str()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seul_le_gerant_transfere_un_relais() {
        assert!(UserRole::Gerant.autorise(ActionStation::TransfererRelais));
        assert!(!UserRole::Superviseur.autorise(ActionStation::TransfererRelais));
        assert!(!UserRole::Pompiste.autorise(ActionStation::TransfererRelais));
    }

    #[test]
    fn seul_le_superviseur_valide_un_relais() {
        assert!(UserRole::Superviseur.autorise(ActionStation::ValiderRelais));
        assert!(!UserRole::Gerant.autorise(ActionStation::ValiderRelais));
    }

    #[test]
    fn le_pompiste_cree_et_soumet() {
        assert!(UserRole::Pompiste.autorise(ActionStation::CreerRelais));
        assert!(UserRole::Pompiste.autorise(ActionStation::SoumettreRelais));
        assert!(!UserRole::Caissier.autorise(ActionStation::CreerRelais));
    }

    #[test]
    fn le_catalogue_est_reserve_au_gerant() {
        assert!(UserRole::Gerant.autorise(ActionStation::DesactiverProduit));
        assert!(!UserRole::Superviseur.autorise(ActionStation::DesactiverProduit));
        assert!(!UserRole::Pompiste.autorise(ActionStation::DesactiverProduit));
    }

    #[test]
    fn les_admins_passent_partout() {
        assert!(UserRole::AdminTenantStation.autorise(ActionStation::TransfererRelais));
        assert!(UserRole::Superadmin.autorise(ActionStation::ActiverPrix));
    }

    #[test]
    fn exiger_rejette_avec_permission_denied() {
        let ctx = OperationContext::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            UserRole::Caissier,
        );
        let err = ctx.exiger(ActionStation::TransfererRelais).unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied("CAISSIER")));
    }
}
