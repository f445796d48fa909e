// src/models/relais.rs

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::common::error::AppError;

// --- Statut du relais d'équipe ---
// Chaîne linéaire BROUILLON → SOUMIS → VALIDE → TRANSFERE, sans saut ni
// retour. ANNULE est la sortie latérale depuis SOUMIS.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "relais_statut", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelaisStatut {
    Brouillon,
    Soumis,
    Valide,
    Transfere,
    Annule,
}

impl RelaisStatut {
    pub fn as_str(self) -> &'static str {
        match self {
            RelaisStatut::Brouillon => "BROUILLON",
            RelaisStatut::Soumis => "SOUMIS",
            RelaisStatut::Valide => "VALIDE",
            RelaisStatut::Transfere => "TRANSFERE",
            RelaisStatut::Annule => "ANNULE",
        }
    }

    pub fn transitions(self) -> &'static [RelaisStatut] {
        use RelaisStatut::*;
        match self {
            Brouillon => &[Soumis],
            Soumis => &[Valide, Annule],
            Valide => &[Transfere],
            Transfere => &[],
            Annule => &[],
        }
    }

    pub fn exiger_transition(self, cible: RelaisStatut) -> Result<(), AppError> {
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

// --- Agrégat relais ---

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RelaisEquipe {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub station_id: Uuid,

    pub debut_relais: DateTime<Utc>,
    pub fin_relais: DateTime<Utc>,

    pub equipe_sortante: String,
    pub equipe_entrante: String,

    // Encaissements généraux ; les tickets sont portés par les lignes
    pub encaisse_liquide: Decimal,
    pub encaisse_carte: Decimal,

    pub statut: RelaisStatut,

    // Garantit l'application at-most-once du stock ; une fois vrai,
    // l'enregistrement est définitivement verrouillé.
    pub stock_applique: bool,

    pub created_by: Option<Uuid>,
    pub soumis_par: Option<Uuid>,
    pub soumis_le: Option<DateTime<Utc>>,
    pub valide_par: Option<Uuid>,
    pub valide_le: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RelaisEquipe {
    /// Les relais ne sont modifiables/supprimables qu'en brouillon, et
    /// jamais une fois le stock appliqué.
    pub fn verifier_mutable(&self) -> Result<(), AppError> {
        if self.stock_applique {
            return Err(AppError::BusinessRule(
                "Le stock de ce relais a déjà été appliqué : enregistrement verrouillé.".into(),
            ));
        }
        if self.statut != RelaisStatut::Brouillon {
            return Err(AppError::BusinessRule(
                "Modification impossible : relais non en brouillon.".into(),
            ));
        }
        Ok(())
    }

    /// Garde d'idempotence du transfert, vérifiée avant toute prise de
    /// verrou : un relais déjà appliqué échoue explicitement.
    pub fn verifier_transferable(&self) -> Result<(), AppError> {
        self.statut.exiger_transition(RelaisStatut::Transfere)?;
        if self.stock_applique {
            return Err(AppError::BusinessRule(
                "Le stock de ce relais a déjà été appliqué.".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct RelaisProduit {
    pub id: Uuid,
    pub relais_id: Uuid,
    pub produit_id: Uuid,

    pub index_debut: Decimal,
    pub index_fin: Decimal,

    pub jauge_debut: Option<Decimal>,
    pub jauge_fin: Option<Decimal>,

    pub encaisse_ticket: Decimal,
}

impl RelaisProduit {
    pub fn volume_vendu(&self) -> Decimal {
        self.index_fin - self.index_debut
    }

    /// Baisse de jauge observée pendant le relais, si relevée.
    pub fn variation_cuve(&self) -> Option<Decimal> {
        match (self.jauge_debut, self.jauge_fin) {
            (Some(debut), Some(fin)) => Some(debut - fin),
            _ => None,
        }
    }
}

// --- Règles pures partagées entre le service et les tests ---

/// Deux fenêtres [début, fin) se chevauchent-elles ?
pub fn fenetres_se_chevauchent(
    debut_a: DateTime<Utc>,
    fin_a: DateTime<Utc>,
    debut_b: DateTime<Utc>,
    fin_b: DateTime<Utc>,
) -> bool {
    debut_a < fin_b && debut_b < fin_a
}

/// Un produit n'apparaît qu'une fois par relais.
pub fn verifier_produits_uniques(produit_ids: &[Uuid]) -> Result<(), AppError> {
    let mut vus = HashSet::new();
    for id in produit_ids {
        if !vus.insert(*id) {
            return Err(AppError::BusinessRule(
                "Un même produit apparaît plusieurs fois dans le relais.".into(),
            ));
        }
    }
    Ok(())
}

pub fn total_encaisse(relais: &RelaisEquipe, lignes: &[RelaisProduit]) -> Decimal {
    relais.encaisse_liquide
        + relais.encaisse_carte
        + lignes
            .iter()
            .map(|l| l.encaisse_ticket)
            .sum::<Decimal>()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValorisationRelais {
    pub total_theorique: Decimal,
    pub total_encaisse: Decimal,
    pub ecart_caisse: Decimal,
}

/// Valorise chaque ligne au prix actif de son produit et calcule l'écart
/// de caisse. L'absence de prix actif pour un produit est bloquante.
pub fn valoriser(
    relais: &RelaisEquipe,
    lignes: &[RelaisProduit],
    prix_par_produit: &HashMap<Uuid, Decimal>,
) -> Result<ValorisationRelais, AppError> {
    let mut total_theorique = Decimal::ZERO;

    for ligne in lignes {
        let prix = prix_par_produit.get(&ligne.produit_id).ok_or_else(|| {
            AppError::BusinessRule(
                "Aucun prix actif pour un produit du relais : validation impossible.".into(),
            )
        })?;

        total_theorique += ligne.volume_vendu() * *prix;
    }

    let encaisse = total_encaisse(relais, lignes);

    Ok(ValorisationRelais {
        total_theorique,
        total_encaisse: encaisse,
        ecart_caisse: encaisse - total_theorique,
    })
}

/// Contrôle financier de validation : |écart| ≤ tolérance de la station.
pub fn controler_ecart(
    valorisation: &ValorisationRelais,
    tolerance: Decimal,
) -> Result<(), AppError> {
    if valorisation.ecart_caisse.abs() > tolerance {
        return Err(AppError::BusinessRule(format!(
            "Écart d'encaissement hors tolérance : tolérance max {}, écart constaté {}.",
            tolerance, valorisation.ecart_caisse
        )));
    }
    Ok(())
}

// --- Payloads ---

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NouvelleLigneRelais {
    pub produit_id: Uuid,
    pub index_debut: Decimal,
    pub index_fin: Decimal,
    pub jauge_debut: Option<Decimal>,
    pub jauge_fin: Option<Decimal>,
    pub encaisse_ticket: Decimal,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NouveauRelais {
    pub debut_relais: DateTime<Utc>,
    pub fin_relais: DateTime<Utc>,

    #[validate(length(min = 1, max = 100))]
    pub equipe_sortante: String,
    #[validate(length(min = 1, max = 100))]
    pub equipe_entrante: String,

    pub encaisse_liquide: Decimal,
    pub encaisse_carte: Decimal,

    pub lignes: Vec<NouvelleLigneRelais>,
}

impl NouveauRelais {
    pub fn valider(&self) -> Result<(), AppError> {
        self.validate()?;

        if self.fin_relais <= self.debut_relais {
            return Err(AppError::Validation(
                "La fin du relais doit être postérieure au début.".into(),
            ));
        }

        if self.lignes.is_empty() {
            return Err(AppError::Validation(
                "Un relais doit comporter au moins une ligne produit.".into(),
            ));
        }

        if self.encaisse_liquide < Decimal::ZERO || self.encaisse_carte < Decimal::ZERO {
            return Err(AppError::Validation(
                "Les encaissements ne peuvent pas être négatifs.".into(),
            ));
        }

        let produit_ids: Vec<Uuid> = self.lignes.iter().map(|l| l.produit_id).collect();
        verifier_produits_uniques(&produit_ids)?;

        for ligne in &self.lignes {
            if ligne.index_debut < Decimal::ZERO || ligne.index_fin < Decimal::ZERO {
                return Err(AppError::Validation(
                    "Les index de pompe ne peuvent pas être négatifs.".into(),
                ));
            }
            if ligne.index_fin < ligne.index_debut {
                return Err(AppError::Validation(
                    "Index fin inférieur à l'index début.".into(),
                ));
            }
            if ligne.encaisse_ticket < Decimal::ZERO {
                return Err(AppError::Validation(
                    "L'encaissement ticket ne peut pas être négatif.".into(),
                ));
            }
            if let (Some(debut), Some(fin)) = (ligne.jauge_debut, ligne.jauge_fin) {
                // Un relais consomme du stock : la jauge ne peut que baisser.
                if fin > debut {
                    return Err(AppError::Validation(
                        "Jauge fin incohérente : supérieure à la jauge début.".into(),
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap()
    }

    fn relais(liquide: i64, carte: i64) -> RelaisEquipe {
        RelaisEquipe {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            station_id: Uuid::new_v4(),
            debut_relais: t(6, 0),
            fin_relais: t(14, 0),
            equipe_sortante: "Equipe A".into(),
            equipe_entrante: "Equipe B".into(),
            encaisse_liquide: Decimal::from(liquide),
            encaisse_carte: Decimal::from(carte),
            statut: RelaisStatut::Soumis,
            stock_applique: false,
            created_by: None,
            soumis_par: None,
            soumis_le: None,
            valide_par: None,
            valide_le: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn ligne(produit_id: Uuid, debut: i64, fin: i64, ticket: i64) -> RelaisProduit {
        RelaisProduit {
            id: Uuid::new_v4(),
            relais_id: Uuid::new_v4(),
            produit_id,
            index_debut: Decimal::from(debut),
            index_fin: Decimal::from(fin),
            jauge_debut: None,
            jauge_fin: None,
            encaisse_ticket: Decimal::from(ticket),
        }
    }

    #[test]
    fn chaine_de_statuts_lineaire() {
        use RelaisStatut::*;
        assert!(Brouillon.exiger_transition(Soumis).is_ok());
        assert!(Soumis.exiger_transition(Valide).is_ok());
        assert!(Soumis.exiger_transition(Annule).is_ok());
        assert!(Valide.exiger_transition(Transfere).is_ok());

        // ni saut, ni retour
        assert!(Brouillon.exiger_transition(Valide).is_err());
        assert!(Brouillon.exiger_transition(Transfere).is_err());
        assert!(Valide.exiger_transition(Soumis).is_err());
        assert!(Transfere.exiger_transition(Valide).is_err());
        assert!(Annule.exiger_transition(Soumis).is_err());
    }

    #[test]
    fn volume_vendu_par_delta_d_index() {
        let l = ligne(Uuid::new_v4(), 1_000, 1_150, 0);
        assert_eq!(l.volume_vendu(), Decimal::from(150));
    }

    #[test]
    fn total_encaisse_somme_liquide_carte_tickets() {
        let r = relais(50_000, 10_000);
        let p1 = Uuid::new_v4();
        let p2 = Uuid::new_v4();
        let lignes = vec![ligne(p1, 0, 10, 2_000), ligne(p2, 0, 20, 3_000)];
        assert_eq!(total_encaisse(&r, &lignes), Decimal::from(65_000));
    }

    #[test]
    fn valorisation_echoue_sans_prix_actif() {
        let r = relais(0, 0);
        let lignes = vec![ligne(Uuid::new_v4(), 0, 10, 0)];
        let err = valoriser(&r, &lignes, &HashMap::new()).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[test]
    fn chevauchement_de_fenetres() {
        // [10:00, 11:00) vs [10:30, 11:30) se chevauchent
        assert!(fenetres_se_chevauchent(t(10, 0), t(11, 0), t(10, 30), t(11, 30)));
        // fenêtres adjacentes : pas de chevauchement ([,) exclusif)
        assert!(!fenetres_se_chevauchent(t(10, 0), t(11, 0), t(11, 0), t(12, 0)));
        assert!(!fenetres_se_chevauchent(t(8, 0), t(9, 0), t(9, 30), t(10, 0)));
    }

    #[test]
    fn produit_en_double_rejete() {
        let p = Uuid::new_v4();
        assert!(verifier_produits_uniques(&[p, Uuid::new_v4()]).is_ok());
        assert!(verifier_produits_uniques(&[p, p]).is_err());
    }

    #[test]
    fn relais_transfere_n_est_plus_transferable() {
        let mut r = relais(0, 0);
        r.statut = RelaisStatut::Valide;
        assert!(r.verifier_transferable().is_ok());

        r.stock_applique = true;
        assert!(matches!(
            r.verifier_transferable(),
            Err(AppError::BusinessRule(_))
        ));

        r.statut = RelaisStatut::Transfere;
        assert!(matches!(
            r.verifier_transferable(),
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn payload_fin_avant_debut_rejete() {
        let payload = NouveauRelais {
            debut_relais: t(14, 0),
            fin_relais: t(6, 0),
            equipe_sortante: "A".into(),
            equipe_entrante: "B".into(),
            encaisse_liquide: Decimal::ZERO,
            encaisse_carte: Decimal::ZERO,
            lignes: vec![NouvelleLigneRelais {
                produit_id: Uuid::new_v4(),
                index_debut: Decimal::ZERO,
                index_fin: Decimal::from(10),
                jauge_debut: None,
                jauge_fin: None,
                encaisse_ticket: Decimal::ZERO,
            }],
        };
        assert!(matches!(payload.valider(), Err(AppError::Validation(_))));
    }

    #[test]
    fn payload_sans_ligne_rejete() {
        let payload = NouveauRelais {
            debut_relais: t(6, 0),
            fin_relais: t(14, 0),
            equipe_sortante: "A".into(),
            equipe_entrante: "B".into(),
            encaisse_liquide: Decimal::ZERO,
            encaisse_carte: Decimal::ZERO,
            lignes: vec![],
        };
        assert!(matches!(payload.valider(), Err(AppError::Validation(_))));
    }
}
