// Scénarios de bout en bout du workflow de relais, joués sur les règles
// pures du domaine (aucune base de données requise).

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use station_core::common::error::AppError;
use station_core::models::cuve::{Cuve, CuveStatut};
use station_core::models::relais::{
    controler_ecart, fenetres_se_chevauchent, total_encaisse, valoriser,
    verifier_produits_uniques, NouveauRelais, NouvelleLigneRelais, RelaisEquipe, RelaisProduit,
    RelaisStatut,
};
use station_core::models::stock::{appliquer_mouvement, TypeMouvement};
use station_core::services::depotage_service::SOURCE_DEPOTAGE;
use station_core::services::relais_service::{SOURCE_FINANCE_RELAIS, SOURCE_MOUVEMENT_RELAIS};

fn t(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, h, m, 0).unwrap()
}

fn relais(encaisse_liquide: i64, statut: RelaisStatut) -> RelaisEquipe {
    RelaisEquipe {
        id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        station_id: Uuid::new_v4(),
        debut_relais: t(6, 0),
        fin_relais: t(14, 0),
        equipe_sortante: "Équipe A".into(),
        equipe_entrante: "Équipe B".into(),
        encaisse_liquide: Decimal::from(encaisse_liquide),
        encaisse_carte: Decimal::ZERO,
        statut,
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

fn ligne(produit_id: Uuid, index_debut: i64, index_fin: i64) -> RelaisProduit {
    RelaisProduit {
        id: Uuid::new_v4(),
        relais_id: Uuid::new_v4(),
        produit_id,
        index_debut: Decimal::from(index_debut),
        index_fin: Decimal::from(index_fin),
        jauge_debut: None,
        jauge_fin: None,
        encaisse_ticket: Decimal::ZERO,
    }
}

// 150 L vendus à 500 F/L = 75 000 F attendus ; 50 000 F en caisse.
// L'écart de -25 000 F dépasse la tolérance : la validation échoue.
#[test]
fn ecart_de_caisse_hors_tolerance_rejete() {
    let produit_id = Uuid::new_v4();
    let r = relais(50_000, RelaisStatut::Soumis);
    let lignes = vec![ligne(produit_id, 10_000, 10_150)];

    let mut prix = HashMap::new();
    prix.insert(produit_id, Decimal::from(500));

    let valorisation = valoriser(&r, &lignes, &prix).unwrap();
    assert_eq!(valorisation.total_theorique, Decimal::from(75_000));
    assert_eq!(valorisation.total_encaisse, Decimal::from(50_000));
    assert_eq!(valorisation.ecart_caisse, Decimal::from(-25_000));

    let err = controler_ecart(&valorisation, Decimal::from(1_000)).unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));
}

// Même relais avec la caisse complète : écart nul, validation acceptée,
// puis la sortie de stock du transfert laisse 4 850 L dans la cuve.
#[test]
fn relais_conforme_valide_puis_stock_applique() {
    let produit_id = Uuid::new_v4();
    let r = relais(75_000, RelaisStatut::Soumis);
    let lignes = vec![ligne(produit_id, 10_000, 10_150)];

    let mut prix = HashMap::new();
    prix.insert(produit_id, Decimal::from(500));

    let valorisation = valoriser(&r, &lignes, &prix).unwrap();
    assert_eq!(valorisation.ecart_caisse, Decimal::ZERO);
    controler_ecart(&valorisation, Decimal::from(1_000)).unwrap();

    let volume = lignes[0].volume_vendu();
    let stock_apres = appliquer_mouvement(
        Decimal::from(5_000),
        TypeMouvement::Sortie,
        volume,
        "GASOIL",
    )
    .unwrap();
    assert_eq!(stock_apres, Decimal::from(4_850));

    assert_eq!(total_encaisse(&r, &lignes), Decimal::from(75_000));
}

#[test]
fn prix_actif_manquant_bloque_la_validation() {
    let produit_id = Uuid::new_v4();
    let r = relais(10_000, RelaisStatut::Soumis);
    let lignes = vec![ligne(produit_id, 0, 20)];

    let err = valoriser(&r, &lignes, &HashMap::new()).unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));
}

#[test]
fn fenetres_de_relais_en_conflit() {
    // [10:00, 11:00) contre [10:30, 11:30) : conflit
    assert!(fenetres_se_chevauchent(t(10, 0), t(11, 0), t(10, 30), t(11, 30)));
    // Fenêtres adjacentes : pas de conflit (bornes hautes exclusives)
    assert!(!fenetres_se_chevauchent(t(10, 0), t(11, 0), t(11, 0), t(12, 0)));
    // Inclusion complète : conflit
    assert!(fenetres_se_chevauchent(t(9, 0), t(12, 0), t(10, 0), t(11, 0)));
}

#[test]
fn cycle_de_vie_nominal_et_annulation() {
    use RelaisStatut::*;

    assert!(Brouillon.transitions().contains(&Soumis));
    assert!(Soumis.transitions().contains(&Valide));
    assert!(Soumis.transitions().contains(&Annule));
    assert!(Valide.transitions().contains(&Transfere));

    // États terminaux
    assert!(Transfere.transitions().is_empty());
    assert!(Annule.transitions().is_empty());

    // Pas de raccourci brouillon → validé ni de retour arrière
    assert!(!Brouillon.transitions().contains(&Valide));
    assert!(!Valide.transitions().contains(&Soumis));
}

#[test]
fn transfert_refuse_si_stock_deja_applique() {
    let mut r = relais(75_000, RelaisStatut::Valide);
    r.verifier_transferable().unwrap();

    r.stock_applique = true;
    let err = r.verifier_transferable().unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));
}

#[test]
fn transfert_refuse_hors_etat_valide() {
    let r = relais(75_000, RelaisStatut::Soumis);
    let err = r.verifier_transferable().unwrap_err();
    assert!(matches!(
        err,
        AppError::InvalidTransition {
            de: "SOUMIS",
            vers: "TRANSFERE"
        }
    ));
}

#[test]
fn payload_refuse_fenetre_inversee_et_produit_duplique() {
    let produit_id = Uuid::new_v4();
    let ligne_ok = NouvelleLigneRelais {
        produit_id,
        index_debut: Decimal::ZERO,
        index_fin: Decimal::from(10),
        jauge_debut: None,
        jauge_fin: None,
        encaisse_ticket: Decimal::ZERO,
    };

    let inverse = NouveauRelais {
        debut_relais: t(14, 0),
        fin_relais: t(6, 0),
        equipe_sortante: "A".into(),
        equipe_entrante: "B".into(),
        encaisse_liquide: Decimal::ZERO,
        encaisse_carte: Decimal::ZERO,
        lignes: vec![ligne_ok.clone()],
    };
    assert!(matches!(
        inverse.valider().unwrap_err(),
        AppError::Validation(_)
    ));

    let duplique = NouveauRelais {
        debut_relais: t(6, 0),
        fin_relais: t(14, 0),
        equipe_sortante: "A".into(),
        equipe_entrante: "B".into(),
        encaisse_liquide: Decimal::ZERO,
        encaisse_carte: Decimal::ZERO,
        lignes: vec![ligne_ok.clone(), ligne_ok],
    };
    assert!(matches!(
        duplique.valider().unwrap_err(),
        AppError::BusinessRule(_)
    ));
}

// Contrat de traçabilité lu par le module comptable et l'audit : les
// mouvements de stock d'un relais portent "RELAIS", son écriture
// financière est clée par ("RelaisEquipe", id) ; un dépotage porte
// "DEPOTAGE" des deux côtés.
#[test]
fn litteraux_de_tracabilite_des_sources() {
    assert_eq!(SOURCE_MOUVEMENT_RELAIS, "RELAIS");
    assert_eq!(SOURCE_FINANCE_RELAIS, "RelaisEquipe");
    assert_eq!(SOURCE_DEPOTAGE, "DEPOTAGE");
}

// La validation re-contrôle l'unicité des produits sur les lignes
// persistées, pas seulement sur le payload de saisie.
#[test]
fn validation_rejette_des_lignes_persistees_dupliquees() {
    let produit_id = Uuid::new_v4();
    let lignes = vec![ligne(produit_id, 0, 10), ligne(produit_id, 10, 30)];

    let produit_ids: Vec<Uuid> = lignes.iter().map(|l| l.produit_id).collect();
    let err = verifier_produits_uniques(&produit_ids).unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));
}

// La valorisation est exposée en camelCase au reste du système.
#[test]
fn valorisation_serialisee_en_camel_case() {
    let produit_id = Uuid::new_v4();
    let r = relais(75_000, RelaisStatut::Soumis);
    let lignes = vec![ligne(produit_id, 10_000, 10_150)];

    let mut prix = HashMap::new();
    prix.insert(produit_id, Decimal::from(500));

    let valorisation = valoriser(&r, &lignes, &prix).unwrap();
    let json = serde_json::to_value(&valorisation).unwrap();

    assert_eq!(json["totalTheorique"], serde_json::json!(75_000.0));
    assert_eq!(json["totalEncaisse"], serde_json::json!(75_000.0));
    assert_eq!(json["ecartCaisse"], serde_json::json!(0.0));
}

// Le volume d'un relais sort toujours de la cuve ACTIVE du produit ;
// les cuves STANDBY comptent dans le disponible mais ne servent pas.
#[test]
fn selection_de_la_cuve_active() {
    let produit_id = Uuid::new_v4();
    let station_id = Uuid::new_v4();

    let cuve = |statut: CuveStatut, stock: i64| Cuve {
        id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        station_id,
        produit_id,
        reference: "C".into(),
        capacite_max: Decimal::from(20_000),
        stock_actuel: Decimal::from(stock),
        seuil_alerte: Decimal::from(1_000),
        statut,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let cuves = vec![
        cuve(CuveStatut::Standby, 3_000),
        cuve(CuveStatut::Active, 5_000),
        cuve(CuveStatut::Maintenance, 9_000),
    ];

    let active: Vec<_> = cuves
        .iter()
        .filter(|c| c.statut == CuveStatut::Active)
        .collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].stock_actuel, Decimal::from(5_000));
}
