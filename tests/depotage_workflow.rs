// Scénarios du workflow de dépotage : validation du bordereau, cycle de
// vie et garde d'idempotence du transfert.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use station_core::common::error::AppError;
use station_core::models::depotage::{Depotage, DepotageStatut, NouveauDepotage};
use station_core::models::stock::{appliquer_mouvement, TypeMouvement};

fn payload(livree: i64, acceptee: i64) -> NouveauDepotage {
    NouveauDepotage {
        cuve_id: Uuid::new_v4(),
        fournisseur: "Total Distribution".into(),
        date_depotage: Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap(),
        quantite_commandee: Some(Decimal::from(10_000)),
        quantite_livree: Decimal::from(livree),
        quantite_acceptee: Decimal::from(acceptee),
        jauge_avant: Decimal::from(2_000),
        jauge_apres: Decimal::from(2_000 + acceptee),
        prix_unitaire: Decimal::from(450),
        bon_livraison_numero: Some("BL-2025-0042".into()),
    }
}

fn depotage(statut: DepotageStatut, stock_applique: bool) -> Depotage {
    let p = payload(10_000, 9_980);
    Depotage {
        id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        station_id: Uuid::new_v4(),
        cuve_id: p.cuve_id,
        fournisseur: p.fournisseur.clone(),
        date_depotage: p.date_depotage,
        quantite_commandee: p.quantite_commandee,
        quantite_livree: p.quantite_livree,
        quantite_acceptee: p.quantite_acceptee,
        jauge_avant: p.jauge_avant,
        jauge_apres: p.jauge_apres,
        variation_cuve: p.variation_cuve(),
        prix_unitaire: p.prix_unitaire,
        montant_total: p.montant_total(),
        bon_livraison_numero: p.bon_livraison_numero,
        stock_applique,
        statut,
        created_by: None,
        validated_by: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

// La quantité acceptée ne peut pas dépasser la quantité livrée : le
// bordereau est rejeté dès la saisie.
#[test]
fn acceptee_superieure_a_livree_refusee() {
    let p = payload(10_000, 10_050);
    let err = p.valider().unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[test]
fn bordereau_conforme_et_champs_calcules() {
    let p = payload(10_000, 9_980);
    p.valider().unwrap();

    assert_eq!(p.variation_cuve(), Decimal::from(9_980));
    assert_eq!(p.montant_total(), Decimal::from(9_980) * Decimal::from(450));
}

#[test]
fn jauge_apres_inferieure_a_avant_refusee() {
    let mut p = payload(10_000, 9_980);
    p.jauge_apres = Decimal::from(1_500);
    assert!(matches!(p.valider().unwrap_err(), AppError::Validation(_)));
}

#[test]
fn cycle_de_vie_strictement_lineaire() {
    use DepotageStatut::*;

    assert_eq!(Brouillon.transitions(), [Soumis]);
    assert_eq!(Soumis.transitions(), [Confirme]);
    assert_eq!(Confirme.transitions(), [Transfere]);
    assert!(Transfere.transitions().is_empty());

    // Pas de saut d'étape
    assert!(matches!(
        Brouillon.exiger_transition(Confirme).unwrap_err(),
        AppError::InvalidTransition { .. }
    ));
    assert!(matches!(
        Soumis.exiger_transition(Transfere).unwrap_err(),
        AppError::InvalidTransition { .. }
    ));
}

#[test]
fn modification_verrouillee_hors_brouillon() {
    depotage(DepotageStatut::Brouillon, false)
        .verifier_mutable()
        .unwrap();

    let err = depotage(DepotageStatut::Soumis, false)
        .verifier_mutable()
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));
}

// Un transfert rejoué échoue explicitement : le drapeau stock_applique
// tient lieu de garde avant toute prise de verrou.
#[test]
fn transfert_idempotent() {
    depotage(DepotageStatut::Confirme, false)
        .verifier_transferable()
        .unwrap();

    let err = depotage(DepotageStatut::Transfere, true)
        .verifier_transferable()
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidTransition { .. }));

    // Drapeau posé mais statut pas encore basculé (écriture partielle
    // impossible en pratique, la garde couvre quand même ce cas)
    let err = depotage(DepotageStatut::Confirme, true)
        .verifier_transferable()
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));
}

// L'entrée de stock du transfert porte la quantité acceptée, pas la
// quantité livrée.
#[test]
fn entree_de_stock_sur_quantite_acceptee() {
    let d = depotage(DepotageStatut::Confirme, false);
    let stock = appliquer_mouvement(
        Decimal::from(2_000),
        TypeMouvement::Entree,
        d.quantite_acceptee,
        "GASOIL",
    )
    .unwrap();
    assert_eq!(stock, Decimal::from(11_980));
}
