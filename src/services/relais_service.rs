// src/services/relais_service.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        context::{ActionStation, OperationContext},
        error::AppError,
    },
    db::{CuveRepository, FinanceRepository, PrixRepository, RelaisRepository, StationRepository},
    models::{
        cuve::CuveStatut,
        finance::TypeTransaction,
        relais::{
            controler_ecart, total_encaisse, valoriser, verifier_produits_uniques, NouveauRelais,
            RelaisEquipe, RelaisProduit, RelaisStatut, ValorisationRelais,
        },
        stock::TypeMouvement,
    },
    services::stock_service::{est_stock_critique, stock_global_utilisable, StockService},
};

/// Type de source inscrit sur les mouvements de stock d'un relais.
pub const SOURCE_MOUVEMENT_RELAIS: &str = "RELAIS";

/// Clé d'idempotence de l'écriture comptable d'un relais : le module
/// financier la retrouve par ("RelaisEquipe", relais.id).
pub const SOURCE_FINANCE_RELAIS: &str = "RelaisEquipe";

#[derive(Clone)]
pub struct RelaisService {
    relais_repo: RelaisRepository,
    cuve_repo: CuveRepository,
    prix_repo: PrixRepository,
    station_repo: StationRepository,
    finance_repo: FinanceRepository,
    stock_service: StockService,
}

impl RelaisService {
    pub fn new(
        relais_repo: RelaisRepository,
        cuve_repo: CuveRepository,
        prix_repo: PrixRepository,
        station_repo: StationRepository,
        finance_repo: FinanceRepository,
        stock_service: StockService,
    ) -> Self {
        Self {
            relais_repo,
            cuve_repo,
            prix_repo,
            station_repo,
            finance_repo,
            stock_service,
        }
    }

    // --- Cycle de vie : brouillon ---

    pub async fn creer<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        payload: &NouveauRelais,
    ) -> Result<RelaisEquipe, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::CreerRelais)?;
        payload.valider()?;

        let mut tx = executor.begin().await?;

        self.refuser_chevauchement(&mut tx, ctx, payload, None)
            .await?;

        let relais = self
            .relais_repo
            .creer_relais(&mut *tx, ctx.tenant_id, ctx.station_id, payload, ctx.actor_id)
            .await?;

        for ligne in &payload.lignes {
            self.relais_repo
                .inserer_ligne(&mut *tx, relais.id, ligne)
                .await?;
        }

        tx.commit().await?;

        tracing::info!(relais_id = %relais.id, "relais créé en brouillon");
        Ok(relais)
    }

    pub async fn modifier<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        relais_id: Uuid,
        payload: &NouveauRelais,
    ) -> Result<RelaisEquipe, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::ModifierRelais)?;
        payload.valider()?;

        let mut tx = executor.begin().await?;

        let relais = self.relais_verrouille(&mut tx, ctx, relais_id).await?;
        relais.verifier_mutable()?;

        self.refuser_chevauchement(&mut tx, ctx, payload, Some(relais_id))
            .await?;

        // Les lignes sont remplacées intégralement, pas fusionnées.
        let relais = self
            .relais_repo
            .modifier_entete(&mut *tx, ctx.tenant_id, relais_id, payload)
            .await?;
        self.relais_repo.supprimer_lignes(&mut *tx, relais_id).await?;
        for ligne in &payload.lignes {
            self.relais_repo
                .inserer_ligne(&mut *tx, relais_id, ligne)
                .await?;
        }

        tx.commit().await?;
        Ok(relais)
    }

    pub async fn supprimer<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        relais_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::SupprimerRelais)?;

        let mut tx = executor.begin().await?;

        let relais = self.relais_verrouille(&mut tx, ctx, relais_id).await?;
        relais.verifier_mutable()?;

        self.relais_repo.supprimer_lignes(&mut *tx, relais_id).await?;
        self.relais_repo
            .supprimer_relais(&mut *tx, ctx.tenant_id, relais_id)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    // --- Cycle de vie : workflow ---

    /// BROUILLON → SOUMIS. Le chevauchement est re-vérifié sous verrou :
    /// deux brouillons concurrents sur la même fenêtre peuvent coexister,
    /// un seul peut être soumis.
    pub async fn soumettre<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        relais_id: Uuid,
    ) -> Result<RelaisEquipe, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::SoumettreRelais)?;

        let mut tx = executor.begin().await?;

        let relais = self.relais_verrouille(&mut tx, ctx, relais_id).await?;
        relais.statut.exiger_transition(RelaisStatut::Soumis)?;

        let conflit = self
            .relais_repo
            .chevauchement_existe(
                &mut *tx,
                ctx.tenant_id,
                ctx.station_id,
                relais.debut_relais,
                relais.fin_relais,
                Some(relais_id),
            )
            .await?;
        if conflit {
            return Err(AppError::BusinessRule(
                "Un relais non annulé chevauche déjà cette plage horaire.".into(),
            ));
        }

        let relais = self
            .relais_repo
            .marquer_soumis(&mut *tx, ctx.tenant_id, relais_id, ctx.actor_id)
            .await?;

        tx.commit().await?;

        tracing::info!(relais_id = %relais.id, "relais soumis");
        Ok(relais)
    }

    /// SOUMIS → VALIDE : contrôle financier. Chaque ligne est valorisée
    /// au prix actif de son produit et l'écart de caisse est confronté à
    /// la tolérance de la station.
    pub async fn valider<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        relais_id: Uuid,
    ) -> Result<(RelaisEquipe, ValorisationRelais), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::ValiderRelais)?;

        let mut tx = executor.begin().await?;

        let relais = self.relais_verrouille(&mut tx, ctx, relais_id).await?;
        relais.statut.exiger_transition(RelaisStatut::Valide)?;

        let lignes = self.relais_repo.lignes(&mut *tx, relais_id).await?;

        // Re-contrôle d'unicité sur les lignes chargées, en plus de la
        // contrainte unique (relais_id, produit_id) du schéma.
        let produit_ids: Vec<Uuid> = lignes.iter().map(|l| l.produit_id).collect();
        verifier_produits_uniques(&produit_ids)?;

        let station = self
            .station_repo
            .get_station(&mut *tx, ctx.tenant_id, ctx.station_id)
            .await?;

        let mut prix_par_produit: HashMap<Uuid, Decimal> = HashMap::new();
        for ligne in &lignes {
            if let Some(prix) = self
                .prix_repo
                .prix_actif(&mut *tx, ctx.tenant_id, ctx.station_id, ligne.produit_id)
                .await?
            {
                prix_par_produit.insert(ligne.produit_id, prix.prix_unitaire);
            }
        }

        let valorisation = valoriser(&relais, &lignes, &prix_par_produit)?;
        controler_ecart(&valorisation, station.seuil_tolerance)?;

        let relais = self
            .relais_repo
            .marquer_valide(&mut *tx, ctx.tenant_id, relais_id, ctx.actor_id)
            .await?;

        tx.commit().await?;

        tracing::info!(
            relais_id = %relais.id,
            ecart = %valorisation.ecart_caisse,
            "relais validé"
        );
        Ok((relais, valorisation))
    }

    /// SOUMIS → ANNULE, terminal. Un relais annulé libère sa plage
    /// horaire (exclu du contrôle de chevauchement).
    pub async fn annuler<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        relais_id: Uuid,
    ) -> Result<RelaisEquipe, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::AnnulerRelais)?;

        let mut tx = executor.begin().await?;

        let relais = self.relais_verrouille(&mut tx, ctx, relais_id).await?;
        relais.statut.exiger_transition(RelaisStatut::Annule)?;

        let relais = self
            .relais_repo
            .marquer_statut(&mut *tx, ctx.tenant_id, relais_id, RelaisStatut::Annule)
            .await?;

        tx.commit().await?;
        Ok(relais)
    }

    /// VALIDE → TRANSFERE : application du stock et écriture financière,
    /// atomiques. Pour chaque ligne, le volume vendu sort de la cuve
    /// ACTIVE du produit ; l'encaissement total devient une RECETTE.
    ///
    /// Idempotence : `stock_applique` est vérifié sous verrou avant tout
    /// effet, et la transaction financière est créée via upsert sur
    /// (source_type, source_id). Une réinvocation échoue sans double
    /// application.
    pub async fn transferer<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        relais_id: Uuid,
    ) -> Result<RelaisEquipe, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::TransfererRelais)?;

        let mut tx = executor.begin().await?;

        // 1. Verrou + garde d'idempotence avant tout effet
        let relais = self.relais_verrouille(&mut tx, ctx, relais_id).await?;
        relais.verifier_transferable()?;

        let lignes = self.relais_repo.lignes(&mut *tx, relais_id).await?;

        // 2. Application du stock, ligne par ligne dans l'ordre des ids
        for ligne in &lignes {
            self.appliquer_sortie_ligne(&mut tx, ctx, &relais, ligne)
                .await?;
        }

        // 3. Écriture financière idempotente
        let montant = total_encaisse(&relais, &lignes);
        self.finance_repo
            .get_or_create_transaction(
                &mut *tx,
                ctx.tenant_id,
                ctx.station_id,
                TypeTransaction::Recette,
                montant,
                relais.fin_relais,
                SOURCE_FINANCE_RELAIS,
                relais.id,
            )
            .await?;

        // 4. Bascule terminale
        let relais = self
            .relais_repo
            .marquer_transfere(&mut *tx, ctx.tenant_id, relais_id)
            .await?;

        tx.commit().await?;

        tracing::info!(
            relais_id = %relais.id,
            montant = %montant,
            "relais transféré : stock appliqué et recette enregistrée"
        );
        Ok(relais)
    }

    // --- Lectures ---

    pub async fn lister(&self, ctx: &OperationContext) -> Result<Vec<RelaisEquipe>, AppError> {
        self.relais_repo
            .lister_par_station(ctx.tenant_id, ctx.station_id)
            .await
    }

    pub async fn detail<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        relais_id: Uuid,
    ) -> Result<(RelaisEquipe, Vec<RelaisProduit>), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;
        let relais = self
            .relais_repo
            .get_relais(&mut *tx, ctx.tenant_id, relais_id)
            .await?;
        if relais.station_id != ctx.station_id {
            return Err(AppError::NotFound("Relais"));
        }
        let lignes = self.relais_repo.lignes(&mut *tx, relais_id).await?;
        tx.commit().await?;
        Ok((relais, lignes))
    }

    // --- Internes ---

    async fn relais_verrouille(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        ctx: &OperationContext,
        relais_id: Uuid,
    ) -> Result<RelaisEquipe, AppError> {
        let relais = self
            .relais_repo
            .get_relais_for_update(&mut **tx, ctx.tenant_id, relais_id)
            .await?;
        if relais.station_id != ctx.station_id {
            return Err(AppError::NotFound("Relais"));
        }
        Ok(relais)
    }

    async fn refuser_chevauchement(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        ctx: &OperationContext,
        payload: &NouveauRelais,
        exclure: Option<Uuid>,
    ) -> Result<(), AppError> {
        let conflit = self
            .relais_repo
            .chevauchement_existe(
                &mut **tx,
                ctx.tenant_id,
                ctx.station_id,
                payload.debut_relais,
                payload.fin_relais,
                exclure,
            )
            .await?;
        if conflit {
            return Err(AppError::BusinessRule(
                "Un relais non annulé chevauche déjà cette plage horaire.".into(),
            ));
        }
        Ok(())
    }

    /// Sortie de stock d'une ligne de relais. Les cuves du produit sont
    /// verrouillées en ordre d'id (pas d'interblocage entre transferts
    /// concurrents), puis trois gardes s'appliquent avant le mouvement :
    /// stock global suffisant, seuil critique non franchi, cuve ACTIVE
    /// présente.
    async fn appliquer_sortie_ligne(
        &self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
        ctx: &OperationContext,
        relais: &RelaisEquipe,
        ligne: &RelaisProduit,
    ) -> Result<(), AppError> {
        let volume = ligne.volume_vendu();
        // Ligne purement déclarative (aucune vente) : rien à sortir.
        if volume <= Decimal::ZERO {
            return Ok(());
        }

        let produit = self
            .station_repo
            .get_produit(&mut **tx, ctx.tenant_id, ligne.produit_id)
            .await?;

        let cuves = self
            .cuve_repo
            .lister_par_produit_for_update(&mut **tx, ctx.tenant_id, ctx.station_id, ligne.produit_id)
            .await?;

        let disponible = stock_global_utilisable(&cuves);
        if disponible < volume {
            return Err(AppError::InsufficientStock {
                produit: produit.code.clone(),
                disponible,
                demande: volume,
            });
        }

        if est_stock_critique(&cuves, produit.seuil_critique_percent, volume) {
            return Err(AppError::CriticalStockBlock {
                produit: produit.code.clone(),
            });
        }

        let cuve_active = cuves
            .iter()
            .find(|c| c.statut == CuveStatut::Active)
            .ok_or_else(|| AppError::NoActiveTank(produit.code.clone()))?;

        self.stock_service
            .enregistrer_mouvement(
                &mut **tx,
                ctx,
                cuve_active.id,
                TypeMouvement::Sortie,
                volume,
                SOURCE_MOUVEMENT_RELAIS,
                relais.id,
                relais.fin_relais,
            )
            .await?;

        Ok(())
    }
}
