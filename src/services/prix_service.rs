// src/services/prix_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        context::{ActionStation, OperationContext},
        error::AppError,
    },
    db::{PrixRepository, StationRepository},
    models::produit::{NouveauPrix, PrixCarburant, ProduitCarburant},
};

#[derive(Clone)]
pub struct PrixService {
    prix_repo: PrixRepository,
    station_repo: StationRepository,
}

impl PrixService {
    pub fn new(prix_repo: PrixRepository, station_repo: StationRepository) -> Self {
        Self {
            prix_repo,
            station_repo,
        }
    }

    /// Active un nouveau prix pour un produit : ferme le prix actif
    /// courant puis ouvre le nouveau. Au plus un prix actif par
    /// (station, produit) ; le verrou sur le produit sérialise les
    /// activations concurrentes.
    pub async fn activer_prix<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        payload: &NouveauPrix,
    ) -> Result<PrixCarburant, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::ActiverPrix)?;
        payload.valider()?;

        let mut tx = executor.begin().await?;

        // 1. Verrou produit : point de sérialisation des activations
        let produit = self
            .station_repo
            .get_produit_for_update(&mut *tx, ctx.tenant_id, payload.produit_id)
            .await?;

        if !produit.actif {
            return Err(AppError::BusinessRule(format!(
                "Le produit {} est désactivé : activation de prix refusée.",
                produit.code
            )));
        }

        // 2. Fermeture du prix actif courant (date_fin = maintenant)
        self.prix_repo
            .fermer_prix_actif(&mut *tx, ctx.tenant_id, ctx.station_id, payload.produit_id)
            .await?;

        // 3. Ouverture du nouveau prix
        let prix = self
            .prix_repo
            .creer_actif(
                &mut *tx,
                ctx.tenant_id,
                ctx.station_id,
                payload.produit_id,
                payload.prix_unitaire,
                ctx.actor_id,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            produit = %produit.code,
            prix = %prix.prix_unitaire,
            "nouveau prix activé"
        );

        Ok(prix)
    }

    pub async fn prix_actif(
        &self,
        ctx: &OperationContext,
        produit_id: Uuid,
    ) -> Result<Option<PrixCarburant>, AppError> {
        self.prix_repo
            .prix_actif_courant(ctx.tenant_id, ctx.station_id, produit_id)
            .await
    }

    pub async fn historique(
        &self,
        ctx: &OperationContext,
        produit_id: Uuid,
    ) -> Result<Vec<PrixCarburant>, AppError> {
        self.prix_repo
            .historique(ctx.tenant_id, ctx.station_id, produit_id)
            .await
    }

    pub async fn creer_produit<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        payload: &crate::models::produit::NouveauProduit,
    ) -> Result<ProduitCarburant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        payload.valider()?;
        self.station_repo
            .creer_produit(executor, ctx.tenant_id, payload)
            .await
    }
}
