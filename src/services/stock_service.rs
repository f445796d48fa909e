// src/services/stock_service.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{context::OperationContext, error::AppError},
    db::{CuveRepository, StationRepository, StockRepository},
    models::{
        cuve::Cuve,
        stock::{appliquer_mouvement, MouvementStock, TypeMouvement},
    },
};

// ============================================================
// Règles pures : arithmétique de stock sur un jeu de cuves
// ============================================================
// Le total exploitable couvre ACTIVE + STANDBY ; les cuves en
// MAINTENANCE / HORS_SERVICE / EN_DEPOTAGE en sont exclues.

pub fn stock_global_utilisable(cuves: &[Cuve]) -> Decimal {
    cuves
        .iter()
        .filter(|c| c.statut.est_utilisable())
        .map(|c| c.stock_actuel)
        .sum()
}

pub fn capacite_totale_utilisable(cuves: &[Cuve]) -> Decimal {
    cuves
        .iter()
        .filter(|c| c.statut.est_utilisable())
        .map(|c| c.capacite_max)
        .sum()
}

/// Seuil critique réel en litres : pourcentage produit × capacité totale.
pub fn seuil_critique_reel(cuves: &[Cuve], seuil_critique_percent: Decimal) -> Decimal {
    let capacite = capacite_totale_utilisable(cuves);
    if capacite <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    seuil_critique_percent / Decimal::from(100) * capacite
}

/// Le stock passe-t-il au niveau ou sous le seuil critique après la
/// déduction envisagée ?
pub fn est_stock_critique(
    cuves: &[Cuve],
    seuil_critique_percent: Decimal,
    volume_a_deduire: Decimal,
) -> bool {
    let stock_global = stock_global_utilisable(cuves);
    if stock_global <= Decimal::ZERO {
        return true;
    }

    let stock_apres = stock_global - volume_a_deduire;
    stock_apres <= seuil_critique_reel(cuves, seuil_critique_percent)
}

// ============================================================
// Service : chemin d'écriture du livre des mouvements
// ============================================================

#[derive(Clone)]
pub struct StockService {
    cuve_repo: CuveRepository,
    stock_repo: StockRepository,
    station_repo: StationRepository,
}

impl StockService {
    pub fn new(
        cuve_repo: CuveRepository,
        stock_repo: StockRepository,
        station_repo: StationRepository,
    ) -> Self {
        Self {
            cuve_repo,
            stock_repo,
            station_repo,
        }
    }

    /// Enregistre un mouvement et répercute le stock de la cuve, dans une
    /// même (sous-)transaction, sous verrou ligne. C'est l'unique chemin
    /// de mutation de `stock_actuel`.
    pub async fn enregistrer_mouvement<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        cuve_id: Uuid,
        type_mouvement: TypeMouvement,
        quantite: Decimal,
        source_type: &str,
        source_id: Uuid,
        date_mouvement: DateTime<Utc>,
    ) -> Result<MouvementStock, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        // 1. Verrou ligne sur la cuve
        let cuve = self
            .cuve_repo
            .get_cuve_for_update(&mut *tx, ctx.tenant_id, cuve_id)
            .await?;

        let produit = self
            .station_repo
            .get_produit(&mut *tx, ctx.tenant_id, cuve.produit_id)
            .await?;

        // 2. Arithmétique contrôlée (quantité > 0, stock jamais négatif)
        let nouveau_stock =
            appliquer_mouvement(cuve.stock_actuel, type_mouvement, quantite, &produit.code)?;

        // 3. Projection + écriture du livre, appariées
        self.cuve_repo
            .update_stock(&mut *tx, ctx.tenant_id, cuve.id, nouveau_stock)
            .await?;

        let mouvement = self
            .stock_repo
            .inserer_mouvement(
                &mut *tx,
                ctx.tenant_id,
                cuve.station_id,
                cuve.id,
                type_mouvement,
                quantite,
                source_type,
                source_id,
                date_mouvement,
            )
            .await?;

        tx.commit().await?;

        tracing::info!(
            cuve = %cuve.reference,
            mouvement = type_mouvement.as_str(),
            %quantite,
            %nouveau_stock,
            source = source_type,
            "mouvement de stock enregistré"
        );

        Ok(mouvement)
    }

    /// Stock global exploitable (ACTIVE + STANDBY) d'un produit sur une
    /// station.
    pub async fn stock_global(
        &self,
        ctx: &OperationContext,
        produit_id: Uuid,
    ) -> Result<Decimal, AppError> {
        let cuves = self
            .cuve_repo
            .lister_par_produit(ctx.tenant_id, ctx.station_id, produit_id)
            .await?;
        Ok(stock_global_utilisable(&cuves))
    }

    pub async fn capacite_totale(
        &self,
        ctx: &OperationContext,
        produit_id: Uuid,
    ) -> Result<Decimal, AppError> {
        let cuves = self
            .cuve_repo
            .lister_par_produit(ctx.tenant_id, ctx.station_id, produit_id)
            .await?;
        Ok(capacite_totale_utilisable(&cuves))
    }

    pub async fn seuil_critique(
        &self,
        ctx: &OperationContext,
        produit_id: Uuid,
    ) -> Result<Decimal, AppError> {
        let cuves = self
            .cuve_repo
            .lister_par_produit(ctx.tenant_id, ctx.station_id, produit_id)
            .await?;
        let produit = self
            .station_repo
            .get_produit_catalogue(ctx.tenant_id, produit_id)
            .await?;
        Ok(seuil_critique_reel(&cuves, produit.seuil_critique_percent))
    }

    /// Journal d'audit d'une cuve.
    pub async fn mouvements(
        &self,
        ctx: &OperationContext,
        cuve_id: Uuid,
    ) -> Result<Vec<MouvementStock>, AppError> {
        self.stock_repo.lister_par_cuve(ctx.tenant_id, cuve_id).await
    }
}
