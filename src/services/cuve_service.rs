// src/services/cuve_service.rs

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        context::{ActionStation, OperationContext},
        error::AppError,
    },
    db::{CuveRepository, StationRepository},
    models::cuve::{planifier_activation, Cuve, CuveStatut},
};

#[derive(Clone)]
pub struct CuveService {
    cuve_repo: CuveRepository,
    station_repo: StationRepository,
}

impl CuveService {
    pub fn new(cuve_repo: CuveRepository, station_repo: StationRepository) -> Self {
        Self {
            cuve_repo,
            station_repo,
        }
    }

    pub async fn creer_cuve<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        produit_id: Uuid,
        reference: &str,
        capacite_max: Decimal,
        seuil_alerte: Decimal,
    ) -> Result<Cuve, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        if capacite_max <= Decimal::ZERO {
            return Err(AppError::Validation(
                "La capacité d'une cuve doit être strictement positive.".into(),
            ));
        }

        let mut tx = executor.begin().await?;

        let produit = self
            .station_repo
            .get_produit(&mut *tx, ctx.tenant_id, produit_id)
            .await?;
        if !produit.actif {
            return Err(AppError::BusinessRule(format!(
                "Le produit {} est désactivé.",
                produit.code
            )));
        }

        let cuve = self
            .cuve_repo
            .creer_cuve(
                &mut *tx,
                ctx.tenant_id,
                ctx.station_id,
                produit_id,
                reference,
                capacite_max,
                seuil_alerte,
            )
            .await?;

        tx.commit().await?;
        Ok(cuve)
    }

    pub async fn lister_cuves(&self, ctx: &OperationContext) -> Result<Vec<Cuve>, AppError> {
        self.cuve_repo
            .lister_par_station(ctx.tenant_id, ctx.station_id)
            .await
    }

    /// Change le statut opérationnel d'une cuve.
    ///
    /// - no-op si le statut demandé est le statut courant ;
    /// - transition validée contre la table unique de `CuveStatut` ;
    /// - entrée en ACTIVE : stock > 0 exigé, et toute autre cuve ACTIVE
    ///   du même (station, produit) bascule en STANDBY dans la même
    ///   transaction (au plus une cuve ACTIVE par produit).
    pub async fn changer_statut<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        cuve_id: Uuid,
        nouveau_statut: CuveStatut,
    ) -> Result<Cuve, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::ChangerStatutCuve)?;

        let mut tx = executor.begin().await?;

        let cuve = self
            .cuve_repo
            .get_cuve_for_update(&mut *tx, ctx.tenant_id, cuve_id)
            .await?;

        if cuve.station_id != ctx.station_id {
            return Err(AppError::NotFound("Cuve"));
        }

        if cuve.statut == nouveau_statut {
            return Ok(cuve);
        }

        let cuve = if nouveau_statut == CuveStatut::Active {
            // Verrouille toutes les cuves soeurs : deux activations
            // concurrentes se sérialisent ici, la seconde voit la
            // première déjà ACTIVE et la bascule.
            let voisines = self
                .cuve_repo
                .lister_par_produit_for_update(
                    &mut *tx,
                    ctx.tenant_id,
                    cuve.station_id,
                    cuve.produit_id,
                )
                .await?;

            let a_basculer = planifier_activation(&cuve, &voisines)?;

            for id in a_basculer {
                self.cuve_repo
                    .update_statut(&mut *tx, ctx.tenant_id, id, CuveStatut::Standby)
                    .await?;
                tracing::info!(cuve_id = %id, "cuve basculée en STANDBY");
            }

            self.cuve_repo
                .update_statut(&mut *tx, ctx.tenant_id, cuve.id, CuveStatut::Active)
                .await?
        } else {
            if !cuve.statut.peut_transiter_vers(nouveau_statut) {
                return Err(AppError::InvalidTransition {
                    de: cuve.statut.as_str(),
                    vers: nouveau_statut.as_str(),
                });
            }

            self.cuve_repo
                .update_statut(&mut *tx, ctx.tenant_id, cuve.id, nouveau_statut)
                .await?
        };

        tx.commit().await?;

        tracing::info!(
            cuve = %cuve.reference,
            statut = cuve.statut.as_str(),
            "statut de cuve changé"
        );

        Ok(cuve)
    }

    /// Désactive un produit du catalogue. Refusé tant qu'une cuve ACTIVE
    /// existe pour lui.
    pub async fn desactiver_produit<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        produit_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::DesactiverProduit)?;

        let mut tx = executor.begin().await?;

        let active = self
            .cuve_repo
            .existe_cuve_active_pour_produit(&mut *tx, ctx.tenant_id, produit_id)
            .await?;
        if active {
            return Err(AppError::BusinessRule(
                "Impossible de désactiver : une cuve ACTIVE existe pour ce produit.".into(),
            ));
        }

        self.station_repo
            .update_produit_actif(&mut *tx, ctx.tenant_id, produit_id, false)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
