// src/services/pompe_service.rs

use rust_decimal::Decimal;
use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    common::{
        context::{ActionStation, OperationContext},
        error::AppError,
    },
    db::PompeRepository,
    models::pompe::{IndexPompe, Pompe},
};

#[derive(Clone)]
pub struct PompeService {
    pompe_repo: PompeRepository,
}

impl PompeService {
    pub fn new(pompe_repo: PompeRepository) -> Self {
        Self { pompe_repo }
    }

    pub async fn lister_pompes(&self, ctx: &OperationContext) -> Result<Vec<Pompe>, AppError> {
        self.pompe_repo.lister_par_station(ctx.station_id).await
    }

    /// Relève un index de pompe. Les index sont des compteurs physiques :
    /// ils ne reculent jamais, le verrou ligne sérialise les relevés
    /// concurrents sur le même compteur.
    pub async fn relever_index<'e, E>(
        &self,
        executor: E,
        ctx: &OperationContext,
        index_id: Uuid,
        nouvelle_valeur: Decimal,
    ) -> Result<IndexPompe, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        ctx.exiger(ActionStation::ReleverIndex)?;

        let mut tx = executor.begin().await?;

        let index = self
            .pompe_repo
            .get_index_for_update(&mut *tx, index_id)
            .await?;

        index.verifier_releve(nouvelle_valeur)?;

        let index = self
            .pompe_repo
            .update_index_courant(&mut *tx, index_id, nouvelle_valeur)
            .await?;

        tx.commit().await?;

        tracing::info!(index_id = %index.id, valeur = %nouvelle_valeur, "index de pompe relevé");
        Ok(index)
    }
}
