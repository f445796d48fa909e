// src/db/stock_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::stock::{MouvementStock, TypeMouvement},
};

#[derive(Clone)]
pub struct StockRepository {
    pool: PgPool,
}

impl StockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Journal d'audit d'une cuve, du plus récent au plus ancien.
    pub async fn lister_par_cuve(
        &self,
        tenant_id: Uuid,
        cuve_id: Uuid,
    ) -> Result<Vec<MouvementStock>, AppError> {
        let mouvements = sqlx::query_as::<_, MouvementStock>(
            r#"
            SELECT * FROM mouvements_stock
            WHERE tenant_id = $1 AND cuve_id = $2
            ORDER BY date_mouvement DESC
            "#,
        )
        .bind(tenant_id)
        .bind(cuve_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(mouvements)
    }

    /// Insère une écriture immuable du livre des mouvements. Toujours
    /// appelée dans la transaction qui met à jour `stock_actuel`.
    pub async fn inserer_mouvement<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        station_id: Uuid,
        cuve_id: Uuid,
        type_mouvement: TypeMouvement,
        quantite: Decimal,
        source_type: &str,
        source_id: Uuid,
        date_mouvement: DateTime<Utc>,
    ) -> Result<MouvementStock, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mouvement = sqlx::query_as::<_, MouvementStock>(
            r#"
            INSERT INTO mouvements_stock
                (tenant_id, station_id, cuve_id, type_mouvement, quantite,
                 source_type, source_id, date_mouvement)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .bind(cuve_id)
        .bind(type_mouvement)
        .bind(quantite)
        .bind(source_type)
        .bind(source_id)
        .bind(date_mouvement)
        .fetch_one(executor)
        .await?;
        Ok(mouvement)
    }
}
