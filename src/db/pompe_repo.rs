// src/db/pompe_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::pompe::{IndexPompe, Pompe},
};

#[derive(Clone)]
pub struct PompeRepository {
    pool: PgPool,
}

impl PompeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn lister_par_station(&self, station_id: Uuid) -> Result<Vec<Pompe>, AppError> {
        let pompes = sqlx::query_as::<_, Pompe>(
            "SELECT * FROM pompes WHERE station_id = $1 ORDER BY reference",
        )
        .bind(station_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(pompes)
    }

    pub async fn get_index_for_update<'e, E>(
        &self,
        executor: E,
        index_id: Uuid,
    ) -> Result<IndexPompe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, IndexPompe>("SELECT * FROM index_pompes WHERE id = $1 FOR UPDATE")
            .bind(index_id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("Index de pompe"))
    }

    pub async fn update_index_courant<'e, E>(
        &self,
        executor: E,
        index_id: Uuid,
        index_courant: Decimal,
    ) -> Result<IndexPompe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, IndexPompe>(
            r#"
            UPDATE index_pompes
            SET index_courant = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(index_id)
        .bind(index_courant)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Index de pompe"))
    }
}
