// src/db/cuve_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::cuve::{Cuve, CuveStatut},
};

#[derive(Clone)]
pub struct CuveRepository {
    pool: PgPool,
}

impl CuveRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Lectures
    // ---
    // Les lectures simples passent par la pool principale.

    pub async fn lister_par_station(
        &self,
        tenant_id: Uuid,
        station_id: Uuid,
    ) -> Result<Vec<Cuve>, AppError> {
        let cuves = sqlx::query_as::<_, Cuve>(
            "SELECT * FROM cuves WHERE tenant_id = $1 AND station_id = $2 ORDER BY reference",
        )
        .bind(tenant_id)
        .bind(station_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(cuves)
    }

    pub async fn lister_par_produit(
        &self,
        tenant_id: Uuid,
        station_id: Uuid,
        produit_id: Uuid,
    ) -> Result<Vec<Cuve>, AppError> {
        let cuves = sqlx::query_as::<_, Cuve>(
            r#"
            SELECT * FROM cuves
            WHERE tenant_id = $1 AND station_id = $2 AND produit_id = $3
            ORDER BY id
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .bind(produit_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(cuves)
    }

    pub async fn get_cuve<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        cuve_id: Uuid,
    ) -> Result<Cuve, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Cuve>("SELECT * FROM cuves WHERE id = $1 AND tenant_id = $2")
            .bind(cuve_id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("Cuve"))
    }

    // ---
    // Verrous (écritures transactionnelles)
    // ---

    /// Verrou ligne : sérialise les mutations de stock/statut concurrentes
    /// sur une même cuve.
    pub async fn get_cuve_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        cuve_id: Uuid,
    ) -> Result<Cuve, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Cuve>(
            "SELECT * FROM cuves WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(cuve_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Cuve"))
    }

    /// Verrouille toutes les cuves d'un (station, produit) dans l'ordre des
    /// ids : ordre d'acquisition déterministe, pas d'interblocage entre deux
    /// transferts concurrents.
    pub async fn lister_par_produit_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        station_id: Uuid,
        produit_id: Uuid,
    ) -> Result<Vec<Cuve>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let cuves = sqlx::query_as::<_, Cuve>(
            r#"
            SELECT * FROM cuves
            WHERE tenant_id = $1 AND station_id = $2 AND produit_id = $3
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .bind(produit_id)
        .fetch_all(executor)
        .await?;
        Ok(cuves)
    }

    // ---
    // Écritures
    // ---

    pub async fn creer_cuve<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        station_id: Uuid,
        produit_id: Uuid,
        reference: &str,
        capacite_max: Decimal,
        seuil_alerte: Decimal,
    ) -> Result<Cuve, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Cuve>(
            r#"
            INSERT INTO cuves
                (tenant_id, station_id, produit_id, reference, capacite_max, seuil_alerte, statut)
            VALUES ($1, $2, $3, $4, $5, $6, 'STANDBY')
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .bind(produit_id)
        .bind(reference)
        .bind(capacite_max)
        .bind(seuil_alerte)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::BusinessRule(format!(
                        "La référence de cuve {} existe déjà pour cette station.",
                        reference
                    ));
                }
            }
            e.into()
        })
    }

    pub async fn update_statut<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        cuve_id: Uuid,
        statut: CuveStatut,
    ) -> Result<Cuve, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Cuve>(
            r#"
            UPDATE cuves
            SET statut = $3, updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(cuve_id)
        .bind(tenant_id)
        .bind(statut)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Cuve"))
    }

    /// Persiste le stock calculé par `appliquer_mouvement`. À n'appeler
    /// que sous verrou ligne, apparié à une écriture de mouvement.
    pub async fn update_stock<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        cuve_id: Uuid,
        nouveau_stock: Decimal,
    ) -> Result<Cuve, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Cuve>(
            r#"
            UPDATE cuves
            SET stock_actuel = $3, updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(cuve_id)
        .bind(tenant_id)
        .bind(nouveau_stock)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Cuve"))
    }

    /// Une cuve ACTIVE existe-t-elle encore pour ce produit ? Consommé par
    /// la désactivation produit.
    pub async fn existe_cuve_active_pour_produit<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        produit_id: Uuid,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let existe: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM cuves
            WHERE tenant_id = $1 AND produit_id = $2 AND statut = 'ACTIVE'
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(produit_id)
        .fetch_optional(executor)
        .await?;
        Ok(existe.is_some())
    }
}
