// src/db/prix_repo.rs

use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{common::error::AppError, models::produit::PrixCarburant};

#[derive(Clone)]
pub struct PrixRepository {
    pool: PgPool,
}

impl PrixRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn historique(
        &self,
        tenant_id: Uuid,
        station_id: Uuid,
        produit_id: Uuid,
    ) -> Result<Vec<PrixCarburant>, AppError> {
        let prix = sqlx::query_as::<_, PrixCarburant>(
            r#"
            SELECT * FROM prix_carburants
            WHERE tenant_id = $1 AND station_id = $2 AND produit_id = $3
            ORDER BY date_debut DESC
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .bind(produit_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(prix)
    }

    /// Au plus une ligne active par (tenant, station, produit), garanti
    /// par l'index partiel unique et le chemin d'activation.
    pub async fn prix_actif<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        station_id: Uuid,
        produit_id: Uuid,
    ) -> Result<Option<PrixCarburant>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let prix = sqlx::query_as::<_, PrixCarburant>(
            r#"
            SELECT * FROM prix_carburants
            WHERE tenant_id = $1 AND station_id = $2 AND produit_id = $3 AND actif = true
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .bind(produit_id)
        .fetch_optional(executor)
        .await?;
        Ok(prix)
    }

    /// Lecture simple du prix actif, hors transaction.
    pub async fn prix_actif_courant(
        &self,
        tenant_id: Uuid,
        station_id: Uuid,
        produit_id: Uuid,
    ) -> Result<Option<PrixCarburant>, AppError> {
        self.prix_actif(&self.pool, tenant_id, station_id, produit_id)
            .await
    }

    /// Ferme la ligne active courante : actif = false, date_fin = now().
    /// À exécuter avant l'insertion du nouveau prix, dans la même
    /// transaction (fermer-avant-ouvrir).
    pub async fn fermer_prix_actif<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        station_id: Uuid,
        produit_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query(
            r#"
            UPDATE prix_carburants
            SET actif = false, date_fin = now()
            WHERE tenant_id = $1 AND station_id = $2 AND produit_id = $3 AND actif = true
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .bind(produit_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn creer_actif<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        station_id: Uuid,
        produit_id: Uuid,
        prix_unitaire: Decimal,
        created_by: Uuid,
    ) -> Result<PrixCarburant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let prix = sqlx::query_as::<_, PrixCarburant>(
            r#"
            INSERT INTO prix_carburants
                (tenant_id, station_id, produit_id, prix_unitaire, date_debut, actif, created_by)
            VALUES ($1, $2, $3, $4, now(), true, $5)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .bind(produit_id)
        .bind(prix_unitaire)
        .bind(created_by)
        .fetch_one(executor)
        .await?;
        Ok(prix)
    }
}
