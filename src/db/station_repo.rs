// src/db/station_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        produit::{NouveauProduit, ProduitCarburant},
        tenancy::Station,
    },
};

#[derive(Clone)]
pub struct StationRepository {
    pool: PgPool,
}

impl StationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Les lectures prennent l'exécuteur de l'appelant : une transaction
    // qui détient déjà des verrous ne doit pas retourner piocher une
    // connexion dans la pool.
    pub async fn get_station<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        station_id: Uuid,
    ) -> Result<Station, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Station>("SELECT * FROM stations WHERE id = $1 AND tenant_id = $2")
            .bind(station_id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("Station"))
    }

    pub async fn get_produit<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        produit_id: Uuid,
    ) -> Result<ProduitCarburant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ProduitCarburant>(
            "SELECT * FROM produits_carburant WHERE id = $1 AND tenant_id = $2",
        )
        .bind(produit_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Produit carburant"))
    }

    /// Lecture simple du catalogue, hors transaction.
    pub async fn get_produit_catalogue(
        &self,
        tenant_id: Uuid,
        produit_id: Uuid,
    ) -> Result<ProduitCarburant, AppError> {
        self.get_produit(&self.pool, tenant_id, produit_id).await
    }

    /// Verrou ligne sur le produit : sérialise les activations de prix
    /// concurrentes pour un même (station, produit).
    pub async fn get_produit_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        produit_id: Uuid,
    ) -> Result<ProduitCarburant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ProduitCarburant>(
            "SELECT * FROM produits_carburant WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(produit_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Produit carburant"))
    }

    pub async fn creer_produit<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        payload: &NouveauProduit,
    ) -> Result<ProduitCarburant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ProduitCarburant>(
            r#"
            INSERT INTO produits_carburant (tenant_id, code, nom, seuil_critique_percent)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(&payload.code)
        .bind(&payload.nom)
        .bind(payload.seuil_critique_percent)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::BusinessRule(format!(
                        "Le code produit {} existe déjà pour ce tenant.",
                        payload.code
                    ));
                }
            }
            e.into()
        })
    }

    pub async fn update_produit_actif<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        produit_id: Uuid,
        actif: bool,
    ) -> Result<ProduitCarburant, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, ProduitCarburant>(
            r#"
            UPDATE produits_carburant
            SET actif = $3
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(produit_id)
        .bind(tenant_id)
        .bind(actif)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Produit carburant"))
    }
}
