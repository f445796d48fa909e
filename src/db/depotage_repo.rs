// src/db/depotage_repo.rs

use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::depotage::{Depotage, NouveauDepotage},
};

#[derive(Clone)]
pub struct DepotageRepository {
    pool: PgPool,
}

impl DepotageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn lister_par_station(
        &self,
        tenant_id: Uuid,
        station_id: Uuid,
    ) -> Result<Vec<Depotage>, AppError> {
        let depotages = sqlx::query_as::<_, Depotage>(
            r#"
            SELECT * FROM depotages
            WHERE tenant_id = $1 AND station_id = $2
            ORDER BY date_depotage DESC
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(depotages)
    }

    pub async fn get_depotage<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        depotage_id: Uuid,
    ) -> Result<Depotage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Depotage>("SELECT * FROM depotages WHERE id = $1 AND tenant_id = $2")
            .bind(depotage_id)
            .bind(tenant_id)
            .fetch_optional(executor)
            .await?
            .ok_or(AppError::NotFound("Dépotage"))
    }

    pub async fn get_depotage_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        depotage_id: Uuid,
    ) -> Result<Depotage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Depotage>(
            "SELECT * FROM depotages WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(depotage_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Dépotage"))
    }

    pub async fn creer_depotage<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        station_id: Uuid,
        payload: &NouveauDepotage,
        created_by: Uuid,
    ) -> Result<Depotage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let depotage = sqlx::query_as::<_, Depotage>(
            r#"
            INSERT INTO depotages
                (tenant_id, station_id, cuve_id, fournisseur, date_depotage,
                 quantite_commandee, quantite_livree, quantite_acceptee,
                 jauge_avant, jauge_apres, variation_cuve,
                 prix_unitaire, montant_total, bon_livraison_numero,
                 statut, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    'BROUILLON', $15)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .bind(payload.cuve_id)
        .bind(&payload.fournisseur)
        .bind(payload.date_depotage)
        .bind(payload.quantite_commandee)
        .bind(payload.quantite_livree)
        .bind(payload.quantite_acceptee)
        .bind(payload.jauge_avant)
        .bind(payload.jauge_apres)
        .bind(payload.variation_cuve())
        .bind(payload.prix_unitaire)
        .bind(payload.montant_total())
        .bind(&payload.bon_livraison_numero)
        .bind(created_by)
        .fetch_one(executor)
        .await?;
        Ok(depotage)
    }

    /// Mise à jour pré-confirmation : les champs calculés (variation,
    /// montant) sont recalculés à partir du payload.
    pub async fn modifier_depotage<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        depotage_id: Uuid,
        payload: &NouveauDepotage,
    ) -> Result<Depotage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Depotage>(
            r#"
            UPDATE depotages
            SET cuve_id = $3, fournisseur = $4, date_depotage = $5,
                quantite_commandee = $6, quantite_livree = $7, quantite_acceptee = $8,
                jauge_avant = $9, jauge_apres = $10, variation_cuve = $11,
                prix_unitaire = $12, montant_total = $13, bon_livraison_numero = $14,
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(depotage_id)
        .bind(tenant_id)
        .bind(payload.cuve_id)
        .bind(&payload.fournisseur)
        .bind(payload.date_depotage)
        .bind(payload.quantite_commandee)
        .bind(payload.quantite_livree)
        .bind(payload.quantite_acceptee)
        .bind(payload.jauge_avant)
        .bind(payload.jauge_apres)
        .bind(payload.variation_cuve())
        .bind(payload.prix_unitaire)
        .bind(payload.montant_total())
        .bind(&payload.bon_livraison_numero)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Dépotage"))
    }

    pub async fn marquer_soumis<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        depotage_id: Uuid,
    ) -> Result<Depotage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Depotage>(
            r#"
            UPDATE depotages
            SET statut = 'SOUMIS', updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(depotage_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Dépotage"))
    }

    pub async fn marquer_confirme<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        depotage_id: Uuid,
        validated_by: Uuid,
    ) -> Result<Depotage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Depotage>(
            r#"
            UPDATE depotages
            SET statut = 'CONFIRME', validated_by = $3, updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(depotage_id)
        .bind(tenant_id)
        .bind(validated_by)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Dépotage"))
    }

    /// Bascule terminale TRANSFERE + stock_applique en une seule écriture.
    pub async fn marquer_transfere<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        depotage_id: Uuid,
    ) -> Result<Depotage, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Depotage>(
            r#"
            UPDATE depotages
            SET statut = 'TRANSFERE', stock_applique = true, updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(depotage_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Dépotage"))
    }
}
