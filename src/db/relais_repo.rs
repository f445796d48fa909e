// src/db/relais_repo.rs

use chrono::{DateTime, Utc};
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::relais::{NouveauRelais, NouvelleLigneRelais, RelaisEquipe, RelaisProduit, RelaisStatut},
};

#[derive(Clone)]
pub struct RelaisRepository {
    pool: PgPool,
}

impl RelaisRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ---
    // Lectures
    // ---

    pub async fn lister_par_station(
        &self,
        tenant_id: Uuid,
        station_id: Uuid,
    ) -> Result<Vec<RelaisEquipe>, AppError> {
        let relais = sqlx::query_as::<_, RelaisEquipe>(
            r#"
            SELECT * FROM relais_equipe
            WHERE tenant_id = $1 AND station_id = $2
            ORDER BY debut_relais DESC
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(relais)
    }

    pub async fn get_relais<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        relais_id: Uuid,
    ) -> Result<RelaisEquipe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RelaisEquipe>(
            "SELECT * FROM relais_equipe WHERE id = $1 AND tenant_id = $2",
        )
        .bind(relais_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Relais"))
    }

    /// Verrou ligne sur l'en-tête : sérialise deux transferts concurrents
    /// du même relais.
    pub async fn get_relais_for_update<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        relais_id: Uuid,
    ) -> Result<RelaisEquipe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RelaisEquipe>(
            "SELECT * FROM relais_equipe WHERE id = $1 AND tenant_id = $2 FOR UPDATE",
        )
        .bind(relais_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Relais"))
    }

    /// Lignes produit dans l'ordre de stockage : c'est l'ordre de
    /// traitement déterministe du transfert.
    pub async fn lignes<'e, E>(
        &self,
        executor: E,
        relais_id: Uuid,
    ) -> Result<Vec<RelaisProduit>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let lignes = sqlx::query_as::<_, RelaisProduit>(
            "SELECT * FROM relais_produits WHERE relais_id = $1 ORDER BY id",
        )
        .bind(relais_id)
        .fetch_all(executor)
        .await?;
        Ok(lignes)
    }

    /// Un relais existe-t-il déjà sur la station dont la fenêtre
    /// [début, fin) chevauche celle-ci ? Les relais annulés ne comptent pas.
    pub async fn chevauchement_existe<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        station_id: Uuid,
        debut: DateTime<Utc>,
        fin: DateTime<Utc>,
        exclure: Option<Uuid>,
    ) -> Result<bool, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let existe: Option<(Uuid,)> = sqlx::query_as(
            r#"
            SELECT id FROM relais_equipe
            WHERE tenant_id = $1
              AND station_id = $2
              AND statut <> 'ANNULE'
              AND debut_relais < $4
              AND fin_relais > $3
              AND ($5::uuid IS NULL OR id <> $5)
            LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .bind(debut)
        .bind(fin)
        .bind(exclure)
        .fetch_optional(executor)
        .await?;
        Ok(existe.is_some())
    }

    // ---
    // Écritures
    // ---

    pub async fn creer_relais<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        station_id: Uuid,
        payload: &NouveauRelais,
        created_by: Uuid,
    ) -> Result<RelaisEquipe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let relais = sqlx::query_as::<_, RelaisEquipe>(
            r#"
            INSERT INTO relais_equipe
                (tenant_id, station_id, debut_relais, fin_relais,
                 equipe_sortante, equipe_entrante,
                 encaisse_liquide, encaisse_carte, statut, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'BROUILLON', $9)
            RETURNING *
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .bind(payload.debut_relais)
        .bind(payload.fin_relais)
        .bind(&payload.equipe_sortante)
        .bind(&payload.equipe_entrante)
        .bind(payload.encaisse_liquide)
        .bind(payload.encaisse_carte)
        .bind(created_by)
        .fetch_one(executor)
        .await?;
        Ok(relais)
    }

    pub async fn inserer_ligne<'e, E>(
        &self,
        executor: E,
        relais_id: Uuid,
        ligne: &NouvelleLigneRelais,
    ) -> Result<RelaisProduit, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RelaisProduit>(
            r#"
            INSERT INTO relais_produits
                (relais_id, produit_id, index_debut, index_fin,
                 jauge_debut, jauge_fin, encaisse_ticket)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(relais_id)
        .bind(ligne.produit_id)
        .bind(ligne.index_debut)
        .bind(ligne.index_fin)
        .bind(ligne.jauge_debut)
        .bind(ligne.jauge_fin)
        .bind(ligne.encaisse_ticket)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::BusinessRule(
                        "Un même produit apparaît plusieurs fois dans le relais.".into(),
                    );
                }
            }
            e.into()
        })
    }

    pub async fn modifier_entete<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        relais_id: Uuid,
        payload: &NouveauRelais,
    ) -> Result<RelaisEquipe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RelaisEquipe>(
            r#"
            UPDATE relais_equipe
            SET debut_relais = $3, fin_relais = $4,
                equipe_sortante = $5, equipe_entrante = $6,
                encaisse_liquide = $7, encaisse_carte = $8,
                updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(relais_id)
        .bind(tenant_id)
        .bind(payload.debut_relais)
        .bind(payload.fin_relais)
        .bind(&payload.equipe_sortante)
        .bind(&payload.equipe_entrante)
        .bind(payload.encaisse_liquide)
        .bind(payload.encaisse_carte)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Relais"))
    }

    pub async fn supprimer_lignes<'e, E>(
        &self,
        executor: E,
        relais_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM relais_produits WHERE relais_id = $1")
            .bind(relais_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn supprimer_relais<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        relais_id: Uuid,
    ) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query("DELETE FROM relais_equipe WHERE id = $1 AND tenant_id = $2")
            .bind(relais_id)
            .bind(tenant_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    pub async fn marquer_soumis<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        relais_id: Uuid,
        soumis_par: Uuid,
    ) -> Result<RelaisEquipe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RelaisEquipe>(
            r#"
            UPDATE relais_equipe
            SET statut = 'SOUMIS', soumis_par = $3, soumis_le = now(), updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(relais_id)
        .bind(tenant_id)
        .bind(soumis_par)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Relais"))
    }

    pub async fn marquer_valide<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        relais_id: Uuid,
        valide_par: Uuid,
    ) -> Result<RelaisEquipe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RelaisEquipe>(
            r#"
            UPDATE relais_equipe
            SET statut = 'VALIDE', valide_par = $3, valide_le = now(), updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(relais_id)
        .bind(tenant_id)
        .bind(valide_par)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Relais"))
    }

    pub async fn marquer_statut<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        relais_id: Uuid,
        statut: RelaisStatut,
    ) -> Result<RelaisEquipe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RelaisEquipe>(
            r#"
            UPDATE relais_equipe
            SET statut = $3, updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(relais_id)
        .bind(tenant_id)
        .bind(statut)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Relais"))
    }

    /// Bascule terminale : statut TRANSFERE + stock_applique, en une seule
    /// écriture pour que la garde d'idempotence ne puisse jamais observer
    /// l'un sans l'autre.
    pub async fn marquer_transfere<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        relais_id: Uuid,
    ) -> Result<RelaisEquipe, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, RelaisEquipe>(
            r#"
            UPDATE relais_equipe
            SET statut = 'TRANSFERE', stock_applique = true, updated_at = now()
            WHERE id = $1 AND tenant_id = $2
            RETURNING *
            "#,
        )
        .bind(relais_id)
        .bind(tenant_id)
        .fetch_optional(executor)
        .await?
        .ok_or(AppError::NotFound("Relais"))
    }
}
