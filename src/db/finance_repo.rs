// src/db/finance_repo.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::finance::{TransactionStation, TypeTransaction},
};

// Puits financier consommé par les transferts de relais et de dépotage.
// L'écriture est idempotente par (source_type, source_id).
#[derive(Clone)]
pub struct FinanceRepository {
    pool: PgPool,
}

impl FinanceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn lister_par_station(
        &self,
        tenant_id: Uuid,
        station_id: Uuid,
    ) -> Result<Vec<TransactionStation>, AppError> {
        let transactions = sqlx::query_as::<_, TransactionStation>(
            r#"
            SELECT * FROM transactions_station
            WHERE tenant_id = $1 AND station_id = $2
            ORDER BY date DESC
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(transactions)
    }

    /// Création si absente, par clé (source_type, source_id). Un retry de
    /// transfert retombe sur l'écriture existante : jamais de double
    /// écriture financière.
    pub async fn get_or_create_transaction<'e, E>(
        &self,
        executor: E,
        tenant_id: Uuid,
        station_id: Uuid,
        type_transaction: TypeTransaction,
        montant: Decimal,
        date: DateTime<Utc>,
        source_type: &str,
        source_id: Uuid,
    ) -> Result<TransactionStation, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        // L'upsert "DO NOTHING" ne retourne rien quand la ligne existe
        // déjà : le SELECT final couvre les deux chemins.
        let transaction = sqlx::query_as::<_, TransactionStation>(
            r#"
            WITH inseree AS (
                INSERT INTO transactions_station
                    (tenant_id, station_id, type_transaction, source_type, source_id,
                     montant, date, finance_statut)
                VALUES ($1, $2, $3, $4, $5, $6, $7, 'PROVISOIRE')
                ON CONFLICT (source_type, source_id) DO NOTHING
                RETURNING *
            )
            SELECT * FROM inseree
            UNION ALL
            SELECT * FROM transactions_station
            WHERE source_type = $4 AND source_id = $5
              AND NOT EXISTS (SELECT 1 FROM inseree)
            "#,
        )
        .bind(tenant_id)
        .bind(station_id)
        .bind(type_transaction)
        .bind(source_type)
        .bind(source_id)
        .bind(montant)
        .bind(date)
        .fetch_one(executor)
        .await?;
        Ok(transaction)
    }
}
