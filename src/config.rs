// src/config.rs

use sqlx::{postgres::PgPoolOptions, PgPool};
use std::{env, time::Duration};

use crate::{
    db::{
        CuveRepository, DepotageRepository, FinanceRepository, PompeRepository, PrixRepository,
        RelaisRepository, StationRepository, StockRepository,
    },
    services::{
        CuveService, DepotageService, PompeService, PrixService, RelaisService, StockService,
    },
};

/// État partagé du coeur station : le pool et le graphe de services,
/// montés une fois au démarrage puis clonés librement (tout est `Clone`
/// et bon marché, les services ne portent que des repositories).
#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub cuve_service: CuveService,
    pub stock_service: StockService,
    pub prix_service: PrixService,
    pub relais_service: RelaisService,
    pub depotage_service: DepotageService,
    pub pompe_service: PompeService,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").map_err(|_| anyhow::anyhow!("DATABASE_URL doit être définie"))?;

        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&database_url)
            .await?;

        tracing::info!("connexion à la base de données établie");

        Ok(Self::from_pool(db_pool))
    }

    /// Monte le graphe de dépendances sur un pool déjà ouvert.
    pub fn from_pool(db_pool: PgPool) -> Self {
        let cuve_repo = CuveRepository::new(db_pool.clone());
        let stock_repo = StockRepository::new(db_pool.clone());
        let prix_repo = PrixRepository::new(db_pool.clone());
        let relais_repo = RelaisRepository::new(db_pool.clone());
        let depotage_repo = DepotageRepository::new(db_pool.clone());
        let finance_repo = FinanceRepository::new(db_pool.clone());
        let station_repo = StationRepository::new(db_pool.clone());
        let pompe_repo = PompeRepository::new(db_pool.clone());

        let stock_service = StockService::new(
            cuve_repo.clone(),
            stock_repo.clone(),
            station_repo.clone(),
        );
        let cuve_service = CuveService::new(cuve_repo.clone(), station_repo.clone());
        let prix_service = PrixService::new(prix_repo.clone(), station_repo.clone());
        let relais_service = RelaisService::new(
            relais_repo,
            cuve_repo.clone(),
            prix_repo,
            station_repo,
            finance_repo.clone(),
            stock_service.clone(),
        );
        let depotage_service = DepotageService::new(
            depotage_repo,
            cuve_repo,
            finance_repo,
            stock_service.clone(),
        );
        let pompe_service = PompeService::new(pompe_repo);

        Self {
            db_pool,
            cuve_service,
            stock_service,
            prix_service,
            relais_service,
            depotage_service,
            pompe_service,
        }
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!().run(&self.db_pool).await?;
        tracing::info!("migrations exécutées");
        Ok(())
    }
}

/// Initialise le logger. À appeler une seule fois, en tout début de
/// programme ; `RUST_LOG` pilote le niveau.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
