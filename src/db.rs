pub mod cuve_repo;
pub use cuve_repo::CuveRepository;
pub mod stock_repo;
pub use stock_repo::StockRepository;
pub mod prix_repo;
pub use prix_repo::PrixRepository;
pub mod relais_repo;
pub use relais_repo::RelaisRepository;
pub mod depotage_repo;
pub use depotage_repo::DepotageRepository;
pub mod finance_repo;
pub use finance_repo::FinanceRepository;
pub mod station_repo;
pub use station_repo::StationRepository;
pub mod pompe_repo;
pub use pompe_repo::PompeRepository;
