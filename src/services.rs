pub mod cuve_service;
pub use cuve_service::CuveService;
pub mod stock_service;
pub use stock_service::StockService;
pub mod prix_service;
pub use prix_service::PrixService;
pub mod relais_service;
pub use relais_service::RelaisService;
pub mod depotage_service;
pub use depotage_service::DepotageService;
pub mod pompe_service;
pub use pompe_service::PompeService;
