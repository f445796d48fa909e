pub mod cuve;
pub mod depotage;
pub mod finance;
pub mod pompe;
pub mod produit;
pub mod relais;
pub mod stock;
pub mod tenancy;
