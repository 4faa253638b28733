pub mod alerts;
pub mod health;
pub mod screening;
pub mod stocks;
