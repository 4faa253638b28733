pub mod alphavantage;
pub mod price_provider;
