pub mod analysis_service;
pub mod criteria_service;
pub mod indicators;
pub mod notification_service;
pub mod price_service;
pub mod screening_service;
