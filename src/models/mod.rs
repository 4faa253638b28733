pub mod alert;
pub mod fundamentals;
pub mod price_bar;
pub mod screening;
pub mod stock;

pub use alert::{
    AlertPreviewRequest, EmailContent, NotificationDispatch, NotificationFrequency, PendingAlert,
    ProcessAlertsRequest, ProcessAlertsResponse,
};
pub use fundamentals::{FundamentalMetrics, FundamentalsSnapshot};
pub use price_bar::{PriceBar, WeeklyBar};
pub use screening::{
    AnalystCoverage, AnalystRecommendations, BaseFormation, BatchScreeningEntry,
    BatchScreeningRequest, BatchScreeningResponse, EvaluateRequest, MediaAnalysis, PriceRange,
    PriceTargets, ScreeningConfig, ScreeningContext, ScreeningResponse, ScreeningVerdict,
    SectorAnalysis, SectorTrend, SentimentIndicators, SentimentLabel, TechnicalSignals,
    VolumeProfile, VolumeTrend, WeeklyCloses,
};
pub use stock::{
    CriterionOperator, CriterionType, CriterionValue, ScreenerCriteria, StockData, StockQuote,
    StockScreenRequest, TechnicalIndicators,
};
