//! Incremental aggregation of the event stream into ranked insights.

pub mod aggregator;
pub mod classifier;
pub mod model;
pub mod report;
pub mod severity;

pub use aggregator::{DiffReport, InsightAggregator};
pub use classifier::{Classification, InsightClassifier, KeywordClassifier};
pub use model::{Insight, InsightKey, InsightTag, InsightType};
pub use report::{INSIGHT_REPORT_JSON_SCHEMA_V1, InsightReport, InsightReportJsonContractV1};
pub use severity::{MAX_SEVERITY, MIN_SEVERITY, severity_score};
