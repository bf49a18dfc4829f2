use serde::{Deserialize, Serialize};

use crate::error::{ReplayError, ReplayResult};

use super::aggregator::{DiffReport, InsightAggregator};
use super::model::Insight;

pub const INSIGHT_REPORT_JSON_SCHEMA_V1: u32 = 1;

/// Serializable export of an insight set, used to persist a baseline across
/// re-runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InsightReport {
    pub insights: Vec<Insight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff: Option<DiffReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightReportJsonContractV1 {
    pub schema_version: u32,
    pub report: InsightReport,
}

impl InsightReport {
    #[must_use]
    pub fn with_diff(mut self, diff: DiffReport) -> Self {
        self.diff = Some(diff);
        self
    }

    pub fn to_json_contract_v1_pretty(&self) -> ReplayResult<String> {
        let payload = InsightReportJsonContractV1 {
            schema_version: INSIGHT_REPORT_JSON_SCHEMA_V1,
            report: self.clone(),
        };
        serde_json::to_string_pretty(&payload).map_err(|e| {
            ReplayError::InvalidData(format!("failed to serialize insight report contract v1: {e}"))
        })
    }

    /// Accepts either a bare report or a versioned contract payload.
    pub fn from_json_compat_str(input: &str) -> ReplayResult<Self> {
        if let Ok(report) = serde_json::from_str::<InsightReport>(input) {
            return Ok(report);
        }
        let payload: InsightReportJsonContractV1 = serde_json::from_str(input).map_err(|e| {
            ReplayError::InvalidData(format!("failed to parse insight report json payload: {e}"))
        })?;
        if payload.schema_version != INSIGHT_REPORT_JSON_SCHEMA_V1 {
            return Err(ReplayError::InvalidData(format!(
                "unsupported insight report schema version: {}",
                payload.schema_version
            )));
        }
        Ok(payload.report)
    }
}

impl InsightAggregator {
    /// Live insights in ranked order.
    #[must_use]
    pub fn report(&self) -> InsightReport {
        InsightReport {
            insights: self.insights_sorted().into_iter().cloned().collect(),
            diff: None,
        }
    }

    /// The current baseline, if any, in capture order.
    #[must_use]
    pub fn baseline_report(&self) -> Option<InsightReport> {
        self.baseline().map(|insights| InsightReport {
            insights: insights.into_iter().cloned().collect(),
            diff: None,
        })
    }

    pub fn restore_baseline_from_json(&mut self, input: &str) -> ReplayResult<usize> {
        let report = InsightReport::from_json_compat_str(input)?;
        let count = report.insights.len();
        self.restore_baseline(report.insights);
        Ok(count)
    }
}
