use indexmap::IndexMap;
use indexmap::map::Entry;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::SeverityConfig;
use crate::core::{Event, EventStatus};
use crate::error::ReplayResult;

use super::classifier::{InsightClassifier, KeywordClassifier};
use super::model::{Insight, InsightKey};
use super::severity::severity_score;

/// Outcome of comparing the live insight set against the baseline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffReport {
    pub resolved: Vec<InsightKey>,
    pub improved: Vec<InsightKey>,
    pub regressed: Vec<InsightKey>,
    pub unchanged: Vec<InsightKey>,
    pub new: Vec<InsightKey>,
}

impl DiffReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
            && self.improved.is_empty()
            && self.regressed.is_empty()
            && self.unchanged.is_empty()
            && self.new.is_empty()
    }
}

/// Folds the event stream into de-duplicated insights keyed by
/// `(element, type)`.
///
/// The aggregator exclusively owns its live map. A baseline is a by-value
/// snapshot; it survives `clear` and only goes away through `reset_baseline`.
pub struct InsightAggregator {
    classifier: Box<dyn InsightClassifier>,
    severity: SeverityConfig,
    insights: IndexMap<InsightKey, Insight>,
    baseline: Option<IndexMap<InsightKey, Insight>>,
    next_sequence: u64,
}

impl Default for InsightAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InsightAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InsightAggregator")
            .field("severity", &self.severity)
            .field("insights", &self.insights.len())
            .field("baseline", &self.baseline.as_ref().map(IndexMap::len))
            .field("next_sequence", &self.next_sequence)
            .finish_non_exhaustive()
    }
}

impl InsightAggregator {
    #[must_use]
    pub fn new() -> Self {
        Self {
            classifier: Box::new(KeywordClassifier::new()),
            severity: SeverityConfig::default(),
            insights: IndexMap::new(),
            baseline: None,
            next_sequence: 0,
        }
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: impl InsightClassifier + 'static) -> Self {
        self.classifier = Box::new(classifier);
        self
    }

    pub fn with_severity_config(mut self, severity: SeverityConfig) -> ReplayResult<Self> {
        self.severity = severity.validate()?;
        Ok(self)
    }

    /// Folds one event into the live set.
    ///
    /// Returns the created or updated insight, or `None` for events that are
    /// not evidence (successful steps).
    pub fn process_event(&mut self, event: &Event) -> Option<&Insight> {
        if event.status == EventStatus::Success {
            return None;
        }
        let classification = self
            .classifier
            .classify(&event.reasoning_text, event.status)?;
        let element = event.element_key();
        let key = InsightKey::new(element, classification.insight_type);
        let severity = self.severity;

        match self.insights.entry(key) {
            Entry::Occupied(entry) => {
                let insight = entry.into_mut();
                insight.evidence.push(event.step_index);
                insight.persona_ids.insert(event.persona_id.clone());
                insight.element_ids.insert(element.to_owned());
                insight.tags.extend(classification.tags);
                insight.resolved = false;
                insight.previous_severity = None;
                insight.severity_score = severity_score(
                    insight.insight_type,
                    insight.persona_ids.len(),
                    insight.evidence.len(),
                    &severity,
                );
                trace!(
                    key = %insight.key,
                    severity = insight.severity_score,
                    evidence = insight.evidence.len(),
                    "updated insight"
                );
                Some(&*insight)
            }
            Entry::Vacant(entry) => {
                self.next_sequence += 1;
                let insight_type = classification.insight_type;
                let insight = Insight {
                    id: format!("insight-{}", self.next_sequence),
                    key: entry.key().clone(),
                    insight_type,
                    persona_ids: std::iter::once(event.persona_id.clone()).collect(),
                    element_ids: std::iter::once(element.to_owned()).collect(),
                    tags: classification.tags.into_iter().collect(),
                    summary: summarize(event, insight_type.as_str(), element),
                    evidence: vec![event.step_index],
                    severity_score: severity.initial_score,
                    created_at: event.timestamp,
                    resolved: false,
                    previous_severity: None,
                };
                debug!(key = %insight.key, id = %insight.id, "created insight");
                Some(&*entry.insert(insight))
            }
        }
    }

    /// Folds a batch in order; returns how many events produced an insight.
    pub fn process_events<'a, I>(&mut self, events: I) -> usize
    where
        I: IntoIterator<Item = &'a Event>,
    {
        events
            .into_iter()
            .filter(|event| self.process_event(event).is_some())
            .count()
    }

    /// All insights by descending severity; ties keep creation order.
    #[must_use]
    pub fn insights_sorted(&self) -> Vec<&Insight> {
        let mut sorted: Vec<&Insight> = self.insights.values().collect();
        sorted.sort_by(|a, b| b.severity_score.cmp(&a.severity_score));
        sorted
    }

    #[must_use]
    pub fn get(&self, key: &InsightKey) -> Option<&Insight> {
        self.insights.get(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.insights.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.insights.is_empty()
    }

    /// Freezes a by-value copy of the live set as the comparison baseline.
    pub fn set_baseline(&mut self) {
        debug!(insights = self.insights.len(), "captured insight baseline");
        self.baseline = Some(self.insights.clone());
    }

    /// Replaces the baseline with insights persisted by the host.
    pub fn restore_baseline(&mut self, insights: Vec<Insight>) {
        let baseline: IndexMap<InsightKey, Insight> = insights
            .into_iter()
            .map(|insight| (insight.key.clone(), insight))
            .collect();
        debug!(insights = baseline.len(), "restored insight baseline");
        self.baseline = Some(baseline);
    }

    pub fn reset_baseline(&mut self) {
        self.baseline = None;
    }

    #[must_use]
    pub fn baseline(&self) -> Option<Vec<&Insight>> {
        self.baseline.as_ref().map(|baseline| baseline.values().collect())
    }

    /// Compares the live set with the baseline.
    ///
    /// Baseline keys missing from the live set are reinserted as resolved
    /// copies. Live insights whose severity dropped get `previous_severity`;
    /// any other live insight has it cleared.
    /// Without a baseline the report is empty.
    pub fn diff_against_baseline(&mut self) -> DiffReport {
        let mut report = DiffReport::default();
        let Some(baseline) = self.baseline.as_ref() else {
            return report;
        };

        for (key, before) in baseline {
            match self.insights.get_mut(key) {
                None => {
                    let mut resolved = before.clone();
                    resolved.resolved = true;
                    self.insights.insert(key.clone(), resolved);
                    report.resolved.push(key.clone());
                }
                Some(live) if live.resolved => report.resolved.push(key.clone()),
                Some(live) if live.severity_score < before.severity_score => {
                    live.previous_severity = Some(before.severity_score);
                    report.improved.push(key.clone());
                }
                Some(live) if live.severity_score > before.severity_score => {
                    live.previous_severity = None;
                    report.regressed.push(key.clone());
                }
                Some(live) => {
                    live.previous_severity = None;
                    report.unchanged.push(key.clone());
                }
            }
        }
        report.new = self
            .insights
            .keys()
            .filter(|key| !baseline.contains_key(*key))
            .cloned()
            .collect();

        debug!(
            resolved = report.resolved.len(),
            improved = report.improved.len(),
            regressed = report.regressed.len(),
            new = report.new.len(),
            "diffed insights against baseline"
        );
        report
    }

    /// Empties the live set and restarts insight ids. The baseline is kept.
    pub fn clear(&mut self) {
        self.insights.clear();
        self.next_sequence = 0;
    }
}

fn summarize(event: &Event, label: &str, element: &str) -> String {
    let reasoning = event.reasoning_text.trim();
    if reasoning.is_empty() {
        format!("{label} on `{element}`")
    } else {
        format!("{label} on `{element}`: {reasoning}")
    }
}
