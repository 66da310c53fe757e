use std::{collections::BTreeMap, iter};
use time::OffsetDateTime;

/// The phase of processing an item was in when a message was recorded.
#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Ord, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    /// Retrieving the upstream payload
    Retrieval,
    /// Decoding and normalising the payload
    Validation,
    /// Writing to the knowledge database
    Storage,
}

#[derive(
    Copy, Clone, Debug, PartialEq, Eq, Ord, PartialOrd, serde::Deserialize, serde::Serialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Severity {
    Error,
    Warning,
}

/// Outcome of a single mirror run.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Start of the run
    #[serde(with = "time::serde::rfc3339")]
    pub start_date: OffsetDateTime,
    /// End of the run
    #[serde(with = "time::serde::rfc3339")]
    pub end_date: OffsetDateTime,

    /// Number of processed items
    pub number_of_items: usize,
    /// Messages recorded during processing
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub messages: BTreeMap<Phase, BTreeMap<String, Vec<Message>>>,
}

impl Report {
    pub fn errors(&self) -> usize {
        self.messages
            .values()
            .flat_map(|files| files.values())
            .flatten()
            .filter(|message| message.severity == Severity::Error)
            .count()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Message {
    pub severity: Severity,
    pub message: String,
}

#[derive(Clone, Debug)]
pub struct ReportBuilder {
    report: Report,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self {
            report: Report {
                start_date: OffsetDateTime::now_utc(),
                end_date: OffsetDateTime::now_utc(),
                number_of_items: 0,
                messages: Default::default(),
            },
        }
    }

    pub fn tick(&mut self) {
        self.report.number_of_items += 1;
    }

    pub fn tick_many(&mut self, count: usize) {
        self.report.number_of_items += count;
    }

    pub fn add_error(&mut self, phase: Phase, item: impl Into<String>, message: impl Into<String>) {
        self.add_message(phase, item, Severity::Error, message)
    }

    pub fn add_message(
        &mut self,
        phase: Phase,
        item: impl Into<String>,
        severity: Severity,
        message: impl Into<String>,
    ) {
        self.report
            .messages
            .entry(phase)
            .or_default()
            .entry(item.into())
            .or_default()
            .extend(iter::once(Message {
                severity,
                message: message.into(),
            }));
    }

    pub fn build(mut self) -> Report {
        self.report.end_date = OffsetDateTime::now_utc();
        self.report
    }
}

impl Default for ReportBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn counts_errors_across_phases() {
        let mut builder = ReportBuilder::new();
        builder.tick();
        builder.tick();
        builder.add_error(Phase::Retrieval, "a", "boom");
        builder.add_error(Phase::Storage, "b", "bang");
        builder.add_message(Phase::Validation, "c", Severity::Warning, "meh");

        let report = builder.build();
        assert_eq!(report.number_of_items, 2);
        assert_eq!(report.errors(), 2);
    }
}
