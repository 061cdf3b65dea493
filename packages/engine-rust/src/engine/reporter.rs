//! Bounded previews of a [`MatchSet`].

use std::fmt;

use serde::Serialize;
use sweep_core::Document;

use super::executor::MatchSet;

/// A single named field rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldPreview {
    pub field: String,
    pub value: String,
}

impl FieldPreview {
    fn lookup(doc: &Document, field: &str) -> Option<Self> {
        doc.get(field).map(|value| Self {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// Summary of one matched document. Fields the document lacks are `None`
/// and left out of both renderings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreviewEntry {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<FieldPreview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered: Option<FieldPreview>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Count and preview for one collection's matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchReport {
    pub collection: String,
    pub total: usize,
    pub degraded: bool,
    pub preview: Vec<PreviewEntry>,
}

impl MatchReport {
    /// Number of matches not shown in the preview.
    #[must_use]
    pub fn hidden(&self) -> usize {
        self.total.saturating_sub(self.preview.len())
    }
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} match", self.collection, self.total)?;
        if self.total != 1 {
            f.write_str("es")?;
        }
        if self.degraded {
            f.write_str(" (filtered in memory)")?;
        }
        for entry in &self.preview {
            write!(f, "\n  - {}", entry.id)?;
            if let Some(label) = &entry.label {
                write!(f, "  {}={}", label.field, label.value)?;
            }
            if let Some(filtered) = &entry.filtered {
                write!(f, "  {}={}", filtered.field, filtered.value)?;
            }
            if let Some(ts) = &entry.timestamp {
                write!(f, "  @ {ts}")?;
            }
        }
        let hidden = self.hidden();
        if hidden > 0 {
            write!(f, "\n  ... and {hidden} more")?;
        }
        Ok(())
    }
}

/// Builds [`MatchReport`]s from match sets.
#[derive(Debug, Clone)]
pub struct ResultReporter {
    preview_size: usize,
    label_fields: Vec<String>,
    timestamp_field: String,
}

impl ResultReporter {
    #[must_use]
    pub fn new(preview_size: usize, label_fields: Vec<String>, timestamp_field: impl Into<String>) -> Self {
        Self {
            preview_size,
            label_fields,
            timestamp_field: timestamp_field.into(),
        }
    }

    /// Summarizes the first `preview_size` matches. `filtered_field` is the
    /// extra condition's field, if the plan had one.
    #[must_use]
    pub fn report(&self, matches: &MatchSet, filtered_field: Option<&str>) -> MatchReport {
        let preview = matches
            .documents()
            .take(self.preview_size)
            .map(|doc| self.entry(doc, filtered_field))
            .collect();
        MatchReport {
            collection: matches.collection.clone(),
            total: matches.len(),
            degraded: matches.degraded,
            preview,
        }
    }

    fn entry(&self, doc: &Document, filtered_field: Option<&str>) -> PreviewEntry {
        let label = self
            .label_fields
            .iter()
            .find_map(|field| FieldPreview::lookup(doc, field));
        // A filter on the label field would print the same value twice.
        let filtered = filtered_field
            .filter(|field| label.as_ref().is_none_or(|l| l.field != *field))
            .and_then(|field| FieldPreview::lookup(doc, field));
        PreviewEntry {
            id: doc.id.clone(),
            label,
            filtered,
            timestamp: doc.get(&self.timestamp_field).map(ToString::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn reporter(k: usize) -> ResultReporter {
        ResultReporter::new(
            k,
            vec!["name".into(), "subject".into(), "email".into()],
            "createdAt",
        )
    }

    fn set(docs: Vec<Document>) -> MatchSet {
        let entries = docs.into_iter().map(|d| (d.reference("leads"), d)).collect();
        MatchSet {
            collection: "leads".into(),
            entries,
            degraded: false,
        }
    }

    #[test]
    fn preview_is_bounded_but_total_is_not() {
        let docs = (0..12).map(|i| Document::new(format!("d{i}"))).collect();
        let report = reporter(5).report(&set(docs), None);

        assert_eq!(report.total, 12);
        assert_eq!(report.preview.len(), 5);
        assert_eq!(report.hidden(), 7);
        assert!(report.to_string().ends_with("... and 7 more"));
    }

    #[test]
    fn first_present_label_field_is_used() {
        let doc = Document::new("a")
            .with("subject", "Follow up")
            .with("email", "ana@example.com");
        let report = reporter(5).report(&set(vec![doc]), None);

        let label = report.preview[0].label.clone().unwrap();
        assert_eq!(label.field, "subject");
        assert_eq!(label.value, "Follow up");
    }

    #[test]
    fn absent_fields_are_omitted() {
        let report = reporter(5).report(&set(vec![Document::new("bare")]), Some("source"));
        let entry = &report.preview[0];

        assert_eq!(entry.id, "bare");
        assert!(entry.label.is_none());
        assert!(entry.filtered.is_none());
        assert!(entry.timestamp.is_none());

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["preview"][0], serde_json::json!({ "id": "bare" }));
        assert_eq!(report.to_string(), "leads: 1 match\n  - bare");
    }

    #[test]
    fn filtered_field_and_timestamp_are_rendered() {
        let doc = Document::new("a")
            .with("name", "Ana")
            .with("source", "email")
            .with("createdAt", Utc.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap());
        let report = reporter(5).report(&set(vec![doc]), Some("source"));
        let entry = &report.preview[0];

        assert_eq!(entry.filtered.as_ref().unwrap().value, "email");
        assert_eq!(entry.timestamp.as_deref(), Some("2025-01-02T09:00:00.000Z"));
        assert_eq!(
            report.to_string(),
            "leads: 1 match\n  - a  name=Ana  source=email  @ 2025-01-02T09:00:00.000Z"
        );
    }

    #[test]
    fn filter_on_label_field_is_not_repeated() {
        let doc = Document::new("a").with("name", "Ana");
        let report = reporter(5).report(&set(vec![doc]), Some("name"));
        assert!(report.preview[0].filtered.is_none());
    }

    #[test]
    fn degraded_flag_is_carried() {
        let mut matches = set(vec![Document::new("a"), Document::new("b")]);
        matches.degraded = true;
        let report = reporter(0).report(&matches, None);

        assert!(report.degraded);
        assert!(report.preview.is_empty());
        assert_eq!(
            report.to_string(),
            "leads: 2 matches (filtered in memory)\n  ... and 2 more"
        );
    }
}
