//! Provenance tags for bulk-imported records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which legacy importer produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImportSource {
    #[serde(rename = "legacy-meetings-csv")]
    LegacyMeetings,
    #[serde(rename = "legacy-carveouts-csv")]
    LegacyCarveOuts,
    #[serde(rename = "legacy-pending-podcasts-csv")]
    LegacyPendingPodcasts,
}

impl ImportSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImportSource::LegacyMeetings => "legacy-meetings-csv",
            ImportSource::LegacyCarveOuts => "legacy-carveouts-csv",
            ImportSource::LegacyPendingPodcasts => "legacy-pending-podcasts-csv",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "legacy-meetings-csv" => Some(ImportSource::LegacyMeetings),
            "legacy-carveouts-csv" => Some(ImportSource::LegacyCarveOuts),
            "legacy-pending-podcasts-csv" => Some(ImportSource::LegacyPendingPodcasts),
            _ => None,
        }
    }
}

impl fmt::Display for ImportSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `{importSource, importBatchId}` pair stamped on imported rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportTag {
    pub source: ImportSource,
    pub batch_id: String,
}

impl ImportTag {
    pub fn new(source: ImportSource, batch_id: impl Into<String>) -> Self {
        Self {
            source,
            batch_id: batch_id.into(),
        }
    }

    pub fn matches(&self, source: ImportSource, batch_id: &str) -> bool {
        self.source == source && self.batch_id == batch_id
    }
}
