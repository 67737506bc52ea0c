//! Meeting domain model and its lifecycle predicates.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::import::ImportTag;
use super::podcast::Podcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    #[default]
    Scheduled,
    Completed,
}

impl MeetingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingStatus::Scheduled => "scheduled",
            MeetingStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "scheduled" => Some(MeetingStatus::Scheduled),
            "completed" => Some(MeetingStatus::Completed),
            _ => None,
        }
    }
}

impl fmt::Display for MeetingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A club meeting.
///
/// `status` is `None` only for legacy rows written before the field existed;
/// their status is derived from `completed_at` and `date`.
#[derive(Debug, Clone, PartialEq)]
pub struct Meeting {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub host_id: Uuid,
    pub podcast_id: Option<Uuid>,
    pub location: String,
    pub notes: String,
    pub status: Option<MeetingStatus>,
    pub completed_at: Option<DateTime<Utc>>,
    pub import: Option<ImportTag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Meeting {
    pub fn effective_status(&self, now: DateTime<Utc>) -> MeetingStatus {
        match self.status {
            Some(status) => status,
            None if self.completed_at.is_some() || self.date < now => MeetingStatus::Completed,
            None => MeetingStatus::Scheduled,
        }
    }

    /// True on any completion signal: status flag, `completed_at`, or a past date.
    pub fn is_completed(&self, now: DateTime<Utc>) -> bool {
        self.status == Some(MeetingStatus::Completed)
            || self.completed_at.is_some()
            || self.date < now
    }

    /// Occupies the single upcoming slot.
    pub fn is_effectively_scheduled(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            Some(MeetingStatus::Scheduled) => true,
            Some(MeetingStatus::Completed) => false,
            None => self.completed_at.is_none() && self.date >= now,
        }
    }

    pub fn complete(&mut self, now: DateTime<Utc>) {
        self.status = Some(MeetingStatus::Completed);
        self.completed_at = Some(now);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeetingHost {
    pub id: String,
    pub name: String,
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingPodcast {
    pub id: Uuid,
    pub title: String,
    pub link: String,
    pub host: String,
    pub episode_count: i32,
    pub episode_names: String,
    pub total_time_minutes: i32,
    pub notes: String,
}

impl From<&Podcast> for MeetingPodcast {
    fn from(podcast: &Podcast) -> Self {
        Self {
            id: podcast.id,
            title: podcast.title.clone(),
            link: podcast.link.clone(),
            host: podcast.host.clone(),
            episode_count: podcast.episode_count,
            episode_names: podcast.episode_names.clone(),
            total_time_minutes: podcast.total_time_minutes,
            notes: podcast.notes.clone(),
        }
    }
}

/// Meeting as returned to clients, with its derived status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingView {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub host: MeetingHost,
    pub podcast: Option<MeetingPodcast>,
    pub location: String,
    pub notes: String,
    pub status: MeetingStatus,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
