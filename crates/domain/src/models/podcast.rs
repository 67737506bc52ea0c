//! Podcast nominations and their ratings.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::import::ImportTag;
use super::member::MemberRef;

/// Lifecycle of a nominated podcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PodcastStatus {
    #[default]
    Pending,
    Discussed,
}

impl PodcastStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PodcastStatus::Pending => "pending",
            PodcastStatus::Discussed => "discussed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(PodcastStatus::Pending),
            "discussed" => Some(PodcastStatus::Discussed),
            _ => None,
        }
    }
}

impl fmt::Display for PodcastStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the fixed rating options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatingValue {
    #[serde(rename = "I like it a lot.")]
    LikeALot,
    #[serde(rename = "I like it.")]
    Like,
    #[serde(rename = "Meh")]
    Meh,
    #[serde(rename = "My podcast")]
    MyPodcast,
    #[serde(rename = "No selection", alias = "No Selection")]
    NoSelection,
}

impl RatingValue {
    pub const OPTIONS: [RatingValue; 5] = [
        RatingValue::LikeALot,
        RatingValue::Like,
        RatingValue::Meh,
        RatingValue::MyPodcast,
        RatingValue::NoSelection,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingValue::LikeALot => "I like it a lot.",
            RatingValue::Like => "I like it.",
            RatingValue::Meh => "Meh",
            RatingValue::MyPodcast => "My podcast",
            RatingValue::NoSelection => "No selection",
        }
    }

    /// Exact match against the selectable options.
    pub fn parse(value: &str) -> Option<Self> {
        Self::OPTIONS.into_iter().find(|v| v.as_str() == value)
    }

    /// Like [`RatingValue::parse`] but also reads the legacy `No Selection` spelling.
    pub fn from_stored(value: &str) -> Option<Self> {
        match value {
            "No Selection" => Some(RatingValue::NoSelection),
            other => Self::parse(other),
        }
    }

    pub fn points(&self) -> i32 {
        match self {
            RatingValue::LikeALot => 2,
            RatingValue::Like => 1,
            RatingValue::Meh | RatingValue::MyPodcast | RatingValue::NoSelection => 0,
        }
    }
}

impl fmt::Display for RatingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member's rating of a podcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rating {
    pub member_id: Uuid,
    pub value: RatingValue,
    pub points: i32,
}

impl Rating {
    pub fn new(member_id: Uuid, value: RatingValue) -> Self {
        Self {
            member_id,
            value,
            points: value.points(),
        }
    }
}

/// A nominated podcast.
#[derive(Debug, Clone, PartialEq)]
pub struct Podcast {
    pub id: Uuid,
    pub title: String,
    pub host: String,
    pub episode_count: i32,
    pub episode_names: String,
    pub total_time_minutes: i32,
    pub link: String,
    pub notes: String,
    pub submitted_by: Uuid,
    pub ratings: Vec<Rating>,
    pub status: PodcastStatus,
    pub discussed_meeting_id: Option<Uuid>,
    pub import: Option<ImportTag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Podcast {
    pub fn is_pending(&self) -> bool {
        self.status == PodcastStatus::Pending
    }

    pub fn rating_for(&self, member_id: Uuid) -> Option<&Rating> {
        self.ratings.iter().find(|r| r.member_id == member_id)
    }

    /// Member currently holding `My podcast`, if any.
    pub fn owner_rating(&self) -> Option<&Rating> {
        self.ratings
            .iter()
            .find(|r| r.value == RatingValue::MyPodcast)
    }

    /// Inserts or overwrites the member's rating.
    pub fn upsert_rating(&mut self, member_id: Uuid, value: RatingValue) {
        match self.ratings.iter_mut().find(|r| r.member_id == member_id) {
            Some(existing) => *existing = Rating::new(member_id, value),
            None => self.ratings.push(Rating::new(member_id, value)),
        }
    }

    pub fn ranking_score(&self) -> i32 {
        self.ratings.iter().map(|r| r.points).sum()
    }

    pub fn mark_discussed(&mut self, meeting_id: Uuid) {
        self.status = PodcastStatus::Discussed;
        self.discussed_meeting_id = Some(meeting_id);
    }

    pub fn revert_to_pending(&mut self) {
        self.status = PodcastStatus::Pending;
        self.discussed_meeting_id = None;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingView {
    pub member: MemberRef,
    pub value: RatingValue,
    pub points: i32,
}

/// Podcast as returned to clients, with derived ranking fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodcastView {
    pub id: Uuid,
    pub title: String,
    pub host: String,
    pub episode_count: i32,
    pub episode_names: String,
    pub total_time_minutes: i32,
    pub link: String,
    pub notes: String,
    pub status: PodcastStatus,
    pub submitted_by: MemberRef,
    pub ratings: Vec<RatingView>,
    pub ranking_score: i32,
    pub missing_voters: Vec<String>,
    pub discussed_meeting: Option<Uuid>,
    pub discussed_meeting_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PodcastView {
    /// Signed-out variant: no member identities, score kept.
    pub fn redacted(mut self) -> Self {
        self.submitted_by = MemberRef::redacted();
        self.ratings.clear();
        self.missing_voters.clear();
        self
    }
}
