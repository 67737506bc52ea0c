//! Carve outs: recommendations shared at a meeting.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::import::ImportTag;
use super::member::MemberRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CarveOutType {
    Book,
    Video,
    Movie,
    Podcast,
    Article,
    #[default]
    Other,
}

impl CarveOutType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarveOutType::Book => "book",
            CarveOutType::Video => "video",
            CarveOutType::Movie => "movie",
            CarveOutType::Podcast => "podcast",
            CarveOutType::Article => "article",
            CarveOutType::Other => "other",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "book" => Some(CarveOutType::Book),
            "video" => Some(CarveOutType::Video),
            "movie" => Some(CarveOutType::Movie),
            "podcast" => Some(CarveOutType::Podcast),
            "article" => Some(CarveOutType::Article),
            "other" => Some(CarveOutType::Other),
            _ => None,
        }
    }
}

impl fmt::Display for CarveOutType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CarveOut {
    pub id: Uuid,
    pub title: String,
    pub carve_out_type: CarveOutType,
    pub url: String,
    pub notes: String,
    pub member_id: Uuid,
    pub meeting_id: Uuid,
    pub import: Option<ImportTag>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarveOutMeeting {
    pub id: Uuid,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarveOutView {
    pub id: Uuid,
    pub title: String,
    #[serde(rename = "type")]
    pub carve_out_type: CarveOutType,
    pub url: String,
    pub notes: String,
    pub member: MemberRef,
    pub meeting: Option<CarveOutMeeting>,
    pub created_at: DateTime<Utc>,
}
