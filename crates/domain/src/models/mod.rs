//! Domain models for Podcast Club.

pub mod carve_out;
pub mod import;
pub mod join_code;
pub mod meeting;
pub mod member;
pub mod podcast;
pub mod recovery;
pub mod reset_token;
pub mod session;

pub use carve_out::{CarveOut, CarveOutMeeting, CarveOutType, CarveOutView};
pub use import::{ImportSource, ImportTag};
pub use join_code::JoinCode;
pub use meeting::{Meeting, MeetingHost, MeetingPodcast, MeetingStatus, MeetingView};
pub use member::{AccountStatus, Address, Member, MemberRef, MemberView};
pub use podcast::{Podcast, PodcastStatus, PodcastView, Rating, RatingValue, RatingView};
pub use recovery::EmergencyRecoveryUse;
pub use reset_token::PasswordResetToken;
pub use session::{Actor, Session, SessionMemberView};
