//! Domain services for Podcast Club.
//!
//! Services hold the business rules and talk to storage only through
//! [`ClubStore`](crate::store::ClubStore).

pub mod accounts;
pub mod carve_outs;
pub mod dates;
pub mod imports;
pub mod meetings;
pub mod members;
pub mod podcasts;
pub mod ranking;
pub mod sessions;

pub use accounts::{AccountService, IssuedCode, MemberSummary, Registration, ResetDelivery};
pub use carve_outs::{CarveOutInput, CarveOutService};
pub use imports::ImportService;
pub use meetings::{MeetingPatch, MeetingService, NewMeeting};
pub use members::{CreatedMember, MemberPatch, MemberService, NewMember};
pub use podcasts::{DeletedPodcast, NewPodcast, PodcastService, CONFIRM_TEXT};
pub use sessions::{IssuedSession, SessionService};
