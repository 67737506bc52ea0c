//! Repository implementations.
//!
//! Each repository owns the SQL for one table family and returns domain
//! models. Errors are plain `sqlx::Error`; the store layer translates them.

pub mod carve_out;
pub mod join_code;
pub mod meeting;
pub mod member;
pub mod podcast;
pub mod recovery;
pub mod reset_token;

pub use carve_out::CarveOutRepository;
pub use join_code::JoinCodeRepository;
pub use meeting::MeetingRepository;
pub use member::MemberRepository;
pub use podcast::PodcastRepository;
pub use recovery::RecoveryRepository;
pub use reset_token::ResetTokenRepository;
