//! Database entity definitions.
//!
//! Entities map 1:1 to database tables and are converted to domain models.

pub mod carve_out;
pub mod join_code;
pub mod meeting;
pub mod member;
pub mod podcast;
pub mod recovery;
pub mod reset_token;

pub use carve_out::CarveOutEntity;
pub use join_code::JoinCodeEntity;
pub use meeting::MeetingEntity;
pub use member::MemberEntity;
pub use podcast::{PodcastEntity, PodcastRatingEntity};
pub use recovery::EmergencyRecoveryUseEntity;
pub use reset_token::PasswordResetTokenEntity;

use domain::models::{ImportSource, ImportTag};

/// Rebuilds an import tag from its two nullable columns. Rows with an
/// unknown source or a missing batch id carry no tag.
pub(crate) fn import_tag(source: Option<&str>, batch_id: Option<String>) -> Option<ImportTag> {
    let source = ImportSource::parse(source?)?;
    Some(ImportTag::new(source, batch_id?))
}
