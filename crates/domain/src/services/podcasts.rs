//! Podcast nominations and voting.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainError;
use crate::models::{
    Actor, Meeting, Podcast, PodcastStatus, PodcastView, Rating, RatingValue,
};
use crate::services::ranking;
use crate::store::ClubStore;

/// Typed confirmation required by destructive operations.
pub const CONFIRM_TEXT: &str = "DELETE";

pub(crate) fn confirmed(text: Option<&str>) -> bool {
    text.map(str::trim) == Some(CONFIRM_TEXT)
}

/// Fields submitted with a new nomination. Numbers arrive unvalidated.
#[derive(Debug, Clone, Default)]
pub struct NewPodcast {
    pub title: String,
    pub host: String,
    pub episode_count: Option<f64>,
    pub episode_names: String,
    pub total_time_minutes: Option<f64>,
    pub link: String,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct DeletedPodcast {
    pub id: Uuid,
    pub title: String,
    pub deleted_meetings: u64,
}

fn whole_number(value: f64) -> Option<i32> {
    if value.fract() == 0.0 && value >= 1.0 && value <= i32::MAX as f64 {
        Some(value as i32)
    } else {
        None
    }
}

/// Any total of at least one minute, stored rounded to whole minutes.
fn total_minutes(value: f64) -> Option<i32> {
    if value >= 1.0 {
        Some(value.round().min(i32::MAX as f64) as i32)
    } else {
        None
    }
}

pub struct PodcastService {
    store: Arc<dyn ClubStore>,
}

impl PodcastService {
    pub fn new(store: Arc<dyn ClubStore>) -> Self {
        Self { store }
    }

    /// Creates a pending podcast with the submitter holding `My podcast`.
    pub async fn submit(&self, actor: Actor, input: NewPodcast) -> Result<Podcast, DomainError> {
        let title = input.title.trim();
        let host = input.host.trim();
        let episode_names = input.episode_names.trim();
        let link = input.link.trim();

        let numbers = input
            .episode_count
            .zip(input.total_time_minutes)
            .filter(|(count, minutes)| count.is_finite() && minutes.is_finite());

        let Some((episode_count, total_time_minutes)) = numbers.filter(|_| {
            !title.is_empty() && !host.is_empty() && !episode_names.is_empty() && !link.is_empty()
        }) else {
            return Err(DomainError::validation(
                "Title, host, # of episodes, episode name(s), total time, and link are required.",
            ));
        };

        let (Some(episode_count), Some(total_time_minutes)) =
            (whole_number(episode_count), total_minutes(total_time_minutes))
        else {
            return Err(DomainError::validation(
                "# of episodes must be a whole number, and total time must be at least 1 minute.",
            ));
        };

        let now = Utc::now();
        let podcast = Podcast {
            id: Uuid::new_v4(),
            title: title.to_string(),
            host: host.to_string(),
            episode_count,
            episode_names: episode_names.to_string(),
            total_time_minutes,
            link: link.to_string(),
            notes: input.notes.trim().to_string(),
            submitted_by: actor.id,
            ratings: vec![Rating::new(actor.id, RatingValue::MyPodcast)],
            status: PodcastStatus::Pending,
            discussed_meeting_id: None,
            import: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_podcast(&podcast).await?;
        tracing::info!(podcast_id = %podcast.id, member_id = %actor.id, "Podcast submitted");
        Ok(podcast)
    }

    /// Records the actor's rating and returns the refreshed view.
    pub async fn vote(
        &self,
        actor: Actor,
        podcast_id: Uuid,
        raw_rating: &str,
    ) -> Result<PodcastView, DomainError> {
        let value = RatingValue::parse(raw_rating.trim())
            .ok_or_else(|| DomainError::validation("A valid rating is required."))?;

        let podcast = self
            .store
            .find_podcast(podcast_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Podcast not found."))?;

        check_vote(&podcast, actor.id, value)?;

        self.store
            .upsert_podcast_rating(podcast_id, &Rating::new(actor.id, value))
            .await?;

        let updated = self
            .store
            .find_podcast(podcast_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Podcast not found."))?;
        let members = self.store.list_members().await?;
        let meeting_date = self.discussed_meeting_date(&updated).await?;
        Ok(ranking::format_podcast(&updated, &members, meeting_date))
    }

    /// Every podcast in sheet order.
    pub async fn list(&self) -> Result<Vec<PodcastView>, DomainError> {
        let mut views = self.formatted_views().await?.0;
        ranking::sort_like_sheet(&mut views);
        Ok(views)
    }

    /// Discussed podcasts, newest first, stripped of member identities.
    pub async fn list_public(&self) -> Result<Vec<PodcastView>, DomainError> {
        let (views, _) = self.formatted_views().await?;
        Ok(views
            .into_iter()
            .filter(|v| v.status == PodcastStatus::Discussed)
            .map(PodcastView::redacted)
            .collect())
    }

    pub async fn discuss_queue(&self) -> Result<Vec<PodcastView>, DomainError> {
        let (views, meetings) = self.formatted_views().await?;
        Ok(ranking::discuss_queue(views, &meetings, Utc::now()))
    }

    /// Submitters may delete their own untouched nominations; admins may
    /// delete anything, taking attached meetings and carve outs with it.
    pub async fn delete(
        &self,
        actor: Actor,
        podcast_id: Uuid,
        confirm_text: Option<&str>,
    ) -> Result<DeletedPodcast, DomainError> {
        if !confirmed(confirm_text) {
            return Err(DomainError::validation(
                "Type DELETE to confirm podcast deletion.",
            ));
        }

        let podcast = self
            .store
            .find_podcast(podcast_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Podcast not found."))?;

        if !actor.is_admin_or(podcast.submitted_by) {
            return Err(DomainError::forbidden(
                "Only admins or the submitter can delete this podcast.",
            ));
        }

        let attached = self.store.find_meetings_by_podcast(podcast_id).await?;

        if !actor.is_admin {
            if podcast.status == PodcastStatus::Discussed {
                return Err(DomainError::conflict("Discussed podcasts cannot be deleted."));
            }
            if !attached.is_empty() {
                return Err(DomainError::conflict(
                    "This podcast is attached to one or more meetings and cannot be deleted.",
                ));
            }
        }

        let mut deleted_meetings = 0;
        if !attached.is_empty() {
            let ids: Vec<Uuid> = attached.iter().map(|m| m.id).collect();
            self.store.delete_carve_outs_for_meetings(&ids).await?;
            deleted_meetings = self.store.delete_meetings(&ids).await?;
        }

        self.store.delete_podcast(podcast_id).await?;
        tracing::info!(
            podcast_id = %podcast_id,
            member_id = %actor.id,
            deleted_meetings,
            "Podcast deleted"
        );

        Ok(DeletedPodcast {
            id: podcast.id,
            title: podcast.title,
            deleted_meetings,
        })
    }

    async fn formatted_views(&self) -> Result<(Vec<PodcastView>, Vec<Meeting>), DomainError> {
        let members = self.store.list_members().await?;
        let podcasts = self.store.list_podcasts().await?;
        let meetings = self.store.list_meetings().await?;
        let dates: HashMap<Uuid, DateTime<Utc>> = meetings.iter().map(|m| (m.id, m.date)).collect();

        let views = podcasts
            .iter()
            .map(|p| {
                let date = p.discussed_meeting_id.and_then(|id| dates.get(&id).copied());
                ranking::format_podcast(p, &members, date)
            })
            .collect();
        Ok((views, meetings))
    }

    async fn discussed_meeting_date(
        &self,
        podcast: &Podcast,
    ) -> Result<Option<DateTime<Utc>>, DomainError> {
        match podcast.discussed_meeting_id {
            Some(id) => Ok(self.store.find_meeting(id).await?.map(|m| m.date)),
            None => Ok(None),
        }
    }
}

/// `My podcast` belongs to the submitter alone, and the submitter can never
/// pick anything else.
pub fn check_vote(podcast: &Podcast, member_id: Uuid, value: RatingValue) -> Result<(), DomainError> {
    if !podcast.is_pending() {
        return Err(DomainError::invalid_state("Only pending podcasts can be rated."));
    }

    let is_submitter = podcast.submitted_by == member_id;
    if !is_submitter && value == RatingValue::MyPodcast {
        return Err(DomainError::validation(
            "Only the member who submitted this podcast can use \"My podcast\".",
        ));
    }
    if is_submitter && value != RatingValue::MyPodcast {
        return Err(DomainError::validation(
            "You cannot change your own submitted podcast rating from \"My podcast\".",
        ));
    }
    if value == RatingValue::MyPodcast
        && podcast
            .ratings
            .iter()
            .any(|r| r.value == RatingValue::MyPodcast && r.member_id != member_id)
    {
        return Err(DomainError::validation(
            "\"My podcast\" has already been selected by another member for this podcast.",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{actor, seed_member, store};

    fn input(title: &str) -> NewPodcast {
        NewPodcast {
            title: title.into(),
            host: "Host".into(),
            episode_count: Some(3.0),
            episode_names: "One, Two, Three".into(),
            total_time_minutes: Some(95.0),
            link: "https://example.com/show".into(),
            notes: "  worth it  ".into(),
        }
    }

    #[tokio::test]
    async fn test_submit_seeds_owner_rating() {
        let store = store();
        let a = seed_member(&store, "Alice", false).await;
        let service = PodcastService::new(store.clone());

        let podcast = service.submit(actor(&a), input("Show")).await.unwrap();
        assert_eq!(podcast.ratings, vec![Rating::new(a.id, RatingValue::MyPodcast)]);
        assert_eq!(podcast.ranking_score(), 0);
        assert_eq!(podcast.notes, "worth it");
        assert_eq!(podcast.status, PodcastStatus::Pending);
    }

    #[tokio::test]
    async fn test_submit_validation() {
        let store = store();
        let a = seed_member(&store, "Alice", false).await;
        let service = PodcastService::new(store.clone());

        let missing = NewPodcast {
            link: " ".into(),
            ..input("Show")
        };
        let err = service.submit(actor(&a), missing).await.unwrap_err();
        assert!(err.to_string().starts_with("Title, host"));

        for (count, minutes) in [(2.5, 10.0), (0.0, 10.0), (2.0, 0.0)] {
            let bad = NewPodcast {
                episode_count: Some(count),
                total_time_minutes: Some(minutes),
                ..input("Show")
            };
            let err = service.submit(actor(&a), bad).await.unwrap_err();
            assert!(err.to_string().starts_with("# of episodes"), "{count} {minutes}");
        }
    }

    #[tokio::test]
    async fn test_fractional_total_time_is_rounded() {
        let store = store();
        let a = seed_member(&store, "Alice", false).await;
        let service = PodcastService::new(store.clone());

        for (minutes, stored) in [(45.5, 46), (1.2, 1), (90.0, 90)] {
            let podcast = service
                .submit(
                    actor(&a),
                    NewPodcast {
                        total_time_minutes: Some(minutes),
                        ..input("Show")
                    },
                )
                .await
                .unwrap();
            assert_eq!(podcast.total_time_minutes, stored, "{minutes}");
        }

        let err = service
            .submit(
                actor(&a),
                NewPodcast {
                    total_time_minutes: Some(0.5),
                    ..input("Show")
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("# of episodes"));
    }

    #[tokio::test]
    async fn test_voting_scenario() {
        let store = store();
        let a = seed_member(&store, "Alice", false).await;
        let b = seed_member(&store, "Bob", false).await;
        let service = PodcastService::new(store.clone());
        let podcast = service.submit(actor(&a), input("Show")).await.unwrap();

        let view = service
            .vote(actor(&b), podcast.id, "I like it a lot.")
            .await
            .unwrap();
        assert_eq!(view.ranking_score, 2);

        // same value twice is idempotent
        let view = service
            .vote(actor(&b), podcast.id, "I like it a lot.")
            .await
            .unwrap();
        assert_eq!(view.ranking_score, 2);
        assert_eq!(view.ratings.len(), 2);

        let err = service
            .vote(actor(&b), podcast.id, "My podcast")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = service
            .vote(actor(&a), podcast.id, "Meh")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = service
            .vote(actor(&b), podcast.id, "Love it")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "A valid rating is required.");

        let owners = store
            .find_podcast(podcast.id)
            .await
            .unwrap()
            .unwrap()
            .ratings
            .iter()
            .filter(|r| r.value == RatingValue::MyPodcast)
            .map(|r| r.member_id)
            .collect::<Vec<_>>();
        assert_eq!(owners, vec![a.id]);
    }

    #[tokio::test]
    async fn test_vote_on_discussed_podcast_is_invalid_state() {
        let store = store();
        let a = seed_member(&store, "Alice", false).await;
        let b = seed_member(&store, "Bob", false).await;
        let service = PodcastService::new(store.clone());
        let podcast = service.submit(actor(&a), input("Show")).await.unwrap();
        store
            .mark_podcast_discussed(podcast.id, Uuid::new_v4())
            .await
            .unwrap();

        let err = service
            .vote(actor(&b), podcast.id, "Meh")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_delete_rules() {
        let store = store();
        let admin = seed_member(&store, "Admin", true).await;
        let a = seed_member(&store, "Alice", false).await;
        let b = seed_member(&store, "Bob", false).await;
        let service = PodcastService::new(store.clone());
        let podcast = service.submit(actor(&a), input("Show")).await.unwrap();

        let err = service
            .delete(actor(&a), podcast.id, Some("delete"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = service
            .delete(actor(&b), podcast.id, Some("DELETE"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        store
            .mark_podcast_discussed(podcast.id, Uuid::new_v4())
            .await
            .unwrap();
        let err = service
            .delete(actor(&a), podcast.id, Some("DELETE"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        let deleted = service
            .delete(actor(&admin), podcast.id, Some(" DELETE "))
            .await
            .unwrap();
        assert_eq!(deleted.title, "Show");
        assert!(store.find_podcast(podcast.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_public_list_is_redacted() {
        let store = store();
        let a = seed_member(&store, "Alice", false).await;
        let service = PodcastService::new(store.clone());
        let pending = service.submit(actor(&a), input("Pending")).await.unwrap();
        let discussed = service.submit(actor(&a), input("Done")).await.unwrap();
        store
            .mark_podcast_discussed(discussed.id, Uuid::new_v4())
            .await
            .unwrap();

        let public = service.list_public().await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].id, discussed.id);
        assert_eq!(public[0].submitted_by.name, "Club Member");
        assert!(public[0].ratings.is_empty());
        assert!(public.iter().all(|p| p.id != pending.id));
    }
}
