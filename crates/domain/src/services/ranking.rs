//! Ranking math: scores, missing voters, duplicate detection and the two
//! podcast orderings. Pure functions over already-loaded records.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use url::Url;
use uuid::Uuid;

use crate::models::{
    Meeting, MeetingStatus, Member, MemberRef, Podcast, PodcastView, RatingValue, RatingView,
};

/// Sum of all rating points.
pub fn ranking_score(podcast: &Podcast) -> i32 {
    podcast.ranking_score()
}

/// Names of members who have not voted, case-insensitively sorted.
/// A `No selection` rating counts as not voted.
pub fn missing_voters(podcast: &Podcast, members: &[Member]) -> Vec<String> {
    let voted: HashSet<Uuid> = podcast
        .ratings
        .iter()
        .filter(|r| r.value != RatingValue::NoSelection)
        .map(|r| r.member_id)
        .collect();

    let mut names: Vec<String> = members
        .iter()
        .filter(|m| !voted.contains(&m.id))
        .map(|m| m.name.clone())
        .collect();
    names.sort_by(|a, b| compare_titles(a, b));
    names
}

/// Case-insensitive comparison with a case-sensitive tiebreak.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

fn normalize_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn normalize_link(value: &str) -> String {
    let raw = value.trim();
    match Url::parse(raw) {
        Ok(url) => format!("{}{}", url.host_str().unwrap_or_default(), url.path()).to_lowercase(),
        Err(_) => raw.to_lowercase(),
    }
}

/// Content key used to collapse duplicate nominations.
pub fn dedupe_key(title: &str, host: &str, episode_names: &str, link: &str) -> String {
    [
        normalize_text(title),
        normalize_text(host),
        normalize_text(episode_names),
        normalize_link(link),
    ]
    .join("||")
}

/// Builds the client view. `members` resolves names; `discussed_meeting_date`
/// is the date of the meeting the podcast was discussed at.
pub fn format_podcast(
    podcast: &Podcast,
    members: &[Member],
    discussed_meeting_date: Option<DateTime<Utc>>,
) -> PodcastView {
    let names: HashMap<Uuid, &str> = members.iter().map(|m| (m.id, m.name.as_str())).collect();
    let member_ref = |id: Uuid| match names.get(&id) {
        Some(name) => MemberRef {
            id: id.to_string(),
            name: name.to_string(),
        },
        None => MemberRef::unknown(id),
    };

    PodcastView {
        id: podcast.id,
        title: podcast.title.clone(),
        host: podcast.host.clone(),
        episode_count: podcast.episode_count,
        episode_names: podcast.episode_names.clone(),
        total_time_minutes: podcast.total_time_minutes,
        link: podcast.link.clone(),
        notes: podcast.notes.clone(),
        status: podcast.status,
        submitted_by: member_ref(podcast.submitted_by),
        ratings: podcast
            .ratings
            .iter()
            .map(|r| RatingView {
                member: member_ref(r.member_id),
                value: r.value,
                points: r.points,
            })
            .collect(),
        ranking_score: ranking_score(podcast),
        missing_voters: missing_voters(podcast, members),
        discussed_meeting: podcast.discussed_meeting_id,
        discussed_meeting_date,
        created_at: podcast.created_at,
    }
}

/// Admin sheet order: most missing voters, then score, then title.
pub fn sort_like_sheet(podcasts: &mut [PodcastView]) {
    podcasts.sort_by(|a, b| {
        b.missing_voters
            .len()
            .cmp(&a.missing_voters.len())
            .then(b.ranking_score.cmp(&a.ranking_score))
            .then_with(|| compare_titles(&a.title, &b.title))
    });
}

/// Pending podcasts not booked on an upcoming meeting, first of each
/// duplicate group kept, best score first.
pub fn discuss_queue(
    podcasts: Vec<PodcastView>,
    meetings: &[Meeting],
    now: DateTime<Utc>,
) -> Vec<PodcastView> {
    let booked: HashSet<Uuid> = meetings
        .iter()
        .filter(|m| m.effective_status(now) != MeetingStatus::Completed)
        .filter_map(|m| m.podcast_id)
        .collect();

    let mut seen = HashSet::new();
    let mut queue: Vec<PodcastView> = podcasts
        .into_iter()
        .filter(|p| p.status == crate::models::PodcastStatus::Pending)
        .filter(|p| !booked.contains(&p.id))
        .filter(|p| seen.insert(dedupe_key(&p.title, &p.host, &p.episode_names, &p.link)))
        .collect();

    queue.sort_by(|a, b| {
        b.ranking_score
            .cmp(&a.ranking_score)
            .then_with(|| compare_titles(&a.title, &b.title))
    });
    queue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, PodcastStatus, Rating};
    use chrono::Duration;

    fn member(name: &str) -> Member {
        Member::new(
            name,
            &format!("{}@example.com", name.to_lowercase()),
            Address::default(),
            Utc::now(),
        )
    }

    fn podcast(title: &str, submitter: &Member) -> Podcast {
        let now = Utc::now();
        Podcast {
            id: Uuid::new_v4(),
            title: title.into(),
            host: "Host".into(),
            episode_count: 1,
            episode_names: "Pilot".into(),
            total_time_minutes: 40,
            link: format!("https://example.com/{}", title.to_lowercase()),
            notes: String::new(),
            submitted_by: submitter.id,
            ratings: vec![Rating::new(submitter.id, RatingValue::MyPodcast)],
            status: PodcastStatus::Pending,
            discussed_meeting_id: None,
            import: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_missing_voters_treats_no_selection_as_missing() {
        let (a, b, c) = (member("alice"), member("Bob"), member("carol"));
        let members = vec![a.clone(), b.clone(), c.clone()];
        let mut p = podcast("Show", &a);
        p.upsert_rating(b.id, RatingValue::NoSelection);

        assert_eq!(missing_voters(&p, &members), vec!["Bob", "carol"]);

        p.upsert_rating(c.id, RatingValue::Meh);
        let missing = missing_voters(&p, &members);
        assert_eq!(missing, vec!["Bob"]);
        let voted = p
            .ratings
            .iter()
            .filter(|r| r.value != RatingValue::NoSelection)
            .count();
        assert_eq!(missing.len() + voted, members.len());
    }

    #[test]
    fn test_dedupe_key_normalizes() {
        assert_eq!(
            dedupe_key(" The  Show ", "Host", "Ep 1", "https://Example.com/Show?utm=1"),
            dedupe_key("the show", "host", "ep 1", "http://example.com/show")
        );
        assert_ne!(
            dedupe_key("The Show", "Host", "Ep 1", "https://example.com/a"),
            dedupe_key("The Show", "Host", "Ep 1", "https://example.com/b")
        );
        assert_eq!(
            dedupe_key("x", "", "", "not a url"),
            dedupe_key("X", "", "", "NOT A URL")
        );
    }

    #[test]
    fn test_sheet_order() {
        let (a, b) = (member("a"), member("b"));
        let members = vec![a.clone(), b.clone()];

        let complete = {
            let mut p = podcast("Zeta", &a);
            p.upsert_rating(b.id, RatingValue::Like);
            p
        };
        let incomplete_high = {
            let mut p = podcast("Beta", &b);
            p.ratings.push(Rating::new(a.id, RatingValue::NoSelection));
            p
        };
        let incomplete_low = podcast("Alpha", &b);

        let mut views: Vec<PodcastView> = [complete, incomplete_high, incomplete_low]
            .iter()
            .map(|p| format_podcast(p, &members, None))
            .collect();
        sort_like_sheet(&mut views);

        let titles: Vec<&str> = views.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta", "Zeta"]);
    }

    #[test]
    fn test_discuss_queue_excludes_booked_and_duplicates() {
        let a = member("a");
        let b = member("b");
        let members = vec![a.clone(), b.clone()];
        let now = Utc::now();

        let mut top = podcast("Top", &a);
        top.upsert_rating(b.id, RatingValue::LikeALot);
        let dup = {
            let mut p = podcast("Top", &b);
            p.link = "https://EXAMPLE.com/top".into();
            p
        };
        let booked = podcast("Booked", &a);
        let mut discussed = podcast("Old", &a);
        discussed.status = PodcastStatus::Discussed;
        let plain = podcast("Plain", &a);

        let meeting = Meeting {
            id: Uuid::new_v4(),
            date: now + Duration::days(7),
            host_id: a.id,
            podcast_id: Some(booked.id),
            location: "Here".into(),
            notes: String::new(),
            status: Some(MeetingStatus::Scheduled),
            completed_at: None,
            import: None,
            created_at: now,
            updated_at: now,
        };

        let views = [&top, &dup, &booked, &discussed, &plain]
            .iter()
            .map(|p| format_podcast(p, &members, None))
            .collect();
        let queue = discuss_queue(views, &[meeting], now);
        let titles: Vec<&str> = queue.iter().map(|v| v.title.as_str()).collect();
        assert_eq!(titles, vec!["Top", "Plain"]);
        assert_eq!(queue[0].id, top.id);
    }

    #[test]
    fn test_unknown_members_render_placeholder() {
        let a = member("a");
        let p = podcast("Show", &a);
        let view = format_podcast(&p, &[], None);
        assert_eq!(view.submitted_by.name, "Unknown");
        assert_eq!(view.ranking_score, 0);
    }
}
