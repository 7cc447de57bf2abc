//! Progress/unlock tracker
//!
//! Single writer of the persisted viewed-artwork history. Decides when the
//! hunt is complete (bonus artworks never count toward the denominator) and
//! fires the one-shot submission-limit check when the user gets within one
//! artwork of completion.

use crate::db;
use crate::error::{Error, Result};
use crate::state::SharedState;
use crate::submission::SubmissionClient;
use artwalk_common::events::HuntEvent;
use artwalk_common::Catalog;
use sqlx::{Pool, Sqlite};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What happened when an artwork was marked viewed
#[derive(Debug, Clone, Copy)]
pub struct ViewOutcome {
    /// First time this artwork was seen
    pub newly_viewed: bool,
    /// Non-bonus artworks viewed so far
    pub viewed_count: usize,
    /// Fixed non-bonus denominator
    pub total_count: usize,
    /// This mark completed the hunt
    pub completed_now: bool,
    /// This mark fired the submission-limit check
    pub triggered_limit_check: bool,
}

pub struct ProgressTracker {
    db: Pool<Sqlite>,
    catalog: Arc<Catalog>,
    shared: Arc<SharedState>,
    submission: Option<Arc<SubmissionClient>>,
    user_id: Uuid,
    /// Ordered viewed set; membership duplicates are impossible by construction
    viewed: RwLock<Vec<String>>,
    /// Latch for the one-shot submission-limit check
    limit_check_fired: AtomicBool,
}

impl ProgressTracker {
    /// Load persisted history and derive the limit-check latch: a user who
    /// was already near completion in a previous session does not re-trigger
    /// the check.
    pub async fn load(
        db: Pool<Sqlite>,
        catalog: Arc<Catalog>,
        shared: Arc<SharedState>,
        submission: Option<Arc<SubmissionClient>>,
        user_id: Uuid,
    ) -> Result<Self> {
        let viewed = db::viewed::load_viewed(&db).await?;
        let non_bonus_viewed = viewed
            .iter()
            .filter(|id| catalog.get(id).map(|r| !r.is_bonus()).unwrap_or(false))
            .count();
        let already_near = non_bonus_viewed + 1 >= catalog.non_bonus_count();

        info!(
            "Progress loaded: {}/{} artworks viewed",
            non_bonus_viewed,
            catalog.non_bonus_count()
        );

        Ok(Self {
            db,
            catalog,
            shared,
            submission,
            user_id,
            viewed: RwLock::new(viewed),
            limit_check_fired: AtomicBool::new(already_near),
        })
    }

    /// Ordered viewed ids, bonus included
    pub async fn viewed_ids(&self) -> Vec<String> {
        self.viewed.read().await.clone()
    }

    pub async fn is_complete(&self) -> bool {
        let viewed = self.viewed.read().await;
        self.non_bonus_viewed(&viewed) == self.catalog.non_bonus_count()
    }

    /// Record that an artwork reached the Viewing state. Idempotent: marking
    /// an already-viewed artwork changes nothing.
    pub async fn mark_viewed(&self, artwork_id: &str) -> Result<ViewOutcome> {
        let record = self
            .catalog
            .get(artwork_id)
            .ok_or_else(|| Error::NotFound(format!("artwork '{}'", artwork_id)))?
            .clone();

        let mut viewed = self.viewed.write().await;

        let newly_viewed = !viewed.iter().any(|id| id == artwork_id);
        if newly_viewed {
            let position = viewed.len();
            db::viewed::append_viewed(&self.db, artwork_id, position).await?;
            viewed.push(artwork_id.to_string());
            info!("artwork '{}' unlocked ({} viewed)", artwork_id, viewed.len());
        } else {
            debug!("artwork '{}' already viewed", artwork_id);
        }

        let viewed_count = self.non_bonus_viewed(&viewed);
        let total_count = self.catalog.non_bonus_count();
        drop(viewed);

        let completed_now = newly_viewed && !record.is_bonus() && viewed_count == total_count;

        // One artwork away from completion: fire the submission-limit check
        // exactly once. Repeat scans of the near-final artwork are filtered
        // by newly_viewed; the latch covers everything else.
        let near_complete = newly_viewed && !record.is_bonus() && viewed_count + 1 == total_count;
        let triggered_limit_check =
            near_complete && !self.limit_check_fired.swap(true, Ordering::AcqRel);
        if triggered_limit_check {
            self.spawn_limit_check();
        }

        self.shared.broadcast_event(HuntEvent::ArtworkViewed {
            artwork_id: record.id.clone(),
            newly_viewed,
            viewed_count,
            total_count,
            unlock_reward: if newly_viewed {
                record.unlock_reward.clone()
            } else {
                None
            },
            timestamp: chrono::Utc::now(),
        });

        if completed_now {
            info!("all {} artworks found", total_count);
            self.shared.broadcast_event(HuntEvent::HuntCompleted {
                timestamp: chrono::Utc::now(),
            });
        }

        Ok(ViewOutcome {
            newly_viewed,
            viewed_count,
            total_count,
            completed_now,
            triggered_limit_check,
        })
    }

    fn non_bonus_viewed(&self, viewed: &[String]) -> usize {
        viewed
            .iter()
            .filter(|id| {
                self.catalog
                    .get(id)
                    .map(|r| !r.is_bonus())
                    .unwrap_or(false)
            })
            .count()
    }

    /// Fire-and-forget limit check; failures are swallowed as "not reached"
    fn spawn_limit_check(&self) {
        let Some(client) = self.submission.clone() else {
            debug!("no submission endpoint configured, skipping limit check");
            return;
        };
        let shared = Arc::clone(&self.shared);
        let user_id = self.user_id;

        tokio::spawn(async move {
            let reached = match client.limit_reached(user_id).await {
                Ok(reached) => reached,
                Err(e) => {
                    warn!("submission-limit check failed: {}", e);
                    false
                }
            };
            shared.set_submission_limit_reached(reached);
            shared.broadcast_event(HuntEvent::SubmissionLimit {
                reached,
                timestamp: chrono::Utc::now(),
            });
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn tracker() -> ProgressTracker {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init::create_schema(&pool).await.unwrap();

        ProgressTracker::load(
            pool,
            Arc::new(Catalog::new()),
            Arc::new(SharedState::new()),
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap()
    }

    /// All seven regular ids, in catalog order
    fn regular_ids() -> Vec<String> {
        Catalog::new()
            .iter()
            .filter(|r| !r.is_bonus())
            .map(|r| r.id.clone())
            .collect()
    }

    #[tokio::test]
    async fn test_mark_viewed_idempotent() {
        let tracker = tracker().await;

        let first = tracker.mark_viewed("xmas-tree").await.unwrap();
        assert!(first.newly_viewed);
        assert_eq!(first.viewed_count, 1);

        let second = tracker.mark_viewed("xmas-tree").await.unwrap();
        assert!(!second.newly_viewed);
        assert_eq!(second.viewed_count, 1);

        assert_eq!(tracker.viewed_ids().await, ["xmas-tree"]);
    }

    #[tokio::test]
    async fn test_seven_of_eight_completes_with_bonus_excluded() {
        let tracker = tracker().await;

        for id in regular_ids() {
            assert!(!tracker.is_complete().await);
            tracker.mark_viewed(&id).await.unwrap();
        }

        // The eighth (bonus) artwork was never viewed
        assert!(tracker.is_complete().await);
    }

    #[tokio::test]
    async fn test_bonus_does_not_advance_completion() {
        let tracker = tracker().await;

        let outcome = tracker.mark_viewed("bonus-aurora").await.unwrap();
        assert!(outcome.newly_viewed);
        assert_eq!(outcome.viewed_count, 0);
        assert!(!outcome.completed_now);
        assert!(!tracker.is_complete().await);
    }

    #[tokio::test]
    async fn test_completion_event_fires_once() {
        let tracker = tracker().await;
        let mut rx = tracker.shared.subscribe_events();

        let ids = regular_ids();
        for id in &ids {
            tracker.mark_viewed(id).await.unwrap();
        }
        // Re-scan of the final artwork must not re-complete
        let again = tracker.mark_viewed(ids.last().unwrap()).await.unwrap();
        assert!(!again.completed_now);

        let mut completions = 0;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, HuntEvent::HuntCompleted { .. }) {
                completions += 1;
            }
        }
        assert_eq!(completions, 1);
    }

    #[tokio::test]
    async fn test_limit_check_triggers_once_at_one_away() {
        let tracker = tracker().await;
        let ids = regular_ids();

        let mut trigger_count = 0;
        for id in &ids {
            let outcome = tracker.mark_viewed(id).await.unwrap();
            if outcome.triggered_limit_check {
                trigger_count += 1;
                // Fired at exactly one-away-from-complete
                assert_eq!(outcome.viewed_count + 1, outcome.total_count);
            }
        }
        assert_eq!(trigger_count, 1);

        // Repeat scans of the near-final artwork do not re-trigger
        let again = tracker.mark_viewed(&ids[ids.len() - 2]).await.unwrap();
        assert!(!again.triggered_limit_check);
    }

    #[tokio::test]
    async fn test_restart_near_completion_does_not_retrigger() {
        let pool = SqlitePoolOptions::new()
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init::create_schema(&pool).await.unwrap();

        let catalog = Arc::new(Catalog::new());
        let ids = regular_ids();

        // Persist six of seven, then "restart" by loading a fresh tracker
        for (position, id) in ids[..6].iter().enumerate() {
            crate::db::viewed::append_viewed(&pool, id, position).await.unwrap();
        }

        let tracker = ProgressTracker::load(
            pool,
            catalog,
            Arc::new(SharedState::new()),
            None,
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let outcome = tracker.mark_viewed(&ids[6]).await.unwrap();
        assert!(outcome.completed_now);
        assert!(!outcome.triggered_limit_check);
    }

    #[tokio::test]
    async fn test_unknown_artwork_rejected() {
        let tracker = tracker().await;
        assert!(tracker.mark_viewed("sunken-bell").await.is_err());
    }
}
