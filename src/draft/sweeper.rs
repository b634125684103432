// Background sweep of expired draft turns.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::draft::engine::DraftEngine;
use crate::league::League;
use crate::store::LeagueStore;

/// Polls in-progress drafts and forces an auto-pick for any turn that has
/// overrun its time budget.
///
/// The cadence is coarser than the turn timer itself; a few seconds of
/// overrun is tolerated, and a grace period absorbs processing latency so a
/// pick submitted right at the buzzer isn't raced. A league may disappear
/// or change state between the query and the action; the engine revalidates
/// the turn inside the pick path, so a stale hit is rejected harmlessly.
pub struct TurnSweeper {
    store: Arc<dyn LeagueStore>,
    engine: Arc<DraftEngine>,
    interval: Duration,
    grace: Duration,
}

impl TurnSweeper {
    pub fn new(
        store: Arc<dyn LeagueStore>,
        engine: Arc<DraftEngine>,
        interval: Duration,
        grace: Duration,
    ) -> Self {
        TurnSweeper {
            store,
            engine,
            interval,
            grace,
        }
    }

    /// Run the sweep loop forever. Spawn as a task; abort it to stop.
    pub async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            grace_secs = self.grace.as_secs(),
            "draft turn sweeper started"
        );
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.sweep_once(Utc::now()).await;
        }
    }

    /// One sweep cycle: find expired turns and force auto-picks. Returns
    /// the number of picks forced, for observability and tests.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> usize {
        let drafting = self.store.list_drafting().await;
        let mut forced = 0;
        for versioned in drafting {
            if self.turn_expired(&versioned.league, now) {
                if self.force_auto_pick(&versioned.league).await {
                    forced += 1;
                }
            }
        }
        forced
    }

    fn turn_expired(&self, league: &League, now: DateTime<Utc>) -> bool {
        let started = match (
            &league.draft_state.current_turn_user,
            league.draft_state.current_turn_started,
        ) {
            (Some(_), Some(started)) => started,
            // No live turn clock; nothing to expire.
            _ => return false,
        };
        let budget = Duration::from_secs(league.draft_settings.time_limit_per_pick) + self.grace;
        let elapsed = (now - started).to_std().unwrap_or(Duration::ZERO);
        elapsed > budget
    }

    async fn force_auto_pick(&self, league: &League) -> bool {
        // Re-read by the engine; the holder may have picked since the query.
        let holder = match &league.draft_state.current_turn_user {
            Some(user) => user.clone(),
            None => return false,
        };
        info!(
            league = %league.id,
            user = %holder,
            round = league.draft_state.current_round,
            pick = league.draft_state.current_pick,
            "turn expired; forcing auto-pick"
        );
        match self.engine.auto_pick(&league.id, &holder).await {
            Ok(outcome) => {
                if outcome.next.draft_complete {
                    info!(league = %league.id, "draft completed by sweeper");
                }
                true
            }
            Err(e) if e.is_transient() => {
                // The user's own pick is mid-flight; let it win.
                debug!(league = %league.id, user = %holder, %e, "auto-pick skipped");
                false
            }
            Err(e) => {
                warn!(league = %league.id, user = %holder, %e, "auto-pick failed");
                false
            }
        }
    }
}
