// Pick orchestration: validation, roster mutation, turn advancement, and
// completion detection, persisted as one atomic unit per pick.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::draft::advance::advance_turn;
use crate::draft::guard::PickGuard;
use crate::draft::order::generate_draft_order;
use crate::draft::status::{self, DraftStatus};
use crate::error::{DraftError, StoreError};
use crate::league::{
    League, LeagueId, LeagueStatus, PickRecord, PlayerId, RosterEntry, UserId,
};
use crate::store::LeagueStore;

/// Summary of the turn that follows a successful pick.
#[derive(Debug, Clone, Serialize)]
pub struct TurnSummary {
    pub round: u32,
    pub pick: u32,
    /// `None` once the draft has completed.
    pub holder: Option<UserId>,
    pub draft_complete: bool,
}

/// Result of a successful pick submission.
#[derive(Debug, Clone, Serialize)]
pub struct PickOutcome {
    /// The recorded pick. `None` only on the empty-pool early termination,
    /// where the draft completes without a pick being made.
    pub pick: Option<PickRecord>,
    pub next: TurnSummary,
}

/// Collaborator hook invoked after any roster change, so scoring and
/// rankings (implemented entirely outside this engine) can recompute.
#[async_trait]
pub trait RosterChanged: Send + Sync {
    async fn roster_changed(&self, league: &LeagueId, user: &UserId);
}

/// Score-recomputation trigger. `Disabled` is the default for tests and
/// for deployments that recompute on a schedule instead.
pub enum ScoreTrigger {
    Active(Arc<dyn RosterChanged>),
    Disabled,
}

impl ScoreTrigger {
    async fn notify(&self, league: &LeagueId, user: &UserId) {
        if let ScoreTrigger::Active(listener) = self {
            listener.roster_changed(league, user).await;
        }
    }
}

/// Orchestrates draft picks against a [`LeagueStore`].
///
/// Every pick is: acquire the per-user guard, load the league at a version,
/// validate, mutate a private copy, and write it back with a
/// compare-and-swap. A conflicting concurrent write rejects the whole pick;
/// nothing is ever partially applied.
pub struct DraftEngine {
    store: Arc<dyn LeagueStore>,
    guard: Arc<PickGuard>,
    score_trigger: ScoreTrigger,
    rng: Mutex<StdRng>,
}

impl DraftEngine {
    pub fn new(store: Arc<dyn LeagueStore>, guard: Arc<PickGuard>) -> Self {
        DraftEngine {
            store,
            guard,
            score_trigger: ScoreTrigger::Disabled,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Replace the RNG with a seeded one, for deterministic tests.
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = Mutex::new(rng);
        self
    }

    pub fn with_score_trigger(mut self, trigger: ScoreTrigger) -> Self {
        self.score_trigger = trigger;
        self
    }

    /// Start the draft: generate the order, seed the draft state, and move
    /// the league to `Drafting`. Only the league creator may do this, the
    /// league must be `Open`, and at least two participants must be active.
    pub async fn start_draft(
        &self,
        league_id: &LeagueId,
        requesting_user: &UserId,
    ) -> Result<League, DraftError> {
        let versioned = self.load(league_id).await?;
        let mut league = versioned.league;

        if &league.created_by != requesting_user {
            return Err(DraftError::AccessDenied);
        }
        if league.status != LeagueStatus::Open {
            return Err(DraftError::LeagueNotOpen(league.status));
        }
        let active: Vec<UserId> = league
            .active_participants()
            .map(|p| p.user.clone())
            .collect();
        if active.len() < 2 {
            return Err(DraftError::TooFewParticipants(active.len()));
        }

        let order = {
            let mut rng = self.rng.lock().expect("rng poisoned");
            generate_draft_order(&active, &mut *rng)
        };

        league.status = LeagueStatus::Drafting;
        league.draft_state.is_active = true;
        league.draft_state.current_round = 1;
        league.draft_state.current_pick = 1;
        league.draft_state.current_turn_user = Some(order[0].clone());
        league.draft_state.current_turn_started = Some(Utc::now());
        league.draft_state.draft_order = order;
        league.draft_state.pick_history.clear();

        self.store.update(league.clone(), versioned.version).await?;

        info!(
            league = %league.id,
            first_turn = %league.draft_state.draft_order[0],
            participants = league.draft_state.draft_order.len(),
            "draft started"
        );
        Ok(league)
    }

    /// Submit a pick for `user`. With `Some(player)` this is a client-chosen
    /// pick; with `None` the engine selects uniformly at random from the
    /// available pool (the auto-pick path).
    pub async fn submit_pick(
        &self,
        league_id: &LeagueId,
        user: &UserId,
        player: Option<PlayerId>,
    ) -> Result<PickOutcome, DraftError> {
        // Released on every exit path, including errors, via Drop.
        let _permit = self.guard.acquire(user)?;

        let versioned = self.load(league_id).await?;
        let mut league = versioned.league;

        if !league.draft_state.is_active {
            return Err(DraftError::DraftNotActive);
        }
        if !league.is_users_turn(user) {
            return Err(DraftError::NotYourTurn);
        }

        let player = match player {
            Some(p) => {
                if !league.is_player_available(&p) {
                    return Err(DraftError::PlayerUnavailable(p));
                }
                p
            }
            None => {
                let available = league.available_players();
                if available.is_empty() {
                    // Fewer players than roster slots is a legitimate
                    // terminal condition, not an error: end the draft early.
                    return self.force_complete(league, versioned.version).await;
                }
                let index = {
                    let mut rng = self.rng.lock().expect("rng poisoned");
                    rng.gen_range(0..available.len())
                };
                available[index].clone()
            }
        };

        let round = league.draft_state.current_round;
        let pick = league.draft_state.current_pick;
        let now = Utc::now();

        {
            let cap = league.max_players_per_team as usize;
            let participant = league
                .participant_mut(user)
                .ok_or_else(|| DraftError::NotAParticipant(user.clone()))?;
            if participant.team.roster_count() >= cap {
                return Err(DraftError::RosterFull);
            }
            participant.team.roster.push(RosterEntry {
                player: player.clone(),
                round,
                pick,
                acquired: now,
            });
        }

        let record = PickRecord {
            user: user.clone(),
            player: player.clone(),
            round,
            pick,
            timestamp: now,
        };
        league.draft_state.pick_history.push(record.clone());

        let total_picks = league.total_picks();
        let current_picks = league.draft_state.pick_history.len();
        if current_picks >= total_picks {
            league.complete_draft();
        } else {
            let next = advance_turn(
                round,
                pick,
                &league.draft_state.draft_order,
                league.draft_settings.draft_type,
            )
            .map_err(|e| {
                // Internal consistency violation: abort without persisting
                // the half-advanced state.
                error!(
                    league = %league.id,
                    round,
                    pick,
                    order_len = league.draft_state.draft_order.len(),
                    %e,
                    "turn advancement failed; pick aborted"
                );
                e
            })?;
            league.draft_state.current_round = next.round;
            league.draft_state.current_pick = next.pick;
            league.draft_state.current_turn_user = Some(next.holder);
            league.draft_state.current_turn_started = Some(Utc::now());
        }

        let outcome = PickOutcome {
            pick: Some(record),
            next: TurnSummary {
                round: league.draft_state.current_round,
                pick: league.draft_state.current_pick,
                holder: league.draft_state.current_turn_user.clone(),
                draft_complete: league.status != LeagueStatus::Drafting
                    || !league.draft_state.is_active,
            },
        };

        let league_id = league.id.clone();
        self.store.update(league, versioned.version).await?;

        info!(
            league = %league_id,
            user = %user,
            player = %player,
            round,
            pick = pick,
            picks = current_picks,
            total = total_picks,
            complete = outcome.next.draft_complete,
            "pick recorded"
        );

        self.score_trigger.notify(&league_id, user).await;

        Ok(outcome)
    }

    /// System-selected pick on the user's behalf. Same contract as
    /// [`DraftEngine::submit_pick`] with the player chosen internally.
    pub async fn auto_pick(
        &self,
        league_id: &LeagueId,
        user: &UserId,
    ) -> Result<PickOutcome, DraftError> {
        self.submit_pick(league_id, user, None).await
    }

    /// Read-only draft status snapshot for a polling client.
    pub async fn draft_status(
        &self,
        league_id: &LeagueId,
        requesting_user: &UserId,
    ) -> Result<DraftStatus, DraftError> {
        let versioned = self.load(league_id).await?;
        status::project(&versioned.league, requesting_user, Utc::now())
    }

    /// End the draft early because the pool is exhausted.
    async fn force_complete(
        &self,
        mut league: League,
        version: u64,
    ) -> Result<PickOutcome, DraftError> {
        warn!(
            league = %league.id,
            picks = league.draft_state.pick_history.len(),
            total = league.total_picks(),
            "no players available; completing draft early"
        );
        let round = league.draft_state.current_round;
        let pick = league.draft_state.current_pick;
        league.complete_draft();
        self.store.update(league, version).await?;
        Ok(PickOutcome {
            pick: None,
            next: TurnSummary {
                round,
                pick,
                holder: None,
                draft_complete: true,
            },
        })
    }

    async fn load(
        &self,
        league_id: &LeagueId,
    ) -> Result<crate::store::VersionedLeague, DraftError> {
        self.store.get(league_id).await.map_err(|e| match e {
            StoreError::NotFound(id) => DraftError::LeagueNotFound(id),
            other => DraftError::Storage(other),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::advance::holder_for_slot;
    use crate::league::{DraftSettings, DraftState, DraftType, Participant, Team};
    use crate::store::MemoryStore;

    fn open_league(id: &str, participants: usize, cap: u32, pool: usize) -> League {
        League {
            id: LeagueId::from(id),
            name: "Period 3 Fantasy".into(),
            created_by: UserId::from("teacher"),
            status: LeagueStatus::Open,
            max_participants: 8,
            max_players_per_team: cap,
            draft_settings: DraftSettings {
                draft_type: DraftType::Linear,
                time_limit_per_pick: 60,
            },
            draft_state: DraftState::default(),
            draft_pool: (1..=pool).map(|i| PlayerId(format!("p{i}"))).collect(),
            participants: (1..=participants)
                .map(|i| Participant {
                    user: UserId(format!("u{i}")),
                    team: Team::new(format!("Team {i}")),
                    is_active: true,
                })
                .collect(),
        }
    }

    async fn engine_with(league: League) -> (DraftEngine, LeagueId) {
        let id = league.id.clone();
        let store = MemoryStore::new();
        store.put(league).await;
        let engine = DraftEngine::new(store, PickGuard::new()).with_rng(StdRng::seed_from_u64(1));
        (engine, id)
    }

    fn teacher() -> UserId {
        UserId::from("teacher")
    }

    /// Drive a started draft to completion, picking the first available
    /// player for whoever holds the turn. Returns the final league.
    async fn run_draft_to_completion(engine: &DraftEngine, id: &LeagueId) -> League {
        loop {
            let versioned = engine.load(id).await.unwrap();
            let league = versioned.league;
            if !league.draft_state.is_active {
                return league;
            }
            let holder = league.draft_state.current_turn_user.clone().unwrap();
            let player = league.available_players()[0].clone();

            // Persisted turn-holder must agree with the advancement rules.
            assert_eq!(
                holder_for_slot(
                    league.draft_state.current_round,
                    league.draft_state.current_pick,
                    &league.draft_state.draft_order,
                    league.draft_settings.draft_type,
                ),
                Some(&holder)
            );

            engine.submit_pick(id, &holder, Some(player)).await.unwrap();
        }
    }

    #[tokio::test]
    async fn start_draft_seeds_state() {
        let (engine, id) = engine_with(open_league("l1", 4, 3, 20)).await;
        let league = engine.start_draft(&id, &teacher()).await.unwrap();

        assert_eq!(league.status, LeagueStatus::Drafting);
        assert!(league.draft_state.is_active);
        assert_eq!(league.draft_state.current_round, 1);
        assert_eq!(league.draft_state.current_pick, 1);
        assert_eq!(league.draft_state.draft_order.len(), 4);
        assert_eq!(
            league.draft_state.current_turn_user.as_ref(),
            Some(&league.draft_state.draft_order[0])
        );
        assert!(league.draft_state.current_turn_started.is_some());
        assert!(league.draft_state.pick_history.is_empty());
    }

    #[tokio::test]
    async fn start_draft_requires_creator() {
        let (engine, id) = engine_with(open_league("l1", 4, 3, 20)).await;
        let err = engine.start_draft(&id, &UserId::from("u1")).await.unwrap_err();
        assert!(matches!(err, DraftError::AccessDenied));
    }

    #[tokio::test]
    async fn start_draft_requires_open_status() {
        let mut league = open_league("l1", 4, 3, 20);
        league.status = LeagueStatus::Setup;
        let (engine, id) = engine_with(league).await;
        let err = engine.start_draft(&id, &teacher()).await.unwrap_err();
        assert!(matches!(err, DraftError::LeagueNotOpen(LeagueStatus::Setup)));
    }

    #[tokio::test]
    async fn start_draft_requires_two_active_participants() {
        let mut league = open_league("l1", 2, 3, 20);
        league.participants[1].is_active = false;
        let (engine, id) = engine_with(league).await;
        let err = engine.start_draft(&id, &teacher()).await.unwrap_err();
        assert!(matches!(err, DraftError::TooFewParticipants(1)));
    }

    #[tokio::test]
    async fn pick_rejected_when_draft_not_active() {
        let (engine, id) = engine_with(open_league("l1", 2, 2, 10)).await;
        let err = engine
            .submit_pick(&id, &UserId::from("u1"), Some(PlayerId::from("p1")))
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::DraftNotActive));
    }

    #[tokio::test]
    async fn pick_rejected_out_of_turn() {
        let (engine, id) = engine_with(open_league("l1", 2, 2, 10)).await;
        let league = engine.start_draft(&id, &teacher()).await.unwrap();
        let not_holder = league
            .participants
            .iter()
            .map(|p| p.user.clone())
            .find(|u| !league.is_users_turn(u))
            .unwrap();
        let err = engine
            .submit_pick(&id, &not_holder, Some(PlayerId::from("p1")))
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::NotYourTurn));
    }

    #[tokio::test]
    async fn pick_rejected_for_unknown_league() {
        let (engine, _) = engine_with(open_league("l1", 2, 2, 10)).await;
        let err = engine
            .submit_pick(
                &LeagueId::from("ghost"),
                &UserId::from("u1"),
                Some(PlayerId::from("p1")),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::LeagueNotFound(_)));
    }

    #[tokio::test]
    async fn pick_rejected_for_player_outside_pool() {
        let (engine, id) = engine_with(open_league("l1", 2, 2, 10)).await;
        let league = engine.start_draft(&id, &teacher()).await.unwrap();
        let holder = league.draft_state.current_turn_user.clone().unwrap();
        let err = engine
            .submit_pick(&id, &holder, Some(PlayerId::from("p999")))
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::PlayerUnavailable(_)));
    }

    #[tokio::test]
    async fn pick_rejected_for_already_drafted_player() {
        let (engine, id) = engine_with(open_league("l1", 2, 2, 10)).await;
        let league = engine.start_draft(&id, &teacher()).await.unwrap();
        let first = league.draft_state.draft_order[0].clone();
        let second = league.draft_state.draft_order[1].clone();

        engine
            .submit_pick(&id, &first, Some(PlayerId::from("p1")))
            .await
            .unwrap();
        let err = engine
            .submit_pick(&id, &second, Some(PlayerId::from("p1")))
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::PlayerUnavailable(_)));
    }

    #[tokio::test]
    async fn pick_rejected_when_roster_full() {
        let mut league = open_league("l1", 2, 2, 10);
        // Pre-fill u1's roster to the cap; turn logic would normally never
        // allow this, so it exercises the defensive check.
        league.participants[0].team.roster = vec![
            RosterEntry {
                player: PlayerId::from("x1"),
                round: 1,
                pick: 1,
                acquired: Utc::now(),
            },
            RosterEntry {
                player: PlayerId::from("x2"),
                round: 1,
                pick: 2,
                acquired: Utc::now(),
            },
        ];
        let (engine, id) = engine_with(league).await;
        let started = engine.start_draft(&id, &teacher()).await.unwrap();

        // Make sure it's u1's turn before poking at the cap.
        let u1 = UserId::from("u1");
        if started.draft_state.current_turn_user != Some(u1.clone()) {
            let other = started.draft_state.current_turn_user.clone().unwrap();
            engine
                .submit_pick(&id, &other, Some(PlayerId::from("p1")))
                .await
                .unwrap();
        }

        let err = engine
            .submit_pick(&id, &u1, Some(PlayerId::from("p5")))
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::RosterFull));
    }

    #[tokio::test]
    async fn pick_while_in_flight_is_rejected() {
        let (engine, id) = engine_with(open_league("l1", 2, 2, 10)).await;
        let league = engine.start_draft(&id, &teacher()).await.unwrap();
        let holder = league.draft_state.current_turn_user.clone().unwrap();

        // Simulate an in-flight pick for the holder.
        let _held = engine.guard.acquire(&holder).unwrap();

        let err = engine
            .submit_pick(&id, &holder, Some(PlayerId::from("p1")))
            .await
            .unwrap_err();
        assert!(matches!(err, DraftError::PickInProgress(_)));
    }

    #[tokio::test]
    async fn linear_draft_runs_to_completion() {
        // 3 participants, 2 players per team, linear: 6 picks, round 2
        // restarts at pick 1, then the league flips to Active.
        let mut league = open_league("l1", 3, 2, 10);
        league.draft_settings.draft_type = DraftType::Linear;
        let (engine, id) = engine_with(league).await;
        engine.start_draft(&id, &teacher()).await.unwrap();

        let final_league = run_draft_to_completion(&engine, &id).await;

        assert_eq!(final_league.status, LeagueStatus::Active);
        assert!(!final_league.draft_state.is_active);
        assert!(final_league.draft_state.current_turn_user.is_none());
        assert!(final_league.draft_state.current_turn_started.is_none());
        assert_eq!(final_league.draft_state.pick_history.len(), 6);

        // Picks landed as R1P1..R1P3, R2P1..R2P3 in draft-order sequence.
        let order = &final_league.draft_state.draft_order;
        let history = &final_league.draft_state.pick_history;
        let slots: Vec<(u32, u32)> = history.iter().map(|p| (p.round, p.pick)).collect();
        assert_eq!(slots, vec![(1, 1), (1, 2), (1, 3), (2, 1), (2, 2), (2, 3)]);
        for record in history {
            assert_eq!(record.user, order[record.pick as usize - 1]);
        }

        // Every team drafted to its cap.
        for p in final_league.active_participants() {
            assert_eq!(p.team.roster_count(), 2);
        }
    }

    #[tokio::test]
    async fn snake_draft_alternates_rounds() {
        // 2 participants, cap 3: rounds go A,B / B,A / A,B.
        let mut league = open_league("l1", 2, 3, 10);
        league.draft_settings.draft_type = DraftType::Snake;
        let (engine, id) = engine_with(league).await;
        engine.start_draft(&id, &teacher()).await.unwrap();

        let final_league = run_draft_to_completion(&engine, &id).await;
        let order = &final_league.draft_state.draft_order;
        let pickers: Vec<&UserId> = final_league
            .draft_state
            .pick_history
            .iter()
            .map(|p| &p.user)
            .collect();
        assert_eq!(
            pickers,
            vec![&order[0], &order[1], &order[1], &order[0], &order[0], &order[1]]
        );
        assert_eq!(final_league.status, LeagueStatus::Active);
    }

    #[tokio::test]
    async fn no_player_is_drafted_twice_and_ceiling_holds() {
        let mut league = open_league("l1", 4, 3, 20);
        league.draft_settings.draft_type = DraftType::Snake;
        let (engine, id) = engine_with(league).await;
        engine.start_draft(&id, &teacher()).await.unwrap();

        let final_league = run_draft_to_completion(&engine, &id).await;
        let history = &final_league.draft_state.pick_history;
        assert!(history.len() <= final_league.total_picks());

        let mut seen = std::collections::HashSet::new();
        for record in history {
            assert!(seen.insert(record.player.clone()), "player drafted twice");
        }
    }

    #[tokio::test]
    async fn auto_pick_selects_only_available_players() {
        let (engine, id) = engine_with(open_league("l1", 2, 2, 3)).await;
        let league = engine.start_draft(&id, &teacher()).await.unwrap();
        let holder = league.draft_state.current_turn_user.clone().unwrap();

        let outcome = engine.auto_pick(&id, &holder).await.unwrap();
        let picked = outcome.pick.unwrap().player;
        assert!(league.draft_pool.contains(&picked));

        // The next auto-pick can't take the same player again.
        let next_holder = outcome.next.holder.unwrap();
        let outcome2 = engine.auto_pick(&id, &next_holder).await.unwrap();
        assert_ne!(outcome2.pick.unwrap().player, picked);
    }

    #[tokio::test]
    async fn auto_pick_on_empty_pool_completes_early() {
        // 2 participants x cap 2 = 4 total picks, but only 2 players exist.
        let (engine, id) = engine_with(open_league("l1", 2, 2, 2)).await;
        let league = engine.start_draft(&id, &teacher()).await.unwrap();

        let first = league.draft_state.current_turn_user.clone().unwrap();
        let o1 = engine.auto_pick(&id, &first).await.unwrap();
        let second = o1.next.holder.unwrap();
        let o2 = engine.auto_pick(&id, &second).await.unwrap();
        assert!(!o2.next.draft_complete);

        let third = o2.next.holder.unwrap();
        let o3 = engine.auto_pick(&id, &third).await.unwrap();
        assert!(o3.pick.is_none());
        assert!(o3.next.draft_complete);

        let final_league = engine.load(&id).await.unwrap().league;
        assert_eq!(final_league.status, LeagueStatus::Active);
        assert!(!final_league.draft_state.is_active);
        assert_eq!(final_league.draft_state.pick_history.len(), 2);
        assert!(final_league.is_draft_complete());
    }

    #[tokio::test]
    async fn guard_releases_after_failed_pick() {
        let (engine, id) = engine_with(open_league("l1", 2, 2, 10)).await;
        let league = engine.start_draft(&id, &teacher()).await.unwrap();
        let holder = league.draft_state.current_turn_user.clone().unwrap();

        // A failing pick must not leave the user wedged.
        engine
            .submit_pick(&id, &holder, Some(PlayerId::from("p999")))
            .await
            .unwrap_err();
        engine
            .submit_pick(&id, &holder, Some(PlayerId::from("p1")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn score_trigger_fires_after_each_pick() {
        struct Counter(std::sync::atomic::AtomicUsize);
        #[async_trait]
        impl RosterChanged for Counter {
            async fn roster_changed(&self, _league: &LeagueId, _user: &UserId) {
                self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        }

        let counter = Arc::new(Counter(std::sync::atomic::AtomicUsize::new(0)));
        let store = MemoryStore::new();
        store.put(open_league("l1", 2, 1, 10)).await;
        let engine = DraftEngine::new(store, PickGuard::new())
            .with_rng(StdRng::seed_from_u64(3))
            .with_score_trigger(ScoreTrigger::Active(counter.clone()));

        let id = LeagueId::from("l1");
        engine.start_draft(&id, &teacher()).await.unwrap();
        let final_league = run_draft_to_completion(&engine, &id).await;
        assert_eq!(final_league.draft_state.pick_history.len(), 2);
        assert_eq!(counter.0.load(std::sync::atomic::Ordering::SeqCst), 2);
    }
}
