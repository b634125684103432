// Read-only draft status projection for polling clients.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DraftError;
use crate::league::{
    DraftSettings, League, LeagueId, LeagueStatus, PickRecord, PlayerId, RosterEntry, UserId,
};

/// Snapshot of a league's draft, assembled per request.
///
/// Computed, never cached: availability is re-derived from the pick history
/// and completion is recomputed from first principles, since pollers may
/// outrun persistence and a stale flag would lie to them. A snapshot taken
/// mid-pick is eventually consistent; clients re-poll.
#[derive(Debug, Clone, Serialize)]
pub struct DraftStatus {
    pub league: LeagueId,
    pub status: LeagueStatus,
    pub is_active: bool,
    pub current_round: u32,
    pub current_pick: u32,
    pub current_turn_user: Option<UserId>,
    pub draft_order: Vec<UserId>,
    pub pick_history: Vec<PickRecord>,
    pub is_draft_complete: bool,
    pub available_players: Vec<PlayerId>,
    pub draft_settings: DraftSettings,
    /// Whether the requesting user holds the current turn.
    pub is_user_turn: bool,
    /// The requesting user's roster so far.
    pub user_roster: Vec<RosterEntry>,
    /// Seconds left on the current turn clock, if one is running. Saturates
    /// at zero once the budget is spent.
    pub seconds_remaining: Option<u64>,
}

/// Assemble a [`DraftStatus`] for `requesting_user`.
///
/// Available while the league is `Drafting` or `Active` (clients keep
/// polling through the completion transition). No mutation; safe to call
/// concurrently with pick submission.
pub fn project(
    league: &League,
    requesting_user: &UserId,
    now: DateTime<Utc>,
) -> Result<DraftStatus, DraftError> {
    let participant = league
        .participant(requesting_user)
        .ok_or_else(|| DraftError::NotAParticipant(requesting_user.clone()))?;

    if !matches!(league.status, LeagueStatus::Drafting | LeagueStatus::Active) {
        return Err(DraftError::LeagueNotDrafting(league.status));
    }

    let seconds_remaining = match (
        league.draft_state.is_active,
        league.draft_state.current_turn_started,
    ) {
        (true, Some(started)) => {
            let elapsed = (now - started).num_seconds().max(0) as u64;
            Some(league.draft_settings.time_limit_per_pick.saturating_sub(elapsed))
        }
        _ => None,
    };

    Ok(DraftStatus {
        league: league.id.clone(),
        status: league.status,
        is_active: league.draft_state.is_active,
        current_round: league.draft_state.current_round,
        current_pick: league.draft_state.current_pick,
        current_turn_user: league.draft_state.current_turn_user.clone(),
        draft_order: league.draft_state.draft_order.clone(),
        pick_history: league.draft_state.pick_history.clone(),
        is_draft_complete: league.is_draft_complete(),
        available_players: league.available_players(),
        draft_settings: league.draft_settings.clone(),
        is_user_turn: league.is_users_turn(requesting_user),
        user_roster: participant.team.roster.clone(),
        seconds_remaining,
    })
}
