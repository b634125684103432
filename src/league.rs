// League data model: identifiers, participants, rosters, and draft state.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Canonical identifiers
// ---------------------------------------------------------------------------

/// Stable league identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeagueId(pub String);

/// Stable user identifier. All turn-holder and participant comparisons go
/// through this one type, so there is a single notion of identity equality.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Stable player identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl fmt::Display for LeagueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for LeagueId {
    fn from(s: &str) -> Self {
        LeagueId(s.to_string())
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

impl From<&str> for PlayerId {
    fn from(s: &str) -> Self {
        PlayerId(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// League lifecycle and draft settings
// ---------------------------------------------------------------------------

/// League lifecycle status. Progression is linear:
/// `Setup -> Open -> Drafting -> Active -> Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeagueStatus {
    Setup,
    Open,
    Drafting,
    Active,
    Completed,
}

impl fmt::Display for LeagueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LeagueStatus::Setup => "setup",
            LeagueStatus::Open => "open",
            LeagueStatus::Drafting => "drafting",
            LeagueStatus::Active => "active",
            LeagueStatus::Completed => "completed",
        };
        write!(f, "{s}")
    }
}

/// Whether draft order reverses on even rounds or stays fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DraftType {
    Snake,
    Linear,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSettings {
    pub draft_type: DraftType,
    /// Per-turn time budget, in seconds.
    pub time_limit_per_pick: u64,
}

// ---------------------------------------------------------------------------
// Picks, rosters, participants
// ---------------------------------------------------------------------------

/// A completed pick: the draft's append-only audit log entry. The pick
/// history is the source of truth for which players are taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickRecord {
    pub user: UserId,
    pub player: PlayerId,
    /// 1-based round this pick was made in.
    pub round: u32,
    /// 1-based pick slot within the round.
    pub pick: u32,
    pub timestamp: DateTime<Utc>,
}

/// A player on a team's roster, with draft provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player: PlayerId,
    pub round: u32,
    pub pick: u32,
    pub acquired: DateTime<Utc>,
}

/// A participant's team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub roster: Vec<RosterEntry>,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Team {
            name: name.into(),
            roster: Vec::new(),
        }
    }

    pub fn roster_count(&self) -> usize {
        self.roster.len()
    }
}

/// A league member and their team. Inactive participants keep their slot
/// but are excluded from the draft order and the total-picks ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub user: UserId,
    pub team: Team,
    pub is_active: bool,
}

// ---------------------------------------------------------------------------
// Draft state
// ---------------------------------------------------------------------------

/// Embedded draft state, mutated only while the league status is `Drafting`.
///
/// Zero-valued at league creation, populated once at draft start, advanced
/// once per pick, and frozen at completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftState {
    /// True while a live turn clock is running.
    pub is_active: bool,
    /// 1-based round counter.
    pub current_round: u32,
    /// 1-based pick counter within the round.
    pub current_pick: u32,
    /// The participant who must act now; `None` when no turn is live.
    pub current_turn_user: Option<UserId>,
    /// When the current turn's clock began.
    pub current_turn_started: Option<DateTime<Utc>>,
    /// Randomized pick sequence, fixed once the draft starts.
    pub draft_order: Vec<UserId>,
    /// Append-only log of completed picks.
    pub pick_history: Vec<PickRecord>,
}

impl Default for DraftState {
    fn default() -> Self {
        DraftState {
            is_active: false,
            current_round: 1,
            current_pick: 1,
            current_turn_user: None,
            current_turn_started: None,
            draft_order: Vec::new(),
            pick_history: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// League aggregate
// ---------------------------------------------------------------------------

/// Aggregate root for one draft instance. The engine reads, validates,
/// mutates, and persists this as a single unit per pick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct League {
    pub id: LeagueId,
    pub name: String,
    /// The teacher who created the league; only they may start the draft.
    pub created_by: UserId,
    pub status: LeagueStatus,
    pub max_participants: usize,
    /// Roster cap per team; also the total round count.
    pub max_players_per_team: u32,
    pub draft_settings: DraftSettings,
    pub draft_state: DraftState,
    /// Players eligible for this league's draft. The pool itself is left
    /// immutable during the draft; availability is computed by subtracting
    /// the pick history.
    pub draft_pool: Vec<PlayerId>,
    pub participants: Vec<Participant>,
}

impl League {
    pub fn active_participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_active)
    }

    pub fn active_participant_count(&self) -> usize {
        self.active_participants().count()
    }

    /// The exact total-picks ceiling: active participants x roster cap.
    pub fn total_picks(&self) -> usize {
        self.active_participant_count() * self.max_players_per_team as usize
    }

    pub fn participant(&self, user: &UserId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| &p.user == user && p.is_active)
    }

    pub fn participant_mut(&mut self, user: &UserId) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| &p.user == user && p.is_active)
    }

    /// Player ids already taken, per the pick history.
    pub fn picked_player_ids(&self) -> HashSet<&PlayerId> {
        self.draft_state
            .pick_history
            .iter()
            .map(|p| &p.player)
            .collect()
    }

    /// Draft pool minus everything in the pick history.
    pub fn available_players(&self) -> Vec<PlayerId> {
        let picked = self.picked_player_ids();
        self.draft_pool
            .iter()
            .filter(|p| !picked.contains(p))
            .cloned()
            .collect()
    }

    /// Whether `player` can still be drafted in this league.
    pub fn is_player_available(&self, player: &PlayerId) -> bool {
        self.draft_pool.contains(player) && !self.picked_player_ids().contains(player)
    }

    /// Whether the user currently holds the turn.
    pub fn is_users_turn(&self, user: &UserId) -> bool {
        self.draft_state.current_turn_user.as_ref() == Some(user)
    }

    /// Completion check, recomputed from first principles rather than
    /// trusted from a stale flag. The pick-count and round-count conditions
    /// are expected to agree; either one ends the draft.
    pub fn is_draft_complete(&self) -> bool {
        // A started draft whose turn clock has stopped is complete, whatever
        // ended it: the normal ceiling, or the empty-pool force-complete that
        // stops short of both the pick-count and round-count conditions.
        if !self.draft_state.is_active && !self.draft_state.draft_order.is_empty() {
            return true;
        }
        self.draft_state.pick_history.len() >= self.total_picks()
            || self.draft_state.current_round > self.max_players_per_team
    }

    /// Freeze the draft state and move the league to `Active`. Used by the
    /// normal completion path and the empty-pool early termination.
    pub fn complete_draft(&mut self) {
        self.draft_state.is_active = false;
        self.status = LeagueStatus::Active;
        self.draft_state.current_turn_user = None;
        self.draft_state.current_turn_started = None;
    }
}
