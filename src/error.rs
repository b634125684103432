// Draft engine error taxonomy.

use thiserror::Error;

use crate::league::{LeagueId, LeagueStatus, PlayerId, UserId};

/// Persistence-layer failures. A version conflict means another writer got
/// in between our read and our write; nothing was applied.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("league {0} not found in store")]
    NotFound(LeagueId),

    #[error("league {id} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict {
        id: LeagueId,
        expected: u64,
        found: u64,
    },
}

/// All the ways a draft operation can fail.
///
/// Most of these are expected, frequent conditions in a live multiplayer
/// draft (a stale client pressing the pick button a beat too late), not
/// exceptional situations. The exception is [`DraftError::DraftOrderInvalid`],
/// which signals an internal consistency violation: the pick is aborted and
/// no state is persisted.
#[derive(Debug, Error)]
pub enum DraftError {
    #[error("league {0} not found")]
    LeagueNotFound(LeagueId),

    #[error("user {0} is not an active participant in this league")]
    NotAParticipant(UserId),

    #[error("only the league creator can perform this action")]
    AccessDenied,

    #[error("league is not in drafting mode (current status: {0})")]
    LeagueNotDrafting(LeagueStatus),

    #[error("league must be open to start a draft (current status: {0})")]
    LeagueNotOpen(LeagueStatus),

    #[error("need at least 2 active participants to start a draft (have {0})")]
    TooFewParticipants(usize),

    #[error("draft is not currently active")]
    DraftNotActive,

    #[error("it is not your turn to pick")]
    NotYourTurn,

    #[error("player {0} is not available")]
    PlayerUnavailable(PlayerId),

    #[error("team roster is full")]
    RosterFull,

    #[error("a pick is already in progress for user {0}")]
    PickInProgress(UserId),

    #[error("draft order is invalid: index {index} out of bounds for {len} participants")]
    DraftOrderInvalid { index: usize, len: usize },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

impl DraftError {
    /// Whether the caller should simply retry or re-poll, rather than treat
    /// this as a real failure.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DraftError::PickInProgress(_)
                | DraftError::Storage(StoreError::VersionConflict { .. })
        )
    }
}
