// Turn advancement: pure round/pick/holder arithmetic.

use crate::error::DraftError;
use crate::league::{DraftType, UserId};

/// The next turn computed by [`advance_turn`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextTurn {
    pub round: u32,
    pub pick: u32,
    pub holder: UserId,
}

/// Compute the next round, pick, and turn-holder.
///
/// Completion must be decided by the caller *before* invoking this: once
/// `pick_history` has reached the total-picks ceiling there is no further
/// valid turn-holder and advancing is a logic error.
///
/// Snake drafts reverse the order on even rounds; linear drafts walk the
/// order identically every round.
pub fn advance_turn(
    current_round: u32,
    current_pick: u32,
    draft_order: &[UserId],
    draft_type: DraftType,
) -> Result<NextTurn, DraftError> {
    let total_participants = draft_order.len();
    // The >= 2 participant floor is enforced at draft start; a smaller
    // order here means corrupted state. Reported as the fatal error, never
    // a panic: the caller logs it and aborts the pick unpersisted.
    if total_participants < 2 {
        return Err(DraftError::DraftOrderInvalid {
            index: 0,
            len: total_participants,
        });
    }

    let mut next_pick = current_pick + 1;
    let mut next_round = current_round;
    if next_pick as usize > total_participants {
        next_round += 1;
        next_pick = 1;
    }

    let index = match draft_type {
        DraftType::Linear => next_pick as usize - 1,
        DraftType::Snake => {
            if next_round % 2 == 0 {
                total_participants - next_pick as usize
            } else {
                next_pick as usize - 1
            }
        }
    };

    // Defensive clamp, then a hard check: if the clamp actually had to move
    // the index the arithmetic above is wrong, and silently masking that
    // would persist a corrupt turn-holder.
    let clamped = index.min(total_participants - 1);
    if clamped != index {
        return Err(DraftError::DraftOrderInvalid {
            index,
            len: total_participants,
        });
    }

    let holder = draft_order
        .get(clamped)
        .cloned()
        .ok_or(DraftError::DraftOrderInvalid {
            index: clamped,
            len: total_participants,
        })?;

    Ok(NextTurn {
        round: next_round,
        pick: next_pick,
        holder,
    })
}

/// The turn-holder for an absolute (round, pick) slot. Used to verify that
/// the persisted turn-holder stays consistent with the advancement rules.
pub fn holder_for_slot(
    round: u32,
    pick: u32,
    draft_order: &[UserId],
    draft_type: DraftType,
) -> Option<&UserId> {
    let n = draft_order.len();
    if n == 0 || pick == 0 || pick as usize > n {
        return None;
    }
    let index = match draft_type {
        DraftType::Linear => pick as usize - 1,
        DraftType::Snake => {
            if round % 2 == 0 {
                n - pick as usize
            } else {
                pick as usize - 1
            }
        }
    };
    draft_order.get(index)
}
