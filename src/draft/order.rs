// Draft order generation.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::league::UserId;

/// Produce a uniformly-random pick sequence for the given active
/// participants.
///
/// Uses `rand`'s Fisher-Yates shuffle; a comparator-based "sort by random"
/// would be statistically biased, and order fairness is the whole point of
/// randomizing. Called exactly once, at draft start; the resulting order is
/// persisted and never regenerated mid-draft.
pub fn generate_draft_order<R: Rng>(participants: &[UserId], rng: &mut R) -> Vec<UserId> {
    let mut order: Vec<UserId> = participants.to_vec();
    order.shuffle(rng);
    order
}
