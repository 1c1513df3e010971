//! Round scoring.
//!
//! Only guesses at or below the answer qualify. Qualifiers are ranked by
//! guess ascending and the player at zero-based rank `r` earns
//! `(r + 1) * 5`. Everyone else earns nothing this round.

/// Points per rank step.
pub const POINTS_PER_RANK: u32 = 5;

/// Computes each player's delta for one round.
///
/// `guesses` is in join order and the returned deltas line up with it.
/// Equal guesses keep join order, so the earlier joiner ranks lower.
pub fn round_deltas(answer: f64, guesses: &[f64]) -> Vec<u32> {
    let mut qualifiers: Vec<usize> = guesses
        .iter()
        .enumerate()
        .filter(|(_, guess)| **guess <= answer)
        .map(|(i, _)| i)
        .collect();
    // `sort_by` is stable.
    qualifiers.sort_by(|a, b| guesses[*a].total_cmp(&guesses[*b]));

    let mut deltas = vec![0; guesses.len()];
    for (rank, index) in qualifiers.into_iter().enumerate() {
        deltas[index] = (rank as u32 + 1) * POINTS_PER_RANK;
    }
    deltas
}
