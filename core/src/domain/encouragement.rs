//! Classification of ledger reasons as encouragement.
//!
//! Bonus points arrive as ordinary ledger rows whose free-text reason reads
//! like a cheer. The write side is not under this system's control, so the
//! match is a substring allow-list kept behind this one function.

use crate::domain::models::LedgerEntry;

/// Case-insensitive substrings that mark a reason as a cheer/bonus.
const ENCOURAGEMENT_PHRASES: &[&str] = &[
    "bonus",
    "high five",
    "high-five",
    "high5",
    "cheer",
    "encouragement",
    "way to go",
    "great job",
];

/// True when the reason text reads as encouragement rather than earnings.
pub fn is_encouragement(reason: &str) -> bool {
    let lower = reason.to_lowercase();
    ENCOURAGEMENT_PHRASES.iter().any(|p| lower.contains(p))
}

/// Total positive points across entries classified as encouragement.
/// Reported alongside the wallet, never folded into it.
pub fn encouragement_total(entries: &[LedgerEntry]) -> i64 {
    entries
        .iter()
        .filter(|e| e.points > 0 && is_encouragement(&e.reason))
        .map(|e| e.points)
        .sum()
}
