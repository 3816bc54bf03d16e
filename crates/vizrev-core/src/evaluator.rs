//! Majority evaluation of a release's verification entries.
//!
//! Two tests run in a fixed order over the same entries:
//!
//! 1. **Rejection**: entries that are reviewed and not safe. A strict
//!    majority removes the release.
//! 2. **Approval**: entries marked safe, reviewed or not. A strict majority
//!    verifies the release; anything less clears the flag.
//!
//! Unreviewed entries never count as rejections, yet stay in both
//! denominators. Both tests share [`is_strict_majority`], so ties never
//! decide either way.

use serde::Serialize;
use vizrev_state::VerificationEntry;

/// `count` is more than half of `total`. Zero of zero is not a majority.
pub fn is_strict_majority(count: usize, total: usize) -> bool {
    count * 2 > total
}

/// Counts over one release's entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Tally {
    pub total: usize,
    pub approvals: usize,
    pub rejections: usize,
    pub pending: usize,
}

impl Tally {
    pub fn of(statuses: &[VerificationEntry]) -> Self {
        statuses.iter().fold(
            Tally {
                total: statuses.len(),
                ..Default::default()
            },
            |mut tally, entry| {
                if entry.is_safe {
                    tally.approvals += 1;
                }
                if entry.is_rejection() {
                    tally.rejections += 1;
                }
                if !entry.is_reviewed {
                    tally.pending += 1;
                }
                tally
            },
        )
    }

    pub fn rejected(&self) -> bool {
        is_strict_majority(self.rejections, self.total)
    }

    pub fn approved(&self) -> bool {
        is_strict_majority(self.approvals, self.total)
    }
}

/// What should happen to a release after its entries changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The recomputed flag equals the stored one.
    Unchanged,
    /// The flag flips to the contained value.
    Verified(bool),
    /// A majority rejected the release; it must be removed.
    Rejected,
}

impl Verdict {
    /// The `verified` flag to persist, or `None` when the release goes away.
    pub fn verified_flag(self, current: bool) -> Option<bool> {
        match self {
            Verdict::Unchanged => Some(current),
            Verdict::Verified(flag) => Some(flag),
            Verdict::Rejected => None,
        }
    }
}

/// Decide the fate of a release holding `statuses` whose stored flag is `current_verified`.
pub fn evaluate(statuses: &[VerificationEntry], current_verified: bool) -> Verdict {
    let tally = Tally::of(statuses);
    if tally.rejected() {
        return Verdict::Rejected;
    }
    let approved = tally.approved();
    if approved == current_verified {
        Verdict::Unchanged
    } else {
        Verdict::Verified(approved)
    }
}
