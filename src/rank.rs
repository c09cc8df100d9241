//! Standings: top entries by score plus the current identity's overall rank.

use crate::leaderboard::{LeaderboardEntry, Snapshot};

/// How many entries the leaderboard panel shows.
pub const TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ranked {
    /// 1-based rank over the full sorted set.
    pub rank: usize,
    pub entry: LeaderboardEntry,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Standings {
    pub top: Vec<Ranked>,
    /// The current identity's placement, when it has an entry at all.
    pub you: Option<Ranked>,
}

/// Pure function over a snapshot: descending score, ties broken by first-seen
/// order (stable sort over the snapshot's arrival order), so a fixed snapshot
/// always produces the same standings.
pub fn compute_standings(snapshot: &Snapshot, identity: Option<&str>) -> Standings {
    let mut sorted: Vec<&LeaderboardEntry> = snapshot.iter().collect();
    sorted.sort_by(|a, b| b.score.cmp(&a.score));

    let top = sorted
        .iter()
        .take(TOP_N)
        .enumerate()
        .map(|(i, e)| Ranked {
            rank: i + 1,
            entry: (*e).clone(),
        })
        .collect();

    let you = identity.and_then(|id| {
        sorted.iter().position(|e| e.identity == id).map(|i| Ranked {
            rank: i + 1,
            entry: sorted[i].clone(),
        })
    });

    Standings { top, you }
}
