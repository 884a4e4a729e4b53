//! Buzz lock arbitration
//!
//! Every client that buzzes in races for one lock per question. The first
//! claim that reaches the session wins; every later claim is a loser and
//! leaves the state untouched until the host releases the lock. Callers
//! serialize access through the session mutex, so claims are linearized and
//! exactly one of any set of concurrent claims wins.

use serde::{Deserialize, Serialize};

use super::teams::Error;

/// Outcome of a single buzz attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuzzOutcome {
    /// The claimant now owns the lock; `round` numbers this ownership
    Won {
        /// Round number assigned to this win
        round: u64,
    },
    /// The lock was already held; nothing changed
    Locked {
        /// The team holding the lock
        owner: usize,
    },
}

/// The shared buzz lock of a session
///
/// `owner` is the only record of who holds the lock. The session-wide
/// `buzz_lock` flag and each team's `buzz_lock_owned` mark are derived from
/// it when snapshots are taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuzzLock {
    owner: Option<usize>,
    round: u64,
}

impl BuzzLock {
    /// Team currently holding the lock
    pub fn owner(&self) -> Option<usize> {
        self.owner
    }

    /// Whether any team holds the lock
    pub fn is_locked(&self) -> bool {
        self.owner.is_some()
    }

    /// Number of times the lock has been won in this session
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Whether `team` is the current owner
    pub fn is_owned_by(&self, team: usize) -> bool {
        self.owner == Some(team)
    }

    /// Attempts to take the lock for `team`
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSuchTeam` if `team` is not below `team_count`. An
    /// invalid claim never disturbs the current owner.
    pub fn try_claim(&mut self, team: usize, team_count: usize) -> Result<BuzzOutcome, Error> {
        if team >= team_count {
            return Err(Error::NoSuchTeam(team));
        }
        match self.owner {
            Some(owner) => Ok(BuzzOutcome::Locked { owner }),
            None => {
                self.owner = Some(team);
                self.round += 1;
                Ok(BuzzOutcome::Won { round: self.round })
            }
        }
    }

    /// Releases the lock, returning the team that held it
    ///
    /// Releasing a free lock does nothing. The round counter keeps counting
    /// across releases so clients can tell a new win from an old one.
    pub fn release(&mut self) -> Option<usize> {
        self.owner.take()
    }
}
