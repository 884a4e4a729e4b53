//! Team roster and scoring
//!
//! This module holds the ordered list of teams in a session, their names and
//! scores. Teams are addressed by their index in the roster, which is how
//! every client refers to them.

use std::collections::HashSet;

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::teams::{MAX_COUNT, MAX_SCORE, MIN_SCORE};

use super::names::{self, NameStyle, NamingScheme};

/// Attempts at drawing a unique generated name before falling back to "Team N"
const GENERATED_NAME_ATTEMPTS: usize = 16;

/// A team as every client sees it
///
/// `buzz_lock_owned` is filled in from the session's buzz lock when a
/// snapshot is taken; the roster itself never stores lock ownership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Display name of the team
    pub team_name: String,
    /// Current score, may be negative
    pub score: i32,
    /// Whether this team currently holds the buzz lock
    pub buzz_lock_owned: bool,
}

impl Team {
    fn named(team_name: String) -> Self {
        Self {
            team_name,
            score: 0,
            buzz_lock_owned: false,
        }
    }
}

/// A partial edit of a team sent by the host
///
/// A full [`Team`] body deserializes into this as well. `buzz_lock_owned`
/// is accepted for compatibility with clients that echo the whole team back
/// but is never applied: only the buzz lock decides ownership.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct TeamUpdate {
    /// New display name
    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_name: Option<String>,
    /// New absolute score
    #[garde(range(min = MIN_SCORE, max = MAX_SCORE))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<i32>,
    /// Ignored
    #[garde(skip)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buzz_lock_owned: Option<bool>,
}

impl TeamUpdate {
    /// Applies the edit to `team`
    ///
    /// The name is validated before anything is changed, so a rejected name
    /// leaves the score untouched as well.
    ///
    /// # Errors
    ///
    /// Returns an error if the new name is rejected.
    pub fn apply_to(&self, team: &mut Team) -> Result<(), names::Error> {
        let name = self
            .team_name
            .as_deref()
            .map(names::validate_team_name)
            .transpose()?;
        if let Some(name) = name {
            team.team_name = name;
        }
        if let Some(score) = self.score {
            team.score = score.clamp(MIN_SCORE, MAX_SCORE);
        }
        Ok(())
    }
}

/// Errors that can occur when editing the roster
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The index does not name a team in this session
    #[error("team {0} does not exist")]
    NoSuchTeam(usize),
    /// The requested team count is outside of the allowed bounds
    #[error("team count must be between 1 and {}", MAX_COUNT)]
    InvalidCount,
    /// The submitted team name was rejected
    #[error(transparent)]
    Name(#[from] names::Error),
}

/// The ordered list of teams in a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Roster {
    teams: Vec<Team>,
}

impl Roster {
    /// Creates a roster of `count` teams named "Team 1" to "Team N"
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCount` if `count` is zero or above the maximum.
    pub fn new(count: usize) -> Result<Self, Error> {
        Self::check_count(count)?;
        Ok(Self {
            teams: (1..=count)
                .map(|i| Team::named(format!("Team {i}")))
                .collect_vec(),
        })
    }

    /// Creates a roster of `count` teams with unique generated names
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidCount` if `count` is zero or above the maximum.
    pub fn generated(count: usize, style: NameStyle) -> Result<Self, Error> {
        Self::check_count(count)?;
        let mut taken = HashSet::new();
        let teams = (1..=count)
            .map(|i| {
                let name = (0..GENERATED_NAME_ATTEMPTS)
                    .map(|_| style.get_plural_name())
                    .find(|candidate| {
                        names::validate_team_name(candidate).is_ok()
                            && !taken.contains(candidate)
                    })
                    .unwrap_or_else(|| format!("Team {i}"));
                taken.insert(name.clone());
                Team::named(name)
            })
            .collect_vec();
        Ok(Self { teams })
    }

    fn check_count(count: usize) -> Result<(), Error> {
        if (1..=MAX_COUNT).contains(&count) {
            Ok(())
        } else {
            Err(Error::InvalidCount)
        }
    }

    /// Number of teams
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    /// Whether the roster has no teams (never true for a constructed roster)
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Gets a team by index
    pub fn get(&self, index: usize) -> Option<&Team> {
        self.teams.get(index)
    }

    /// Iterates over the teams in roster order
    pub fn iter(&self) -> impl Iterator<Item = &Team> {
        self.teams.iter()
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut Team, Error> {
        self.teams.get_mut(index).ok_or(Error::NoSuchTeam(index))
    }

    /// Applies a host edit to a team
    ///
    /// # Errors
    ///
    /// * `Error::NoSuchTeam` - `index` is out of range
    /// * `Error::Name` - the new name was rejected
    pub fn update(&mut self, index: usize, update: TeamUpdate) -> Result<&Team, Error> {
        let team = self.get_mut(index)?;
        update.apply_to(team)?;
        Ok(team)
    }

    /// Adds `delta` to a team's score, clamped to the score bounds
    ///
    /// # Errors
    ///
    /// Returns `Error::NoSuchTeam` if `index` is out of range.
    pub fn adjust_score(&mut self, index: usize, delta: i32) -> Result<&Team, Error> {
        let team = self.get_mut(index)?;
        team.score = team.score.saturating_add(delta).clamp(MIN_SCORE, MAX_SCORE);
        Ok(team)
    }

    /// Sets every score back to zero
    pub fn reset_scores(&mut self) {
        self.teams.iter_mut().for_each(|team| team.score = 0);
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_roster_default_names() {
        let roster = Roster::new(3).unwrap();
        let names = roster.iter().map(|t| t.team_name.as_str()).collect_vec();
        assert_eq!(names, ["Team 1", "Team 2", "Team 3"]);
        assert!(roster.iter().all(|t| t.score == 0 && !t.buzz_lock_owned));
    }

    #[test]
    fn test_roster_count_bounds() {
        assert_eq!(Roster::new(0).unwrap_err(), Error::InvalidCount);
        assert_eq!(Roster::new(MAX_COUNT + 1).unwrap_err(), Error::InvalidCount);
        assert_eq!(Roster::new(MAX_COUNT).unwrap().len(), MAX_COUNT);
    }

    #[test]
    fn test_roster_generated_names_are_unique() {
        for _ in 0..20 {
            let roster = Roster::generated(MAX_COUNT, NameStyle::Petname(2)).unwrap();
            let unique: HashSet<_> = roster.iter().map(|t| t.team_name.clone()).collect();
            assert_eq!(unique.len(), MAX_COUNT);
        }
    }

    #[test]
    fn test_update_name_and_score() {
        let mut roster = Roster::new(3).unwrap();
        let team = roster
            .update(
                1,
                TeamUpdate {
                    team_name: Some("  Eagles ".to_string()),
                    score: Some(400),
                    buzz_lock_owned: None,
                },
            )
            .unwrap();
        assert_eq!(team.team_name, "Eagles");
        assert_eq!(team.score, 400);
    }

    #[test]
    fn test_update_ignores_lock_ownership() {
        let mut roster = Roster::new(2).unwrap();
        let team = roster
            .update(
                0,
                TeamUpdate {
                    buzz_lock_owned: Some(true),
                    ..TeamUpdate::default()
                },
            )
            .unwrap();
        assert!(!team.buzz_lock_owned);
    }

    #[test]
    fn test_update_unknown_team() {
        let mut roster = Roster::new(3).unwrap();
        assert_eq!(
            roster.update(3, TeamUpdate::default()).unwrap_err(),
            Error::NoSuchTeam(3)
        );
    }

    #[test]
    fn test_update_rejected_name_keeps_score() {
        let mut roster = Roster::new(1).unwrap();
        let result = roster.update(
            0,
            TeamUpdate {
                team_name: Some("   ".to_string()),
                score: Some(100),
                buzz_lock_owned: None,
            },
        );
        assert_eq!(result.unwrap_err(), Error::Name(names::Error::Empty));
        assert_eq!(roster.get(0).unwrap().score, 0);
        assert_eq!(roster.get(0).unwrap().team_name, "Team 1");
    }

    #[test]
    fn test_full_team_body_deserializes_as_update() {
        let update: TeamUpdate =
            serde_json::from_str(r#"{"team_name":"Owls","score":-200,"buzz_lock_owned":true}"#)
                .unwrap();
        assert_eq!(update.team_name.as_deref(), Some("Owls"));
        assert_eq!(update.score, Some(-200));
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_update_score_out_of_bounds_fails_validation() {
        let update = TeamUpdate {
            score: Some(MAX_SCORE + 1),
            ..TeamUpdate::default()
        };
        assert!(update.validate().is_err());
    }

    #[test]
    fn test_adjust_score_saturates_at_bounds() {
        let mut roster = Roster::new(1).unwrap();
        assert_eq!(roster.adjust_score(0, 300).unwrap().score, 300);
        assert_eq!(roster.adjust_score(0, -500).unwrap().score, -200);
        assert_eq!(roster.adjust_score(0, i32::MAX).unwrap().score, MAX_SCORE);
        assert_eq!(roster.adjust_score(0, i32::MIN).unwrap().score, MIN_SCORE);
        assert_eq!(roster.adjust_score(1, 1).unwrap_err(), Error::NoSuchTeam(1));
    }

    #[test]
    fn test_reset_scores() {
        let mut roster = Roster::new(2).unwrap();
        roster.adjust_score(0, 100).unwrap();
        roster.adjust_score(1, -100).unwrap();
        roster.reset_scores();
        assert!(roster.iter().all(|t| t.score == 0));
    }
}
