//! A shared game session
//!
//! A session bundles everything a host and its remote players look at: the
//! team roster, the buzz lock, the question deck and the board. All
//! mutations go through `&mut Session`, which the store hands out behind a
//! per-session mutex.

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use web_time::{Duration, Instant};

use crate::constants::teams::{DEFAULT_COUNT, MAX_COUNT};

use super::{
    board::{Board, BoardView, Selection},
    buzzer::{BuzzLock, BuzzOutcome},
    names::NameStyle,
    questions::{Deck, Question},
    teams::{Roster, Team, TeamUpdate},
};

fn default_team_count() -> usize {
    DEFAULT_COUNT
}

/// Options a host may pass when starting a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SessionOptions {
    /// Number of teams
    #[garde(range(min = 1, max = MAX_COUNT))]
    #[serde(default = "default_team_count")]
    pub team_count: usize,
    /// Generate team names in this style instead of "Team N"
    #[garde(dive)]
    #[serde(default)]
    pub name_style: Option<NameStyle>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            team_count: DEFAULT_COUNT,
            name_style: None,
        }
    }
}

/// The scoreboard as every client polls it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreboardSnapshot {
    /// Teams with lock ownership filled in
    pub teams: Vec<Team>,
    /// Whether any team holds the lock
    pub buzz_lock: bool,
    /// Number of wins of the lock so far
    pub buzz_round: u64,
    /// Points of the last opened cell
    pub target_score: Option<u32>,
}

/// Errors that can occur while operating on a session
#[derive(thiserror::Error, Serialize, Debug, Clone, PartialEq, Eq, derive_more::From)]
pub enum Error {
    /// A roster operation failed
    #[error(transparent)]
    Teams(super::teams::Error),
    /// A board operation failed
    #[error(transparent)]
    Board(super::board::Error),
    /// A deck operation failed
    #[error(transparent)]
    Questions(super::questions::Error),
}

/// A single shared game
#[derive(Debug)]
pub struct Session {
    roster: Roster,
    buzz: BuzzLock,
    deck: Deck,
    board: Board,
    created_at: Instant,
    last_active: Instant,
}

impl Session {
    /// Creates a session with the built-in deck, shuffled
    ///
    /// # Errors
    ///
    /// Returns an error if the team count is outside of the allowed bounds.
    pub fn new(options: SessionOptions) -> Result<Self, Error> {
        let roster = match options.name_style {
            Some(style) => Roster::generated(options.team_count, style)?,
            None => Roster::new(options.team_count)?,
        };
        let mut deck = Deck::sample();
        deck.shuffle();
        let board = Board::from_deck(&deck);
        let now = Instant::now();
        Ok(Self {
            roster,
            buzz: BuzzLock::default(),
            deck,
            board,
            created_at: now,
            last_active: now,
        })
    }

    fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    /// When the session was created
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When the session was last changed
    pub fn last_active(&self) -> Instant {
        self.last_active
    }

    /// Whether the session is at least `ttl` old at `now`
    ///
    /// Expiry counts from creation, not from the last activity.
    pub fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }

    /// The teams with `buzz_lock_owned` derived from the lock
    pub fn teams(&self) -> Vec<Team> {
        self.roster
            .iter()
            .enumerate()
            .map(|(i, team)| Team {
                buzz_lock_owned: self.buzz.is_owned_by(i),
                ..team.clone()
            })
            .collect_vec()
    }

    fn team(&self, index: usize) -> Result<Team, Error> {
        self.teams()
            .into_iter()
            .nth(index)
            .ok_or_else(|| super::teams::Error::NoSuchTeam(index).into())
    }

    /// Everything a polling client needs in one response
    pub fn snapshot(&self) -> ScoreboardSnapshot {
        ScoreboardSnapshot {
            teams: self.teams(),
            buzz_lock: self.buzz.is_locked(),
            buzz_round: self.buzz.round(),
            target_score: self.board.target_score(),
        }
    }

    /// The buzz lock
    pub fn buzz_lock(&self) -> &BuzzLock {
        &self.buzz
    }

    /// Applies a host edit to a team
    ///
    /// # Errors
    ///
    /// Returns an error if the team does not exist or the name is rejected.
    pub fn modify_team(&mut self, index: usize, update: TeamUpdate) -> Result<Team, Error> {
        self.roster.update(index, update)?;
        self.touch();
        self.team(index)
    }

    /// Adds points to (or takes points from) a team
    ///
    /// # Errors
    ///
    /// Returns an error if the team does not exist.
    pub fn adjust_score(&mut self, index: usize, delta: i32) -> Result<Team, Error> {
        self.roster.adjust_score(index, delta)?;
        self.touch();
        self.team(index)
    }

    /// A team buzzes in
    ///
    /// # Errors
    ///
    /// Returns an error if the team does not exist.
    pub fn buzz(&mut self, index: usize) -> Result<BuzzOutcome, Error> {
        let outcome = self.buzz.try_claim(index, self.roster.len())?;
        if matches!(outcome, BuzzOutcome::Won { .. }) {
            self.touch();
        }
        Ok(outcome)
    }

    /// The host frees the buzz lock, returning the previous owner
    pub fn release(&mut self) -> Option<usize> {
        let previous = self.buzz.release();
        self.touch();
        previous
    }

    /// Replaces the deck, shuffles it and lays out a fresh board
    pub fn load_deck(&mut self, mut deck: Deck) {
        deck.shuffle();
        deck.reset();
        self.board = Board::from_deck(&deck);
        self.board.reset();
        self.deck = deck;
        self.touch();
    }

    /// Opens a board cell
    ///
    /// # Errors
    ///
    /// Returns an error if the cell does not exist or is blank.
    pub fn select_cell(&mut self, cell: usize) -> Result<Selection, Error> {
        let selection = self.board.select(cell, &self.deck)?;
        self.touch();
        Ok(selection)
    }

    /// Shows the answer of a question
    ///
    /// # Errors
    ///
    /// Returns an error if no question has this id.
    pub fn reveal(&mut self, question_id: &str) -> Result<Question, Error> {
        let question = self.deck.reveal(question_id)?.clone();
        self.touch();
        Ok(question)
    }

    /// Looks up a question by id
    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.deck.get(question_id)
    }

    /// Closes every opened cell and hides every answer
    pub fn reset_board(&mut self) {
        self.board.reset();
        self.deck.reset();
        self.touch();
    }

    /// Renames a board column
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist or the name is rejected.
    pub fn rename_category(&mut self, index: usize, name: &str) -> Result<(), Error> {
        self.board.rename_category(index, name)?;
        self.touch();
        Ok(())
    }

    /// The board as sent to clients
    pub fn board_view(&self) -> BoardView {
        self.board.view(&self.deck)
    }
}
