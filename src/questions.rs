//! Question decks
//!
//! A deck is the set of questions a session plays with. Hosts upload decks
//! as tab-separated text (one header line, then one question per row) or as
//! JSON; a small built-in deck is used until they do.

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::questions::{MAX_DECK_SIZE, MAX_TEXT_LENGTH};

const SAMPLE_DECK: &str = include_str!("../data/sample_questions.tsv");

/// A single trivia question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    /// Identifier unique within the deck
    #[garde(length(min = 1, max = 64))]
    pub id: String,
    /// The question read out to the teams
    #[garde(length(max = MAX_TEXT_LENGTH))]
    pub question_text: String,
    /// The expected answer
    #[garde(length(max = MAX_TEXT_LENGTH))]
    pub answer_text: String,
    /// Where the answer comes from
    #[garde(length(max = MAX_TEXT_LENGTH))]
    #[serde(default)]
    pub reference_text: String,
    /// Whether the answer has been shown
    #[garde(skip)]
    #[serde(default)]
    pub revealed: bool,
    /// Board column this question belongs to
    #[garde(length(max = crate::constants::board::MAX_CATEGORY_LENGTH))]
    #[serde(default)]
    pub category: Option<String>,
    /// Points awarded, overriding the row value on the board
    #[garde(skip)]
    #[serde(default)]
    pub point_value: Option<u32>,
}

/// Errors that can occur while loading or playing a deck
#[derive(Error, Serialize, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The deck has no questions
    #[error("deck has no questions")]
    Empty,
    /// The deck has more questions than allowed
    #[error("deck has more than {} questions", MAX_DECK_SIZE)]
    TooMany,
    /// A row carries a field longer than allowed
    #[error("row {row} has a field that is too long")]
    TooLong {
        /// 1-based data row (the header is row 0)
        row: usize,
    },
    /// A row carries a point value that is not a whole number
    #[error("row {row} has an invalid point value")]
    InvalidPointValue {
        /// 1-based data row (the header is row 0)
        row: usize,
    },
    /// Two questions share an id
    #[error("question id {0} is used more than once")]
    DuplicateId(String),
    /// No question with this id exists
    #[error("question {0} does not exist")]
    NotFound(String),
}

/// An ordered collection of questions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(transparent)]
pub struct Deck {
    #[garde(length(min = 1, max = MAX_DECK_SIZE), dive)]
    questions: Vec<Question>,
}

fn optional(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|f| !f.is_empty())
}

impl Deck {
    /// Builds a deck from questions, checking that ids are unique
    ///
    /// # Errors
    ///
    /// * `Error::Empty` - no questions were given
    /// * `Error::TooMany` - more than the maximum deck size
    /// * `Error::DuplicateId` - two questions share an id
    pub fn new(questions: Vec<Question>) -> Result<Self, Error> {
        if questions.is_empty() {
            return Err(Error::Empty);
        }
        if questions.len() > MAX_DECK_SIZE {
            return Err(Error::TooMany);
        }
        if let Some(duplicate) = questions.iter().map(|q| &q.id).duplicates().next() {
            return Err(Error::DuplicateId(duplicate.clone()));
        }
        Ok(Self { questions })
    }

    /// Parses a tab-separated deck
    ///
    /// The first line is a header and is skipped, as are blank lines. Each
    /// row holds question, answer, reference, and optionally category and
    /// point value; missing columns are left empty. Question ids are the
    /// 1-based row numbers.
    ///
    /// # Errors
    ///
    /// Returns an error if the deck is empty or too large, or a row has an
    /// oversized field or a malformed point value.
    pub fn parse_tsv(text: &str) -> Result<Self, Error> {
        let questions = text
            .lines()
            .skip(1)
            .filter(|line| !line.trim().is_empty())
            .enumerate()
            .map(|(i, line)| {
                let row = i + 1;
                let mut fields = line.trim_end_matches('\r').split('\t');
                let question_text = fields.next().unwrap_or_default().trim().to_owned();
                let answer_text = fields.next().unwrap_or_default().trim().to_owned();
                let reference_text = fields.next().unwrap_or_default().trim().to_owned();
                let category = optional(fields.next()).map(str::to_owned);
                let point_value = optional(fields.next())
                    .map(|p| p.parse::<u32>())
                    .transpose()
                    .map_err(|_| Error::InvalidPointValue { row })?;

                let too_long = [&question_text, &answer_text, &reference_text]
                    .iter()
                    .any(|f| f.len() > MAX_TEXT_LENGTH)
                    || category
                        .as_ref()
                        .is_some_and(|c| c.len() > crate::constants::board::MAX_CATEGORY_LENGTH);
                if too_long {
                    return Err(Error::TooLong { row });
                }

                Ok(Question {
                    id: row.to_string(),
                    question_text,
                    answer_text,
                    reference_text,
                    revealed: false,
                    category,
                    point_value,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(questions)
    }

    /// The built-in deck used by new sessions
    pub fn sample() -> Self {
        Self::parse_tsv(SAMPLE_DECK).unwrap_or_else(|_| Self {
            questions: Vec::new(),
        })
    }

    /// Shuffles the question order in place
    pub fn shuffle(&mut self) {
        fastrand::shuffle(&mut self.questions);
    }

    /// Number of questions
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Whether the deck has no questions
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// Questions in play order
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Looks up a question by id
    pub fn get(&self, id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// Marks a question's answer as shown
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no question has this id.
    pub fn reveal(&mut self, id: &str) -> Result<&Question, Error> {
        let question = self
            .questions
            .iter_mut()
            .find(|q| q.id == id)
            .ok_or_else(|| Error::NotFound(id.to_owned()))?;
        question.revealed = true;
        Ok(question)
    }

    /// Hides every answer again
    pub fn reset(&mut self) {
        self.questions.iter_mut().for_each(|q| q.revealed = false);
    }
}
