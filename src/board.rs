//! The question board
//!
//! The board is a grid of `COLUMNS` categories by `ROWS` point values. Each
//! cell points at one question of the deck (or is blank when the deck is
//! short). Cells are numbered in row-major order, so the row of a cell sets
//! its default point value.

use std::collections::BTreeSet;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::board::{CELLS, COLUMNS, MAX_CATEGORY_LENGTH, POINT_STEP};

use super::questions::Deck;

/// Errors that can occur when interacting with the board
#[derive(Error, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The index is past the last cell
    #[error("cell {0} does not exist")]
    NoSuchCell(usize),
    /// The cell holds no question
    #[error("cell {0} is blank")]
    BlankCell(usize),
    /// The index is past the last category
    #[error("category {0} does not exist")]
    NoSuchCategory(usize),
    /// The category name is empty after trimming
    #[error("category name cannot be empty")]
    EmptyCategory,
    /// The category name exceeds the maximum length
    #[error("category name is too long")]
    CategoryTooLong,
}

/// The result of opening a cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    /// The cell that was opened
    pub cell: usize,
    /// The question behind it
    pub question_id: String,
    /// Points at stake, also the new target score
    pub point_value: u32,
}

/// One cell as sent to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellView {
    /// Question behind the cell, `None` when blank
    pub question_id: Option<String>,
    /// Points at stake
    pub point_value: u32,
    /// Whether the cell has been opened
    pub clicked: bool,
    /// Whether this is the most recently opened cell
    pub recently_clicked: bool,
}

/// The whole board as sent to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardView {
    /// Column headers
    pub categories: Vec<String>,
    /// Cells in row-major order
    pub cells: Vec<CellView>,
    /// Points of the last opened cell
    pub target_score: Option<u32>,
}

/// Board state shared by everyone in a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    categories: Vec<String>,
    cells: Vec<Option<String>>,
    clicked: BTreeSet<usize>,
    recently_clicked: Option<usize>,
    target_score: Option<u32>,
}

fn default_categories() -> Vec<String> {
    (1..=COLUMNS).map(|i| format!("Category {i}")).collect_vec()
}

impl Default for Board {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            cells: vec![None; CELLS],
            clicked: BTreeSet::new(),
            recently_clicked: None,
            target_score: None,
        }
    }
}

impl Board {
    /// Lays out a deck on a fresh board
    ///
    /// Cell `i` holds the `i`-th question and the rest stay blank. When every
    /// placed question carries a category and they name exactly `COLUMNS`
    /// of them, those become the headers in first-seen order.
    pub fn from_deck(deck: &Deck) -> Self {
        let mut board = Self::default();
        let placed = &deck.questions()[..deck.len().min(CELLS)];

        for (cell, question) in board.cells.iter_mut().zip(placed) {
            *cell = Some(question.id.clone());
        }

        let categories = placed
            .iter()
            .map(|q| q.category.as_deref())
            .collect::<Option<Vec<_>>>()
            .map(|c| c.into_iter().unique().collect_vec())
            .filter(|c| c.len() == COLUMNS);
        if let Some(categories) = categories {
            board.categories = categories.into_iter().map(str::to_owned).collect_vec();
        }

        board
    }

    /// Points at stake for a cell
    ///
    /// A question's own non-zero point value wins; otherwise the row decides.
    pub fn point_value(&self, cell: usize, deck: &Deck) -> u32 {
        self.cells
            .get(cell)
            .and_then(Option::as_deref)
            .and_then(|id| deck.get(id))
            .and_then(|q| q.point_value)
            .filter(|&points| points > 0)
            .unwrap_or_else(|| (cell / COLUMNS + 1) as u32 * POINT_STEP)
    }

    /// Opens a cell
    ///
    /// Opening an already opened cell is allowed and simply re-opens its
    /// question.
    ///
    /// # Errors
    ///
    /// * `Error::NoSuchCell` - `cell` is past the end of the board
    /// * `Error::BlankCell` - the cell holds no question
    pub fn select(&mut self, cell: usize, deck: &Deck) -> Result<Selection, Error> {
        let question_id = self
            .cells
            .get(cell)
            .ok_or(Error::NoSuchCell(cell))?
            .clone()
            .ok_or(Error::BlankCell(cell))?;
        let point_value = self.point_value(cell, deck);

        self.clicked.insert(cell);
        self.recently_clicked = Some(cell);
        self.target_score = Some(point_value);

        Ok(Selection {
            cell,
            question_id,
            point_value,
        })
    }

    /// Renames a column header
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range or the name is empty
    /// or too long.
    pub fn rename_category(&mut self, index: usize, name: &str) -> Result<(), Error> {
        let slot = self
            .categories
            .get_mut(index)
            .ok_or(Error::NoSuchCategory(index))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyCategory);
        }
        if name.len() > MAX_CATEGORY_LENGTH {
            return Err(Error::CategoryTooLong);
        }
        name.clone_into(slot);
        Ok(())
    }

    /// Forgets which cells were opened and zeroes the target score
    pub fn reset(&mut self) {
        self.clicked.clear();
        self.recently_clicked = None;
        self.target_score = Some(0);
    }

    /// Points of the last opened cell
    pub fn target_score(&self) -> Option<u32> {
        self.target_score
    }

    /// Whether a cell has been opened
    pub fn is_clicked(&self, cell: usize) -> bool {
        self.clicked.contains(&cell)
    }

    /// Builds the view sent to clients
    pub fn view(&self, deck: &Deck) -> BoardView {
        BoardView {
            categories: self.categories.clone(),
            cells: self
                .cells
                .iter()
                .enumerate()
                .map(|(i, id)| CellView {
                    question_id: id.clone(),
                    point_value: self.point_value(i, deck),
                    clicked: self.clicked.contains(&i),
                    recently_clicked: self.recently_clicked == Some(i),
                })
                .collect_vec(),
            target_score: self.target_score,
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn plain_deck(count: usize) -> Deck {
        let text = std::iter::once("header".to_string())
            .chain((1..=count).map(|i| format!("Q{i}\tA{i}\tR{i}")))
            .join("\n");
        Deck::parse_tsv(&text).unwrap()
    }

    #[test]
    fn test_from_deck_fills_in_order() {
        let deck = plain_deck(4);
        let board = Board::from_deck(&deck);
        let view = board.view(&deck);

        assert_eq!(view.cells.len(), CELLS);
        assert_eq!(view.cells[0].question_id.as_deref(), Some("1"));
        assert_eq!(view.cells[3].question_id.as_deref(), Some("4"));
        assert!(view.cells[4..].iter().all(|c| c.question_id.is_none()));
        assert_eq!(view.categories, default_categories());
    }

    fn categorized_deck(categories: &[(&str, usize)]) -> Deck {
        let rows = categories
            .iter()
            .flat_map(|&(category, count)| std::iter::repeat_n(category, count))
            .enumerate()
            .map(|(i, category)| format!("Q{i}\tA{i}\tR{i}\t{category}"));
        let text = std::iter::once("header".to_string()).chain(rows).join("\n");
        Deck::parse_tsv(&text).unwrap()
    }

    #[test]
    fn test_from_deck_takes_category_headers() {
        let deck = Deck::sample();
        let board = Board::from_deck(&deck);
        let view = board.view(&deck);

        let expected = deck
            .questions()
            .iter()
            .filter_map(|q| q.category.clone())
            .unique()
            .collect_vec();
        assert_eq!(view.categories, expected);
        for (cell, question) in view.cells.iter().zip(deck.questions()) {
            assert_eq!(cell.question_id.as_deref(), Some(question.id.as_str()));
        }
    }

    #[test]
    fn test_uneven_categories_leave_no_blank_cells() {
        let deck = categorized_deck(&[("A", 10), ("B", 4), ("C", 4), ("D", 4), ("E", 4), ("F", 4)]);
        let board = Board::from_deck(&deck);
        let view = board.view(&deck);

        assert_eq!(view.categories, ["A", "B", "C", "D", "E", "F"]);
        assert!(view.cells.iter().all(|c| c.question_id.is_some()));
        assert_eq!(view.cells[1].question_id.as_deref(), Some("2"));
        assert_eq!(view.cells[CELLS - 1].question_id.as_deref(), Some("30"));
    }

    #[test]
    fn test_headers_only_count_placed_questions() {
        let deck = categorized_deck(&[("A", 5), ("B", 5), ("C", 5), ("D", 5), ("E", 5), ("F", 5), ("G", 1)]);
        let board = Board::from_deck(&deck);
        assert_eq!(board.view(&deck).categories, ["A", "B", "C", "D", "E", "F"]);

        let deck = categorized_deck(&[("A", 3), ("B", 3)]);
        assert_eq!(Board::from_deck(&deck).view(&deck).categories, default_categories());
    }

    #[test]
    fn test_point_values_follow_rows() {
        let deck = plain_deck(CELLS);
        let board = Board::from_deck(&deck);
        assert_eq!(board.point_value(0, &deck), 100);
        assert_eq!(board.point_value(COLUMNS - 1, &deck), 100);
        assert_eq!(board.point_value(COLUMNS, &deck), 200);
        assert_eq!(board.point_value(CELLS - 1, &deck), 500);
    }

    #[test]
    fn test_point_value_override() {
        let deck = Deck::parse_tsv("h\nQ\tA\tR\t\t750\n").unwrap();
        let board = Board::from_deck(&deck);
        assert_eq!(board.point_value(0, &deck), 750);
    }

    #[test]
    fn test_zero_point_value_falls_back_to_row() {
        let deck = Deck::parse_tsv("h\nQ\tA\tR\t\t0\n").unwrap();
        let board = Board::from_deck(&deck);
        assert_eq!(board.point_value(0, &deck), 100);
    }

    #[test]
    fn test_select_sets_target_score() {
        let deck = plain_deck(CELLS);
        let mut board = Board::from_deck(&deck);

        let selection = board.select(COLUMNS + 2, &deck).unwrap();
        assert_eq!(
            selection,
            Selection {
                cell: COLUMNS + 2,
                question_id: (COLUMNS + 3).to_string(),
                point_value: 200,
            }
        );
        assert!(board.is_clicked(COLUMNS + 2));
        assert_eq!(board.target_score(), Some(200));

        let view = board.view(&deck);
        assert!(view.cells[COLUMNS + 2].recently_clicked);
        assert_eq!(view.cells.iter().filter(|c| c.recently_clicked).count(), 1);
    }

    #[test]
    fn test_select_invalid_cells() {
        let deck = plain_deck(2);
        let mut board = Board::from_deck(&deck);
        assert_eq!(board.select(CELLS, &deck), Err(Error::NoSuchCell(CELLS)));
        assert_eq!(board.select(5, &deck), Err(Error::BlankCell(5)));
        assert_eq!(board.target_score(), None);
    }

    #[test]
    fn test_reselect_clicked_cell() {
        let deck = plain_deck(2);
        let mut board = Board::from_deck(&deck);
        board.select(0, &deck).unwrap();
        board.select(1, &deck).unwrap();
        assert!(board.select(0, &deck).is_ok());
        assert!(board.view(&deck).cells[0].recently_clicked);
    }

    #[test]
    fn test_reset_clears_clicks() {
        let deck = plain_deck(3);
        let mut board = Board::from_deck(&deck);
        board.select(0, &deck).unwrap();
        board.reset();

        assert!(!board.is_clicked(0));
        assert_eq!(board.target_score(), Some(0));
        assert!(board.view(&deck).cells.iter().all(|c| !c.recently_clicked));
    }

    #[test]
    fn test_rename_category() {
        let mut board = Board::default();
        board.rename_category(2, "  Music ").unwrap();
        assert_eq!(board.categories[2], "Music");

        assert_eq!(board.rename_category(COLUMNS, "X"), Err(Error::NoSuchCategory(COLUMNS)));
        assert_eq!(board.rename_category(COLUMNS, " "), Err(Error::NoSuchCategory(COLUMNS)));
        assert_eq!(board.rename_category(0, " "), Err(Error::EmptyCategory));
        assert_eq!(
            board.rename_category(0, &"a".repeat(MAX_CATEGORY_LENGTH + 1)),
            Err(Error::CategoryTooLong)
        );
    }

    #[test]
    fn test_view_serializes_camel_case() {
        let deck = plain_deck(1);
        let board = Board::from_deck(&deck);
        let json = serde_json::to_string(&board.view(&deck)).unwrap();
        assert!(json.contains("\"questionId\":\"1\""));
        assert!(json.contains("\"pointValue\":100"));
        assert!(json.contains("\"targetScore\":null"));
    }
}
