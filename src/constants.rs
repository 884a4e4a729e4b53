//! Configuration constants for the buzzboard game system
//!
//! This module contains the limits and defaults used throughout the
//! scoreboard to keep session state bounded and provide consistent
//! boundaries for the different game components.

/// Session lifecycle constants
pub mod session {
    /// Seconds after creation at which a session expires
    pub const TTL_SECS: u64 = 3600;
    /// Seconds between sweeps for expired sessions
    pub const CLEANUP_INTERVAL_SECS: u64 = 600;
    /// Maximum number of live sessions held by one server
    pub const MAX_SESSIONS: usize = 1024;
}

/// Team roster constants
pub mod teams {
    /// Number of teams in a session when none is requested
    pub const DEFAULT_COUNT: usize = 3;
    /// Maximum number of teams in a single session
    pub const MAX_COUNT: usize = 8;
    /// Maximum length of a team name in bytes
    pub const MAX_NAME_LENGTH: usize = 30;
    /// Lowest score a team can hold
    pub const MIN_SCORE: i32 = -1_000_000;
    /// Highest score a team can hold
    pub const MAX_SCORE: i32 = 1_000_000;
}

/// Board layout constants
pub mod board {
    /// Number of category columns
    pub const COLUMNS: usize = 6;
    /// Number of point rows
    pub const ROWS: usize = 5;
    /// Total number of cells on the board
    pub const CELLS: usize = COLUMNS * ROWS;
    /// Points added per row when a question carries no explicit value
    pub const POINT_STEP: u32 = 100;
    /// Maximum length of a category header
    pub const MAX_CATEGORY_LENGTH: usize = 40;
}

/// Question deck constants
pub mod questions {
    /// Maximum length of any question, answer or reference text
    pub const MAX_TEXT_LENGTH: usize = 1000;
    /// Maximum number of questions in a deck
    pub const MAX_DECK_SIZE: usize = 500;
}

/// Polling client constants
pub mod client {
    /// Milliseconds between scoreboard polls
    pub const POLL_INTERVAL_MS: u64 = 200;
}
