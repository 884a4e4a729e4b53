//! # Buzzboard
//!
//! A shared scoreboard and buzzer for trivia nights. A host starts a session,
//! remote players buzz in through the HTTP API, and every screen polls the
//! same state: team scores, who holds the buzz lock, and the question board.
//!
//! The server side is [`store::SessionStore`] behind the [`routes`] router.
//! The [`client`] module holds a polling client that follows the same rules
//! as the browser front end.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]

pub mod board;
pub mod buzzer;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod names;
pub mod questions;
pub mod routes;
pub mod server;
pub mod session;
pub mod session_id;
pub mod store;
pub mod teams;

pub use config::Config;
pub use error::Error;
pub use session_id::SessionId;
