//! HTTP routes
//!
//! Every endpoint is scoped to a session id taken from the path. Ids that do
//! not parse are reported exactly like ids that do not exist.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderName, header::CONTENT_TYPE},
    routing::{get, post, put},
};
use garde::Validate;
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info};

use crate::constants::teams::{MAX_SCORE, MIN_SCORE};

use super::{
    board::{BoardView, Selection},
    buzzer::BuzzOutcome,
    config::Config,
    error::Error,
    names::NameStyle,
    questions::{Deck, Question},
    session::{ScoreboardSnapshot, SessionOptions},
    session_id::SessionId,
    store::SessionStore,
    teams::{Team, TeamUpdate},
};

/// Body returned by a winning buzz
pub const BUZZ_SUCCESS: &str = "Success";

/// Header carrying the round a winning buzz opened
pub const BUZZ_ROUND_HEADER: &str = "x-buzz-round";

/// State shared by every handler
pub struct AppState {
    /// All live sessions
    pub store: Arc<SessionStore>,
    /// The configuration the server was started with
    pub config: Config,
}

impl AppState {
    /// Creates the state for a configuration, with an empty store
    pub fn new(config: Config) -> Self {
        Self {
            store: Arc::new(SessionStore::new(config.max_sessions)),
            config,
        }
    }
}

type Shared = State<Arc<AppState>>;

fn parse_id(id: &str) -> Result<SessionId, Error> {
    id.parse().map_err(|_| Error::SessionNotFound)
}

/// Body of `POST /session/start`; every field may be omitted
#[derive(Debug, Default, Deserialize)]
struct StartRequest {
    team_count: Option<usize>,
    name_style: Option<NameStyle>,
}

/// Body of `POST /session/:id/teams/:index/score`
#[derive(Debug, Deserialize, Validate)]
pub struct ScoreDelta {
    /// Points to add, negative to subtract
    #[garde(range(min = MIN_SCORE, max = MAX_SCORE))]
    pub delta: i32,
}

/// Body of `PUT /session/:id/board/categories/:index`
#[derive(Debug, Deserialize)]
pub struct CategoryName {
    /// New header text
    pub name: String,
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    sessions: usize,
}

async fn health(State(state): Shared) -> Json<Health> {
    Json(Health {
        status: "ok",
        sessions: state.store.len().await,
    })
}

async fn start_session(State(state): Shared, body: Bytes) -> Result<Json<SessionId>, Error> {
    let request: StartRequest = if body.iter().all(u8::is_ascii_whitespace) {
        StartRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| Error::Validation(e.to_string()))?
    };
    let options = SessionOptions {
        team_count: request.team_count.unwrap_or(state.config.team_count),
        name_style: request.name_style,
    };
    options.validate()?;

    Ok(Json(state.store.start(options).await?))
}

async fn get_session(
    State(state): Shared,
    Path(id): Path<String>,
) -> Result<Json<SessionId>, Error> {
    let id = parse_id(&id)?;
    if state.store.contains(id).await {
        Ok(Json(id))
    } else {
        Err(Error::SessionNotFound)
    }
}

async fn get_teams(
    State(state): Shared,
    Path(id): Path<String>,
) -> Result<Json<Vec<Team>>, Error> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.with_session(id, |s| s.teams()).await?))
}

async fn get_state(
    State(state): Shared,
    Path(id): Path<String>,
) -> Result<Json<ScoreboardSnapshot>, Error> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.with_session(id, |s| s.snapshot()).await?))
}

async fn modify_team(
    State(state): Shared,
    Path((id, index)): Path<(String, usize)>,
    Json(update): Json<TeamUpdate>,
) -> Result<Json<Team>, Error> {
    let id = parse_id(&id)?;
    update.validate()?;
    let team = state
        .store
        .with_session(id, |s| s.modify_team(index, update))
        .await??;
    debug!(session = %id, team = index, score = team.score, "team modified");
    Ok(Json(team))
}

async fn adjust_score(
    State(state): Shared,
    Path((id, index)): Path<(String, usize)>,
    Json(delta): Json<ScoreDelta>,
) -> Result<Json<Team>, Error> {
    let id = parse_id(&id)?;
    delta.validate()?;
    let team = state
        .store
        .with_session(id, |s| s.adjust_score(index, delta.delta))
        .await??;
    debug!(session = %id, team = index, delta = delta.delta, "score adjusted");
    Ok(Json(team))
}

async fn buzz(
    State(state): Shared,
    Path((id, index)): Path<(String, usize)>,
) -> Result<([(&'static str, String); 1], Json<&'static str>), Error> {
    let id = parse_id(&id)?;
    match state.store.with_session(id, |s| s.buzz(index)).await?? {
        BuzzOutcome::Won { round } => {
            info!(session = %id, team = index, round, "buzz lock won");
            Ok(([(BUZZ_ROUND_HEADER, round.to_string())], Json(BUZZ_SUCCESS)))
        }
        BuzzOutcome::Locked { owner } => {
            debug!(session = %id, team = index, owner, "buzz rejected");
            Err(Error::BuzzLockHeld { owner })
        }
    }
}

async fn release(State(state): Shared, Path(id): Path<String>) -> Result<Json<bool>, Error> {
    let id = parse_id(&id)?;
    let previous = state.store.with_session(id, |s| s.release()).await?;
    if let Some(team) = previous {
        info!(session = %id, team, "buzz lock released");
    }
    Ok(Json(previous.is_some()))
}

async fn get_board(State(state): Shared, Path(id): Path<String>) -> Result<Json<BoardView>, Error> {
    let id = parse_id(&id)?;
    Ok(Json(state.store.with_session(id, |s| s.board_view()).await?))
}

async fn select_cell(
    State(state): Shared,
    Path((id, cell)): Path<(String, usize)>,
) -> Result<Json<Selection>, Error> {
    let id = parse_id(&id)?;
    let selection = state
        .store
        .with_session(id, |s| s.select_cell(cell))
        .await??;
    debug!(session = %id, cell, question = %selection.question_id, "cell opened");
    Ok(Json(selection))
}

async fn reset_board(
    State(state): Shared,
    Path(id): Path<String>,
) -> Result<Json<BoardView>, Error> {
    let id = parse_id(&id)?;
    let view = state
        .store
        .with_session(id, |s| {
            s.reset_board();
            s.board_view()
        })
        .await?;
    Ok(Json(view))
}

async fn rename_category(
    State(state): Shared,
    Path((id, index)): Path<(String, usize)>,
    Json(body): Json<CategoryName>,
) -> Result<Json<BoardView>, Error> {
    let id = parse_id(&id)?;
    let view = state
        .store
        .with_session(id, |s| {
            s.rename_category(index, &body.name)
                .map(|()| s.board_view())
        })
        .await??;
    Ok(Json(view))
}

async fn load_questions(
    State(state): Shared,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<BoardView>, Error> {
    let id = parse_id(&id)?;
    let is_json = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"));

    let deck = if is_json {
        let deck: Deck =
            serde_json::from_slice(&body).map_err(|e| Error::Validation(e.to_string()))?;
        deck.validate()?;
        Deck::new(deck.questions().to_vec())?
    } else {
        let text = std::str::from_utf8(&body).map_err(|e| Error::Validation(e.to_string()))?;
        Deck::parse_tsv(text)?
    };

    let count = deck.len();
    let view = state
        .store
        .with_session(id, |s| {
            s.load_deck(deck);
            s.board_view()
        })
        .await?;
    info!(session = %id, questions = count, "deck loaded");
    Ok(Json(view))
}

async fn reveal(
    State(state): Shared,
    Path((id, question_id)): Path<(String, String)>,
) -> Result<Json<Question>, Error> {
    let id = parse_id(&id)?;
    let question = state
        .store
        .with_session(id, |s| s.reveal(&question_id))
        .await??;
    Ok(Json(question))
}

async fn close_session(State(state): Shared, Path(id): Path<String>) -> Result<Json<bool>, Error> {
    let id = parse_id(&id)?;
    state.store.close(id).await?;
    Ok(Json(true))
}

/// Builds the router with CORS open to any origin and per-request tracing
///
/// The round header is exposed so browsers can read it from a winning buzz.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(BUZZ_ROUND_HEADER)]);

    Router::new()
        .route("/health", get(health))
        .route("/session/start", post(start_session))
        .route("/session/:id", get(get_session))
        .route("/session/:id/teams", get(get_teams))
        .route("/session/:id/teams/:index", put(modify_team))
        .route("/session/:id/teams/:index/score", post(adjust_score))
        .route("/session/:id/buzz/release", post(release))
        .route("/session/:id/buzz/:index", post(buzz))
        .route("/session/:id/state", get(get_state))
        .route("/session/:id/board", get(get_board))
        .route("/session/:id/board/reset", post(reset_board))
        .route("/session/:id/board/:cell", post(select_cell))
        .route("/session/:id/board/categories/:index", put(rename_category))
        .route("/session/:id/questions", put(load_questions))
        .route("/session/:id/questions/:question_id/reveal", post(reveal))
        .route("/session/:id/close", post(close_session))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
