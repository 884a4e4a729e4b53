//! Polling client
//!
//! [`ApiClient`] is a typed wrapper over the HTTP routes. [`Scoreboard`] is
//! the model a front end keeps: it works on its own until it is attached to
//! a session, and from then on reconciles with the server by polling.

use std::sync::Arc;

use itertools::Itertools;
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};
use web_time::Duration;

use crate::constants::teams::DEFAULT_COUNT;

use super::{
    buzzer::BuzzOutcome,
    error::Error,
    routes::BUZZ_ROUND_HEADER,
    session::{ScoreboardSnapshot, SessionOptions},
    session_id::SessionId,
    teams::{self, Roster, Team, TeamUpdate},
};

/// Typed access to a buzzboard server
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
}

#[derive(Deserialize)]
struct LockedBody {
    owner: Option<usize>,
}

impl ApiClient {
    /// Creates a client for the server at `base`, e.g. `http://127.0.0.1:3000`
    pub fn new(base: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base)
    }

    /// Creates a client that sends requests through `http`
    pub fn with_client(http: reqwest::Client, base: impl Into<String>) -> Self {
        let mut base = base.into();
        while base.ends_with('/') {
            base.pop();
        }
        Self { http, base }
    }

    /// The server address requests go to
    pub fn base(&self) -> &str {
        &self.base
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn check(response: Response) -> Result<Response, Error> {
        Ok(response.error_for_status()?)
    }

    /// Starts a session, with server defaults when `options` is `None`
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the server refuses.
    pub async fn start_session(
        &self,
        options: Option<&SessionOptions>,
    ) -> Result<SessionId, Error> {
        let request = self.http.post(self.url("/session/start"));
        let request = match options {
            Some(options) => request.json(options),
            None => request,
        };
        Ok(Self::check(request.send().await?)?.json().await?)
    }

    /// Checks that a session exists
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionNotFound` if the server does not know the id.
    pub async fn join_session(&self, id: SessionId) -> Result<SessionId, Error> {
        let response = self.http.get(self.url(&format!("/session/{id}"))).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(Error::SessionNotFound);
        }
        Ok(Self::check(response)?.json().await?)
    }

    /// Closes a session
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session does not exist.
    pub async fn close_session(&self, id: SessionId) -> Result<bool, Error> {
        let url = self.url(&format!("/session/{id}/close"));
        Ok(Self::check(self.http.post(url).send().await?)?.json().await?)
    }

    /// Fetches the teams of a session
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session does not exist.
    pub async fn fetch_teams(&self, id: SessionId) -> Result<Vec<Team>, Error> {
        let url = self.url(&format!("/session/{id}/teams"));
        Ok(Self::check(self.http.get(url).send().await?)?.json().await?)
    }

    /// Edits a team
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the edit is rejected.
    pub async fn modify_team(
        &self,
        id: SessionId,
        index: usize,
        update: &TeamUpdate,
    ) -> Result<Team, Error> {
        let url = self.url(&format!("/session/{id}/teams/{index}"));
        let response = self.http.put(url).json(update).send().await?;
        Ok(Self::check(response)?.json().await?)
    }

    /// Buzzes in for a team
    ///
    /// A 409 is not an error: it comes back as [`BuzzOutcome::Locked`]. The
    /// round of a win is read from the `x-buzz-round` header, or from a
    /// snapshot when the server does not send it. A win whose round cannot
    /// be learned is still a win, with round 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the team does not exist, or a
    /// 409 does not name the owner.
    pub async fn buzz(&self, id: SessionId, index: usize) -> Result<BuzzOutcome, Error> {
        let url = self.url(&format!("/session/{id}/buzz/{index}"));
        let response = self.http.post(url).send().await?;
        if response.status() == StatusCode::CONFLICT {
            let body: LockedBody = response.json().await?;
            return body
                .owner
                .map(|owner| BuzzOutcome::Locked { owner })
                .ok_or(Error::Status(StatusCode::CONFLICT.as_u16()));
        }

        let response = Self::check(response)?;
        let round = response
            .headers()
            .get(BUZZ_ROUND_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let round = match round {
            Some(round) => round,
            None => match self.snapshot(id).await {
                Ok(snapshot) => snapshot.buzz_round,
                Err(e) => {
                    warn!(session = %id, team = index, error = %e, "buzz won without a round");
                    0
                }
            },
        };
        Ok(BuzzOutcome::Won { round })
    }

    /// Releases the buzz lock, returning whether one was held
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session does not exist.
    pub async fn release(&self, id: SessionId) -> Result<bool, Error> {
        let url = self.url(&format!("/session/{id}/buzz/release"));
        Ok(Self::check(self.http.post(url).send().await?)?.json().await?)
    }

    /// Fetches the full scoreboard state
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the session does not exist.
    pub async fn snapshot(&self, id: SessionId) -> Result<ScoreboardSnapshot, Error> {
        let url = self.url(&format!("/session/{id}/state"));
        Ok(Self::check(self.http.get(url).send().await?)?.json().await?)
    }
}

/// Emitted once when a team takes the buzz lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuzzSignal {
    /// The team that buzzed in
    pub team: usize,
}

/// Teams shown when no session is attached
pub fn default_teams() -> Vec<Team> {
    Roster::new(DEFAULT_COUNT)
        .map(|roster| roster.iter().cloned().collect_vec())
        .unwrap_or_default()
}

/// Client-side scoreboard model
#[derive(Debug)]
pub struct Scoreboard {
    api: ApiClient,
    session: Option<SessionId>,
    teams: Vec<Team>,
    buzz_lock: bool,
    /// Latest known lock round
    round: u64,
    /// Round the buzz signal last fired for, `None` once the lock is seen free
    player_round: Option<u64>,
}

impl Scoreboard {
    /// A scoreboard in local mode with the default teams
    pub fn new(api: ApiClient) -> Self {
        Self {
            api,
            session: None,
            teams: default_teams(),
            buzz_lock: false,
            round: 0,
            player_round: None,
        }
    }

    /// A scoreboard attached to `session` without checking it first
    ///
    /// The first poll reconciles the teams, or detaches if the session is
    /// gone.
    pub fn attached(api: ApiClient, session: SessionId) -> Self {
        Self {
            session: Some(session),
            ..Self::new(api)
        }
    }

    /// The underlying API client
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// The attached session, if any
    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// The teams as last seen
    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    /// Whether a team holds the buzz lock, as last seen
    pub fn buzz_lock(&self) -> bool {
        self.buzz_lock
    }

    /// Latest known lock round
    pub fn round(&self) -> u64 {
        self.round
    }

    /// Round the buzz signal last fired for
    pub fn player_round(&self) -> Option<u64> {
        self.player_round
    }

    /// Starts a session on the server and attaches to it
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be started or fetched.
    pub async fn start_session(
        &mut self,
        options: Option<&SessionOptions>,
    ) -> Result<SessionId, Error> {
        let id = self.api.start_session(options).await?;
        self.attach(id).await?;
        Ok(id)
    }

    /// Attaches to an existing session
    ///
    /// # Errors
    ///
    /// Returns `Error::SessionNotFound` if the session does not exist. The
    /// scoreboard is left unchanged in that case.
    pub async fn join(&mut self, id: SessionId) -> Result<(), Error> {
        self.api.join_session(id).await?;
        self.attach(id).await
    }

    async fn attach(&mut self, id: SessionId) -> Result<(), Error> {
        let snapshot = self.api.snapshot(id).await?;
        self.session = Some(id);
        self.player_round = None;
        self.apply_state(snapshot);
        info!(session = %id, round = self.round, "attached to session");
        Ok(())
    }

    /// Detaches from the session and goes back to the default teams
    pub fn detach(&mut self) {
        if let Some(id) = self.session.take() {
            info!(session = %id, "detached from session");
        }
        self.teams = default_teams();
        self.buzz_lock = false;
        self.round = 0;
        self.player_round = None;
    }

    fn mark_owner(&mut self, team: usize) -> Option<BuzzSignal> {
        let teams = self
            .teams
            .iter()
            .enumerate()
            .map(|(i, t)| Team {
                buzz_lock_owned: i == team,
                ..t.clone()
            })
            .collect_vec();
        self.apply_snapshot(teams)
    }

    /// Replaces the teams with a fresh view
    ///
    /// # Returns
    ///
    /// A signal the first time an owner appears in the current round
    pub fn apply_snapshot(&mut self, teams: Vec<Team>) -> Option<BuzzSignal> {
        let owner = teams.iter().position(|t| t.buzz_lock_owned);
        self.teams = teams;
        self.buzz_lock = owner.is_some();

        match owner {
            Some(team) if self.player_round != Some(self.round) => {
                self.player_round = Some(self.round);
                Some(BuzzSignal { team })
            }
            Some(_) => None,
            None => {
                self.player_round = None;
                None
            }
        }
    }

    /// Replaces teams and round with a server snapshot
    ///
    /// A lock won again between two polls shows up as a new round and is
    /// signalled even though an owner was already seen.
    pub fn apply_state(&mut self, snapshot: ScoreboardSnapshot) -> Option<BuzzSignal> {
        self.round = snapshot.buzz_round;
        self.apply_snapshot(snapshot.teams)
    }

    fn apply_poll(
        &mut self,
        id: SessionId,
        result: Result<ScoreboardSnapshot, Error>,
    ) -> Result<Option<BuzzSignal>, Error> {
        if self.session != Some(id) {
            return Ok(None);
        }
        match result {
            Ok(snapshot) => Ok(self.apply_state(snapshot)),
            Err(e) => {
                warn!(session = %id, error = %e, "poll failed, dropping session");
                self.detach();
                Err(e)
            }
        }
    }

    /// A team buzzes in
    ///
    /// Without a session the lock is claimed locally. With one, the claim is
    /// refused locally when the last view shows the lock taken, and otherwise
    /// sent to the server; a lost race changes nothing until the next poll.
    ///
    /// # Returns
    ///
    /// A signal if this call gave the team the lock
    ///
    /// # Errors
    ///
    /// Returns an error if the team does not exist or the request fails.
    pub async fn buzz_in(&mut self, team: usize) -> Result<Option<BuzzSignal>, Error> {
        if team >= self.teams.len() {
            return Err(teams::Error::NoSuchTeam(team).into());
        }
        if self.buzz_lock {
            return Ok(None);
        }
        let Some(id) = self.session else {
            self.round += 1;
            return Ok(self.mark_owner(team));
        };

        match self.api.buzz(id, team).await? {
            BuzzOutcome::Won { round } => {
                debug!(session = %id, team, round, "buzz won");
                self.round = if round > 0 { round } else { self.round + 1 };
                Ok(self.mark_owner(team))
            }
            BuzzOutcome::Locked { owner } => {
                debug!(session = %id, team, owner, "buzz lost");
                Ok(None)
            }
        }
    }

    /// Frees the buzz lock, returning whether one was held
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn release(&mut self) -> Result<bool, Error> {
        let released = match self.session {
            Some(id) => self.api.release(id).await?,
            None => self.buzz_lock,
        };
        let teams = self
            .teams
            .iter()
            .map(|t| Team {
                buzz_lock_owned: false,
                ..t.clone()
            })
            .collect_vec();
        self.apply_snapshot(teams);
        Ok(released)
    }

    /// Edits a team, locally or on the server
    ///
    /// # Errors
    ///
    /// Returns an error if the team does not exist, the edit is rejected or
    /// the request fails.
    pub async fn modify_team(&mut self, index: usize, update: TeamUpdate) -> Result<Team, Error> {
        let team = match self.session {
            Some(id) => self.api.modify_team(id, index, &update).await?,
            None => {
                let mut team = self
                    .teams
                    .get(index)
                    .cloned()
                    .ok_or(teams::Error::NoSuchTeam(index))?;
                update.apply_to(&mut team).map_err(teams::Error::from)?;
                team
            }
        };
        if let Some(slot) = self.teams.get_mut(index) {
            *slot = team.clone();
        }
        Ok(team)
    }

    /// Fetches the teams and round once
    ///
    /// Does nothing without a session. When the fetch fails the session is
    /// dropped and the default teams come back.
    ///
    /// # Errors
    ///
    /// Returns the fetch error after detaching.
    pub async fn poll_once(&mut self) -> Result<Option<BuzzSignal>, Error> {
        let Some(id) = self.session else {
            return Ok(None);
        };
        let result = self.api.snapshot(id).await;
        self.apply_poll(id, result)
    }
}

/// Polls `scoreboard` every `interval` and publishes the teams
///
/// The scoreboard is only locked to read the session and to apply the
/// result, never across the request. The task ends once the scoreboard has
/// no session, including after a failed poll detaches it. The last
/// published value is then the default teams.
pub fn spawn_poller(
    scoreboard: Arc<Mutex<Scoreboard>>,
    interval: Duration,
) -> (JoinHandle<()>, watch::Receiver<Vec<Team>>) {
    let (tx, rx) = watch::channel(default_teams());
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let (api, id) = {
                let scoreboard = scoreboard.lock().await;
                match scoreboard.session() {
                    Some(id) => (scoreboard.api().clone(), id),
                    None => {
                        tx.send_replace(scoreboard.teams().to_vec());
                        break;
                    }
                }
            };

            let result = api.snapshot(id).await;

            let mut scoreboard = scoreboard.lock().await;
            if let Ok(Some(BuzzSignal { team })) = scoreboard.apply_poll(id, result) {
                info!(session = %id, team, round = scoreboard.round(), "buzz");
            }
            tx.send_replace(scoreboard.teams().to_vec());
        }
    });
    (handle, rx)
}
