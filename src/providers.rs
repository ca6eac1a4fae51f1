use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use reqwest::blocking::Client;

use crate::box_score::model::BoxScore;
use crate::box_score::traits::{GameId, PersonId, TeamId};
use crate::providers::chadwick::PlayerIdentity;
use crate::providers::schedule::{GameRecord, TeamRecord};
use crate::providers::statcast::PitchTable;

pub mod archive;
pub mod chadwick;
pub mod live_feed;
pub mod schedule;
pub mod statcast;
pub mod stats_api;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub trait BoxScoreSource {
    fn box_score(&self, game_id: GameId) -> Result<BoxScore>;
}

/// Every schedule entry the provider has for a game id. Postponed games can
/// show up more than once.
pub trait ScheduleSource {
    fn schedule(&self, game_id: GameId) -> Result<Vec<GameRecord>>;
}

pub trait TeamSource {
    fn team(&self, team_id: TeamId) -> Result<TeamRecord>;
}

pub trait IdentitySource {
    fn reverse_lookup(&self, ids: &BTreeSet<PersonId>) -> Result<Vec<PlayerIdentity>>;
}

pub trait PitchSource {
    fn pitches(&self, date: NaiveDate) -> Result<PitchTable>;
}

pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}
