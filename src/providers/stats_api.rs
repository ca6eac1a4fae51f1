use std::time::Duration;

use anyhow::{Context, Result};
use const_format::concatcp;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::box_score::model::BoxScore;
use crate::box_score::traits::{GameId, TeamId};
use crate::providers::live_feed::LiveFeed;
use crate::providers::schedule::{GameRecord, ScheduleResponse, TeamRecord, TeamsResponse};
use crate::providers::{http_client, BoxScoreSource, ScheduleSource, TeamSource};

pub const STATS_API_ROOT: &str = "https://statsapi.mlb.com";
const LIVE_FEED_PATH: &str = "/api/v1.1/game";
const SCHEDULE_HYDRATE: &str = "decisions,probablePitcher,linescore,seriesStatus";
const SCHEDULE_PATH: &str = concatcp!("/api/v1/schedule?sportId=1&hydrate=", SCHEDULE_HYDRATE);
const TEAMS_PATH: &str = "/api/v1/teams";

/// Client for the MLB Stats API: live game feeds, schedule and team lookups.
pub struct StatsApiClient {
    client: Client,
    base_url: String,
}

impl StatsApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        self.client
            .get(&url)
            .send()
            .and_then(reqwest::blocking::Response::error_for_status)
            .with_context(|| format!("Request failed: {url}"))?
            .json::<T>()
            .with_context(|| format!("Unexpected response body from {url}"))
    }
}

impl BoxScoreSource for StatsApiClient {
    fn box_score(&self, game_id: GameId) -> Result<BoxScore> {
        let feed: LiveFeed = self.get_json(&format!("{LIVE_FEED_PATH}/{game_id}/feed/live"))?;
        let box_score = feed.into_box_score(game_id)?;
        let (batters, pitchers) = box_score.player_count();
        debug!("Game {}: {} batters, {} pitchers", game_id, batters, pitchers);
        Ok(box_score)
    }
}

impl ScheduleSource for StatsApiClient {
    fn schedule(&self, game_id: GameId) -> Result<Vec<GameRecord>> {
        let response: ScheduleResponse =
            self.get_json(&format!("{SCHEDULE_PATH}&gamePk={game_id}"))?;
        Ok(response.into_records())
    }
}

impl TeamSource for StatsApiClient {
    fn team(&self, team_id: TeamId) -> Result<TeamRecord> {
        let response: TeamsResponse = self.get_json(&format!("{TEAMS_PATH}/{team_id}"))?;
        response
            .teams
            .into_iter()
            .next()
            .with_context(|| format!("No team found for id {team_id}"))
    }
}
