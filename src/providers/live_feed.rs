//! The subset of the MLB Stats API live game feed needed to build a `BoxScore`.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::box_score::game_info::{BoxInfo, BoxInfoField};
use crate::box_score::innings::InningsPitched;
use crate::box_score::model::{
    BattingLine, BattingLineStats, BoxScore, PitchingLine, PitchingLineStats, TeamBox,
};
use crate::box_score::traits::{GameId, Matchup, PersonId, TeamId};
use crate::util::{lenient_count, lenient_id};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveFeed {
    #[serde(default)]
    game_pk: Option<GameId>,
    #[serde(default)]
    game_data: FeedGameData,
    live_data: FeedLiveData,
}

#[derive(Debug, Default, Deserialize)]
struct FeedGameData {
    #[serde(default)]
    players: HashMap<String, FeedPlayer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedPlayer {
    #[serde(default)]
    boxscore_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedLiveData {
    boxscore: FeedBoxScore,
}

#[derive(Debug, Deserialize)]
struct FeedBoxScore {
    teams: Matchup<FeedBoxTeam>,
    #[serde(default)]
    info: Vec<BoxInfoField>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedBoxTeam {
    team: FeedTeam,
    #[serde(default)]
    team_stats: FeedStats,
    #[serde(default)]
    players: HashMap<String, FeedBoxPlayer>,
    #[serde(default)]
    batters: Vec<PersonId>,
    #[serde(default)]
    pitchers: Vec<PersonId>,
    #[serde(default)]
    info: Vec<FeedInfoSection>,
}

#[derive(Debug, Deserialize)]
struct FeedTeam {
    #[serde(deserialize_with = "lenient_id")]
    id: TeamId,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedInfoSection {
    #[serde(default)]
    field_list: Vec<BoxInfoField>,
}

#[derive(Debug, Deserialize)]
struct FeedBoxPlayer {
    person: FeedPerson,
    #[serde(default)]
    stats: FeedStats,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedPerson {
    #[serde(deserialize_with = "lenient_id")]
    id: PersonId,
    #[serde(default)]
    full_name: String,
}

#[derive(Debug, Default, Deserialize)]
struct FeedStats {
    #[serde(default)]
    batting: FeedBatting,
    #[serde(default)]
    pitching: FeedPitching,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FeedBatting {
    #[serde(deserialize_with = "lenient_count")]
    at_bats: u16,
    #[serde(deserialize_with = "lenient_count")]
    runs: u16,
    #[serde(deserialize_with = "lenient_count")]
    hits: u16,
    #[serde(deserialize_with = "lenient_count")]
    doubles: u16,
    #[serde(deserialize_with = "lenient_count")]
    triples: u16,
    #[serde(deserialize_with = "lenient_count")]
    home_runs: u16,
    #[serde(deserialize_with = "lenient_count")]
    rbi: u16,
    #[serde(deserialize_with = "lenient_count")]
    stolen_bases: u16,
    #[serde(deserialize_with = "lenient_count")]
    base_on_balls: u16,
    #[serde(deserialize_with = "lenient_count")]
    strike_outs: u16,
}

impl From<&FeedBatting> for BattingLineStats {
    fn from(b: &FeedBatting) -> Self {
        Self {
            at_bats: b.at_bats,
            runs: b.runs,
            hits: b.hits,
            doubles: b.doubles,
            triples: b.triples,
            home_runs: b.home_runs,
            rbi: b.rbi,
            stolen_bases: b.stolen_bases,
            walks: b.base_on_balls,
            strikeouts: b.strike_outs,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FeedPitching {
    innings_pitched: InningsPitched,
    #[serde(deserialize_with = "lenient_count")]
    hits: u16,
    #[serde(deserialize_with = "lenient_count")]
    runs: u16,
    #[serde(deserialize_with = "lenient_count")]
    earned_runs: u16,
    #[serde(deserialize_with = "lenient_count")]
    base_on_balls: u16,
    #[serde(deserialize_with = "lenient_count")]
    strike_outs: u16,
    #[serde(deserialize_with = "lenient_count")]
    home_runs: u16,
    #[serde(alias = "pitchesThrown", deserialize_with = "lenient_count")]
    number_of_pitches: u16,
    #[serde(deserialize_with = "lenient_count")]
    strikes: u16,
}

impl From<&FeedPitching> for PitchingLineStats {
    fn from(p: &FeedPitching) -> Self {
        Self {
            innings_pitched: p.innings_pitched,
            hits: p.hits,
            runs: p.runs,
            earned_runs: p.earned_runs,
            walks: p.base_on_balls,
            strikeouts: p.strike_outs,
            home_runs: p.home_runs,
            pitches: p.number_of_pitches,
            strikes: p.strikes,
        }
    }
}

fn player_key(person_id: PersonId) -> String {
    format!("ID{person_id}")
}

impl FeedBoxTeam {
    fn player(&self, person_id: PersonId) -> Result<&FeedBoxPlayer> {
        self.players
            .get(&player_key(person_id))
            .with_context(|| format!("Player {person_id} listed but missing from team {}", self.team.id))
    }

    fn into_team_box(self, names: &HashMap<String, FeedPlayer>) -> Result<TeamBox> {
        // Box score display names ("Perez, S") are what the info fields use
        let display_name = |player: &FeedBoxPlayer| {
            names
                .get(&player_key(player.person.id))
                .and_then(|p| p.boxscore_name.clone())
                .unwrap_or_else(|| player.person.full_name.clone())
        };

        let mut batters = Vec::with_capacity(self.batters.len() + 1);
        for &person_id in &self.batters {
            let player = self.player(person_id)?;
            batters.push(BattingLine::new(
                player.person.id,
                &display_name(player),
                BattingLineStats::from(&player.stats.batting),
            ));
        }
        batters.push(BattingLine::team_totals(BattingLineStats::from(
            &self.team_stats.batting,
        )));

        let mut pitchers = Vec::with_capacity(self.pitchers.len() + 1);
        for &person_id in &self.pitchers {
            let player = self.player(person_id)?;
            pitchers.push(PitchingLine::new(
                player.person.id,
                &display_name(player),
                PitchingLineStats::from(&player.stats.pitching),
            ));
        }
        pitchers.push(PitchingLine::team_totals(PitchingLineStats::from(
            &self.team_stats.pitching,
        )));

        let info = self
            .info
            .into_iter()
            .next()
            .map(|section| BoxInfo(section.field_list))
            .unwrap_or_default();

        Ok(TeamBox {
            team_id: self.team.id,
            batters,
            pitchers,
            info,
        })
    }
}

impl LiveFeed {
    pub fn into_box_score(self, game_id: GameId) -> Result<BoxScore> {
        if let Some(pk) = self.game_pk {
            if pk != game_id {
                bail!("Requested game {game_id} but provider returned game {pk}");
            }
        }
        let names = self.game_data.players;
        let boxscore = self.live_data.boxscore;
        let Matchup { away, home } = boxscore.teams;
        Ok(BoxScore {
            game_id,
            teams: Matchup::new(
                away.into_team_box(&names)
                    .with_context(|| format!("Bad away team in game {game_id}"))?,
                home.into_team_box(&names)
                    .with_context(|| format!("Bad home team in game {game_id}"))?,
            ),
            game_info: BoxInfo(boxscore.info),
        })
    }
}
