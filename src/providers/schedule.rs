use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::box_score::traits::{GameId, Matchup, TeamId};

const CALLED_OFF_STATUSES: [&str; 2] = ["Postponed", "Cancelled"];

/// One row of `game_data`.
#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct GameRecord {
    pub game_id: GameId,
    pub game_datetime: String,
    pub game_date: String,
    pub game_type: String,
    pub status: String,
    pub away_name: String,
    pub home_name: String,
    pub away_id: TeamId,
    pub home_id: TeamId,
    pub doubleheader: String,
    pub game_num: u8,
    pub home_probable_pitcher: Option<String>,
    pub away_probable_pitcher: Option<String>,
    pub away_score: Option<u16>,
    pub home_score: Option<u16>,
    pub current_inning: Option<u8>,
    pub inning_state: Option<String>,
    pub venue_id: Option<u32>,
    pub venue_name: Option<String>,
    pub series_status: Option<String>,
    pub winning_team: Option<String>,
    pub losing_team: Option<String>,
    pub winning_pitcher: Option<String>,
    pub losing_pitcher: Option<String>,
    pub save_pitcher: Option<String>,
}

impl GameRecord {
    pub fn is_called_off(&self) -> bool {
        CALLED_OFF_STATUSES.contains(&self.status.as_str())
    }
}

/// Narrows the provider's schedule entries for a game id down to the games
/// that were actually played. A lone entry is kept whatever its status.
pub fn select_candidates(game_id: GameId, candidates: Vec<GameRecord>) -> Result<Vec<GameRecord>> {
    match candidates.len() {
        0 => bail!("No schedule entry for game {game_id}"),
        1 => Ok(candidates),
        n => {
            let kept: Vec<GameRecord> = candidates
                .into_iter()
                .filter(|g| !g.is_called_off())
                .collect();
            if kept.len() < n {
                warn!(
                    "Game {}: dropped {} postponed/cancelled schedule entries",
                    game_id,
                    n - kept.len()
                );
            }
            Ok(kept)
        }
    }
}

/// One row of `teams_data`.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamRecord {
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub team_code: Option<String>,
    #[serde(default)]
    pub file_code: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub location_name: Option<String>,
    #[serde(default)]
    pub short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TeamsResponse {
    #[serde(default)]
    pub teams: Vec<TeamRecord>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScheduleResponse {
    #[serde(default)]
    dates: Vec<ScheduleDate>,
}

#[derive(Debug, Deserialize)]
struct ScheduleDate {
    #[serde(default)]
    games: Vec<ScheduleGame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleGame {
    game_pk: GameId,
    game_date: String,
    #[serde(default)]
    official_date: String,
    #[serde(default)]
    game_type: String,
    status: ScheduleStatus,
    teams: Matchup<ScheduleSide>,
    #[serde(default)]
    double_header: String,
    #[serde(default)]
    game_number: u8,
    #[serde(default)]
    venue: Option<NamedRef>,
    #[serde(default)]
    linescore: Option<Linescore>,
    #[serde(default)]
    series_status: Option<SeriesStatus>,
    #[serde(default)]
    decisions: Option<Decisions>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleStatus {
    detailed_state: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleSide {
    team: NamedRef,
    #[serde(default)]
    score: Option<u16>,
    #[serde(default)]
    is_winner: Option<bool>,
    #[serde(default)]
    probable_pitcher: Option<PersonRef>,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    id: u32,
    #[serde(default)]
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonRef {
    full_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Linescore {
    #[serde(default)]
    current_inning: Option<u8>,
    #[serde(default)]
    inning_state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SeriesStatus {
    #[serde(default)]
    result: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Decisions {
    #[serde(default)]
    winner: Option<PersonRef>,
    #[serde(default)]
    loser: Option<PersonRef>,
    #[serde(default)]
    save: Option<PersonRef>,
}

fn full_name(person: Option<PersonRef>) -> Option<String> {
    person.map(|p| p.full_name)
}

impl From<ScheduleGame> for GameRecord {
    fn from(g: ScheduleGame) -> Self {
        let Matchup { away, home } = g.teams;
        let (winning_team, losing_team) = match (away.is_winner, home.is_winner) {
            (Some(true), _) => (Some(away.team.name.clone()), Some(home.team.name.clone())),
            (_, Some(true)) => (Some(home.team.name.clone()), Some(away.team.name.clone())),
            _ => (None, None),
        };
        let decisions = g.decisions.unwrap_or_default();
        let (current_inning, inning_state) = g
            .linescore
            .map_or((None, None), |l| (l.current_inning, l.inning_state));
        Self {
            game_id: g.game_pk,
            game_datetime: g.game_date,
            game_date: g.official_date,
            game_type: g.game_type,
            status: g.status.detailed_state,
            away_name: away.team.name,
            home_name: home.team.name,
            away_id: away.team.id,
            home_id: home.team.id,
            doubleheader: g.double_header,
            game_num: g.game_number,
            home_probable_pitcher: full_name(home.probable_pitcher),
            away_probable_pitcher: full_name(away.probable_pitcher),
            away_score: away.score,
            home_score: home.score,
            current_inning,
            inning_state,
            venue_id: g.venue.as_ref().map(|v| v.id),
            venue_name: g.venue.map(|v| v.name),
            series_status: g.series_status.and_then(|s| s.result),
            winning_team,
            losing_team,
            winning_pitcher: full_name(decisions.winner),
            losing_pitcher: full_name(decisions.loser),
            save_pitcher: full_name(decisions.save),
        }
    }
}

impl ScheduleResponse {
    pub(crate) fn into_records(self) -> Vec<GameRecord> {
        self.dates
            .into_iter()
            .flat_map(|d| d.games)
            .map(GameRecord::from)
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn game(game_id: GameId, status: &str) -> GameRecord {
        GameRecord {
            game_id,
            game_datetime: "2025-04-01T23:10:00Z".to_string(),
            game_date: "2025-04-01".to_string(),
            game_type: "R".to_string(),
            status: status.to_string(),
            away_name: "New York Yankees".to_string(),
            home_name: "Kansas City Royals".to_string(),
            away_id: 147,
            home_id: 118,
            doubleheader: "N".to_string(),
            game_num: 1,
            home_probable_pitcher: None,
            away_probable_pitcher: None,
            away_score: None,
            home_score: None,
            current_inning: None,
            inning_state: None,
            venue_id: None,
            venue_name: None,
            series_status: None,
            winning_team: None,
            losing_team: None,
            winning_pitcher: None,
            losing_pitcher: None,
            save_pitcher: None,
        }
    }

    #[test]
    fn lone_postponed_entry_is_kept() {
        let kept = select_candidates(1, vec![game(1, "Postponed")]).unwrap();
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].status, "Postponed");
    }

    #[test]
    fn called_off_entries_dropped_among_several() {
        let kept = select_candidates(
            1,
            vec![game(1, "Postponed"), game(1, "Final"), game(1, "Cancelled")],
        )
        .unwrap();
        assert_eq!(kept, vec![game(1, "Final")]);
    }

    #[test]
    fn no_entries_is_an_error() {
        assert!(select_candidates(7, vec![]).is_err());
    }

    #[test]
    fn parses_schedule_payload() {
        let payload = r#"{
            "dates": [{"date": "2025-04-01", "games": [{
                "gamePk": 778001,
                "gameDate": "2025-04-01T23:10:00Z",
                "officialDate": "2025-04-01",
                "gameType": "R",
                "status": {"abstractGameState": "Final", "detailedState": "Final"},
                "teams": {
                    "away": {"team": {"id": 147, "name": "New York Yankees"}, "score": 5, "isWinner": true},
                    "home": {"team": {"id": 118, "name": "Kansas City Royals"}, "score": 2, "isWinner": false,
                             "probablePitcher": {"id": 663903, "fullName": "Cole Ragans"}}
                },
                "doubleHeader": "N",
                "gameNumber": 1,
                "venue": {"id": 7, "name": "Kauffman Stadium"},
                "decisions": {
                    "winner": {"id": 543037, "fullName": "Gerrit Cole"},
                    "loser": {"id": 663903, "fullName": "Cole Ragans"}
                }
            }]}]
        }"#;
        let response: ScheduleResponse = serde_json::from_str(payload).unwrap();
        let records = response.into_records();
        assert_eq!(records.len(), 1);
        let g = &records[0];
        assert_eq!(g.game_id, 778_001);
        assert_eq!(g.game_date, "2025-04-01");
        assert_eq!((g.away_id, g.home_id), (147, 118));
        assert_eq!(g.winning_team.as_deref(), Some("New York Yankees"));
        assert_eq!(g.losing_team.as_deref(), Some("Kansas City Royals"));
        assert_eq!(g.winning_pitcher.as_deref(), Some("Gerrit Cole"));
        assert_eq!(g.save_pitcher, None);
        assert_eq!(g.home_probable_pitcher.as_deref(), Some("Cole Ragans"));
        assert_eq!(g.venue_name.as_deref(), Some("Kauffman Stadium"));
        assert!(!g.is_called_off());
    }

    #[test]
    fn parses_team_payload() {
        let payload = r#"{"teams": [{"id": 118, "name": "Kansas City Royals", "teamCode": "kca",
            "fileCode": "kc", "teamName": "Royals", "locationName": "Kansas City", "shortName": "Kansas City",
            "active": true}]}"#;
        let response: TeamsResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(response.teams[0].team_code.as_deref(), Some("kca"));
        assert_eq!(response.teams[0].team_name.as_deref(), Some("Royals"));
    }
}
