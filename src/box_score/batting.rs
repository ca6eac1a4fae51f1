use itertools::Itertools;
use serde::Serialize;

use crate::box_score::game_info::{batter_hbp, NameMatch, SACRIFICE_FLY_LABEL};
use crate::box_score::model::{BattingLine, BoxScore};
use crate::box_score::traits::{FromBoxScore, GameId, PersonId, TeamId};

/// One row of `batting_boxscore_data`.
///
/// Stat columns are floats, matching the warehouse's numeric columns. The
/// person, game and team ids stay integers so they join cleanly.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct BattingRecord {
    #[serde(rename = "personId")]
    pub person_id: PersonId,
    pub ab: f64,
    pub r: f64,
    pub h: f64,
    pub doubles: f64,
    pub triples: f64,
    pub hr: f64,
    pub rbi: f64,
    pub sb: f64,
    pub bb: f64,
    pub k: f64,
    pub hbp: f64,
    pub sf: f64,
    #[serde(rename = "gameId")]
    pub game_id: GameId,
    pub team_id: TeamId,
}

impl BattingRecord {
    fn new(line: &BattingLine, hbp: u32, sf: u32, game_id: GameId, team_id: TeamId) -> Self {
        let s = &line.batting_stats;
        Self {
            person_id: line.person_id,
            ab: s.at_bats.into(),
            r: s.runs.into(),
            h: s.hits.into(),
            doubles: s.doubles.into(),
            triples: s.triples.into(),
            hr: s.home_runs.into(),
            rbi: s.rbi.into(),
            sb: s.stolen_bases.into(),
            bb: s.walks.into(),
            k: s.strikeouts.into(),
            hbp: hbp.into(),
            sf: sf.into(),
            game_id,
            team_id,
        }
    }
}

impl FromBoxScore for BattingRecord {
    fn from_box_score(box_score: &BoxScore, name_match: NameMatch) -> Vec<Self> {
        let hbp_events = box_score.game_info.hbp_events();
        box_score
            .teams
            .sides()
            .into_iter()
            .flat_map(|team| {
                // SF only credits batters of the team whose own field names them
                let sf_text = team.info.value(SACRIFICE_FLY_LABEL);
                let hbp_events = &hbp_events;
                team.batters
                    .iter()
                    .filter(|line| !line.is_placeholder())
                    .map(move |line| {
                        let hbp = batter_hbp(hbp_events, &line.name, name_match);
                        let sf = u32::from(name_match.matches(&line.name, sf_text));
                        Self::new(line, hbp, sf, box_score.game_id, team.team_id)
                    })
            })
            .collect_vec()
    }
}
