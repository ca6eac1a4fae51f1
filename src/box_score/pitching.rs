use itertools::Itertools;
use serde::Serialize;

use crate::box_score::game_info::{batters_faced, pitcher_hbp, NameMatch};
use crate::box_score::model::{BoxScore, PitchingLine};
use crate::box_score::traits::{FromBoxScore, GameId, PersonId, TeamId};

/// One row of `pitching_boxscore_data`.
///
/// Stat columns are floats, matching the warehouse's numeric columns. The
/// person, game and team ids stay integers so they join cleanly.
#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct PitchingRecord {
    #[serde(rename = "personId")]
    pub person_id: PersonId,
    pub ip: f64,
    pub h: f64,
    pub r: f64,
    pub er: f64,
    pub bb: f64,
    pub k: f64,
    pub hr: f64,
    pub p: f64,
    pub s: f64,
    pub hbp: f64,
    pub bat_faced: f64,
    #[serde(rename = "gameId")]
    pub game_id: GameId,
    pub team_id: TeamId,
    pub outs: f64,
}

impl PitchingRecord {
    fn new(
        line: &PitchingLine,
        hbp: u32,
        bat_faced: u32,
        game_id: GameId,
        team_id: TeamId,
    ) -> Self {
        let s = &line.pitching_stats;
        Self {
            person_id: line.person_id,
            ip: s.innings_pitched.as_decimal(),
            h: s.hits.into(),
            r: s.runs.into(),
            er: s.earned_runs.into(),
            bb: s.walks.into(),
            k: s.strikeouts.into(),
            hr: s.home_runs.into(),
            p: s.pitches.into(),
            s: s.strikes.into(),
            hbp: hbp.into(),
            bat_faced: bat_faced.into(),
            game_id,
            team_id,
            // Integer arithmetic on the exact notation, converted last
            outs: s.innings_pitched.outs().into(),
        }
    }
}

impl FromBoxScore for PitchingRecord {
    fn from_box_score(box_score: &BoxScore, name_match: NameMatch) -> Vec<Self> {
        let hbp_events = box_score.game_info.hbp_events();
        let faced = box_score.game_info.batters_faced();
        box_score
            .teams
            .sides()
            .into_iter()
            .flat_map(|team| {
                let (hbp_events, faced) = (&hbp_events, &faced);
                team.pitchers
                    .iter()
                    .filter(|line| !line.is_placeholder())
                    .map(move |line| {
                        let hbp = pitcher_hbp(hbp_events, &line.name, name_match);
                        let bat_faced = batters_faced(faced, &line.name, name_match);
                        Self::new(line, hbp, bat_faced, box_score.game_id, team.team_id)
                    })
            })
            .collect_vec()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::box_score::game_info::{BoxInfo, BoxInfoField, BATTERS_FACED_LABEL, HBP_LABEL};
    use crate::box_score::innings::InningsPitched;
    use crate::box_score::model::{PitchingLineStats, TeamBox};
    use crate::box_score::traits::Matchup;

    fn line(person_id: PersonId, name: &str, ip: &str) -> PitchingLine {
        PitchingLine::new(
            person_id,
            name,
            PitchingLineStats {
                innings_pitched: InningsPitched::from_str(ip).unwrap(),
                pitches: 90,
                strikes: 60,
                ..PitchingLineStats::default()
            },
        )
    }

    fn box_score(game_info: Vec<BoxInfoField>) -> BoxScore {
        BoxScore {
            game_id: 745_002,
            teams: Matchup::new(
                TeamBox {
                    team_id: 147,
                    batters: vec![],
                    pitchers: vec![line(10, "Cole", "6.2"), line(11, "Holmes", "2.1")],
                    info: BoxInfo::default(),
                },
                TeamBox {
                    team_id: 118,
                    batters: vec![],
                    pitchers: vec![
                        line(20, "Ragans", "5.0"),
                        line(21, "Lugo", "4.0"),
                        PitchingLine::team_totals(PitchingLineStats::default()),
                    ],
                    info: BoxInfo::default(),
                },
            ),
            game_info: BoxInfo(game_info),
        }
    }

    fn find(records: &[PitchingRecord], person_id: PersonId) -> &PitchingRecord {
        records.iter().find(|r| r.person_id == person_id).unwrap()
    }

    #[test]
    fn outs_follow_innings_notation() {
        let records = PitchingRecord::from_box_score(&box_score(vec![]), NameMatch::Substring);
        assert_eq!(find(&records, 10).outs, 20.0);
        assert_eq!(find(&records, 11).outs, 7.0);
        assert_eq!(find(&records, 20).outs, 15.0);
        assert!((find(&records, 10).ip - 6.2).abs() < 1e-9);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let records = PitchingRecord::from_box_score(&box_score(vec![]), NameMatch::Substring);
        assert_eq!(records.len(), 4);
        assert!(records.iter().all(|r| r.hbp == 0.0 && r.bat_faced == 0.0));
        assert!(records.iter().all(|r| r.person_id != 0));
    }

    #[test]
    fn home_pitchers_first() {
        let records = PitchingRecord::from_box_score(&box_score(vec![]), NameMatch::Substring);
        let ids = records.iter().map(|r| r.person_id).collect_vec();
        assert_eq!(ids, vec![20, 21, 10, 11]);
    }

    #[test]
    fn hbp_charged_from_by_clause() {
        let records = PitchingRecord::from_box_score(
            &box_score(vec![BoxInfoField::new(
                HBP_LABEL,
                "Judge (by Ragans); Perez, S 2 (by Cole 2); Witt (by Ragans).",
            )]),
            NameMatch::Substring,
        );
        assert_eq!(find(&records, 20).hbp, 2.0);
        assert_eq!(find(&records, 10).hbp, 2.0);
        assert_eq!(find(&records, 21).hbp, 0.0);
    }

    #[test]
    fn batters_faced_from_shared_field() {
        let records = PitchingRecord::from_box_score(
            &box_score(vec![BoxInfoField::new(
                BATTERS_FACED_LABEL,
                "Cole 27; Holmes 9; Ragans 22; Lugo 16.",
            )]),
            NameMatch::Token,
        );
        assert_eq!(find(&records, 10).bat_faced, 27.0);
        assert_eq!(find(&records, 11).bat_faced, 9.0);
        assert_eq!(find(&records, 20).bat_faced, 22.0);
        assert_eq!(find(&records, 21).bat_faced, 16.0);
        assert_eq!(find(&records, 21).p, 90.0);
    }
}
