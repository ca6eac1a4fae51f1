use crate::box_score::game_info::BoxInfo;
use crate::box_score::innings::InningsPitched;
use crate::box_score::traits::{GameId, Matchup, PersonId, TeamId, PLACEHOLDER_PERSON_ID};

#[derive(Debug, Eq, PartialEq, Clone, Copy, Default)]
pub struct BattingLineStats {
    pub at_bats: u16,
    pub runs: u16,
    pub hits: u16,
    pub doubles: u16,
    pub triples: u16,
    pub home_runs: u16,
    pub rbi: u16,
    pub stolen_bases: u16,
    pub walks: u16,
    pub strikeouts: u16,
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct BattingLine {
    pub person_id: PersonId,
    pub name: String,
    pub batting_stats: BattingLineStats,
}

impl BattingLine {
    pub fn new(person_id: PersonId, name: &str, batting_stats: BattingLineStats) -> Self {
        Self {
            person_id,
            name: name.to_string(),
            batting_stats,
        }
    }

    pub fn team_totals(batting_stats: BattingLineStats) -> Self {
        Self::new(PLACEHOLDER_PERSON_ID, "", batting_stats)
    }

    pub const fn is_placeholder(&self) -> bool {
        self.person_id == PLACEHOLDER_PERSON_ID
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Copy, Default)]
pub struct PitchingLineStats {
    pub innings_pitched: InningsPitched,
    pub hits: u16,
    pub runs: u16,
    pub earned_runs: u16,
    pub walks: u16,
    pub strikeouts: u16,
    pub home_runs: u16,
    pub pitches: u16,
    pub strikes: u16,
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub struct PitchingLine {
    pub person_id: PersonId,
    pub name: String,
    pub pitching_stats: PitchingLineStats,
}

impl PitchingLine {
    pub fn new(person_id: PersonId, name: &str, pitching_stats: PitchingLineStats) -> Self {
        Self {
            person_id,
            name: name.to_string(),
            pitching_stats,
        }
    }

    pub fn team_totals(pitching_stats: PitchingLineStats) -> Self {
        Self::new(PLACEHOLDER_PERSON_ID, "", pitching_stats)
    }

    pub const fn is_placeholder(&self) -> bool {
        self.person_id == PLACEHOLDER_PERSON_ID
    }
}

/// One side of a box score: the team's player lines and its own info fields
/// (the first info section of the team, where `SF` is reported).
#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub struct TeamBox {
    pub team_id: TeamId,
    pub batters: Vec<BattingLine>,
    pub pitchers: Vec<PitchingLine>,
    pub info: BoxInfo,
}

#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub struct BoxScore {
    pub game_id: GameId,
    pub teams: Matchup<TeamBox>,
    /// Game-wide info fields (`HBP`, `Batters faced`, umpires, weather, ...).
    pub game_info: BoxInfo,
}

impl BoxScore {
    pub fn player_count(&self) -> (usize, usize) {
        let batters = self
            .teams
            .sides()
            .into_iter()
            .flat_map(|t| &t.batters)
            .filter(|b| !b.is_placeholder())
            .count();
        let pitchers = self
            .teams
            .sides()
            .into_iter()
            .flat_map(|t| &t.pitchers)
            .filter(|p| !p.is_placeholder())
            .count();
        (batters, pitchers)
    }
}
