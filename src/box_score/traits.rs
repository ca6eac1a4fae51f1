use serde::Deserialize;

use crate::box_score::game_info::NameMatch;
use crate::box_score::model::BoxScore;

pub type GameId = u64;
pub type PersonId = u32;
pub type TeamId = u32;

/// Box score rows with this id are team totals rather than players.
pub const PLACEHOLDER_PERSON_ID: PersonId = 0;

#[derive(Debug, Eq, PartialEq, Clone, Default, Deserialize)]
pub struct Matchup<T> {
    pub away: T,
    pub home: T,
}

impl<T> Matchup<T> {
    pub const fn new(away: T, home: T) -> Self {
        Self { away, home }
    }

    /// Home first, matching the row order of the warehouse tables.
    pub const fn sides(&self) -> [&T; 2] {
        [&self.home, &self.away]
    }
}

/// Implemented by the per-player tables derived from a single box score.
pub trait FromBoxScore: Sized {
    fn from_box_score(box_score: &BoxScore, name_match: NameMatch) -> Vec<Self>;
}
