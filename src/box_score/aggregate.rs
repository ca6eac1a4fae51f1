use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::box_score::batting::BattingRecord;
use crate::box_score::game_info::NameMatch;
use crate::box_score::model::BoxScore;
use crate::box_score::pitching::PitchingRecord;
use crate::box_score::traits::{FromBoxScore, GameId};
use crate::providers::BoxScoreSource;

const PROGRESS_INTERVAL: usize = 100;

/// Rows accumulated across games, in game order.
#[derive(Debug, PartialEq, Clone)]
pub struct StatTable<R> {
    pub rows: Vec<R>,
    pub games: usize,
}

impl<R> Default for StatTable<R> {
    fn default() -> Self {
        Self {
            rows: vec![],
            games: 0,
        }
    }
}

impl<R> StatTable<R> {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Something that can take in one game's box score at a time.
pub trait Aggregate: Default {
    #[must_use]
    fn add_game(self, box_score: &BoxScore, name_match: NameMatch) -> Self;

    fn rows(&self) -> usize;
}

impl<R: FromBoxScore> Aggregate for StatTable<R> {
    fn add_game(mut self, box_score: &BoxScore, name_match: NameMatch) -> Self {
        self.rows.extend(R::from_box_score(box_score, name_match));
        self.games += 1;
        self
    }

    fn rows(&self) -> usize {
        self.len()
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct BoxScoreTables {
    pub batting: StatTable<BattingRecord>,
    pub pitching: StatTable<PitchingRecord>,
}

/// Both reconcilers from a single fetch per game.
impl Aggregate for BoxScoreTables {
    fn add_game(self, box_score: &BoxScore, name_match: NameMatch) -> Self {
        Self {
            batting: self.batting.add_game(box_score, name_match),
            pitching: self.pitching.add_game(box_score, name_match),
        }
    }

    fn rows(&self) -> usize {
        self.batting.len() + self.pitching.len()
    }
}

fn log_progress(done: usize, total: usize) {
    if done % PROGRESS_INTERVAL == 0 || done == total {
        info!("Reconciled {}/{} box scores", done, total);
    }
}

/// Fetches each game's box score in order and folds it in. The first failing
/// game aborts the whole batch.
pub fn aggregate<A, S>(source: &S, game_ids: &[GameId], name_match: NameMatch) -> Result<A>
where
    A: Aggregate,
    S: BoxScoreSource + ?Sized,
{
    game_ids
        .iter()
        .enumerate()
        .try_fold(A::default(), |acc, (i, &game_id)| {
            let box_score = source
                .box_score(game_id)
                .with_context(|| format!("Failed to load box score for game {game_id}"))?;
            let acc = acc.add_game(&box_score, name_match);
            debug!("Game {}: {} rows so far", game_id, acc.rows());
            log_progress(i + 1, game_ids.len());
            Ok(acc)
        })
}
