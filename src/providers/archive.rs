use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::GlobError;
use tracing::info;

use crate::box_score::model::BoxScore;
use crate::box_score::traits::GameId;
use crate::providers::live_feed::LiveFeed;
use crate::providers::BoxScoreSource;

/// A directory of saved live feeds named `<game id>.json`, for offline runs.
pub struct BoxScoreArchive {
    files: BTreeMap<GameId, PathBuf>,
}

impl BoxScoreArchive {
    pub fn open(dir: &Path) -> Result<Self> {
        let pattern = dir.join("*.json");
        let pattern = pattern
            .to_str()
            .with_context(|| format!("Archive path is not valid UTF-8: {}", dir.display()))?;
        let paths = glob::glob(pattern)?.collect::<Result<Vec<PathBuf>, GlobError>>()?;
        let files: BTreeMap<GameId, PathBuf> = paths
            .into_iter()
            .filter_map(|p| {
                let game_id = p.file_stem()?.to_str()?.parse::<GameId>().ok()?;
                Some((game_id, p))
            })
            .collect();
        info!("Found {} archived box scores in {}", files.len(), dir.display());
        Ok(Self { files })
    }

    pub fn game_ids(&self) -> Vec<GameId> {
        self.files.keys().copied().collect()
    }
}

impl BoxScoreSource for BoxScoreArchive {
    fn box_score(&self, game_id: GameId) -> Result<BoxScore> {
        let path = self
            .files
            .get(&game_id)
            .with_context(|| format!("Game {game_id} is not in the archive"))?;
        let reader = BufReader::new(File::open(path)?);
        let feed: LiveFeed = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        feed.into_box_score(game_id)
    }
}
