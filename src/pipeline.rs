use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{Days, NaiveDate};
use itertools::Itertools;
use serde::Serialize;
use tracing::{info, warn};

use crate::box_score::aggregate::{aggregate, BoxScoreTables};
use crate::box_score::game_info::NameMatch;
use crate::box_score::traits::{GameId, PersonId, TeamId};
use crate::providers::schedule::{select_candidates, GameRecord, TeamRecord};
use crate::providers::statcast::{
    pull_pitches, PitchTable, BATTER_COLUMN, GAME_DATE_COLUMN, GAME_PK_COLUMN, PITCHER_COLUMN,
};
use crate::providers::{BoxScoreSource, IdentitySource, PitchSource, ScheduleSource, TeamSource};
use crate::warehouse::parquet_export::ParquetExporter;
use crate::warehouse::{Table, Warehouse, WriteMode};

const PROGRESS_INTERVAL: usize = 100;

/// Runtime settings shared by every command.
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub output_dir: PathBuf,
    pub schema: String,
    pub name_match: NameMatch,
    pub parquet: bool,
    pub stats_api_url: String,
    pub savant_url: String,
    pub register_url: String,
    pub timeout: Duration,
    pub box_score_dir: Option<PathBuf>,
}

/// The providers a load draws from.
pub struct Sources<'a> {
    pub box_scores: &'a dyn BoxScoreSource,
    pub schedule: &'a dyn ScheduleSource,
    pub teams: &'a dyn TeamSource,
    pub identities: &'a dyn IdentitySource,
    pub pitches: &'a dyn PitchSource,
}

/// Inclusive range of game dates to pull.
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub struct PullWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl PullWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            bail!("Start date {start} is after end date {end}");
        }
        Ok(Self { start, end })
    }

    /// The window that picks up after a watermark, if there is anything left
    /// to pull before `end`.
    pub fn after(watermark: NaiveDate, end: NaiveDate) -> Option<Self> {
        let start = watermark.checked_add_days(Days::new(1))?;
        (start <= end).then_some(Self { start, end })
    }

    fn label(self) -> String {
        format!("{}_{}", self.start, self.end)
    }
}

impl Display for PullWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

#[derive(Debug, Eq, PartialEq, Clone, Default)]
pub struct LoadSummary {
    pub pitches: usize,
    pub games: usize,
    pub teams: usize,
    pub batters: usize,
    pub pitchers: usize,
    pub batting_rows: usize,
    pub pitching_rows: usize,
}

#[derive(Debug, Eq, PartialEq, Clone)]
pub enum UpdateOutcome {
    UpToDate { watermark: NaiveDate, end: NaiveDate },
    Loaded { window: PullWindow, summary: LoadSummary },
}

/// Everything pulled for a window before any of it is written.
struct Pull {
    pitches: PitchTable,
    game_ids: Vec<GameId>,
    batter_ids: BTreeSet<PersonId>,
    pitcher_ids: BTreeSet<PersonId>,
    games: Vec<GameRecord>,
    box_scores: BoxScoreTables,
}

/// Schedule metadata for each game, in game id order.
pub fn lookup_games(schedule: &dyn ScheduleSource, game_ids: &[GameId]) -> Result<Vec<GameRecord>> {
    let mut games = Vec::with_capacity(game_ids.len());
    for (i, &game_id) in game_ids.iter().enumerate() {
        let candidates = schedule
            .schedule(game_id)
            .with_context(|| format!("Failed to look up schedule for game {game_id}"))?;
        games.extend(select_candidates(game_id, candidates)?);
        if (i + 1) % PROGRESS_INTERVAL == 0 {
            info!("Looked up {}/{} games", i + 1, game_ids.len());
        }
    }
    Ok(games)
}

/// One record per distinct home or away team.
pub fn lookup_teams(teams: &dyn TeamSource, games: &[GameRecord]) -> Result<Vec<TeamRecord>> {
    let team_ids: BTreeSet<TeamId> = games.iter().flat_map(|g| [g.home_id, g.away_id]).collect();
    team_ids
        .into_iter()
        .map(|team_id| {
            teams
                .team(team_id)
                .with_context(|| format!("Failed to look up team {team_id}"))
        })
        .collect()
}

pub struct Pipeline<'a, W: Warehouse> {
    sources: Sources<'a>,
    warehouse: W,
    exporter: Option<ParquetExporter>,
    name_match: NameMatch,
}

impl<'a, W: Warehouse> Pipeline<'a, W> {
    pub fn new(sources: Sources<'a>, warehouse: W, name_match: NameMatch) -> Self {
        Self {
            sources,
            warehouse,
            exporter: None,
            name_match,
        }
    }

    /// Also write the box score tables as parquet.
    #[must_use]
    pub fn with_parquet(mut self, exporter: ParquetExporter) -> Self {
        self.exporter = Some(exporter);
        self
    }

    pub fn into_warehouse(self) -> W {
        self.warehouse
    }

    fn pull(&self, window: PullWindow) -> Result<Pull> {
        info!("Pulling {}", window);
        let pitches = pull_pitches(self.sources.pitches, window.start, window.end)?;
        let game_ids = pitches.distinct_ids::<GameId>(GAME_PK_COLUMN)?.into_iter().collect_vec();
        let batter_ids: BTreeSet<PersonId> = pitches.distinct_ids(BATTER_COLUMN)?;
        let pitcher_ids: BTreeSet<PersonId> = pitches.distinct_ids(PITCHER_COLUMN)?;
        info!(
            "{} games, {} batters, {} pitchers",
            game_ids.len(),
            batter_ids.len(),
            pitcher_ids.len()
        );
        let games = lookup_games(self.sources.schedule, &game_ids)?;
        let box_scores: BoxScoreTables = aggregate(self.sources.box_scores, &game_ids, self.name_match)?;
        Ok(Pull {
            pitches,
            game_ids,
            batter_ids,
            pitcher_ids,
            games,
            box_scores,
        })
    }

    fn write<R: Serialize>(&mut self, table: Table, rows: &[R], mode: WriteMode) -> Result<usize> {
        self.warehouse
            .write_rows(table, rows, mode)
            .with_context(|| format!("Failed to write {table}"))
    }

    fn write_box_scores(&mut self, tables: &BoxScoreTables, label: &str, mode: WriteMode) -> Result<(usize, usize)> {
        let batting = self.write(Table::BattingBoxscoreData, &tables.batting.rows, mode)?;
        let pitching = self.write(Table::PitchingBoxscoreData, &tables.pitching.rows, mode)?;
        if let Some(exporter) = &self.exporter {
            exporter.export(Table::BattingBoxscoreData, &tables.batting.rows, label, mode)?;
            exporter.export(Table::PitchingBoxscoreData, &tables.pitching.rows, label, mode)?;
        }
        Ok((batting, pitching))
    }

    fn write_pull(&mut self, pull: &Pull, window: PullWindow, mode: WriteMode) -> Result<LoadSummary> {
        let pitches = self
            .warehouse
            .write_records(
                Table::GameStatcastData,
                &pull.pitches.headers,
                &pull.pitches.rows,
                mode,
            )
            .context("Failed to write pitches")?;
        let games = self.write(Table::GameData, &pull.games, mode)?;
        let (batting_rows, pitching_rows) = self.write_box_scores(&pull.box_scores, &window.label(), mode)?;
        Ok(LoadSummary {
            pitches,
            games,
            batting_rows,
            pitching_rows,
            ..LoadSummary::default()
        })
    }

    /// Replaces every table with what the providers have for the window.
    pub fn initial_load(&mut self, window: PullWindow) -> Result<LoadSummary> {
        let pull = self.pull(window)?;
        let teams = lookup_teams(self.sources.teams, &pull.games)?;
        let batters = self.sources.identities.reverse_lookup(&pull.batter_ids)?;
        let pitchers = self.sources.identities.reverse_lookup(&pull.pitcher_ids)?;

        let mut summary = self.write_pull(&pull, window, WriteMode::Replace)?;
        summary.teams = self.write(Table::TeamsData, &teams, WriteMode::Replace)?;
        summary.batters = self.write(Table::BattersData, &batters, WriteMode::Replace)?;
        summary.pitchers = self.write(Table::PitchersData, &pitchers, WriteMode::Replace)?;
        info!("Initial load complete for {} ({} games)", window, pull.game_ids.len());
        Ok(summary)
    }

    /// Appends everything after the latest loaded pitch date, up to `end`.
    pub fn update(&mut self, end: NaiveDate) -> Result<UpdateOutcome> {
        let watermark = self
            .warehouse
            .max_date(Table::GameStatcastData, GAME_DATE_COLUMN)?
            .with_context(|| {
                format!(
                    "No {} found in {}; run initial-load first",
                    GAME_DATE_COLUMN,
                    Table::GameStatcastData
                )
            })?;
        info!("Latest record in warehouse: {}", watermark);
        let Some(window) = PullWindow::after(watermark, end) else {
            info!("Nothing to pull after {} up to {}", watermark, end);
            return Ok(UpdateOutcome::UpToDate { watermark, end });
        };

        let pull = self.pull(window)?;

        let known_batters = self.warehouse.distinct_ids(Table::GameStatcastData, BATTER_COLUMN)?;
        let known_pitchers = self.warehouse.distinct_ids(Table::GameStatcastData, PITCHER_COLUMN)?;
        let new_batters: BTreeSet<PersonId> = pull.batter_ids.difference(&known_batters).copied().collect();
        let new_pitchers: BTreeSet<PersonId> = pull.pitcher_ids.difference(&known_pitchers).copied().collect();
        info!(
            "{} new batters, {} new pitchers",
            new_batters.len(),
            new_pitchers.len()
        );
        let batters = self.sources.identities.reverse_lookup(&new_batters)?;
        let pitchers = self.sources.identities.reverse_lookup(&new_pitchers)?;

        let mut summary = self.write_pull(&pull, window, WriteMode::Append)?;
        if !batters.is_empty() {
            summary.batters = self.write(Table::BattersData, &batters, WriteMode::Append)?;
        }
        if !pitchers.is_empty() {
            summary.pitchers = self.write(Table::PitchersData, &pitchers, WriteMode::Append)?;
        }
        if pull.game_ids.is_empty() {
            warn!("No games found for {}", window);
        }
        Ok(UpdateOutcome::Loaded { window, summary })
    }

    /// Reconciles box scores for the given games and writes the two box
    /// score tables.
    pub fn reconcile(&mut self, game_ids: &[GameId], mode: WriteMode) -> Result<LoadSummary> {
        let game_ids = game_ids.iter().copied().unique().collect_vec();
        let tables: BoxScoreTables = aggregate(self.sources.box_scores, &game_ids, self.name_match)?;
        let label = match (game_ids.first(), game_ids.last()) {
            (Some(first), Some(last)) => format!("games_{first}_{last}"),
            _ => "games".to_string(),
        };
        let (batting_rows, pitching_rows) = self.write_box_scores(&tables, &label, mode)?;
        Ok(LoadSummary {
            games: tables.batting.games,
            batting_rows,
            pitching_rows,
            ..LoadSummary::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use anyhow::anyhow;

    use super::*;
    use crate::box_score::model::BoxScore;
    use crate::providers::chadwick::PlayerIdentity;
    use crate::providers::live_feed::tests::SAMPLE_FEED;
    use crate::providers::live_feed::LiveFeed;
    use crate::providers::schedule::tests::game;
    use crate::util::scratch_dir;
    use crate::warehouse::csv_store::FileWarehouse;

    const DAY_ONE: &str = "pitch_type,game_date,batter,pitcher,game_type,game_pk
FF,2025-04-01,592450,663903,R,778001
SL,2025-04-01,677951,543037,R,778001
FF,2025-04-01,5,6,S,700000
";
    const DAY_TWO: &str = "pitch_type,game_date,batter,pitcher,game_type,game_pk
CU,2025-04-02,592450,663903,R,778002
CH,2025-04-02,660271,543037,R,778002
";

    struct FakeProviders {
        box_score: BoxScore,
        days: HashMap<NaiveDate, &'static str>,
        lookups: RefCell<Vec<BTreeSet<PersonId>>>,
    }

    impl FakeProviders {
        fn new() -> Self {
            let feed: LiveFeed = serde_json::from_str(SAMPLE_FEED).unwrap();
            Self {
                box_score: feed.into_box_score(778_001).unwrap(),
                days: HashMap::from([(date(1), DAY_ONE), (date(2), DAY_TWO), (date(3), "")]),
                lookups: RefCell::new(vec![]),
            }
        }

        fn sources(&self) -> Sources<'_> {
            Sources {
                box_scores: self,
                schedule: self,
                teams: self,
                identities: self,
                pitches: self,
            }
        }
    }

    impl BoxScoreSource for FakeProviders {
        fn box_score(&self, game_id: GameId) -> Result<BoxScore> {
            Ok(BoxScore {
                game_id,
                ..self.box_score.clone()
            })
        }
    }

    impl ScheduleSource for FakeProviders {
        fn schedule(&self, game_id: GameId) -> Result<Vec<GameRecord>> {
            Ok(vec![game(game_id, "Postponed"), game(game_id, "Final")])
        }
    }

    impl TeamSource for FakeProviders {
        fn team(&self, team_id: TeamId) -> Result<TeamRecord> {
            Ok(TeamRecord {
                id: team_id,
                name: format!("Team {team_id}"),
                team_code: None,
                file_code: None,
                team_name: None,
                location_name: None,
                short_name: None,
            })
        }
    }

    impl IdentitySource for FakeProviders {
        fn reverse_lookup(&self, ids: &BTreeSet<PersonId>) -> Result<Vec<PlayerIdentity>> {
            self.lookups.borrow_mut().push(ids.clone());
            Ok(ids
                .iter()
                .map(|&id| PlayerIdentity {
                    name_last: format!("Last{id}"),
                    name_first: "First".to_string(),
                    key_mlbam: Some(id),
                    key_retro: String::new(),
                    key_bbref: String::new(),
                    key_fangraphs: None,
                    mlb_played_first: Some(2020),
                    mlb_played_last: None,
                })
                .collect())
        }
    }

    impl PitchSource for FakeProviders {
        fn pitches(&self, date: NaiveDate) -> Result<PitchTable> {
            let body = self.days.get(&date).ok_or_else(|| anyhow!("No data for {date}"))?;
            PitchTable::from_reader(body.as_bytes())
        }
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, d).unwrap()
    }

    fn warehouse(label: &str) -> FileWarehouse {
        FileWarehouse::new(&scratch_dir(label), "bronze").unwrap()
    }

    fn line_count(warehouse: &FileWarehouse, table: Table) -> usize {
        std::fs::read_to_string(warehouse.table_path(table))
            .map(|s| s.lines().count())
            .unwrap_or_default()
    }

    #[test]
    fn window_after_watermark() {
        assert_eq!(
            PullWindow::after(date(1), date(3)),
            Some(PullWindow { start: date(2), end: date(3) })
        );
        assert_eq!(PullWindow::after(date(3), date(3)), None);
        assert!(PullWindow::new(date(3), date(1)).is_err());
    }

    #[test]
    fn initial_load_replaces_all_tables() {
        let providers = FakeProviders::new();
        let mut pipeline = Pipeline::new(providers.sources(), warehouse("initial"), NameMatch::Substring);
        let summary = pipeline
            .initial_load(PullWindow::new(date(1), date(1)).unwrap())
            .unwrap();
        assert_eq!(
            summary,
            LoadSummary {
                pitches: 2,
                games: 1,
                teams: 2,
                batters: 2,
                pitchers: 2,
                batting_rows: 2,
                pitching_rows: 2,
            }
        );

        let warehouse = pipeline.into_warehouse();
        assert_eq!(line_count(&warehouse, Table::GameStatcastData), 3);
        assert_eq!(line_count(&warehouse, Table::TeamsData), 3);
        let batting = std::fs::read_to_string(warehouse.table_path(Table::BattingBoxscoreData)).unwrap();
        assert!(batting.starts_with("personId,ab,r,h,doubles,triples,hr,rbi,sb,bb,k,hbp,sf,gameId,team_id\n"));
    }

    #[test]
    fn update_appends_after_watermark() {
        let providers = FakeProviders::new();
        let mut pipeline = Pipeline::new(providers.sources(), warehouse("update"), NameMatch::Substring);
        pipeline
            .initial_load(PullWindow::new(date(1), date(1)).unwrap())
            .unwrap();

        let outcome = pipeline.update(date(3)).unwrap();
        let UpdateOutcome::Loaded { window, summary } = outcome else {
            panic!("expected a load, got {outcome:?}");
        };
        assert_eq!(window, PullWindow { start: date(2), end: date(3) });
        assert_eq!(summary.pitches, 2);
        assert_eq!(summary.batters, 1);
        assert_eq!(summary.pitchers, 0);

        // Only ids missing from the pitch table get looked up
        let lookups = providers.lookups.borrow();
        assert_eq!(lookups[2], BTreeSet::from([660_271]));
        assert!(lookups[3].is_empty());

        let warehouse = pipeline.into_warehouse();
        assert_eq!(line_count(&warehouse, Table::GameStatcastData), 5);
        assert_eq!(line_count(&warehouse, Table::BattersData), 4);
        assert_eq!(line_count(&warehouse, Table::PitchersData), 3);
        assert_eq!(
            warehouse.max_date(Table::GameStatcastData, GAME_DATE_COLUMN).unwrap(),
            Some(date(2))
        );
    }

    #[test]
    fn update_is_a_no_op_when_current() {
        let providers = FakeProviders::new();
        let mut pipeline = Pipeline::new(providers.sources(), warehouse("current"), NameMatch::Substring);
        pipeline
            .initial_load(PullWindow::new(date(1), date(2)).unwrap())
            .unwrap();
        let outcome = pipeline.update(date(2)).unwrap();
        assert_eq!(
            outcome,
            UpdateOutcome::UpToDate {
                watermark: date(2),
                end: date(2)
            }
        );
        assert_eq!(line_count(&pipeline.into_warehouse(), Table::GameStatcastData), 5);
    }

    #[test]
    fn update_needs_an_initial_load() {
        let providers = FakeProviders::new();
        let mut pipeline = Pipeline::new(providers.sources(), warehouse("empty"), NameMatch::Substring);
        let err = pipeline.update(date(3)).unwrap_err();
        assert!(err.to_string().contains("initial-load"));
    }

    #[test]
    fn reconcile_writes_box_score_tables() {
        let providers = FakeProviders::new();
        let mut pipeline = Pipeline::new(providers.sources(), warehouse("reconcile"), NameMatch::Token);
        let summary = pipeline
            .reconcile(&[778_002, 778_001, 778_002], WriteMode::Append)
            .unwrap();
        assert_eq!(summary.games, 2);
        assert_eq!(summary.batting_rows, 4);
        let warehouse = pipeline.into_warehouse();
        assert_eq!(line_count(&warehouse, Table::PitchingBoxscoreData), 5);
        assert_eq!(line_count(&warehouse, Table::GameData), 0);
    }

    #[test]
    fn reconcile_exports_parquet_when_enabled() {
        let providers = FakeProviders::new();
        let warehouse = warehouse("reconcile-parquet");
        let exporter = ParquetExporter::new(warehouse.schema_dir());
        let table_dir = exporter.table_dir(Table::BattingBoxscoreData);
        let mut pipeline = Pipeline::new(providers.sources(), warehouse, NameMatch::Substring)
            .with_parquet(exporter);
        pipeline.reconcile(&[778_001], WriteMode::Replace).unwrap();
        assert!(table_dir.join("games_778001_778001.parquet").exists());
    }

    #[test]
    fn teams_are_distinct() {
        let providers = FakeProviders::new();
        let games = vec![game(1, "Final"), game(2, "Final")];
        let teams = lookup_teams(&providers, &games).unwrap();
        assert_eq!(teams.iter().map(|t| t.id).collect_vec(), vec![118, 147]);
    }

    #[test]
    fn games_drop_postponed_duplicates() {
        let providers = FakeProviders::new();
        let games = lookup_games(&providers, &[1, 2]).unwrap();
        assert_eq!(games.len(), 2);
        assert!(games.iter().all(|g| g.status == "Final"));
    }
}
