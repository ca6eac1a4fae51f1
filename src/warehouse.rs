use std::collections::BTreeSet;

use anyhow::Result;
use chrono::NaiveDate;
use csv::StringRecord;
use fixed_map::Key;
use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString};

use crate::box_score::traits::PersonId;

pub mod csv_store;
pub mod parquet_export;

/// Every table the loader writes, named as they appear in the warehouse.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Ord, PartialOrd, Hash, Display, EnumIter, EnumString, Key)]
#[strum(serialize_all = "snake_case")]
pub enum Table {
    GameStatcastData,
    GameData,
    TeamsData,
    BattersData,
    PitchersData,
    BattingBoxscoreData,
    PitchingBoxscoreData,
}

#[derive(Debug, Eq, PartialEq, Copy, Clone, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum WriteMode {
    /// Drop whatever the table held and write it fresh, header included.
    #[default]
    Replace,
    /// Add rows after the existing ones. A table that doesn't exist yet gets
    /// a header.
    Append,
}

pub trait Warehouse {
    /// Writes serializable rows, returning how many were written.
    fn write_rows<R: Serialize>(&mut self, table: Table, rows: &[R], mode: WriteMode) -> Result<usize>;

    /// Writes rows whose columns are only known at runtime.
    fn write_records(
        &mut self,
        table: Table,
        headers: &StringRecord,
        rows: &[StringRecord],
        mode: WriteMode,
    ) -> Result<usize>;

    /// Latest date in a column, or `None` when the table is missing or empty.
    fn max_date(&self, table: Table, column: &str) -> Result<Option<NaiveDate>>;

    fn distinct_ids(&self, table: Table, column: &str) -> Result<BTreeSet<PersonId>>;
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn table_names_are_snake_case() {
        let names = Table::iter().map(|t| t.to_string()).collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![
                "game_statcast_data",
                "game_data",
                "teams_data",
                "batters_data",
                "pitchers_data",
                "batting_boxscore_data",
                "pitching_boxscore_data",
            ]
        );
    }

    #[test]
    fn write_mode_parses() {
        assert_eq!(WriteMode::from_str("append").unwrap(), WriteMode::Append);
        assert!(WriteMode::from_str("upsert").is_err());
    }
}
