use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use csv::{Reader, StringRecord, Writer, WriterBuilder};
use fixed_map::Map;
use serde::Serialize;
use tracing::{debug, info};

use crate::box_score::traits::PersonId;
use crate::util::parse_id;
use crate::warehouse::{Table, Warehouse, WriteMode};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// A warehouse laid out as `<root>/<schema>/<table>.csv`.
pub struct FileWarehouse {
    schema_dir: PathBuf,
    written: Map<Table, usize>,
}

impl FileWarehouse {
    pub fn new(root: &Path, schema: &str) -> Result<Self> {
        let schema_dir = root.join(schema);
        std::fs::create_dir_all(&schema_dir)
            .with_context(|| format!("Failed to create {}", schema_dir.display()))?;
        Ok(Self {
            schema_dir: schema_dir.canonicalize()?,
            written: Map::new(),
        })
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    pub fn table_path(&self, table: Table) -> PathBuf {
        self.schema_dir.join(format!("{table}.csv"))
    }

    fn has_data(&self, table: Table) -> bool {
        std::fs::metadata(self.table_path(table)).map_or(false, |m| m.len() > 0)
    }

    fn open_writer(&self, table: Table, mode: WriteMode, has_headers: bool) -> Result<Writer<File>> {
        let path = self.table_path(table);
        debug!("Opening {} in {} mode", path.display(), mode);
        let file = match mode {
            WriteMode::Replace => File::create(&path),
            WriteMode::Append => OpenOptions::new().create(true).append(true).open(&path),
        }
        .with_context(|| format!("Failed to open {}", path.display()))?;
        Ok(WriterBuilder::new().has_headers(has_headers).from_writer(file))
    }

    fn reader(&self, table: Table) -> Result<Option<Reader<File>>> {
        if !self.has_data(table) {
            return Ok(None);
        }
        let path = self.table_path(table);
        let reader = Reader::from_path(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(Some(reader))
    }

    fn column_values(&self, table: Table, column: &str) -> Result<Vec<String>> {
        let Some(mut reader) = self.reader(table)? else {
            return Ok(vec![]);
        };
        let idx = reader
            .headers()?
            .iter()
            .position(|h| h == column)
            .with_context(|| format!("Table {table} has no `{column}` column"))?;
        let mut values = vec![];
        for record in reader.records() {
            let record = record?;
            let value = record.get(idx).unwrap_or_default().trim();
            if !value.is_empty() {
                values.push(value.to_string());
            }
        }
        Ok(values)
    }

    fn record_written(&mut self, table: Table, count: usize) {
        let total = self.written.get(table).copied().unwrap_or_default() + count;
        self.written.insert(table, total);
    }

    #[cfg(test)]
    pub fn rows_written(&self, table: Table) -> usize {
        self.written.get(table).copied().unwrap_or_default()
    }

    pub fn log_summary(&self) {
        for (table, count) in self.written.iter() {
            info!("{}.{}: {} rows written", self.schema_name(), table, count);
        }
    }

    fn schema_name(&self) -> String {
        self.schema_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl Warehouse for FileWarehouse {
    fn write_rows<R: Serialize>(&mut self, table: Table, rows: &[R], mode: WriteMode) -> Result<usize> {
        let has_headers = mode == WriteMode::Replace || !self.has_data(table);
        let mut writer = self.open_writer(table, mode, has_headers)?;
        for row in rows {
            writer
                .serialize(row)
                .with_context(|| format!("Failed to write row to {table}"))?;
        }
        writer.flush()?;
        self.record_written(table, rows.len());
        Ok(rows.len())
    }

    fn write_records(
        &mut self,
        table: Table,
        headers: &StringRecord,
        rows: &[StringRecord],
        mode: WriteMode,
    ) -> Result<usize> {
        let needs_header = match mode {
            WriteMode::Replace => true,
            // Nothing pulled, not even columns
            WriteMode::Append if headers.is_empty() && rows.is_empty() => return Ok(0),
            WriteMode::Append => match self.reader(table)? {
                None => true,
                Some(mut reader) => {
                    if !reader.headers()?.iter().eq(headers.iter()) {
                        bail!("Columns don't match the existing {table} table");
                    }
                    false
                }
            },
        };
        // Header-only batches still create the table with its columns
        let mut writer = self.open_writer(table, mode, false)?;
        if needs_header && !headers.is_empty() {
            writer.write_record(headers)?;
        }
        for row in rows {
            writer
                .write_record(row)
                .with_context(|| format!("Failed to write record to {table}"))?;
        }
        writer.flush()?;
        self.record_written(table, rows.len());
        Ok(rows.len())
    }

    fn max_date(&self, table: Table, column: &str) -> Result<Option<NaiveDate>> {
        let mut latest = None;
        for value in self.column_values(table, column)? {
            // Timestamps carry the date first
            let date_part = value.get(..10).unwrap_or(value.as_str());
            let date = NaiveDate::parse_from_str(date_part, DATE_FORMAT)
                .with_context(|| format!("Invalid date in {table}.{column}: {value}"))?;
            latest = latest.max(Some(date));
        }
        Ok(latest)
    }

    fn distinct_ids(&self, table: Table, column: &str) -> Result<BTreeSet<PersonId>> {
        self.column_values(table, column)?
            .iter()
            .map(|v| parse_id::<PersonId>(v).with_context(|| format!("Invalid id in {table}.{column}: {v}")))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::scratch_dir;

    #[derive(Serialize)]
    struct Row {
        id: u32,
        value: f64,
    }

    fn rows(ids: &[u32]) -> Vec<Row> {
        ids.iter().map(|&id| Row { id, value: 1.5 }).collect()
    }

    fn pitch_header() -> StringRecord {
        StringRecord::from(vec!["game_date", "batter", "pitcher"])
    }

    fn pitch(date: &str, batter: &str, pitcher: &str) -> StringRecord {
        StringRecord::from(vec![date, batter, pitcher])
    }

    fn read(warehouse: &FileWarehouse, table: Table) -> String {
        std::fs::read_to_string(warehouse.table_path(table)).unwrap()
    }

    #[test]
    fn replace_rewrites_with_header() {
        let mut warehouse = FileWarehouse::new(&scratch_dir("replace"), "bronze").unwrap();
        warehouse.write_rows(Table::GameData, &rows(&[1, 2]), WriteMode::Replace).unwrap();
        warehouse.write_rows(Table::GameData, &rows(&[3]), WriteMode::Replace).unwrap();
        assert_eq!(read(&warehouse, Table::GameData), "id,value\n3,1.5\n");
        assert_eq!(warehouse.rows_written(Table::GameData), 3);
    }

    #[test]
    fn append_writes_header_once() {
        let mut warehouse = FileWarehouse::new(&scratch_dir("append"), "bronze").unwrap();
        warehouse.write_rows(Table::TeamsData, &rows(&[1]), WriteMode::Append).unwrap();
        warehouse.write_rows(Table::TeamsData, &rows(&[2, 3]), WriteMode::Append).unwrap();
        assert_eq!(read(&warehouse, Table::TeamsData), "id,value\n1,1.5\n2,1.5\n3,1.5\n");
    }

    #[test]
    fn tables_live_under_the_schema() {
        let root = scratch_dir("layout");
        let mut warehouse = FileWarehouse::new(&root, "bronze").unwrap();
        warehouse.write_rows(Table::BattersData, &rows(&[1]), WriteMode::Replace).unwrap();
        assert!(root.join("bronze").join("batters_data.csv").exists());
    }

    #[test]
    fn watermark_and_ids_from_records() {
        let mut warehouse = FileWarehouse::new(&scratch_dir("watermark"), "bronze").unwrap();
        assert_eq!(warehouse.max_date(Table::GameStatcastData, "game_date").unwrap(), None);
        assert!(warehouse.distinct_ids(Table::GameStatcastData, "batter").unwrap().is_empty());

        warehouse
            .write_records(
                Table::GameStatcastData,
                &pitch_header(),
                &[pitch("2025-04-02", "10", "20"), pitch("2025-04-01", "11", "20")],
                WriteMode::Replace,
            )
            .unwrap();
        warehouse
            .write_records(
                Table::GameStatcastData,
                &pitch_header(),
                &[pitch("2025-04-03", "10.0", "21")],
                WriteMode::Append,
            )
            .unwrap();

        assert_eq!(
            warehouse.max_date(Table::GameStatcastData, "game_date").unwrap(),
            NaiveDate::from_ymd_opt(2025, 4, 3)
        );
        assert_eq!(
            warehouse.distinct_ids(Table::GameStatcastData, "batter").unwrap(),
            BTreeSet::from([10, 11])
        );
        assert_eq!(
            warehouse.distinct_ids(Table::GameStatcastData, "pitcher").unwrap(),
            BTreeSet::from([20, 21])
        );
    }

    #[test]
    fn appended_records_must_match_columns() {
        let mut warehouse = FileWarehouse::new(&scratch_dir("columns"), "bronze").unwrap();
        warehouse
            .write_records(Table::GameStatcastData, &pitch_header(), &[], WriteMode::Replace)
            .unwrap();
        let other = StringRecord::from(vec!["game_date", "batter"]);
        let result = warehouse.write_records(
            Table::GameStatcastData,
            &other,
            &[StringRecord::from(vec!["2025-04-01", "1"])],
            WriteMode::Append,
        );
        assert!(result.is_err());
    }

    #[test]
    fn missing_column_is_an_error() {
        let mut warehouse = FileWarehouse::new(&scratch_dir("missing"), "bronze").unwrap();
        warehouse
            .write_records(
                Table::GameStatcastData,
                &pitch_header(),
                &[pitch("2025-04-01", "1", "2")],
                WriteMode::Replace,
            )
            .unwrap();
        assert!(warehouse.max_date(Table::GameStatcastData, "game_day").is_err());
    }
}
