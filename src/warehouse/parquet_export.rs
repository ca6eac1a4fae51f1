use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use parquet::{
    arrow::ArrowWriter,
    basic::{Compression, GzipLevel},
    file::properties::{EnabledStatistics, WriterProperties, WriterVersion},
};
use serde::Serialize;
use serde_arrow::{
    arrow::{serialize_into_arrays, serialize_into_fields},
    schema::TracingOptions,
};
use tracing::{debug, info};

use crate::warehouse::{Table, WriteMode};

const PARQUET_DIR: &str = "parquet";

/// Writes tables as `<schema dir>/parquet/<table>/<label>.parquet`, one file
/// per load.
pub struct ParquetExporter {
    root: PathBuf,
}

impl ParquetExporter {
    pub fn new(schema_dir: &Path) -> Self {
        Self {
            root: schema_dir.join(PARQUET_DIR),
        }
    }

    pub fn table_dir(&self, table: Table) -> PathBuf {
        self.root.join(table.to_string())
    }

    fn writer_props() -> WriterProperties {
        WriterProperties::builder()
            .set_compression(Compression::GZIP(GzipLevel::default()))
            .set_writer_version(WriterVersion::PARQUET_2_0)
            .set_statistics_enabled(EnabledStatistics::Page)
            .build()
    }

    /// Returns the written file, or `None` when there were no rows to write.
    pub fn export<R: Serialize>(
        &self,
        table: Table,
        rows: &[R],
        label: &str,
        mode: WriteMode,
    ) -> Result<Option<PathBuf>> {
        let dir = self.table_dir(table);
        if mode == WriteMode::Replace && dir.exists() {
            std::fs::remove_dir_all(&dir)
                .with_context(|| format!("Failed to clear {}", dir.display()))?;
        }
        if rows.is_empty() {
            debug!("No rows for {}, skipping parquet export", table);
            return Ok(None);
        }
        std::fs::create_dir_all(&dir)?;

        // Field types are traced from the rows themselves
        let fields = serialize_into_fields(rows, TracingOptions::default())
            .with_context(|| format!("Failed to trace arrow schema for {table}"))?;
        let arrays = serialize_into_arrays(&fields, rows)?;
        let schema = Arc::new(Schema::new(fields));
        let record_batch = RecordBatch::try_new(schema.clone(), arrays)?;

        let path = dir.join(format!("{label}.parquet"));
        let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
        let mut writer = ArrowWriter::try_new(file, schema, Some(Self::writer_props()))?;
        writer.write(&record_batch)?;
        writer.close()?;
        info!("Wrote {} rows to {}", rows.len(), path.display());
        Ok(Some(path))
    }
}
