use crate::series::{CloseRow, CloseSeries, OhlcRow, OhlcSeries};
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Flat CSV store: `<root>/close/<id>.csv` and `<root>/ohlc/<id>.csv`,
/// one date-sorted file per asset per series kind. These files are the
/// system's only durable state.
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Reads the cached close-only series, `None` if no file exists yet.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn read_close(&self, id: &str) -> Result<Option<CloseSeries>> {
        let path = self.close_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("Failed to open cache file: {}", path.display()))?;
        let mut rows: Vec<CloseRow> = Vec::new();
        for record in reader.deserialize() {
            rows.push(record?);
        }
        Ok(Some(CloseSeries::from_rows(rows)))
    }

    /// Reads the cached OHLC series, `None` if no file exists yet.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn read_ohlc(&self, id: &str) -> Result<Option<OhlcSeries>> {
        let path = self.ohlc_path(id);
        if !path.exists() {
            return Ok(None);
        }
        let mut reader = csv::Reader::from_path(&path)
            .with_context(|| format!("Failed to open cache file: {}", path.display()))?;
        let mut rows: Vec<OhlcRow> = Vec::new();
        for record in reader.deserialize() {
            rows.push(record?);
        }
        Ok(Some(OhlcSeries::from_rows(rows)))
    }

    /// Writes the full close-only series, replacing any previous file.
    ///
    /// The write is atomic: serialize to a temp file, then rename over the
    /// old file, so an interrupted write never leaves a partial cache.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn write_close(&self, id: &str, series: &CloseSeries) -> Result<()> {
        let path = self.close_path(id);
        Self::write_atomic(&path, |writer| {
            for row in series.rows() {
                writer.serialize(row)?;
            }
            Ok(())
        })
    }

    /// Writes the full OHLC series, replacing any previous file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be created or written.
    pub fn write_ohlc(&self, id: &str, series: &OhlcSeries) -> Result<()> {
        let path = self.ohlc_path(id);
        Self::write_atomic(&path, |writer| {
            for row in series.rows() {
                writer.serialize(row)?;
            }
            Ok(())
        })
    }

    fn write_atomic(
        path: &Path,
        write_rows: impl FnOnce(&mut csv::Writer<fs::File>) -> Result<()>,
    ) -> Result<()> {
        let dir = path
            .parent()
            .with_context(|| format!("Cache path has no parent: {}", path.display()))?;
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create cache dir: {}", dir.display()))?;

        let tmp = path.with_extension("csv.tmp");
        let file = fs::File::create(&tmp)
            .with_context(|| format!("Failed to create temp file: {}", tmp.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        write_rows(&mut writer)?;
        writer.flush()?;
        drop(writer);

        fs::rename(&tmp, path)
            .with_context(|| format!("Failed to replace cache file: {}", path.display()))?;
        Ok(())
    }

    fn close_path(&self, id: &str) -> PathBuf {
        self.root.join("close").join(format!("{id}.csv"))
    }

    fn ohlc_path(&self, id: &str) -> PathBuf {
        self.root.join("ohlc").join(format!("{id}.csv"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_close() -> CloseSeries {
        CloseSeries::from_rows(vec![
            CloseRow {
                date: "2024-01-01".parse().unwrap(),
                marketcap: 1e9,
                volume: 1e6,
                close: 100.0,
                ret: None,
            },
            CloseRow {
                date: "2024-01-02".parse().unwrap(),
                marketcap: 1.1e9,
                volume: 2e6,
                close: 105.0,
                ret: None,
            },
        ])
    }

    #[test]
    fn close_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());

        let series = sample_close();
        store.write_close("bitcoin", &series).unwrap();
        let loaded = store.read_close("bitcoin").unwrap().unwrap();

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.last_date(), series.last_date());
        assert!((loaded.rows()[1].close - 105.0).abs() < f64::EPSILON);
        assert!((loaded.rows()[1].ret.unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());
        assert!(store.read_close("nope").unwrap().is_none());
        assert!(store.read_ohlc("nope").unwrap().is_none());
    }

    #[test]
    fn ohlc_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());

        let series = OhlcSeries::from_rows(vec![OhlcRow {
            date: "2024-01-01".parse().unwrap(),
            open: 1.0,
            high: 2.0,
            low: 0.5,
            close: 1.5,
        }]);
        store.write_ohlc("bitcoin", &series).unwrap();
        let loaded = store.read_ohlc("bitcoin").unwrap().unwrap();

        assert_eq!(loaded.len(), 1);
        assert!((loaded.rows()[0].high - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rewrite_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvStore::new(dir.path());

        store.write_close("coin", &sample_close()).unwrap();
        let extended = sample_close().merged_with(&CloseSeries::from_rows(vec![
            CloseRow {
                date: "2024-01-02".parse().unwrap(),
                marketcap: 0.0,
                volume: 0.0,
                close: 0.0,
                ret: None,
            },
            CloseRow {
                date: "2024-01-03".parse().unwrap(),
                marketcap: 1.2e9,
                volume: 3e6,
                close: 110.0,
                ret: None,
            },
        ]));
        store.write_close("coin", &extended).unwrap();

        let loaded = store.read_close("coin").unwrap().unwrap();
        assert_eq!(loaded.len(), 3);
    }
}
