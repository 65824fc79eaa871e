use crate::core::oracle::SeriesSource;
use crate::core::series::Series;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads `<dir>/<key>.csv` files with `Date,Close` columns.
pub struct CsvSeriesSource {
    dir: PathBuf,
}

impl CsvSeriesSource {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        CsvSeriesSource {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.csv"))
    }
}

/// Reads a single series file, e.g. the CPI index.
pub async fn read_series_file<P: AsRef<Path>>(path: P) -> Result<Series> {
    let path = path.as_ref();
    let content = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read series: {}", path.display()))?;
    Series::from_csv(content.as_slice())
        .with_context(|| format!("Failed to parse series: {}", path.display()))
}

#[async_trait]
impl SeriesSource for CsvSeriesSource {
    async fn load_series(&self, key: &str) -> Result<Option<Series>> {
        let path = self.path_for(key);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("No series file at {}", path.display());
            return Ok(None);
        }
        debug!("Reading series from {}", path.display());
        read_series_file(&path).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_loads_series_by_key() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(
            dir.path().join("VAS.AX.csv"),
            "Date,Open,Close\n2024-02-01,90,91.5\n2024-02-02,91,92\n",
        )?;
        let source = CsvSeriesSource::new(dir.path());

        let series = source.load_series("VAS.AX").await?.expect("series present");
        let quote = series
            .on_or_before(NaiveDate::from_ymd_opt(2024, 2, 4).unwrap())
            .unwrap();
        assert_eq!(quote.value, dec!(92));
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_file_is_none() -> Result<()> {
        let dir = TempDir::new()?;
        let source = CsvSeriesSource::new(dir.path());
        assert!(source.load_series("NOPE").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_file_is_error() -> Result<()> {
        let dir = TempDir::new()?;
        std::fs::write(dir.path().join("BAD.csv"), "Date,Close\nnot-a-date,1\n")?;
        let source = CsvSeriesSource::new(dir.path());
        assert!(source.load_series("BAD").await.is_err());
        Ok(())
    }
}
