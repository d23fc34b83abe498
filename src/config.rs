//
// config.rs
// Dicom-Deid-rs
//
// Runtime settings for the anonymizer and the batch runner, plus the cooperative cancellation flag.
//
// Thales Matheus Mendonça Santos - November 2025

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{Local, NaiveDate};

/// Values the anonymizer would otherwise read from process-wide state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnonymizerConfig {
    /// Written into StationName of every output.
    pub station_name: String,
    /// Substitute date for non-numeric serial numbers; `None` means today.
    pub fallback_date: Option<NaiveDate>,
}

impl AnonymizerConfig {
    pub fn new(station_name: impl Into<String>) -> Self {
        Self {
            station_name: station_name.into().to_uppercase(),
            fallback_date: None,
        }
    }

    /// Station name taken from the local host name, uppercased.
    pub fn from_host() -> Self {
        let host = gethostname::gethostname().to_string_lossy().into_owned();
        Self::new(host)
    }

    pub fn with_fallback_date(mut self, date: NaiveDate) -> Self {
        self.fallback_date = Some(date);
        self
    }

    pub(crate) fn fallback_date(&self) -> NaiveDate {
        self.fallback_date
            .unwrap_or_else(|| Local::now().date_naive())
    }
}

impl Default for AnonymizerConfig {
    fn default() -> Self {
        Self::from_host()
    }
}

/// Options for one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Output root; `None` means `<source>/anonymized`.
    pub destination: Option<PathBuf>,
    /// Worker count; `None` lets rayon size the pool.
    pub threads: Option<usize>,
}

/// Shared flag checked by batch workers between files.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
