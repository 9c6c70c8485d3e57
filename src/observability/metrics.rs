use lazy_static::lazy_static;
use prometheus::{
    Counter, Histogram, HistogramOpts, IntCounterVec, Opts, Registry,
};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // Entry metrics
    pub static ref ENTRIES_APPENDED: Counter = Counter::new(
        "ledger_entries_appended_total",
        "Total number of ledger entries appended to day-files"
    ).unwrap();

    pub static ref DUPLICATE_APPENDS: Counter = Counter::new(
        "ledger_duplicate_appends_total",
        "Appends skipped because the content hash was already stored"
    ).unwrap();

    pub static ref ADJUSTMENTS_APPENDED: Counter = Counter::new(
        "ledger_adjustments_total",
        "Total number of shadow adjustments appended"
    ).unwrap();

    // Day-file metrics
    pub static ref DAY_FILES_CREATED: Counter = Counter::new(
        "ledger_day_files_created_total",
        "Total number of day-files created"
    ).unwrap();

    pub static ref DAY_FILES_MIGRATED: Counter = Counter::new(
        "ledger_day_files_migrated_total",
        "Legacy day-files renamed and rewritten in the current format"
    ).unwrap();

    pub static ref CORRUPT_FILES_SKIPPED: Counter = Counter::new(
        "ledger_corrupt_files_skipped_total",
        "Day-files skipped because they could not be decoded"
    ).unwrap();

    pub static ref STORE_ERRORS: IntCounterVec = IntCounterVec::new(
        Opts::new("ledger_store_errors_total", "Backing-store failures by kind"),
        &["kind"]
    ).unwrap();

    // Latency metrics
    pub static ref HISTORY_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "ledger_history_reconstruction_seconds",
            "History reconstruction latency"
        ).buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0])
    ).unwrap();
}

pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(ENTRIES_APPENDED.clone()))?;
    REGISTRY.register(Box::new(DUPLICATE_APPENDS.clone()))?;
    REGISTRY.register(Box::new(ADJUSTMENTS_APPENDED.clone()))?;
    REGISTRY.register(Box::new(DAY_FILES_CREATED.clone()))?;
    REGISTRY.register(Box::new(DAY_FILES_MIGRATED.clone()))?;
    REGISTRY.register(Box::new(CORRUPT_FILES_SKIPPED.clone()))?;
    REGISTRY.register(Box::new(STORE_ERRORS.clone()))?;
    REGISTRY.register(Box::new(HISTORY_LATENCY.clone()))?;
    Ok(())
}

/// Counts a failed backing-store call under its persistence kind.
pub fn record_store_error(error: &crate::error::Error) {
    if let crate::error::Error::Persistence { kind, .. } = error {
        STORE_ERRORS.with_label_values(&[&kind.to_string()]).inc();
    }
}
