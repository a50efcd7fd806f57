//! SQL schema for the report cache.

/// Returns the cache schema as a single batch string.
///
/// `flux_reports` holds one row per fingerprint: the gzip-compressed JSON
/// report and its creation/expiry instants in Unix milliseconds.
pub fn create_schema() -> &'static str {
    r#"
    CREATE TABLE IF NOT EXISTS flux_reports (
        fingerprint TEXT PRIMARY KEY,
        payload BLOB NOT NULL,
        created_at INTEGER NOT NULL,
        expires_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_flux_reports_expires ON flux_reports(expires_at);
    "#
}
