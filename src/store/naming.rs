//! Snapshot naming convention
//!
//! Every snapshot is `<schema>_<label>.sql.gz` where `label` is either an
//! 8-digit UTC date (`YYYYMMDD`, the scheduled daily snapshot) or a tag such
//! as `prerestore_<ts>` or `pre_promote_<ts>`. Daily dedup, retention, and
//! the metadata join all key off this convention, so it must stay stable.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::errors::{StoreError, StoreResult};

/// Extension shared by every snapshot file
pub const SNAPSHOT_EXT: &str = ".sql.gz";

fn filename_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*\.sql\.gz$").unwrap())
}

fn label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_-]*$").unwrap())
}

/// Compose a snapshot filename from schema and label.
pub fn snapshot_filename(schema: &str, label: &str) -> String {
    format!("{}_{}{}", schema, label, SNAPSHOT_EXT)
}

/// Today's dated label, UTC.
pub fn dated_label(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d").to_string()
}

/// Timestamp label component, UTC, second resolution.
pub fn timestamp_label(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d%H%M%S").to_string()
}

/// Validate a snapshot filename received from a caller.
///
/// Rejects anything that could escape the tenant directory (path separators,
/// `..` segments) or that does not match the naming convention. Validation
/// happens before any filesystem access.
pub fn validate_filename(name: &str) -> StoreResult<()> {
    if name.is_empty()
        || name.contains('/')
        || name.contains('\\')
        || name.contains("..")
        || !filename_re().is_match(name)
    {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Validate a user-supplied snapshot label.
pub fn validate_label(label: &str) -> StoreResult<()> {
    if !label_re().is_match(label) {
        return Err(StoreError::InvalidName(label.to_string()));
    }
    Ok(())
}

/// Extract the label from a snapshot filename for the given schema, if the
/// filename follows the convention.
pub fn label_of<'a>(filename: &'a str, schema: &str) -> Option<&'a str> {
    filename
        .strip_prefix(schema)?
        .strip_prefix('_')?
        .strip_suffix(SNAPSHOT_EXT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_snapshot_filename() {
        assert_eq!(
            snapshot_filename("tenant_5", "20260827"),
            "tenant_5_20260827.sql.gz"
        );
    }

    #[test]
    fn test_dated_and_timestamp_labels() {
        let now = Utc.with_ymd_and_hms(2026, 8, 27, 13, 5, 9).unwrap();
        assert_eq!(dated_label(now), "20260827");
        assert_eq!(timestamp_label(now), "20260827130509");
    }

    #[test]
    fn test_valid_filenames() {
        validate_filename("tenant_5_20260827.sql.gz").unwrap();
        validate_filename("tenant_5_prerestore_20260827130509.sql.gz").unwrap();
        validate_filename("uni_5_pre_promote_20260827130509.sql.gz").unwrap();
    }

    #[test]
    fn test_path_traversal_rejected() {
        assert!(validate_filename("../../etc/passwd").is_err());
        assert!(validate_filename("a/../b.sql.gz").is_err());
        assert!(validate_filename("sub/dir.sql.gz").is_err());
        assert!(validate_filename("back\\slash.sql.gz").is_err());
    }

    #[test]
    fn test_bad_extension_and_empty_rejected() {
        assert!(validate_filename("").is_err());
        assert!(validate_filename("tenant_5_20260827.sql").is_err());
        assert!(validate_filename("tenant_5_20260827.tar.gz").is_err());
        assert!(validate_filename(".sql.gz").is_err());
    }

    #[test]
    fn test_validate_label() {
        validate_label("20260827").unwrap();
        validate_label("pre_promote_20260827130509").unwrap();
        assert!(validate_label("has space").is_err());
        assert!(validate_label("dotted.label").is_err());
        assert!(validate_label("").is_err());
    }

    #[test]
    fn test_label_of() {
        assert_eq!(
            label_of("tenant_5_20260827.sql.gz", "tenant_5"),
            Some("20260827")
        );
        assert_eq!(
            label_of("tenant_5_prerestore_1.sql.gz", "tenant_5"),
            Some("prerestore_1")
        );
        assert_eq!(label_of("other_20260827.sql.gz", "tenant_5"), None);
    }
}
