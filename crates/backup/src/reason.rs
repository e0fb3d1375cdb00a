//! Why a snapshot was taken; becomes the last segment of its file name.

use std::fmt;

use serde::{Deserialize, Serialize};

const MAX_CUSTOM_TAG: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BackupReason {
    /// Explicit user request.
    Manual,
    /// Startup found no snapshot at all.
    AutoFirst,
    /// Startup found the newest snapshot older than the interval.
    AutoScheduled,
    /// Startup asked for a snapshot regardless of age.
    Forced,
    /// Safety copy of the live file taken right before a restore overwrites it.
    PreRestore,
    /// Taken before an older data file layout is upgraded.
    SchemaUpdate,
    /// Taken before the data file is deleted and rebuilt.
    Recreate,
    Custom(String),
}

impl BackupReason {
    /// A free-form tag reduced to `[a-z0-9_]`; blank input becomes [`BackupReason::Manual`].
    pub fn custom(tag: &str) -> Self {
        let mut cleaned = String::with_capacity(tag.len().min(MAX_CUSTOM_TAG));
        for c in tag.trim().chars() {
            if cleaned.len() == MAX_CUSTOM_TAG {
                break;
            }
            if c.is_ascii_alphanumeric() {
                cleaned.push(c.to_ascii_lowercase());
            } else if !cleaned.ends_with('_') {
                cleaned.push('_');
            }
        }
        let cleaned = cleaned.trim_matches('_');
        match cleaned {
            "" => BackupReason::Manual,
            known => Self::from_tag(known),
        }
    }

    pub fn as_tag(&self) -> &str {
        match self {
            BackupReason::Manual => "manual",
            BackupReason::AutoFirst => "auto_first",
            BackupReason::AutoScheduled => "auto_scheduled",
            BackupReason::Forced => "forced",
            BackupReason::PreRestore => "pre_restore",
            BackupReason::SchemaUpdate => "schema_update",
            BackupReason::Recreate => "recreate",
            BackupReason::Custom(tag) => tag,
        }
    }

    /// Inverse of [`BackupReason::as_tag`] for tags read back from file names.
    pub(crate) fn from_tag(tag: &str) -> Self {
        match tag {
            "manual" => BackupReason::Manual,
            "auto_first" => BackupReason::AutoFirst,
            "auto_scheduled" => BackupReason::AutoScheduled,
            "forced" => BackupReason::Forced,
            "pre_restore" => BackupReason::PreRestore,
            "schema_update" => BackupReason::SchemaUpdate,
            "recreate" => BackupReason::Recreate,
            other => BackupReason::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for BackupReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_tags_are_file_name_safe() {
        assert_eq!(BackupReason::custom("Before Import: March!").as_tag(), "before_import_march");
        assert_eq!(BackupReason::custom("../../etc").as_tag(), "etc");
    }

    #[test]
    fn blank_custom_tag_is_manual() {
        assert_eq!(BackupReason::custom("  !!  "), BackupReason::Manual);
    }

    #[test]
    fn known_tags_map_to_their_variant() {
        assert_eq!(BackupReason::custom("PRE RESTORE"), BackupReason::PreRestore);
    }

    #[test]
    fn custom_tags_are_bounded() {
        let long = "x".repeat(200);
        assert_eq!(BackupReason::custom(&long).as_tag().len(), MAX_CUSTOM_TAG);
    }
}
