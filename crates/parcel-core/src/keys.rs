//! Object key derivation.
//!
//! Keys are always built here and never taken from a client verbatim. A key
//! handed back by a client is only accepted after [`KeyPathBuilder::owns`]
//! confirms this builder could have produced it for the same owner.

use crate::config::UploadConfig;
use crate::error::{UploadError, UploadResult};
use crate::validation::is_valid_filename;

/// Derives `<storageRoot>/<entityType>/...` object keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPathBuilder {
    root: Vec<String>,
    entity_type: String,
}

impl KeyPathBuilder {
    /// A builder with an explicit storage root (may be empty or nested).
    pub fn new(storage_root: &str, entity_type: impl Into<String>) -> Self {
        Self {
            root: storage_root
                .split('/')
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
            entity_type: entity_type.into(),
        }
    }

    /// Builder for the configured storage path and entity type.
    #[must_use]
    pub fn from_config(config: &UploadConfig) -> Self {
        Self::new(&config.storage_path, config.entity_type.clone())
    }

    /// `<storageRoot>/<entityType>/<entityId>/<filename>`.
    pub fn build_path(&self, entity_id: &str, filename: &str) -> UploadResult<String> {
        check_segment("recordId", entity_id)?;
        check_segment("filename", filename)?;
        Ok(self.join(&[entity_id, filename]))
    }

    /// `<storageRoot>/<entityType>/<ownerId>/<entityId>/<sessionId>/<filename>`.
    ///
    /// `session_id` is unique per multipart session, so two sessions for the
    /// same record and filename never share a key.
    pub fn build_scoped_path(
        &self,
        owner_id: &str,
        entity_id: &str,
        session_id: &str,
        filename: &str,
    ) -> UploadResult<String> {
        check_segment("ownerId", owner_id)?;
        check_segment("recordId", entity_id)?;
        check_segment("sessionId", session_id)?;
        check_segment("filename", filename)?;
        Ok(self.join(&[owner_id, entity_id, session_id, filename]))
    }

    /// Whether `key` is a scoped key for `owner_id`.
    #[must_use]
    pub fn owns(&self, owner_id: &str, key: &str) -> bool {
        if check_segment("ownerId", owner_id).is_err() {
            return false;
        }
        let prefix = self.join(&[owner_id, ""]);
        let Some(rest) = key.strip_prefix(prefix.as_str()) else {
            return false;
        };
        match rest.split('/').collect::<Vec<_>>().as_slice() {
            [entity_id, session_id, filename] => {
                check_segment("recordId", entity_id).is_ok()
                    && check_segment("sessionId", session_id).is_ok()
                    && check_segment("filename", filename).is_ok()
                    && is_valid_filename(filename)
            }
            _ => false,
        }
    }

    fn join(&self, tail: &[&str]) -> String {
        self.root
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.entity_type.as_str()))
            .chain(tail.iter().copied())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn check_segment(field: &str, value: &str) -> UploadResult<()> {
    let reason = if value.is_empty() {
        "must not be empty"
    } else if value == "." || value == ".." {
        "must not be a relative path segment"
    } else if value.contains(['/', '\\']) {
        "must not contain path separators"
    } else if value.chars().any(char::is_control) {
        "must not contain control characters"
    } else {
        return Ok(());
    };
    Err(UploadError::validation(field, format!("{field} {reason}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_build_plain_path() {
        let keys = KeyPathBuilder::new("", "resources");
        assert_eq!(
            keys.build_path("r-1", "data.csv").unwrap(),
            "resources/r-1/data.csv"
        );

        let rooted = KeyPathBuilder::new("/portal/prod/", "resources");
        assert_eq!(
            rooted.build_path("r-1", "data.csv").unwrap(),
            "portal/prod/resources/r-1/data.csv"
        );
    }

    #[test]
    fn test_should_build_deterministic_distinct_paths() {
        let keys = KeyPathBuilder::new("root", "resources");
        let a = keys.build_path("r-1", "a.csv").unwrap();
        assert_eq!(a, keys.build_path("r-1", "a.csv").unwrap());
        assert_ne!(a, keys.build_path("r-2", "a.csv").unwrap());
        assert_ne!(a, keys.build_path("r-1", "b.csv").unwrap());
    }

    #[test]
    fn test_should_reject_traversal_segments() {
        let keys = KeyPathBuilder::new("", "resources");
        for (entity, file) in [
            ("..", "a.csv"),
            (".", "a.csv"),
            ("", "a.csv"),
            ("r/1", "a.csv"),
            ("r-1", "../a.csv"),
            ("r-1", "a\\b"),
            ("r-1", "a\nb"),
            ("r-1", ""),
        ] {
            assert!(keys.build_path(entity, file).is_err(), "{entity:?} {file:?}");
        }
    }

    #[test]
    fn test_should_build_scoped_path() {
        let keys = KeyPathBuilder::new("", "resources");
        assert_eq!(
            keys.build_scoped_path("pkg-1", "r-1", "s-1", "data.csv").unwrap(),
            "resources/pkg-1/r-1/s-1/data.csv"
        );
        assert_ne!(
            keys.build_scoped_path("pkg-1", "r-1", "s-1", "data.csv").unwrap(),
            keys.build_scoped_path("pkg-1", "r-1", "s-2", "data.csv").unwrap()
        );
        assert!(keys.build_scoped_path("pkg/1", "r-1", "s-1", "data.csv").is_err());
        assert!(keys.build_scoped_path("pkg-1", "r-1", "..", "data.csv").is_err());
    }

    #[test]
    fn test_should_check_key_ownership() {
        let keys = KeyPathBuilder::new("root", "resources");
        let key = keys.build_scoped_path("pkg-1", "r-1", "s-1", "data.csv").unwrap();
        assert!(keys.owns("pkg-1", &key));
        assert!(!keys.owns("pkg-2", &key));
        assert!(!keys.owns("pkg", &key));
        assert!(!keys.owns("pkg-1", "root/resources/pkg-1/r-1/data.csv"));
        assert!(!keys.owns("pkg-1", "root/resources/pkg-1/r-1/s-1/x/data.csv"));
        assert!(!keys.owns("pkg-1", "root/resources/pkg-1/r-1/../data.csv"));
        assert!(!keys.owns("pkg-1", "root/resources/pkg-1/r-1/s-1/CON"));
        assert!(!keys.owns("pkg-1", "other/resources/pkg-1/r-1/s-1/data.csv"));
        assert!(!keys.owns("", "root/resources//r-1/s-1/data.csv"));
    }
}
