//! Shipped path resolvers.
//!
//! `FileResolver` treats the play case as a filesystem path. The richer
//! `ProfileResolver` reads a JSON profile mapping logical case names to a
//! path and an optional per-case playback resolution, so deployments can
//! swap media without touching the consumer.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use fc_common::{PathResolver, Resolution, ResolveError, ResolvedSource};

/// Resolves a case by checking it exists on disk. Relative cases are
/// resolved against the configured root.
pub struct FileResolver {
    root: PathBuf,
}

impl FileResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PathResolver for FileResolver {
    fn resolve(&self, case: &str) -> Result<ResolvedSource, ResolveError> {
        let path = self.root.join(case);
        if path.is_file() {
            Ok(ResolvedSource::new(path))
        } else {
            Err(ResolveError::NotFound { case: case.into() })
        }
    }
}

/// One profile entry: a source path plus an optional playback resolution.
#[derive(Debug, Deserialize)]
struct ProfileEntry {
    path: PathBuf,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

impl ProfileEntry {
    fn resolution(&self) -> Option<Resolution> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some(Resolution::new(w, h)),
            _ => None,
        }
    }
}

/// Resolves cases through a JSON profile file.
///
/// The profile is a single object mapping case names to entries:
/// `{ "intro": { "path": "clips/intro.avi", "width": 1280, "height": 720 } }`.
/// Entry paths are resolved relative to the profile file's directory. A
/// missing case and an entry whose file is gone both resolve to not-found.
pub struct ProfileResolver {
    base: PathBuf,
    entries: HashMap<String, ProfileEntry>,
}

impl ProfileResolver {
    /// Load and parse the profile at `path`. The file is read once;
    /// later edits are not picked up.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ResolveError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let entries: HashMap<String, ProfileEntry> =
            serde_json::from_str(&text).map_err(|err| ResolveError::MalformedProfile {
                path: path.display().to_string(),
                reason: err.to_string(),
            })?;
        let base = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        tracing::debug!(profile = %path.display(), cases = entries.len(), "Profile loaded");
        Ok(Self { base, entries })
    }
}

impl PathResolver for ProfileResolver {
    fn resolve(&self, case: &str) -> Result<ResolvedSource, ResolveError> {
        let entry = self
            .entries
            .get(case)
            .ok_or_else(|| ResolveError::NotFound { case: case.into() })?;
        let path = if entry.path.is_absolute() {
            entry.path.clone()
        } else {
            self.base.join(&entry.path)
        };
        if !path.is_file() {
            return Err(ResolveError::NotFound { case: case.into() });
        }
        Ok(ResolvedSource {
            path,
            resolution: entry.resolution(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;

    /// Unique scratch directory per test, removed on drop.
    struct Scratch(PathBuf);

    impl Scratch {
        fn new(tag: &str) -> Self {
            let dir = std::env::temp_dir().join(format!(
                "fc-profile-{}-{}",
                tag,
                std::process::id()
            ));
            fs::create_dir_all(&dir).unwrap();
            Self(dir)
        }

        fn file(&self, name: &str, contents: &str) -> PathBuf {
            let path = self.0.join(name);
            let mut file = File::create(&path).unwrap();
            file.write_all(contents.as_bytes()).unwrap();
            path
        }
    }

    impl Drop for Scratch {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.0);
        }
    }

    #[test]
    fn file_resolver_finds_existing() {
        let scratch = Scratch::new("file-ok");
        scratch.file("clip.avi", "x");
        let resolver = FileResolver::new(&scratch.0);

        let resolved = resolver.resolve("clip.avi").unwrap();
        assert!(resolved.path.ends_with("clip.avi"));
        assert_eq!(resolved.resolution, None);
    }

    #[test]
    fn file_resolver_rejects_missing() {
        let scratch = Scratch::new("file-miss");
        let resolver = FileResolver::new(&scratch.0);
        assert!(matches!(
            resolver.resolve("nope.avi"),
            Err(ResolveError::NotFound { .. })
        ));
    }

    #[test]
    fn profile_maps_case_to_path_and_resolution() {
        let scratch = Scratch::new("profile-ok");
        scratch.file("intro.avi", "x");
        let profile = scratch.file(
            "profile.json",
            r#"{ "intro": { "path": "intro.avi", "width": 1280, "height": 720 } }"#,
        );

        let resolver = ProfileResolver::from_file(profile).unwrap();
        let resolved = resolver.resolve("intro").unwrap();
        assert!(resolved.path.ends_with("intro.avi"));
        assert_eq!(resolved.resolution, Some(Resolution::new(1280, 720)));
    }

    #[test]
    fn profile_entry_without_size_has_no_resolution() {
        let scratch = Scratch::new("profile-nosize");
        scratch.file("raw.avi", "x");
        let profile = scratch.file("profile.json", r#"{ "raw": { "path": "raw.avi" } }"#);

        let resolver = ProfileResolver::from_file(profile).unwrap();
        assert_eq!(resolver.resolve("raw").unwrap().resolution, None);
    }

    #[test]
    fn unknown_case_and_dangling_path_are_not_found() {
        let scratch = Scratch::new("profile-miss");
        let profile = scratch.file(
            "profile.json",
            r#"{ "ghost": { "path": "gone.avi" } }"#,
        );

        let resolver = ProfileResolver::from_file(profile).unwrap();
        assert!(matches!(
            resolver.resolve("unknown"),
            Err(ResolveError::NotFound { .. })
        ));
        assert!(matches!(
            resolver.resolve("ghost"),
            Err(ResolveError::NotFound { .. })
        ));
    }

    #[test]
    fn malformed_profile_is_reported() {
        let scratch = Scratch::new("profile-bad");
        let profile = scratch.file("profile.json", "{ not json");
        assert!(matches!(
            ProfileResolver::from_file(profile),
            Err(ResolveError::MalformedProfile { .. })
        ));
    }
}
