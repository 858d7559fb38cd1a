//! On-disk profile persistence.
//!
//! One file per profile, named after a sanitized display name, containing the
//! serialized property list produced by [`crate::plist::encode`]. Saving
//! always stamps the modification time and validates before writing.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::ModelError;
use crate::plist;
use crate::profile::Profile;

/// File extension for persisted profiles.
pub const PROFILE_EXTENSION: &str = "mobileconfig";

/// Characters stripped from display names when deriving file names.
const UNSAFE_FILE_CHARS: &[char] = &[':', '/', '\\', '?', '%', '*', '|', '"', '<', '>'];

/// Loads and saves profiles in a single directory.
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    /// Open the platform-standard profile directory.
    pub fn open_default() -> Result<Self, ModelError> {
        let dirs = directories::ProjectDirs::from("com", "mdmforge", "mdmforge").ok_or_else(
            || {
                ModelError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "could not determine a data directory",
                ))
            },
        )?;
        Ok(Self::open(dirs.data_dir().join("profiles")))
    }

    /// Open a store over an explicit directory.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stamp, validate, serialize and write the profile. Returns the path it
    /// was written to.
    pub fn save(&self, profile: &mut Profile) -> Result<PathBuf, ModelError> {
        profile.touch();

        let violations = profile.validate();
        if !violations.is_empty() {
            return Err(ModelError::Validation(violations));
        }

        let bytes = plist::encode(profile)?;
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&profile.display_name);
        fs::write(&path, bytes)?;

        info!(profile = %profile.display_name, path = %path.display(), "saved profile");
        Ok(path)
    }

    pub fn load(&self, path: &Path) -> Result<Profile, ModelError> {
        let bytes = fs::read(path)?;
        let profile = plist::decode(&bytes)?;
        debug!(profile = %profile.display_name, path = %path.display(), "loaded profile");
        Ok(profile)
    }

    /// Load every readable profile in the store, newest-modified first.
    /// Unreadable files are skipped with a warning so one corrupt profile
    /// cannot hide the rest.
    pub fn load_all(&self) -> Result<Vec<Profile>, ModelError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut profiles = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(PROFILE_EXTENSION) {
                continue;
            }
            match self.load(&path) {
                Ok(profile) => profiles.push(profile),
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable profile");
                }
            }
        }

        profiles.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        Ok(profiles)
    }

    /// Remove the profile's file.
    pub fn delete(&self, profile: &Profile) -> Result<(), ModelError> {
        let path = self.path_for(&profile.display_name);
        fs::remove_file(&path)?;
        info!(profile = %profile.display_name, "deleted profile");
        Ok(())
    }

    fn path_for(&self, display_name: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{PROFILE_EXTENSION}", sanitize_file_name(display_name)))
    }
}

/// Replace characters that are unsafe in file names with underscores.
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if UNSAFE_FILE_CHARS.contains(&c) { '_' } else { c })
        .collect()
}
