use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::debug;

use crate::{
    profile::{ProfileId, StylingProfile},
    stage::create_parent_dirs,
    Error, Result,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Added,
    Updated,
}

impl SaveStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SaveStatus::Added => "added",
            SaveStatus::Updated => "updated",
        }
    }
}

/// Profile records, one `<id>.toml` file each.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, id: &ProfileId) -> PathBuf {
        self.dir.join(format!("{id}.toml"))
    }

    pub fn exists(&self, id: &ProfileId) -> bool {
        self.record_path(id).is_file()
    }

    pub fn load(&self, id: &ProfileId) -> Result<StylingProfile> {
        let path = self.record_path(id);
        let profile = read_record(&path)?;
        if profile.id != *id {
            return Err(Error::Config(format!(
                "{} contains profile `{}`",
                path.display(),
                profile.id
            )));
        }
        Ok(profile)
    }

    /// Every stored profile, sorted by id. A missing directory is an empty store.
    pub fn list(&self) -> Result<Vec<StylingProfile>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::io(&self.dir)(e)),
        };

        let mut profiles = Vec::new();
        for entry in entries {
            let entry = entry.map_err(Error::io(&self.dir))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "toml") && path.is_file() {
                let Some(stem) = path.file_stem().map(|s| s.to_string_lossy()) else {
                    continue;
                };
                let id = ProfileId::parse(&stem)
                    .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
                profiles.push(self.load(&id)?);
            }
        }

        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(profiles)
    }

    pub fn save(&self, profile: &StylingProfile) -> Result<SaveStatus> {
        let path = self.record_path(&profile.id);
        let status = if path.is_file() {
            SaveStatus::Updated
        } else {
            SaveStatus::Added
        };

        let contents = toml::to_string_pretty(profile)
            .map_err(|e| Error::Config(format!("failed to serialize profile {}: {e}", profile.id)))?;

        create_parent_dirs(&path)?;
        fs::write(&path, contents).map_err(Error::io(&path))?;
        debug!("Wrote {}", path.display());

        Ok(status)
    }

    /// Returns whether a record existed.
    pub fn delete(&self, id: &ProfileId) -> Result<bool> {
        let path = self.record_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Error::io(&path)(e)),
        }
    }
}

fn read_record(path: &Path) -> Result<StylingProfile> {
    let contents = fs::read_to_string(path).map_err(Error::io(path))?;
    toml::from_str(&contents).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
}
