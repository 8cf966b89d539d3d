//! Grouping of the frames in a directory by exposure time.

use crate::error::{FrameError, Result};
use crate::header::keys;
use crate::io::FormatAdapter;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Frame paths keyed by the textual form of their `EXPTIME`.
///
/// Keys keep first-seen order, and paths keep discovery order within a key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExposureGroups {
    groups: Vec<(String, Vec<PathBuf>)>,
}

impl ExposureGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, exposure: String, path: PathBuf) {
        match self.groups.iter_mut().find(|(key, _)| *key == exposure) {
            Some((_, paths)) => paths.push(path),
            None => self.groups.push((exposure, vec![path])),
        }
    }

    pub fn get(&self, exposure: &str) -> Option<&[PathBuf]> {
        self.groups
            .iter()
            .find(|(key, _)| key == exposure)
            .map(|(_, paths)| paths.as_slice())
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn exposures(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[PathBuf])> {
        self.groups
            .iter()
            .map(|(key, paths)| (key.as_str(), paths.as_slice()))
    }

    /// Total number of grouped files
    pub fn file_count(&self) -> usize {
        self.groups.iter().map(|(_, paths)| paths.len()).sum()
    }
}

impl Serialize for ExposureGroups {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for (exposure, paths) in &self.groups {
            map.serialize_entry(exposure, paths)?;
        }
        map.end()
    }
}

/// Regular files directly inside `dir` whose name ends in `.{extension}`,
/// sorted by file name.
pub fn list_candidate_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let suffix = format!(".{extension}");
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let matches = path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&suffix));
        if matches && path.is_file() {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Group the frames directly inside `dir` by their `EXPTIME` header value.
///
/// Only headers are read. A candidate without `EXPTIME` aborts the scan with
/// `MissingKey`.
pub fn group_by_exposure<A>(adapter: &A, dir: &Path, extension: &str) -> Result<ExposureGroups>
where
    A: FormatAdapter + ?Sized,
{
    let mut groups = ExposureGroups::new();

    for path in list_candidate_files(dir, extension)? {
        let header = adapter.read_header_only(&path)?;
        let Some(exposure) = header.get(keys::EXPTIME) else {
            warn!("{} has no {} keyword", path.display(), keys::EXPTIME);
            return Err(FrameError::MissingKey(keys::EXPTIME.to_string()));
        };
        debug!("{} -> EXPTIME {}", path.display(), exposure);
        groups.push(exposure.to_string(), path);
    }

    Ok(groups)
}
