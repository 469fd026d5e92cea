//! Config file discovery.
//!
//! Search paths are expanded into directories in ascending priority, each
//! directory is checked for the config file name, and the [`SearchMode`]
//! decides whether every file found is a layer or only the nearest one.
//! Missing files are skipped; other I/O errors are reported.

use std::io;
use std::path::{Path, PathBuf};

use toml::Table;
use tracing::debug;

use crate::error::AskfigError;
use crate::schema::Target;
use crate::types::{Boundary, SearchMode, SearchPath};
use crate::validate::{unknown_keys, validate_unknown_keys};

/// A config file found on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub content: String,
}

impl ConfigFile {
    /// Parse into a table. In strict mode keys unknown to `target` are
    /// errors; otherwise they are logged and left for the parser to ignore.
    pub fn parse(&self, target: &Target, strict: bool) -> Result<Table, AskfigError> {
        if strict {
            return validate_unknown_keys(target, &self.content, &self.path);
        }
        let table: Table = toml::from_str(&self.content).map_err(|e| AskfigError::ParseError {
            path: self.path.clone(),
            source: e,
        })?;
        for key in unknown_keys(target, &table) {
            debug!(path = %self.path.display(), %key, "ignoring unknown config key");
        }
        Ok(table)
    }
}

/// The directory a single search path names. `None` when it cannot be
/// resolved (no home directory) or when it names several ([`SearchPath::Ancestors`]).
pub fn search_dir(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
        SearchPath::Ancestors(_) => None,
    }
}

/// `start` and its parents up to the boundary, root end first.
pub fn ancestors(start: &Path, boundary: &Boundary) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for dir in start.ancestors() {
        dirs.push(dir.to_path_buf());
        if let Boundary::Marker(name) = boundary
            && dir.join(name).exists()
        {
            break;
        }
    }
    dirs.reverse();
    dirs
}

/// Expand search paths into directories, ascending priority. Ancestor walks
/// start at `start`, or the working directory when `None`.
pub fn search_dirs(search_paths: &[SearchPath], app_name: &str, start: Option<&Path>) -> Vec<PathBuf> {
    let cwd = match start {
        Some(start) => Some(start.to_path_buf()),
        None => std::env::current_dir().ok(),
    };
    let mut dirs = Vec::new();
    for sp in search_paths {
        match (sp, &cwd) {
            (SearchPath::Ancestors(boundary), Some(cwd)) => dirs.extend(ancestors(cwd, boundary)),
            (SearchPath::Ancestors(_), None) => {}
            (other, _) => dirs.extend(search_dir(other, app_name)),
        }
    }
    dirs
}

/// Find `file_name` in `dirs` (ascending priority).
pub fn discover(dirs: &[PathBuf], file_name: &str, mode: SearchMode) -> Result<Vec<ConfigFile>, AskfigError> {
    let mut found = Vec::new();
    let ordered: Box<dyn Iterator<Item = &PathBuf>> = match mode {
        SearchMode::Merge => Box::new(dirs.iter()),
        SearchMode::FirstMatch => Box::new(dirs.iter().rev()),
    };
    for dir in ordered {
        let path = dir.join(file_name);
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                debug!(path = %path.display(), "config file found");
                found.push(ConfigFile { path, content });
                if mode == SearchMode::FirstMatch {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
            Err(e) => return Err(AskfigError::IoError { path, source: e }),
        }
    }
    Ok(found)
}
