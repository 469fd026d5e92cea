use std::path::PathBuf;

/// Where to look for config files. Lists are in ascending priority: later
/// entries override earlier ones.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchPath {
    /// Platform config directory (XDG on Linux, ~/Library/Application Support on macOS).
    Platform,
    /// A subdirectory under the user's home directory, e.g. `Home(".myapp")`.
    Home(&'static str),
    /// Current working directory.
    Cwd,
    /// An explicit path.
    Path(PathBuf),
    /// The working directory and its parents, nearest last.
    Ancestors(Boundary),
}

/// Where an [`Ancestors`](SearchPath::Ancestors) walk stops.
#[derive(Debug, Clone, PartialEq)]
pub enum Boundary {
    Root,
    /// Stop at the first directory containing this entry (inclusive), e.g.
    /// `Marker(".git")`. Walks to the root if never found.
    Marker(&'static str),
}

/// How found config files combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    /// Every found file is a layer.
    #[default]
    Merge,
    /// Only the highest-priority file found is used.
    FirstMatch,
}
