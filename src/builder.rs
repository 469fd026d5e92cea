use serde::de::DeserializeOwned;
use toml::{Table, Value};
use tracing::debug;

use crate::env;
use crate::error::AskfigError;
use crate::file;
use crate::merge::merge_layers;
use crate::overrides::overrides_to_table;
use crate::parse::{Parser, TableParser};
use crate::provider::ValueProvider;
use crate::resolve::{Outcome, Resolution, Resolver};
use crate::schema::{Describe, Target};
use crate::types::{SearchMode, SearchPath};

/// Entry point for building an askfig run.
pub struct Askfig;

impl Askfig {
    pub fn builder() -> AskfigBuilder {
        AskfigBuilder::new()
    }
}

/// Builder for the defaults layers and the resolution run on top of them.
///
/// Defaults come from config files, then environment variables, then
/// [`default_value`](Self::default_value) entries, each overriding the
/// previous. Raw input (command-line tokens) overrides all of them, and
/// answers from the value provider override everything.
pub struct AskfigBuilder {
    app_name: Option<String>,
    file_name: Option<String>,
    search_paths: Option<Vec<SearchPath>>,
    search_mode: SearchMode,
    env_prefix: Option<String>,
    env_enabled: bool,
    strict: bool,
    overrides: Vec<(String, Value)>,
    #[cfg(feature = "clap")]
    args: Option<Vec<String>>,
    title: Option<String>,
    reask_limit: usize,
}

impl AskfigBuilder {
    fn new() -> Self {
        Self {
            app_name: None,
            file_name: None,
            search_paths: None,
            search_mode: SearchMode::default(),
            env_prefix: None,
            env_enabled: true,
            strict: true,
            overrides: Vec::new(),
            #[cfg(feature = "clap")]
            args: None,
            title: None,
            reask_limit: 0,
        }
    }

    /// Set the application name. This derives sensible defaults:
    /// - `file_name` → `"{app_name}.toml"`
    /// - `search_paths` → `[SearchPath::Platform]`
    /// - `env_prefix` → `"{APP_NAME}"` (uppercased)
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// Override the config file name (default: `"{app_name}.toml"`).
    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = Some(name.to_string());
        self
    }

    /// Replace the default search paths entirely. Paths are listed in
    /// ascending priority: the last entry wins.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    /// Append a search path, starting from `[Platform]` if none were set.
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        self.search_paths
            .get_or_insert_with(|| vec![SearchPath::Platform])
            .push(path);
        self
    }

    /// Set the search mode (default: [`SearchMode::Merge`]).
    pub fn search_mode(mut self, mode: SearchMode) -> Self {
        self.search_mode = mode;
        self
    }

    /// Override the environment variable prefix (default: uppercased `app_name`).
    pub fn env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_string());
        self
    }

    /// Disable environment variable loading entirely.
    pub fn no_env(mut self) -> Self {
        self.env_enabled = false;
        self
    }

    /// Enable or disable strict mode (default: `true`).
    /// In strict mode, unknown keys in config files produce errors.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Set a default at a dotted key, above files and env. With candidate
    /// targets the first segment names the candidate (`"Deploy.target"`).
    /// Keys are checked against the target when defaults load.
    pub fn default_value<V: Into<Value>>(mut self, key: &str, value: V) -> Self {
        self.overrides.push((key.to_string(), value.into()));
        self
    }

    /// Command-line tokens to parse, without the binary name. Without
    /// tokens, only defaults and answers are used.
    #[cfg(feature = "clap")]
    pub fn args<I, T>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.args = Some(tokens.into_iter().map(Into::into).collect());
        self
    }

    /// Title of value requests.
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_string());
        self
    }

    /// See [`Resolver::reask_limit`].
    pub fn reask_limit(mut self, limit: usize) -> Self {
        self.reask_limit = limit;
        self
    }

    fn effective_app_name(&self) -> Result<&str, AskfigError> {
        self.app_name.as_deref().ok_or(AskfigError::AppNameRequired)
    }

    fn effective_file_name(&self) -> Result<String, AskfigError> {
        if let Some(name) = &self.file_name {
            return Ok(name.clone());
        }
        let app = self.effective_app_name()?;
        Ok(format!("{app}.toml"))
    }

    fn effective_search_paths(&self) -> Vec<SearchPath> {
        match &self.search_paths {
            Some(paths) => paths.clone(),
            None => vec![SearchPath::Platform],
        }
    }

    /// `None` when env loading is disabled.
    fn effective_env_prefix(&self) -> Result<Option<String>, AskfigError> {
        if !self.env_enabled {
            return Ok(None);
        }
        if let Some(prefix) = &self.env_prefix {
            return Ok(Some(prefix.clone()));
        }
        let app = self.effective_app_name()?;
        Ok(Some(app.to_uppercase()))
    }

    /// The merged defaults for `target`: config files, then environment
    /// variables, then [`default_value`](Self::default_value) entries.
    pub fn load_defaults(&self, target: &Target) -> Result<Table, AskfigError> {
        self.defaults_from(target, std::env::vars())
    }

    fn defaults_from(
        &self,
        target: &Target,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Table, AskfigError> {
        let app_name = self.effective_app_name()?;
        let file_name = self.effective_file_name()?;

        let dirs = file::search_dirs(&self.effective_search_paths(), app_name, None);
        let files = file::discover(&dirs, &file_name, self.search_mode)?;
        let mut layers = Vec::with_capacity(files.len() + 2);
        for found in &files {
            layers.push(found.parse(target, self.strict)?);
        }

        if let Some(prefix) = self.effective_env_prefix()? {
            layers.push(env::env_to_table(target, &prefix, vars));
        }

        if let Some((key, _)) = self.overrides.iter().find(|(key, _)| target.locate(key).is_none()) {
            return Err(AskfigError::UnknownField(key.clone()));
        }
        layers.push(overrides_to_table(&self.overrides));

        debug!(files = files.len(), "defaults loaded");
        let refs: Vec<&Table> = layers.iter().collect();
        Ok(merge_layers(target, &refs))
    }

    #[cfg(feature = "clap")]
    fn parser(&self) -> Result<Box<dyn Parser>, AskfigError> {
        match &self.args {
            Some(tokens) => {
                let name = self.effective_app_name()?;
                Ok(Box::new(crate::cli::ClapParser::new(name, tokens.iter().cloned())))
            }
            None => Ok(Box::new(TableParser::default())),
        }
    }

    #[cfg(not(feature = "clap"))]
    fn parser(&self) -> Result<Box<dyn Parser>, AskfigError> {
        Ok(Box::new(TableParser::default()))
    }

    fn configure<V: ValueProvider>(
        &self,
        resolver: Resolver<Box<dyn Parser>, V>,
        target: &Target,
    ) -> Result<Resolver<Box<dyn Parser>, V>, AskfigError> {
        let mut resolver = resolver
            .defaults(self.load_defaults(target)?)
            .reask_limit(self.reask_limit);
        if let Some(title) = &self.title {
            resolver = resolver.title(title.clone());
        }
        Ok(resolver)
    }

    /// Resolve `target`, asking `provider` for whatever the defaults and
    /// command line leave open.
    pub fn resolve<V: ValueProvider>(&self, target: &Target, provider: V) -> Result<Outcome<Resolution>, AskfigError> {
        let resolver = Resolver::new(self.parser()?, provider);
        self.configure(resolver, target)?.resolve(target)
    }

    /// Resolve and deserialize `T`.
    pub fn run<T, V>(&self, provider: V) -> Result<Outcome<T>, AskfigError>
    where
        T: Describe + DeserializeOwned,
        V: ValueProvider,
    {
        let target = T::describe();
        match self.resolve(&target, provider)? {
            Outcome::Resolved(resolution) => Ok(Outcome::Resolved(resolution.deserialize()?)),
            Outcome::Cancelled => Ok(Outcome::Cancelled),
        }
    }

    /// Like [`run`](Self::run) with no one to ask: anything left open is an
    /// error.
    pub fn run_unattended<T>(&self) -> Result<T, AskfigError>
    where
        T: Describe + DeserializeOwned,
    {
        let target = T::describe();
        let resolver = Resolver::unattended(self.parser()?);
        match self.configure(resolver, &target)?.resolve(&target)? {
            Outcome::Resolved(resolution) => resolution.deserialize(),
            Outcome::Cancelled => Err(AskfigError::Unresolvable {
                diagnostic: "resolution cancelled".into(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::{Command, Person, TestConfig, commands, person};
    use crate::provider::ScriptedProvider;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn in_dir(dir: &TempDir) -> AskfigBuilder {
        Askfig::builder()
            .app_name("myapp")
            .search_paths(vec![SearchPath::Path(dir.path().to_path_buf())])
            .no_env()
    }

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn app_name_sets_defaults() {
        let builder = Askfig::builder().app_name("myapp");
        assert_eq!(builder.effective_file_name().unwrap(), "myapp.toml");
        assert_eq!(builder.effective_env_prefix().unwrap(), Some("MYAPP".to_string()));
        assert_eq!(builder.effective_search_paths(), vec![SearchPath::Platform]);
    }

    #[test]
    fn overrides_of_derived_names() {
        let builder = Askfig::builder()
            .app_name("myapp")
            .file_name("custom.toml")
            .env_prefix("CUSTOM");
        assert_eq!(builder.effective_file_name().unwrap(), "custom.toml");
        assert_eq!(builder.effective_env_prefix().unwrap(), Some("CUSTOM".to_string()));
        assert_eq!(builder.no_env().effective_env_prefix().unwrap(), None);
    }

    #[test]
    fn add_search_path_appends() {
        let builder = Askfig::builder().app_name("myapp").add_search_path(SearchPath::Cwd);
        assert_eq!(
            builder.effective_search_paths(),
            vec![SearchPath::Platform, SearchPath::Cwd]
        );
        let builder = Askfig::builder()
            .search_paths(vec![SearchPath::Cwd])
            .add_search_path(SearchPath::Path(PathBuf::from("/etc/x")));
        assert_eq!(
            builder.effective_search_paths(),
            vec![SearchPath::Cwd, SearchPath::Path(PathBuf::from("/etc/x"))]
        );
    }

    #[test]
    fn app_name_required() {
        let err = Askfig::builder()
            .load_defaults(&TestConfig::describe())
            .unwrap_err();
        assert!(matches!(err, AskfigError::AppNameRequired));
    }

    #[test]
    fn layers_stack_files_then_env_then_defaults() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("myapp.toml"),
            "host = \"file\"\nport = 1\n[database]\npool_size = 7\n",
        )
        .unwrap();
        let builder = Askfig::builder()
            .app_name("myapp")
            .search_paths(vec![SearchPath::Path(dir.path().to_path_buf())])
            .default_value("port", 3);
        let table = builder
            .defaults_from(
                &TestConfig::describe(),
                vars(&[("MYAPP__PORT", "2"), ("MYAPP__HOST", "env")]),
            )
            .unwrap();
        assert_eq!(table["host"].as_str(), Some("env"));
        assert_eq!(table["port"].as_integer(), Some(3));
        assert_eq!(table["database"]["pool_size"].as_integer(), Some(7));
    }

    #[test]
    fn strict_mode_rejects_unknown_file_keys() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("myapp.toml"), "prot = 1\n").unwrap();
        let err = in_dir(&dir).load_defaults(&TestConfig::describe()).unwrap_err();
        assert!(matches!(err, AskfigError::UnknownKeys(_)));

        let table = in_dir(&dir)
            .strict(false)
            .load_defaults(&TestConfig::describe())
            .unwrap();
        assert_eq!(table["prot"].as_integer(), Some(1));
    }

    #[test]
    fn unknown_default_key_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = in_dir(&dir)
            .default_value("Deploy.region", "eu")
            .load_defaults(&Target::Candidates(commands()))
            .unwrap_err();
        assert!(matches!(err, AskfigError::UnknownField(key) if key == "Deploy.region"));
    }

    #[test]
    fn run_asks_for_what_defaults_leave_open() {
        let dir = TempDir::new().unwrap();
        let mut provider = ScriptedProvider::new().answer([("name", "Ann")]);
        let outcome = in_dir(&dir)
            .default_value("age", 30)
            .run::<Person, _>(&mut provider)
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Resolved(Person {
                name: "Ann".into(),
                age: 30
            })
        );
        assert_eq!(provider.requests()[0].labels(), vec!["name"]);
    }

    #[test]
    fn cancelled_run_exits_with_one() {
        let dir = TempDir::new().unwrap();
        let outcome = in_dir(&dir)
            .run::<Person, _>(ScriptedProvider::new().cancel())
            .unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(outcome.exit_code(), 1);
    }

    #[test]
    fn unattended_run_fails_on_gaps() {
        let dir = TempDir::new().unwrap();
        let err = in_dir(&dir).run_unattended::<Person>().unwrap_err();
        assert!(matches!(err, AskfigError::Unresolvable { .. }));

        let person = in_dir(&dir)
            .default_value("name", "Bo")
            .run_unattended::<Person>()
            .unwrap();
        assert_eq!(person.age, 4);
    }

    #[test]
    fn title_reaches_the_provider() {
        let dir = TempDir::new().unwrap();
        let mut provider = ScriptedProvider::new().answer([("name", "Ann")]);
        in_dir(&dir)
            .title("Who are you?")
            .resolve(&Target::Single(person()), &mut provider)
            .unwrap();
        assert_eq!(provider.requests()[0].title, "Who are you?");
    }

    #[cfg(feature = "clap")]
    #[test]
    fn command_line_picks_candidate_over_file_sections() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("myapp.toml"),
            "[Build]\nshared = 9\n[Deploy]\ntarget = \"prod\"\n",
        )
        .unwrap();
        let command = in_dir(&dir)
            .args(["deploy", "--shared", "3"])
            .run_unattended::<Command>()
            .unwrap();
        assert_eq!(
            command,
            Command::Deploy {
                shared: 3,
                target: "prod".into()
            }
        );
    }

    #[cfg(feature = "clap")]
    #[test]
    fn unknown_flag_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = in_dir(&dir)
            .args(["--nope"])
            .run::<Person, _>(ScriptedProvider::new())
            .unwrap_err();
        assert!(matches!(err, AskfigError::Rejected(_)));
    }
}
