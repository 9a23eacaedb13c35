use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use matview_core::{
    BuildStep, DEFAULT_INDEX_CAP, RedactedConnection, Statement, drop_view_statement,
    redact_connection_string, validate_view_name,
};
use matview_postgres::PgConnectOptions;
use matview_refresh::RefreshPlan;

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5432;
const DEFAULT_DATABASE: &str = "postgres";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("toml decode error: {0}")]
    TomlDecode(#[from] toml::de::Error),
    #[error(transparent)]
    Core(#[from] matview_core::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Job file describing which views to refresh and which benchmarks to run.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    /// Drop order; defaults to the reverse of `views`.
    #[serde(default)]
    pub drop_order: Option<Vec<String>>,
    /// Views in build order.
    #[serde(default)]
    pub views: Vec<ViewConfig>,
    #[serde(default)]
    pub indexes: Option<IndexConfig>,
    pub benchmarks: BenchmarkConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewConfig {
    pub name: String,
    /// SQL file holding the full definition of the view.
    pub definition: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexConfig {
    pub source: PathBuf,
    #[serde(default = "default_index_cap")]
    pub cap: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BenchmarkConfig {
    /// YAML expectation document.
    pub source: PathBuf,
}

fn default_index_cap() -> usize {
    DEFAULT_INDEX_CAP
}

impl JobConfig {
    /// Parse a job file; relative paths resolve against `base_dir`.
    pub fn from_toml_str(content: &str, base_dir: &Path) -> ConfigResult<Self> {
        let mut config: JobConfig = toml::from_str(content)?;

        for view in &mut config.views {
            validate_view_name(&view.name)?;
            view.definition = resolve_path(base_dir, &view.definition);
        }
        if let Some(order) = &config.drop_order {
            for name in order {
                validate_view_name(name)?;
            }
        }
        if let Some(indexes) = &mut config.indexes {
            indexes.source = resolve_path(base_dir, &indexes.source);
        }
        config.benchmarks.source = resolve_path(base_dir, &config.benchmarks.source);

        Ok(config)
    }

    /// Drop commands in execution order.
    pub fn drop_statements(&self) -> ConfigResult<Vec<Statement>> {
        let names: Vec<&str> = match &self.drop_order {
            Some(order) => order.iter().map(String::as_str).collect(),
            None => self.views.iter().rev().map(|view| view.name.as_str()).collect(),
        };
        names
            .into_iter()
            .map(|name| drop_view_statement(name).map_err(ConfigError::from))
            .collect()
    }

    /// Read every view definition and the index source from disk.
    pub fn load_refresh_plan(&self) -> ConfigResult<RefreshPlan> {
        if self.views.is_empty() {
            return Err(ConfigError::Invalid(
                "no views configured; add [[views]] entries or use --only-benchmarks".to_string(),
            ));
        }

        let builds = self
            .views
            .iter()
            .map(|view| {
                read_file(&view.definition)
                    .map(|sql| BuildStep::new(view.definition.display().to_string(), sql))
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        let (index_source, index_cap) = match &self.indexes {
            Some(indexes) => (read_file(&indexes.source)?, indexes.cap),
            None => (String::new(), DEFAULT_INDEX_CAP),
        };

        let plan = RefreshPlan::new(self.drop_statements()?, builds, index_source);
        Ok(plan.with_index_cap(index_cap))
    }
}

/// Load the job file at `path`.
pub fn load_job_config(path: &Path) -> ConfigResult<JobConfig> {
    let content = read_file(path)?;
    let base_dir = path.parent().unwrap_or(Path::new("."));
    JobConfig::from_toml_str(&content, base_dir)
}

pub fn read_file(path: &Path) -> ConfigResult<String> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }

    let mut out = PathBuf::new();
    for component in base_dir.join(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Where and how to connect, plus a loggable description of it.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub options: PgConnectOptions,
    pub redacted: RedactedConnection,
}

impl ConnectionSettings {
    /// Use `conn` when given, otherwise the `DB_*` variables read through `lookup`.
    pub fn resolve<F>(conn: Option<&str>, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(conn) = conn {
            let options = conn
                .parse::<PgConnectOptions>()
                .map_err(|err| ConfigError::Invalid(format!("invalid connection string: {err}")))?;
            return Ok(Self {
                options,
                redacted: redact_connection_string(conn),
            });
        }

        let host = lookup("DB_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("DB_PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid(format!("DB_PORT is not a valid port: {raw}")))?,
            None => DEFAULT_PORT,
        };
        let database = lookup("DB_NAME").unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let user = lookup("DB_USER");

        let mut options = PgConnectOptions::new()
            .host(&host)
            .port(port)
            .database(&database);
        if let Some(user) = &user {
            options = options.username(user);
        }
        if let Some(password) = lookup("DB_PASSWORD") {
            options = options.password(&password);
        }

        Ok(Self {
            options,
            redacted: RedactedConnection::from_parts(&host, port, &database, user.as_deref()),
        })
    }
}
