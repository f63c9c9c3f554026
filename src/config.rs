//! Tool configuration for flowdeploy.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (FLOWDEPLOY_HOME, FLOWDEPLOY_CACHE_DIR)
//! 2. Config file (.flowdeploy/config.yaml)
//! 3. Defaults (~/.flowdeploy)
//!
//! Config file discovery:
//! - Searches current directory and parents for .flowdeploy/config.yaml
//! - Paths in config file are relative to the .flowdeploy/ directory
//!
//! This is the tool's own configuration. Per-run parameters (account,
//! region, client, environment) come from CLI inputs and secrets instead.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::limits::ExecutionLimits;

/// Global cached configuration (stores Result to handle init errors)
static CONFIG: OnceLock<Result<ResolvedConfig, String>> = OnceLock::new();

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub cli: Option<CliSettings>,
    #[serde(default)]
    pub cache: Option<CacheSettings>,
    #[serde(default)]
    pub network: Option<NetworkSettings>,
    #[serde(default)]
    pub tools: Option<ToolSettings>,
    #[serde(default)]
    pub limits: Option<ExecutionLimits>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory for run journals (relative to config file)
    pub home: Option<String>,
    /// Layer-cache archive directory (relative to config file)
    pub cache_dir: Option<String>,
}

/// How the deployment CLI is installed and invoked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliSettings {
    /// Executable name of the deployment CLI
    pub binary: String,
    /// Package name passed to pip
    pub package: String,
    /// Optional extra enabling flow visualization
    pub visualization_extra: String,
    /// Python package installer
    pub pip: String,
    /// Native packages required by the visualization extra
    pub system_packages: Vec<String>,
    /// Install `system_packages` with apt-get
    pub install_system_packages: bool,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            binary: "datateer".to_string(),
            package: "datateer-cli".to_string(),
            visualization_extra: "visualization".to_string(),
            pip: "pip".to_string(),
            system_packages: vec!["graphviz".to_string(), "libgraphviz-dev".to_string()],
            install_system_packages: true,
        }
    }
}

/// Layer-cache settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    /// Files (relative to the workspace) whose contents form the cache hash
    pub hash_globs: Vec<String>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            hash_globs: vec![
                "Dockerfile".to_string(),
                "requirements*.txt".to_string(),
                "**/*.py".to_string(),
            ],
        }
    }
}

/// Database network window settings (AWS only)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Endpoint returning the runner's public IPv4 address as plain text
    pub ip_endpoint: String,
    /// `Name` tag of the VPC to search
    pub vpc_name: String,
    /// Security group guarding the database
    pub security_group_name: String,
    /// Description attached to the ingress rule
    pub rule_description: String,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            ip_endpoint: "https://checkip.amazonaws.com".to_string(),
            vpc_name: "default".to_string(),
            security_group_name: "meltano-db-sg".to_string(),
            rule_description: "flowdeploy runner access (automation-created)".to_string(),
        }
    }
}

/// Executables for the cloud and container CLIs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub aws: String,
    pub gcloud: String,
    pub docker: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            aws: "aws".to_string(),
            gcloud: "gcloud".to_string(),
            docker: "docker".to_string(),
        }
    }
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Absolute path to flowdeploy home (run journals)
    pub home: PathBuf,
    /// Directory holding layer-cache archives
    pub cache_dir: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub cli: CliSettings,
    pub cache: CacheSettings,
    pub network: NetworkSettings,
    pub tools: ToolSettings,
    pub limits: ExecutionLimits,
}

impl ResolvedConfig {
    /// Configuration rooted at `home`, all other settings at their defaults
    pub fn with_home(home: PathBuf) -> Self {
        Self {
            cache_dir: home.join("cache"),
            home,
            config_file: None,
            cli: CliSettings::default(),
            cache: CacheSettings::default(),
            network: NetworkSettings::default(),
            tools: ToolSettings::default(),
            limits: ExecutionLimits::default(),
        }
    }

    /// Directory holding one journal per run
    pub fn runs_dir(&self) -> PathBuf {
        self.home.join("runs")
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".flowdeploy").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}

/// Load configuration from all sources
fn load_config() -> Result<ResolvedConfig> {
    let default_home = dirs::home_dir()
        .context("Failed to determine home directory")?
        .join(".flowdeploy");

    let config_file = find_config_file();
    let file = match config_file {
        Some(ref path) => Some(load_config_file(path)?),
        None => None,
    };

    resolve(file.as_ref(), config_file.as_deref(), default_home)
}

/// Merge a parsed config file with env overrides and defaults
fn resolve(
    file: Option<&ConfigFile>,
    config_path: Option<&Path>,
    default_home: PathBuf,
) -> Result<ResolvedConfig> {
    let config_dir = config_path
        .and_then(Path::parent)
        .unwrap_or(Path::new("."));

    let home = if let Ok(env_home) = std::env::var("FLOWDEPLOY_HOME") {
        PathBuf::from(env_home)
    } else if let Some(home_path) = file.and_then(|f| f.paths.home.as_deref()) {
        resolve_path(config_dir, home_path)
    } else {
        default_home
    };

    let cache_dir = if let Ok(env_cache) = std::env::var("FLOWDEPLOY_CACHE_DIR") {
        PathBuf::from(env_cache)
    } else if let Some(cache_path) = file.and_then(|f| f.paths.cache_dir.as_deref()) {
        resolve_path(config_dir, cache_path)
    } else {
        home.join("cache")
    };

    Ok(ResolvedConfig {
        home,
        cache_dir,
        config_file: config_path.map(Path::to_path_buf),
        cli: file.and_then(|f| f.cli.clone()).unwrap_or_default(),
        cache: file.and_then(|f| f.cache.clone()).unwrap_or_default(),
        network: file.and_then(|f| f.network.clone()).unwrap_or_default(),
        tools: file.and_then(|f| f.tools.clone()).unwrap_or_default(),
        limits: file.and_then(|f| f.limits.clone()).unwrap_or_default(),
    })
}

/// Get the global configuration (loads once, then cached)
pub fn config() -> Result<&'static ResolvedConfig> {
    let result = CONFIG.get_or_init(|| load_config().map_err(|e| format!("{:#}", e)));

    match result {
        Ok(config) => Ok(config),
        Err(e) => anyhow::bail!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let config_dir = temp.path().join(".flowdeploy");
        std::fs::create_dir_all(&config_dir).unwrap();

        let config_path = config_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
version: "1.0"
paths:
  home: ./state
  cache_dir: /var/cache/flowdeploy
cli:
  binary: datateer
  install_system_packages: false
network:
  security_group_name: analytics-db-sg
tools:
  aws: /opt/aws/bin/aws
limits:
  deploy_timeout_seconds: 900
"#
        )
        .unwrap();

        let config = load_config_file(&config_path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.paths.home, Some("./state".to_string()));

        let cli = config.cli.clone().unwrap();
        assert!(!cli.install_system_packages);
        assert_eq!(cli.package, "datateer-cli");

        let network = config.network.clone().unwrap();
        assert_eq!(network.security_group_name, "analytics-db-sg");
        assert_eq!(network.vpc_name, "default");

        let tools = config.tools.clone().unwrap();
        assert_eq!(tools.aws, "/opt/aws/bin/aws");
        assert_eq!(tools.docker, "docker");

        let limits = config.limits.clone().unwrap();
        assert_eq!(limits.deploy_timeout_seconds, 900);
        assert_eq!(limits.step_timeout_seconds, 1800);
    }

    #[test]
    fn test_resolve_without_file_uses_defaults() {
        let home = PathBuf::from("/tmp/flowdeploy-home");
        let config = resolve(None, None, home.clone()).unwrap();

        if std::env::var("FLOWDEPLOY_HOME").is_err() {
            assert_eq!(config.home, home);
            assert_eq!(config.runs_dir(), home.join("runs"));
        }
        assert!(config.config_file.is_none());
        assert_eq!(config.cli, CliSettings::default());
        assert_eq!(config.network.security_group_name, "meltano-db-sg");
        assert_eq!(config.tools, ToolSettings::default());
    }

    #[test]
    fn test_with_home_layout() {
        let config = ResolvedConfig::with_home(PathBuf::from("/srv/fd"));
        assert_eq!(config.cache_dir, PathBuf::from("/srv/fd/cache"));
        assert_eq!(config.runs_dir(), PathBuf::from("/srv/fd/runs"));
    }

    #[test]
    fn test_resolve_relative_path() {
        let base = PathBuf::from("/home/user/project/.flowdeploy");

        assert_eq!(
            resolve_path(&base, "./state"),
            PathBuf::from("/home/user/project/.flowdeploy/state")
        );
        assert_eq!(
            resolve_path(&base, "/absolute/path"),
            PathBuf::from("/absolute/path")
        );
    }
}
