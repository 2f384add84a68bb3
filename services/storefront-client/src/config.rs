//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! `STOREFRONT_API_URL` overrides `api.base_url` so the same file can point
//! at staging or production.

use acl::PermissionTree;
use refresh_gate::Routes;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub acl: AclConfig,
}

/// REST API endpoints
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    /// Defaults to `<base_url>/auth`
    #[serde(default)]
    pub auth_base_url: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Session storage and the routes used for login redirects
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default = "default_home_route")]
    pub home_route: String,
    #[serde(default = "default_login_route")]
    pub login_route: String,
    /// Path reported as the current location when a session ends
    #[serde(default = "default_home_route")]
    pub current_route: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            home_route: default_home_route(),
            login_route: default_login_route(),
            current_route: default_home_route(),
        }
    }
}

/// Permission tree source
#[derive(Debug, Default, Deserialize)]
pub struct AclConfig {
    /// JSON permission tree; the built-in back-office tree when unset
    #[serde(default)]
    pub tree_file: Option<PathBuf>,
}

fn default_timeout() -> u64 {
    30
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("storefront-session.json")
}

fn default_home_route() -> String {
    "/".into()
}

fn default_login_route() -> String {
    "/login".into()
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(url) = std::env::var("STOREFRONT_API_URL") {
            config.api.base_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        check_http_url("api.base_url", &self.api.base_url)?;
        if let Some(ref auth) = self.api.auth_base_url {
            check_http_url("api.auth_base_url", auth)?;
        }

        if self.api.timeout_secs == 0 {
            return Err(common::Error::invalid(
                "api.timeout_secs",
                "must be greater than 0",
            ));
        }

        for (field, route) in [
            ("session.home_route", &self.session.home_route),
            ("session.login_route", &self.session.login_route),
            ("session.current_route", &self.session.current_route),
        ] {
            if !route.starts_with('/') {
                return Err(common::Error::invalid(
                    field,
                    format!("must start with '/', got: {route}"),
                ));
            }
        }
        Ok(())
    }

    /// Auth endpoints base URL.
    pub fn auth_base_url(&self) -> String {
        match &self.api.auth_base_url {
            Some(url) => url.clone(),
            None => format!("{}/auth", self.api.base_url.trim_end_matches('/')),
        }
    }

    pub fn routes(&self) -> Routes {
        Routes {
            home: self.session.home_route.clone(),
            login: self.session.login_route.clone(),
        }
    }

    pub fn permission_tree(&self) -> acl::Result<PermissionTree> {
        match &self.acl.tree_file {
            Some(path) => PermissionTree::from_file(path),
            None => Ok(PermissionTree::default()),
        }
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("storefront-client.toml")
    }
}

fn check_http_url(field: &'static str, url: &str) -> common::Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(common::Error::invalid(
            field,
            format!("must start with http:// or https://, got: {url}"),
        ))
    }
}
