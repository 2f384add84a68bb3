//! Command-line interface

use acl::Action;
use clap::{Parser, Subcommand};
use reqwest::Method;

#[derive(Debug, Parser)]
#[command(name = "storefront-client")]
#[command(about = "Storefront API client with automatic token refresh")]
#[command(version)]
pub struct Cli {
    /// Config file (falls back to CONFIG_PATH, then storefront-client.toml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Path reported as the current location when a session ends
    #[arg(long, global = true)]
    pub route: Option<String>,

    /// Print Prometheus metrics to stderr on exit
    #[arg(long, global = true)]
    pub metrics: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, PartialEq, Subcommand)]
pub enum Command {
    /// Sign in and store the session
    Login {
        email: String,

        /// Keep the session as a remembered access token
        #[arg(long)]
        remember: bool,

        #[arg(long, env = "STOREFRONT_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// End the stored session
    Logout,

    /// GET an API path
    Get {
        path: String,

        /// Send without requiring a session
        #[arg(long)]
        public: bool,
    },

    /// POST a JSON body to an API path
    Post {
        path: String,

        body: serde_json::Value,

        /// Send without requiring a session
        #[arg(long)]
        public: bool,
    },

    /// DELETE an API path
    Delete { path: String },

    /// Check the stored user's permissions on an area
    Can {
        /// Dotted area key, e.g. SYSTEM.USER
        key: String,

        /// VIEW, CREATE, UPDATE or DELETE (any case)
        #[arg(required = true)]
        actions: Vec<Action>,
    },

    /// Print the stored user
    Whoami,
}

/// An API call, for commands that make one.
pub struct Call {
    pub method: Method,
    pub path: String,
    pub body: Option<serde_json::Value>,
    pub public: bool,
}

impl Command {
    pub fn into_call(self) -> Option<Call> {
        let (method, path, body, public) = match self {
            Command::Get { path, public } => (Method::GET, path, None, public),
            Command::Post { path, body, public } => (Method::POST, path, Some(body), public),
            Command::Delete { path } => (Method::DELETE, path, None, false),
            _ => return None,
        };
        Some(Call {
            method,
            path,
            body,
            public,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("storefront-client").chain(args.iter().copied()))
    }

    #[test]
    fn login_with_remember() {
        let cli = parse(&[
            "--config",
            "/etc/sf.toml",
            "login",
            "ana@example.com",
            "--remember",
            "--password",
            "hunter2",
        ])
        .unwrap();
        assert_eq!(cli.config.as_deref(), Some("/etc/sf.toml"));
        assert_eq!(
            cli.command,
            Command::Login {
                email: "ana@example.com".into(),
                remember: true,
                password: "hunter2".into(),
            }
        );
    }

    #[test]
    fn get_public_and_global_flags_after_subcommand() {
        let cli = parse(&["get", "/products", "--public", "--route", "/shop", "--metrics"]).unwrap();
        assert_eq!(cli.route.as_deref(), Some("/shop"));
        assert!(cli.metrics);

        let call = cli.command.into_call().unwrap();
        assert_eq!(call.method, Method::GET);
        assert_eq!(call.path, "/products");
        assert!(call.body.is_none());
        assert!(call.public);
    }

    #[test]
    fn post_parses_json_body() {
        let cli = parse(&["post", "/orders", r#"{"qty":2}"#]).unwrap();
        let call = cli.command.into_call().unwrap();
        assert_eq!(call.method, Method::POST);
        assert_eq!(call.body, Some(serde_json::json!({"qty": 2})));
        assert!(!call.public);
    }

    #[test]
    fn post_rejects_bad_json() {
        assert!(parse(&["post", "/orders", "{oops"]).is_err());
    }

    #[test]
    fn delete_is_never_public() {
        assert!(parse(&["delete", "/orders/1", "--public"]).is_err());
        let call = parse(&["delete", "/orders/1"]).unwrap().command.into_call().unwrap();
        assert_eq!(call.method, Method::DELETE);
        assert!(!call.public);
    }

    #[test]
    fn can_parses_actions_case_insensitively() {
        let cli = parse(&["can", "SYSTEM.USER", "view", "Delete"]).unwrap();
        assert_eq!(
            cli.command,
            Command::Can {
                key: "SYSTEM.USER".into(),
                actions: vec![Action::View, Action::Delete]
            }
        );
        assert!(cli.command.into_call().is_none());
    }

    #[test]
    fn can_requires_a_known_action() {
        assert!(parse(&["can", "SYSTEM.USER"]).is_err());
        assert!(parse(&["can", "SYSTEM.USER", "PUBLISH"]).is_err());
    }

    #[test]
    fn unknown_flags_and_commands_are_rejected() {
        assert!(parse(&["whoami", "--remember"]).is_err());
        assert!(parse(&["refresh"]).is_err());
        assert!(parse(&[]).is_err());
        assert!(parse(&["--config"]).is_err());
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
