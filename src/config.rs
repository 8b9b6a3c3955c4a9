use std::{
    env, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use dirs::config_dir;
use log::LevelFilter;
use serde::Deserialize;

use crate::{
    model::Priority,
    table::{parse_columns, Column},
};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rpc: RpcConfig,
    pub poll_interval: Duration,
    pub log_level: LevelFilter,
    pub columns: Vec<Column>,
}

#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
    pub verify_ssl: bool,
    pub user_agent: String,
    pub url: Option<String>,
}

impl RpcConfig {
    pub fn endpoint(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        let mut path = self.path.clone();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        format!("{}://{}:{}{}", self.scheme, self.host, self.port, path)
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse the files of Transmission torrents", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub host: Option<String>,
    #[arg(long)]
    pub port: Option<u16>,
    #[arg(long)]
    pub path: Option<String>,
    #[arg(long)]
    pub username: Option<String>,
    #[arg(long)]
    pub password: Option<String>,
    #[arg(long)]
    pub timeout: Option<f64>,
    #[arg(long)]
    pub poll_interval: Option<f64>,
    #[arg(long, action = ArgAction::SetTrue)]
    pub tls: bool,
    #[arg(long = "no-tls", action = ArgAction::SetTrue)]
    pub no_tls: bool,
    #[arg(long)]
    pub insecure: bool,
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub log_level: Option<String>,
    /// Comma separated columns: name, size, downloaded, progress, priority
    #[arg(long, global = true, value_delimiter = ',')]
    pub columns: Option<Vec<String>>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List the files of matching torrents
    Ls {
        /// File filter, e.g. "wanted & size>100M" or "name~sample"
        filter: Option<String>,
        /// Only torrents whose name contains this text
        #[arg(short, long)]
        torrents: Option<String>,
    },
    /// Change the download priority of matching files
    Priority {
        /// off, low, normal or high
        level: Priority,
        /// File filter selecting the files to change
        filter: Option<String>,
        /// Only torrents whose name contains this text
        #[arg(short, long)]
        torrents: Option<String>,
    },
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    rpc: Option<FileRpcConfig>,
    poll_interval: Option<f64>,
    log_level: Option<String>,
    display: Option<FileDisplayConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct FileDisplayConfig {
    columns: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct FileRpcConfig {
    url: Option<String>,
    scheme: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    path: Option<String>,
    username: Option<String>,
    password: Option<String>,
    timeout: Option<f64>,
    tls: Option<bool>,
    verify_ssl: Option<bool>,
    user_agent: Option<String>,
}

/// Looks up an environment variable by name.
type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub fn build_config(cli: &Cli) -> Result<AppConfig> {
    build_config_with_env(cli, &|name: &str| env::var(name).ok())
}

fn build_config_with_env(cli: &Cli, env: EnvLookup) -> Result<AppConfig> {
    let file_config = load_file_config(cli.config.as_deref(), env)?;
    let rpc_file = file_config.as_ref().and_then(|cfg| cfg.rpc.as_ref());

    let url = cli
        .url
        .clone()
        .or_else(|| env("TRANSMISSION_URL"))
        .or_else(|| rpc_file.and_then(|cfg| cfg.url.clone()));

    let host = cli
        .host
        .clone()
        .or_else(|| env("TRANSMISSION_HOST"))
        .or_else(|| rpc_file.and_then(|cfg| cfg.host.clone()))
        .unwrap_or_else(|| "localhost".to_string());

    let port = cli
        .port
        .or_else(|| env_var_parse(env, "TRANSMISSION_PORT"))
        .or_else(|| rpc_file.and_then(|cfg| cfg.port))
        .unwrap_or(9091);

    let path = cli
        .path
        .clone()
        .or_else(|| env("TRANSMISSION_RPC_PATH"))
        .or_else(|| rpc_file.and_then(|cfg| cfg.path.clone()))
        .unwrap_or_else(|| "/transmission/rpc".to_string());

    let username = cli
        .username
        .clone()
        .or_else(|| env("TRANSMISSION_USERNAME"))
        .or_else(|| rpc_file.and_then(|cfg| cfg.username.clone()));

    let password = cli
        .password
        .clone()
        .or_else(|| env("TRANSMISSION_PASSWORD"))
        .or_else(|| rpc_file.and_then(|cfg| cfg.password.clone()));

    let timeout_secs = cli
        .timeout
        .or_else(|| env_float(env, "TRANSMISSION_TIMEOUT"))
        .or_else(|| rpc_file.and_then(|cfg| cfg.timeout))
        .unwrap_or(10.0);

    if timeout_secs <= 0.0 {
        anyhow::bail!("timeout must be positive");
    }

    let poll_secs = cli
        .poll_interval
        .or_else(|| env_float(env, "TRANSMISSION_POLL_INTERVAL"))
        .or_else(|| file_config.as_ref().and_then(|cfg| cfg.poll_interval))
        .unwrap_or(3.0);

    if poll_secs < 0.0 {
        anyhow::bail!("poll interval cannot be negative");
    }

    let tls_flag = if cli.tls {
        Some(true)
    } else if cli.no_tls {
        Some(false)
    } else {
        None
    };

    let tls_env = env_bool(env, "TRANSMISSION_TLS");
    let use_tls = tls_flag
        .or(tls_env)
        .or_else(|| rpc_file.and_then(|cfg| cfg.tls))
        .unwrap_or(false);

    let verify_env = env_bool(env, "TRANSMISSION_VERIFY_SSL");
    let mut verify_ssl = rpc_file.and_then(|cfg| cfg.verify_ssl).unwrap_or(true);
    if let Some(value) = verify_env {
        verify_ssl = value;
    }
    if cli.insecure {
        verify_ssl = false;
    }

    let scheme = rpc_file
        .and_then(|cfg| cfg.scheme.clone())
        .unwrap_or_else(|| if use_tls { "https" } else { "http" }.to_string());

    let user_agent = env("TRANSMISSION_USER_AGENT")
        .or_else(|| rpc_file.and_then(|cfg| cfg.user_agent.clone()))
        .unwrap_or_else(|| "transmission-files".to_string());

    let log_level_str = cli
        .log_level
        .clone()
        .or_else(|| env("TRANSMISSION_LOG_LEVEL"))
        .or_else(|| file_config.as_ref().and_then(|cfg| cfg.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let log_level = LevelFilter::from_str(&log_level_str).unwrap_or(LevelFilter::Info);

    let column_names = cli
        .columns
        .clone()
        .or_else(|| env_list(env, "TRANSMISSION_FILES_COLUMNS"))
        .or_else(|| {
            file_config
                .as_ref()
                .and_then(|cfg| cfg.display.as_ref())
                .and_then(|display| display.columns.clone())
        });
    let columns = match column_names {
        Some(names) => parse_columns(&names).map_err(anyhow::Error::msg)?,
        None => Column::defaults(),
    };

    Ok(AppConfig {
        rpc: RpcConfig {
            scheme,
            host,
            port,
            path,
            username,
            password,
            timeout: Duration::from_secs_f64(timeout_secs),
            verify_ssl,
            user_agent,
            url,
        },
        poll_interval: Duration::from_secs_f64(poll_secs.max(0.0)),
        log_level,
        columns,
    })
}

fn load_file_config(path: Option<&Path>, env: EnvLookup) -> Result<Option<FileConfig>> {
    if let Some(path) = path {
        return read_file_config(path);
    }

    if let Some(env_path) = env("TRANSMISSION_FILES_CONFIG") {
        return read_file_config(Path::new(&env_path));
    }

    if let Some(dir) = config_dir() {
        let path = dir.join("transmission-files").join("config.toml");
        return read_file_config(&path);
    }

    Ok(None)
}

fn read_file_config(path: &Path) -> Result<Option<FileConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let parsed: FileConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    Ok(Some(parsed))
}

fn env_var_parse<T>(env: EnvLookup, name: &str) -> Option<T>
where
    T: FromStr,
{
    env(name).and_then(|value| value.parse().ok())
}

fn env_list(env: EnvLookup, name: &str) -> Option<Vec<String>> {
    env(name).map(|value| value.split(',').map(|part| part.trim().to_string()).collect())
}

fn env_float(env: EnvLookup, name: &str) -> Option<f64> {
    env_var_parse(env, name)
}

fn env_bool(env: EnvLookup, name: &str) -> Option<bool> {
    env(name).and_then(|value| match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["transmission-files"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn config_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn file_values_apply_when_flags_are_absent() {
        let file = config_file(
            r#"
poll_interval = 5.0
log_level = "debug"

[rpc]
host = "seedbox"
port = 9000
tls = true

[display]
columns = ["priority", "name"]
"#,
        );
        let path = file.path().to_str().unwrap().to_string();
        let config = build_config_with_env(&cli(&["--config", &path]), &no_env).unwrap();

        assert_eq!(config.rpc.host, "seedbox");
        assert_eq!(config.rpc.port, 9000);
        assert_eq!(config.rpc.endpoint(), "https://seedbox:9000/transmission/rpc");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.log_level, LevelFilter::Debug);
        assert_eq!(config.columns, vec![Column::Priority, Column::Name]);
    }

    #[test]
    fn flags_override_file_values() {
        let file = config_file("[rpc]\nhost = \"seedbox\"\n[display]\ncolumns = [\"size\"]\n");
        let path = file.path().to_str().unwrap().to_string();
        let args = cli(&[
            "--config",
            &path,
            "--host",
            "nas",
            "--columns",
            "name,progress",
        ]);
        let config = build_config_with_env(&args, &no_env).unwrap();

        assert_eq!(config.rpc.host, "nas");
        assert_eq!(config.columns, vec![Column::Name, Column::Progress]);
    }

    #[test]
    fn environment_sits_between_flags_and_file() {
        let file = config_file("[rpc]\nhost = \"seedbox\"\nport = 9000\n");
        let path = file.path().to_str().unwrap().to_string();
        let env = |name: &str| match name {
            "TRANSMISSION_HOST" => Some("nas".to_string()),
            "TRANSMISSION_PORT" => Some("9100".to_string()),
            "TRANSMISSION_FILES_COLUMNS" => Some("name, priority".to_string()),
            _ => None,
        };

        let config = build_config_with_env(&cli(&["--config", &path]), &env).unwrap();
        assert_eq!(config.rpc.host, "nas");
        assert_eq!(config.rpc.port, 9100);
        assert_eq!(config.columns, vec![Column::Name, Column::Priority]);

        let config =
            build_config_with_env(&cli(&["--config", &path, "--port", "9200"]), &env).unwrap();
        assert_eq!(config.rpc.port, 9200);
    }

    #[test]
    fn unknown_columns_are_rejected() {
        let file = config_file("");
        let path = file.path().to_str().unwrap().to_string();
        let err = build_config_with_env(
            &cli(&["--config", &path, "--columns", "name,colour"]),
            &no_env,
        )
        .unwrap_err();
        assert!(err.to_string().contains("colour"));
    }

    #[test]
    fn broken_config_file_reports_its_path() {
        let file = config_file("[rpc\nhost=");
        let path = file.path().to_str().unwrap().to_string();
        let err = build_config_with_env(&cli(&["--config", &path]), &no_env).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn subcommands_parse() {
        let parsed = cli(&["priority", "high", "name~flac", "--torrents", "album"]);
        match parsed.command {
            Some(Command::Priority {
                level,
                filter,
                torrents,
            }) => {
                assert_eq!(level, Priority::High);
                assert_eq!(filter.as_deref(), Some("name~flac"));
                assert_eq!(torrents.as_deref(), Some("album"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(cli(&[]).command.is_none());
    }
}
