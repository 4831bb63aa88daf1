use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lettre::message::Mailbox;
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8080";
const DEFAULT_FROM_ADDRESS: &str = "intercom@localhost.localdomain";
const DEFAULT_SIGNATURE: &str = "DKC Exports";
const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTransportKind {
    Smtp,
    /// Log messages instead of delivering them.
    Log,
}

impl std::fmt::Display for MailTransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MailTransportKind::Smtp => write!(f, "smtp"),
            MailTransportKind::Log => write!(f, "log"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmtpSecurity {
    #[value(alias = "starttls")]
    #[serde(alias = "start_tls")]
    StartTls,
    Tls,
    /// Unencrypted relay, for local test servers.
    #[value(alias = "none")]
    #[serde(alias = "none")]
    Plain,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub transport: MailTransportKind,
    pub from_address: String,
    pub signature: String,
    pub smtp_host: Option<String>,
    pub smtp_port: Option<u16>,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_security: SmtpSecurity,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            transport: MailTransportKind::Log,
            from_address: DEFAULT_FROM_ADDRESS.to_string(),
            signature: DEFAULT_SIGNATURE.to_string(),
            smtp_host: None,
            smtp_port: None,
            smtp_username: None,
            smtp_password: None,
            smtp_security: SmtpSecurity::StartTls,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub http_bind_address: SocketAddr,
    pub seed_file: Option<PathBuf>,
    pub mail: MailConfig,
    pub graceful_shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_bind_address: default_bind_address(),
            seed_file: None,
            mail: MailConfig::default(),
            graceful_shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    pub fn from_args(args: CliArgs) -> Result<Self> {
        let CliArgs {
            config,
            http_bind: cli_http_bind,
            seed_file: cli_seed_file,
            mail_transport: cli_mail_transport,
            from_address: cli_from_address,
            signature: cli_signature,
            smtp_host: cli_smtp_host,
            smtp_port: cli_smtp_port,
            smtp_username: cli_smtp_username,
            smtp_password: cli_smtp_password,
            smtp_security: cli_smtp_security,
        } = args;

        let file_config = if let Some(path) = config.as_ref() {
            load_config_file(path)?
        } else {
            PartialConfig::default()
        };

        let PartialConfig {
            http_bind: file_http_bind,
            seed_file: file_seed_file,
            mail_transport: file_mail_transport,
            from_address: file_from_address,
            signature: file_signature,
            smtp_host: file_smtp_host,
            smtp_port: file_smtp_port,
            smtp_username: file_smtp_username,
            smtp_password: file_smtp_password,
            smtp_security: file_smtp_security,
            graceful_shutdown_timeout_secs: file_shutdown_timeout,
        } = file_config;

        // Relative seed paths in a config file resolve against that file.
        let file_seed_file = file_seed_file.map(|path| match config.as_deref() {
            Some(config_path) if path.is_relative() => config_path
                .parent()
                .map(|dir| dir.join(&path))
                .unwrap_or(path),
            _ => path,
        });

        let smtp_host = cli_smtp_host
            .or(file_smtp_host)
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty());

        // Naming a relay implies SMTP unless a transport is chosen explicitly.
        let transport = cli_mail_transport
            .or(file_mail_transport)
            .unwrap_or(if smtp_host.is_some() {
                MailTransportKind::Smtp
            } else {
                MailTransportKind::Log
            });

        let mail = MailConfig {
            transport,
            from_address: cli_from_address
                .or(file_from_address)
                .unwrap_or_else(|| DEFAULT_FROM_ADDRESS.to_string()),
            signature: cli_signature
                .or(file_signature)
                .unwrap_or_else(|| DEFAULT_SIGNATURE.to_string()),
            smtp_host,
            smtp_port: cli_smtp_port.or(file_smtp_port),
            smtp_username: cli_smtp_username.or(file_smtp_username),
            smtp_password: cli_smtp_password.or(file_smtp_password),
            smtp_security: cli_smtp_security
                .or(file_smtp_security)
                .unwrap_or(SmtpSecurity::StartTls),
        };

        Ok(Self {
            http_bind_address: cli_http_bind.or(file_http_bind).unwrap_or_else(default_bind_address),
            seed_file: cli_seed_file.or(file_seed_file),
            mail,
            graceful_shutdown_timeout_secs: file_shutdown_timeout
                .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
        })
    }

    /// Fail-fast checks run before the server starts.
    pub fn validate(&self) -> Result<()> {
        self.mail
            .from_address
            .parse::<Mailbox>()
            .with_context(|| format!("invalid sender address {:?}", self.mail.from_address))?;

        if self.mail.transport == MailTransportKind::Smtp {
            anyhow::ensure!(
                self.mail.smtp_host.is_some(),
                "smtp mail transport requires --smtp-host"
            );
        }

        anyhow::ensure!(
            self.mail.smtp_username.is_some() == self.mail.smtp_password.is_some(),
            "smtp username and password must be provided together"
        );

        if let Some(seed) = self.seed_file.as_ref() {
            anyhow::ensure!(seed.is_file(), "seed file {:?} does not exist", seed);
        }
        Ok(())
    }
}

fn default_bind_address() -> SocketAddr {
    DEFAULT_HTTP_BIND
        .parse()
        .expect("default bind address valid")
}

#[derive(Parser, Debug, Default, Clone)]
#[command(
    name = "intercom-directory",
    about = "Phone-extension directory that mails the intercom sheet on every change",
    version
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE",
        help = "Path to a configuration file (YAML or JSON)",
        global = true
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "INTERCOM_HTTP_BIND",
        value_name = "ADDR",
        help = "HTTP bind address for the admin API (default 127.0.0.1:8080)"
    )]
    pub http_bind: Option<SocketAddr>,

    #[arg(
        long,
        env = "INTERCOM_SEED_FILE",
        value_name = "FILE",
        help = "YAML or JSON file with employees to load at startup"
    )]
    pub seed_file: Option<PathBuf>,

    #[arg(
        long,
        env = "INTERCOM_MAIL_TRANSPORT",
        value_enum,
        value_name = "TRANSPORT",
        help = "Mail transport (smtp or log)"
    )]
    pub mail_transport: Option<MailTransportKind>,

    #[arg(
        long,
        env = "INTERCOM_MAIL_FROM",
        value_name = "ADDRESS",
        help = "Sender address for notification mail"
    )]
    pub from_address: Option<String>,

    #[arg(
        long,
        env = "INTERCOM_MAIL_SIGNATURE",
        value_name = "TEXT",
        help = "Sign-off line used in notification mail"
    )]
    pub signature: Option<String>,

    #[arg(long, env = "INTERCOM_SMTP_HOST", value_name = "HOST")]
    pub smtp_host: Option<String>,

    #[arg(long, env = "INTERCOM_SMTP_PORT", value_name = "PORT")]
    pub smtp_port: Option<u16>,

    #[arg(long, env = "INTERCOM_SMTP_USERNAME", value_name = "USER")]
    pub smtp_username: Option<String>,

    #[arg(
        long,
        env = "INTERCOM_SMTP_PASSWORD",
        value_name = "PASSWORD",
        hide_env_values = true
    )]
    pub smtp_password: Option<String>,

    #[arg(long, env = "INTERCOM_SMTP_SECURITY", value_enum, value_name = "MODE")]
    pub smtp_security: Option<SmtpSecurity>,
}

#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    http_bind: Option<SocketAddr>,
    seed_file: Option<PathBuf>,
    mail_transport: Option<MailTransportKind>,
    from_address: Option<String>,
    signature: Option<String>,
    smtp_host: Option<String>,
    smtp_port: Option<u16>,
    smtp_username: Option<String>,
    smtp_password: Option<String>,
    smtp_security: Option<SmtpSecurity>,
    graceful_shutdown_timeout_secs: Option<u64>,
}

/// Parses a YAML or JSON document picked by file extension.
pub(crate) fn load_structured_file<T: serde::de::DeserializeOwned>(
    path: &Path,
    what: &str,
) -> Result<T> {
    if !path.exists() {
        anyhow::bail!("{what} file {:?} does not exist", path);
    }
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} file {:?}", path))?;
    let ext = path
        .extension()
        .and_then(|os| os.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let parsed = match ext.as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse YAML {what} {:?}", path))?,
        "json" => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse JSON {what} {:?}", path))?,
        other => anyhow::bail!("unsupported {what} extension: {other}"),
    };
    Ok(parsed)
}

fn load_config_file(path: &Path) -> Result<PartialConfig> {
    load_structured_file(path, "config")
}
