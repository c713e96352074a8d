// 命令行参数解析，每个参数都可以通过环境变量提供
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "scp-jump")]
#[command(about = "Copy files over SSH/SCP, optionally through a jump host, with pinned host keys")]
#[command(version)]
pub struct Cli {
    /// Deadline for the whole action, e.g. "10m" or "1m30s"
    #[arg(long, env = "ACTION_TIMEOUT", default_value = "10m")]
    pub action_timeout: String,

    /// Timeout for each dial and SSH handshake ("0" disables it)
    #[arg(long, env = "TIMEOUT", default_value = "30s")]
    pub timeout: String,

    /// Transfer direction: upload or download
    #[arg(short, long, env = "DIRECTION")]
    pub direction: Option<String>,

    /// Target SSH host
    #[arg(short = 'H', long, env = "HOST")]
    pub host: Option<String>,

    /// Target SSH port
    #[arg(short, long, env = "PORT", default_value = "22")]
    pub port: String,

    /// Target SSH username
    #[arg(short, long, env = "USERNAME")]
    pub username: Option<String>,

    /// Private key material for the target (not a path)
    #[arg(short, long, env = "KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Expected SHA256 host key fingerprint of the target, e.g. "SHA256:..."
    #[arg(short, long, env = "FINGERPRINT")]
    pub fingerprint: Option<String>,

    /// Jump host used to reach the target
    #[arg(long, env = "PROXY_HOST")]
    pub proxy_host: Option<String>,

    /// Jump host SSH port
    #[arg(long, env = "PROXY_PORT", default_value = "22")]
    pub proxy_port: String,

    /// Jump host SSH username
    #[arg(long, env = "PROXY_USERNAME")]
    pub proxy_username: Option<String>,

    /// Private key material for the jump host
    #[arg(long, env = "PROXY_KEY", hide_env_values = true)]
    pub proxy_key: Option<String>,

    /// Expected SHA256 host key fingerprint of the jump host
    #[arg(long, env = "PROXY_FINGERPRINT")]
    pub proxy_fingerprint: Option<String>,

    /// Newline separated list of files to transfer
    #[arg(short, long, env = "SOURCE")]
    pub source: Option<String>,

    /// Destination directory; files are placed directly inside it
    #[arg(short, long, env = "TARGET")]
    pub target: Option<String>,

    /// Verbose output
    #[arg(short, long, env = "VERBOSE")]
    pub verbose: bool,
}
