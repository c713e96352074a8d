// 配置管理
use crate::cli::Cli;
use crate::ssh::credential::PrivateKey;
use crate::utils::error::{Hop, TransferError};
use crate::utils::file::file_name;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub action_timeout: Duration,
    /// `None` leaves dial and handshake unbounded (apart from the action timeout).
    pub dial_timeout: Option<Duration>,
    pub target: Endpoint,
    pub proxy: Option<Endpoint>,
    pub request: TransferRequest,
    pub verbose: bool,
}

/// Connection and identity parameters of one SSH host.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub key: PrivateKey,
    pub fingerprint: String,
}

impl Endpoint {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upload,
    Download,
}

impl FromStr for Direction {
    type Err = TransferError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "upload" => Ok(Direction::Upload),
            "download" => Ok(Direction::Download),
            other => Err(TransferError::Config(format!(
                "direction must be either upload or download, got {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => f.write_str("upload"),
            Direction::Download => f.write_str("download"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub direction: Direction,
    pub sources: Vec<String>,
    pub destination: String,
}

impl TransferRequest {
    /// Builds a request from the newline-delimited source list. Lines are
    /// trimmed and blank lines dropped; every remaining source must end in a
    /// file name since files are flattened into `destination`.
    pub fn new(
        direction: Direction,
        sources: &str,
        destination: &str,
    ) -> Result<Self, TransferError> {
        let sources: Vec<String> = sources
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        if sources.is_empty() {
            return Err(TransferError::Config("source must list at least one file".into()));
        }
        if let Some(bad) = sources.iter().find(|s| file_name(s).is_empty()) {
            return Err(TransferError::Config(format!("source {:?} has no file name", bad)));
        }

        let destination = destination.trim();
        if destination.is_empty() {
            return Err(TransferError::Config("target must not be empty".into()));
        }

        Ok(Self {
            direction,
            sources,
            destination: destination.to_string(),
        })
    }
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Result<Self, TransferError> {
        let action_timeout = parse_duration(&cli.action_timeout)
            .map_err(|e| TransferError::Config(format!("Failed to parse action timeout: {}", e)))?;
        if action_timeout.is_zero() {
            return Err(TransferError::Config("action timeout must be positive".into()));
        }

        let dial_timeout = parse_duration(&cli.timeout)
            .map_err(|e| TransferError::Config(format!("Failed to parse timeout: {}", e)))?;
        let dial_timeout = (!dial_timeout.is_zero()).then_some(dial_timeout);

        let direction: Direction = cli.direction.as_deref().unwrap_or_default().parse()?;

        let target = Self::endpoint(
            Hop::Target,
            cli.host.as_deref(),
            &cli.port,
            cli.username.as_deref(),
            cli.key.as_deref(),
            cli.fingerprint.as_deref(),
        )?;

        let proxy = Self::proxy_endpoint(cli)?;

        let request = TransferRequest::new(
            direction,
            cli.source.as_deref().unwrap_or_default(),
            cli.target.as_deref().unwrap_or_default(),
        )?;

        Ok(Config {
            action_timeout,
            dial_timeout,
            target,
            proxy,
            request,
            verbose: cli.verbose,
        })
    }

    // 代理配置要么全部提供，要么全部省略
    fn proxy_endpoint(cli: &Cli) -> Result<Option<Endpoint>, TransferError> {
        let fields = [
            ("proxy host", cli.proxy_host.as_deref()),
            ("proxy username", cli.proxy_username.as_deref()),
            ("proxy key", cli.proxy_key.as_deref()),
            ("proxy fingerprint", cli.proxy_fingerprint.as_deref()),
        ];
        let present: Vec<&str> = fields
            .iter()
            .filter(|(_, v)| v.is_some_and(|v| !v.trim().is_empty()))
            .map(|(name, _)| *name)
            .collect();

        if present.is_empty() {
            return Ok(None);
        }
        if present.len() != fields.len() {
            let missing: Vec<&str> = fields
                .iter()
                .map(|(name, _)| *name)
                .filter(|name| !present.contains(name))
                .collect();
            return Err(TransferError::Config(format!(
                "incomplete proxy configuration, missing: {}",
                missing.join(", ")
            )));
        }

        Self::endpoint(
            Hop::Proxy,
            cli.proxy_host.as_deref(),
            &cli.proxy_port,
            cli.proxy_username.as_deref(),
            cli.proxy_key.as_deref(),
            cli.proxy_fingerprint.as_deref(),
        )
        .map(Some)
    }

    fn endpoint(
        hop: Hop,
        host: Option<&str>,
        port: &str,
        username: Option<&str>,
        key: Option<&str>,
        fingerprint: Option<&str>,
    ) -> Result<Endpoint, TransferError> {
        let host = required(hop, "host", host)?;
        let username = required(hop, "username", username)?;
        let fingerprint = required(hop, "fingerprint", fingerprint)?;
        let port = port.trim().parse::<u16>().map_err(|e| {
            TransferError::Config(format!("Failed to parse {} port {:?}: {}", hop, port, e))
        })?;
        let key = PrivateKey::parse(key.unwrap_or_default())
            .map_err(|reason| TransferError::Credential { hop, reason })?;

        Ok(Endpoint {
            host,
            port,
            username,
            key,
            fingerprint,
        })
    }
}

fn required(hop: Hop, field: &str, value: Option<&str>) -> Result<String, TransferError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(TransferError::Config(format!("{} {} must not be empty", hop, field))),
    }
}

/// Parses a duration such as `"300ms"`, `"1.5h"` or `"2h45m"`: a sequence of
/// decimal numbers, each with a unit out of `ns`, `us`, `µs`, `ms`, `s`, `m`, `h`.
/// A bare `"0"` is accepted.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("empty duration".into());
    }
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.starts_with('-') {
        return Err(format!("negative duration {:?}", input));
    }
    let mut rest = s.strip_prefix('+').unwrap_or(s);

    let mut total: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let (whole, frac) = number.split_once('.').unwrap_or((number, ""));
        if (whole.is_empty() && frac.is_empty()) || frac.contains('.') {
            return Err(format!("invalid duration {:?}", input));
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(unit_len);
        let nanos_per_unit: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3600 * 1_000_000_000,
            "" => return Err(format!("missing unit in duration {:?}", input)),
            other => return Err(format!("unknown unit {:?} in duration {:?}", other, input)),
        };

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| format!("invalid duration {:?}", input))?
        };
        let mut nanos = whole
            .checked_mul(nanos_per_unit)
            .ok_or_else(|| format!("duration {:?} overflows", input))?;
        if !frac.is_empty() {
            // 小数部分最多保留到纳秒精度
            let digits = &frac[..frac.len().min(18)];
            let scale = 10u128.pow(digits.len() as u32);
            let frac: u128 = digits.parse().map_err(|_| format!("invalid duration {:?}", input))?;
            nanos += frac * nanos_per_unit / scale;
        }
        total = total
            .checked_add(nanos)
            .ok_or_else(|| format!("duration {:?} overflows", input))?;
        rest = tail;
    }

    let secs = u64::try_from(total / 1_000_000_000)
        .map_err(|_| format!("duration {:?} overflows", input))?;
    Ok(Duration::new(secs, (total % 1_000_000_000) as u32))
}
