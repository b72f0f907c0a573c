use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_API_URL: &str = "http://localhost";
pub const DEFAULT_API_PORT: u16 = 9090;
pub const DEFAULT_TITLE: &str = "FAIR EVA";
pub const DEFAULT_LOGO_URL: &str = "https://digital.csic.es";
pub const DEFAULT_LOGO_IMAGE: &str = "logo_fair_eosc.svg";
pub const DEFAULT_SAMPLE_FILE: &str = "data/salida_new.json";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CHART_JS_URL: &str = "https://cdn.jsdelivr.net/npm/chart.js";

/// Runtime configuration for the web client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Host name or IP address to bind; resolved at startup.
    pub host: String,
    pub port: u16,
    /// Base URL of the FAIR EVA API, without port or trailing slash.
    pub api_url: String,
    pub api_port: u16,
    pub title: String,
    pub logo_url: String,
    /// File name under `static/img`.
    pub logo_image: String,
    /// Load evaluations from `sample_file` instead of calling the API.
    pub dev_mode: bool,
    pub sample_file: PathBuf,
    pub api_timeout: Duration,
    /// Where pages load Chart.js from. `None` disables the aggregate chart.
    pub chart_js_url: Option<String>,
    pub enable_cors: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_vars(|_| None).expect("defaults parse")
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary variable lookup; every missing or
    /// unparseable value takes its documented default.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let (host, port) = match var("FAIR_EVA_BIND_ADDR") {
            Some(raw) => split_host_port(&raw).context("failed to parse FAIR_EVA_BIND_ADDR")?,
            None => (DEFAULT_HOST.to_string(), DEFAULT_PORT),
        };

        let api_url = var("FAIR_EVA_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_port = var("FAIR_EVA_API_PORT")
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_API_PORT);
        let title = var("FAIR_EVA_TITLE").unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let logo_url = var("FAIR_EVA_LOGO_URL").unwrap_or_else(|| DEFAULT_LOGO_URL.to_string());
        let logo_image =
            var("FAIR_EVA_LOGO_IMAGE").unwrap_or_else(|| DEFAULT_LOGO_IMAGE.to_string());
        let dev_mode = var("FAIR_EVA_DEV").map(|v| is_truthy(&v)).unwrap_or(false);
        let sample_file = PathBuf::from(
            var("FAIR_EVA_SAMPLE_FILE").unwrap_or_else(|| DEFAULT_SAMPLE_FILE.to_string()),
        );
        let api_timeout = var("FAIR_EVA_API_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_API_TIMEOUT_SECS));
        let chart_js_url = match var("FAIR_EVA_CHART_JS_URL") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v),
            None => Some(DEFAULT_CHART_JS_URL.to_string()),
        };
        let enable_cors = var("FAIR_EVA_ENABLE_CORS")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            api_url,
            api_port,
            title,
            logo_url,
            logo_image,
            dev_mode,
            sample_file,
            api_timeout,
            chart_js_url,
            enable_cors,
        })
    }

    /// Apply command-line overrides on top of the environment values.
    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(host) = &overrides.host {
            self.host = host.clone();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(api_url) = &overrides.api_url {
            self.api_url = api_url.clone();
        }
        if let Some(api_port) = overrides.api_port {
            self.api_port = api_port;
        }
        if let Some(title) = &overrides.title {
            self.title = title.clone();
        }
        if let Some(logo_url) = &overrides.logo_url {
            self.logo_url = logo_url.clone();
        }
        if let Some(logo_image) = &overrides.logo_image {
            self.logo_image = logo_image.clone();
        }
        if overrides.dev {
            self.dev_mode = true;
        }
        if let Some(sample_file) = &overrides.sample_file {
            self.sample_file = sample_file.clone();
        }
    }

    /// Resolve `host:port` to the first socket address it names.
    pub async fn resolve_bind_addr(&self) -> anyhow::Result<SocketAddr> {
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("failed to resolve bind host {}", self.host))?
            .next()
            .ok_or_else(|| anyhow::anyhow!("bind host {} resolved to no address", self.host))
    }

    /// `{api_url}:{api_port}` with any trailing slash on the URL removed.
    pub fn api_base(&self) -> String {
        format!("{}:{}", self.api_url.trim_end_matches('/'), self.api_port)
    }
}

/// Command-line overrides for [`AppConfig`].
#[derive(Debug, Default, Clone, clap::Args)]
pub struct Overrides {
    /// Host to bind
    #[arg(long)]
    pub host: Option<String>,
    /// Port for the web server
    #[arg(long)]
    pub port: Option<u16>,
    /// Base URL of the FAIR EVA API
    #[arg(long)]
    pub api_url: Option<String>,
    /// Port of the FAIR EVA API
    #[arg(long)]
    pub api_port: Option<u16>,
    /// Page title
    #[arg(long)]
    pub title: Option<String>,
    /// URL to link the logo
    #[arg(long)]
    pub logo_url: Option<String>,
    /// Logo image file in static/img
    #[arg(long)]
    pub logo_image: Option<String>,
    /// Enable development mode (load evaluations from a JSON file)
    #[arg(long)]
    pub dev: bool,
    /// Path to sample JSON file for --dev
    #[arg(long)]
    pub sample_file: Option<PathBuf>,
}

/// Split `host:port`, accepting bracketed IPv6 hosts such as `[::1]:8000`.
fn split_host_port(raw: &str) -> anyhow::Result<(String, u16)> {
    let (host, port) = raw
        .trim()
        .rsplit_once(':')
        .ok_or_else(|| anyhow::anyhow!("expected host:port, got {raw:?}"))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    if host.is_empty() {
        anyhow::bail!("missing host in {raw:?}");
    }
    let port = port
        .parse::<u16>()
        .with_context(|| format!("invalid port in {raw:?}"))?;
    Ok((host.to_string(), port))
}

fn is_truthy(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = AppConfig::from_vars(lookup(&[])).unwrap();
        assert_eq!(cfg.host, DEFAULT_HOST);
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.api_base(), "http://localhost:9090");
        assert_eq!(cfg.title, "FAIR EVA");
        assert!(!cfg.dev_mode);
        assert_eq!(cfg.api_timeout, Duration::from_secs(30));
        assert_eq!(cfg.chart_js_url.as_deref(), Some(DEFAULT_CHART_JS_URL));
    }

    #[test]
    fn unparseable_numbers_fall_back() {
        let cfg = AppConfig::from_vars(lookup(&[
            ("FAIR_EVA_API_PORT", "not-a-port"),
            ("FAIR_EVA_API_TIMEOUT_SECS", "-3"),
            ("FAIR_EVA_DEV", "1"),
            ("FAIR_EVA_API_URL", "https://eva.example.org/"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_port, DEFAULT_API_PORT);
        assert_eq!(cfg.api_timeout, Duration::from_secs(30));
        assert!(cfg.dev_mode);
        assert_eq!(cfg.api_base(), "https://eva.example.org:9090");
    }

    #[test]
    fn bad_bind_addr_is_an_error() {
        assert!(AppConfig::from_vars(lookup(&[("FAIR_EVA_BIND_ADDR", "nowhere")])).is_err());
    }

    #[test]
    fn empty_chart_url_disables_chart() {
        let cfg = AppConfig::from_vars(lookup(&[("FAIR_EVA_CHART_JS_URL", "")])).unwrap();
        assert!(cfg.chart_js_url.is_none());
    }

    #[test]
    fn overrides_win_over_env() {
        let mut cfg = AppConfig::from_vars(lookup(&[("FAIR_EVA_TITLE", "From env")])).unwrap();
        cfg.apply_overrides(&Overrides {
            host: Some("localhost".into()),
            port: Some(9000),
            title: Some("From flag".into()),
            dev: true,
            sample_file: Some(PathBuf::from("/tmp/sample.json")),
            ..Overrides::default()
        });
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.port, 9000);
        assert_eq!(cfg.title, "From flag");
        assert!(cfg.dev_mode);
        assert_eq!(cfg.sample_file, PathBuf::from("/tmp/sample.json"));
    }

    #[test]
    fn bind_addr_accepts_hostnames_and_ipv6() {
        let cfg = AppConfig::from_vars(lookup(&[("FAIR_EVA_BIND_ADDR", "localhost:8080")])).unwrap();
        assert_eq!((cfg.host.as_str(), cfg.port), ("localhost", 8080));
        let cfg = AppConfig::from_vars(lookup(&[("FAIR_EVA_BIND_ADDR", "[::1]:8081")])).unwrap();
        assert_eq!((cfg.host.as_str(), cfg.port), ("::1", 8081));
        assert!(AppConfig::from_vars(lookup(&[("FAIR_EVA_BIND_ADDR", ":8080")])).is_err());
        assert!(AppConfig::from_vars(lookup(&[("FAIR_EVA_BIND_ADDR", "localhost:http")])).is_err());
    }

    #[tokio::test]
    async fn resolves_hostname_bind_addr() {
        let cfg = AppConfig {
            host: "localhost".into(),
            port: 8123,
            ..AppConfig::default()
        };
        let addr = cfg.resolve_bind_addr().await.unwrap();
        assert!(addr.ip().is_loopback());
        assert_eq!(addr.port(), 8123);
    }
}
