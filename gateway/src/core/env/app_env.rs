use dotenvy::dotenv;
use std::env;

const DEFAULT_UPSTREAM_URL: &str = "http://localhost:8080";
const REQUIRED_FORWARD_HEADERS: [&str; 2] = ["authorization", "content-type"];

#[derive(Debug, Clone)]
pub struct AppEnv {
    pub app_port: u16,
    pub mount_path: String,
    pub upstream: UpstreamConfig,
    pub tls_enabled: bool,
    pub tls: TlsConfig,
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub forward_headers: Vec<String>,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
}

impl Default for AppEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl AppEnv {
    pub fn new() -> Self {
        dotenv().ok();

        let forward_headers = env::var("FORWARD_HEADERS")
            .map(|val| Self::parse_header_list(&val))
            .unwrap_or_else(|_| Self::parse_header_list("authorization,content-type,accept"));

        Self {
            app_port: Self::get_env("APP_PORT", 3000),
            mount_path: Self::get_str_env("MOUNT_PATH", "api".to_owned())
                .trim_matches('/')
                .to_string(),
            upstream: UpstreamConfig {
                base_url: Self::get_str_env("API_URL", DEFAULT_UPSTREAM_URL.to_owned())
                    .trim_end_matches('/')
                    .to_string(),
                timeout_secs: Self::get_num_env("UPSTREAM_TIMEOUT_SECS", 10),
                forward_headers,
                max_body_bytes: Self::get_num_env("MAX_BODY_BYTES", 1_048_576) as usize, // 1 MiB
            },
            tls_enabled: env::var("TLS_ENABLED")
                .unwrap_or_else(|_| "false".into())
                .to_lowercase()
                == "true",
            tls: TlsConfig {
                cert_path: Self::get_str_env("TLS_CERT_PATH", "certificates/cert.pem".to_owned()),
                key_path: Self::get_str_env("TLS_KEY_PATH", "certificates/key.pem".to_owned()),
            },
        }
    }

    /// Lower-cases and de-duplicates a comma separated header list.
    /// Authorization and Content-Type are always kept.
    pub fn parse_header_list(raw: &str) -> Vec<String> {
        let mut headers: Vec<String> = REQUIRED_FORWARD_HEADERS
            .iter()
            .map(|h| h.to_string())
            .collect();

        for name in raw.split(',').map(|s| s.trim().to_lowercase()) {
            if !name.is_empty() && !headers.contains(&name) {
                headers.push(name);
            }
        }

        headers
    }

    fn get_env(var: &str, default: u16) -> u16 {
        env::var(var)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_num_env(var: &str, default: u64) -> u64 {
        env::var(var)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_str_env(var: &str, default: String) -> String {
        env::var(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(default)
    }
}
