use crate::idology::{IdologyConfig, KYC_ENDPOINT};
use crate::trulioo::TruliooConfig;
use std::time::Duration;

/// Service configuration, loaded by the binary and handed to the providers.
///
/// The library itself never reads the environment; only `from_env` does.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    /// Deadline for every provider call; `None` leaves the HTTP client default.
    pub http_timeout: Option<Duration>,
    /// Outbound proxy for provider calls (providers whitelist caller IPs).
    pub proxy: Option<String>,
    pub idology: Option<IdologyConfig>,
    pub trulioo: Option<TruliooConfig>,
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn validate_url(name: &str, url: String) -> anyhow::Result<String> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        anyhow::bail!("{} must start with http:// or https://", name);
    }
    Ok(url)
}

fn required_var(name: &str) -> anyhow::Result<String> {
    optional_var(name)
        .ok_or_else(|| anyhow::anyhow!("{} environment variable required", name))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?;

        let http_timeout = optional_var("HTTP_TIMEOUT_SECS")
            .map(|secs| {
                secs.parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a whole number"))
            })
            .transpose()?;

        let proxy = optional_var("KYC_PROXY")
            .map(|url| validate_url("KYC_PROXY", url))
            .transpose()?;

        // A provider is enabled by configuring its credentials
        let idology = match optional_var("IDOLOGY_USERNAME") {
            Some(username) => Some(IdologyConfig {
                host: validate_url(
                    "IDOLOGY_HOST",
                    optional_var("IDOLOGY_HOST").unwrap_or_else(|| KYC_ENDPOINT.to_string()),
                )?,
                username,
                password: required_var("IDOLOGY_PASSWORD")?,
                use_summary_result: optional_var("IDOLOGY_USE_SUMMARY_RESULT")
                    .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                    .unwrap_or(false),
            }),
            None => None,
        };

        let trulioo = match optional_var("TRULIOO_TOKEN") {
            Some(token) => Some(TruliooConfig {
                host: validate_url("TRULIOO_HOST", required_var("TRULIOO_HOST")?)?,
                token,
                consents: optional_var("TRULIOO_CONSENTS")
                    .map(|list| {
                        list.split(',')
                            .map(|c| c.trim().to_string())
                            .filter(|c| !c.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            }),
            None => None,
        };

        if idology.is_none() && trulioo.is_none() {
            anyhow::bail!("Configure at least one provider (IDOLOGY_USERNAME or TRULIOO_TOKEN)");
        }

        let config = Self {
            port,
            http_timeout,
            proxy,
            idology,
            trulioo,
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        if let Some(ref idology) = config.idology {
            tracing::info!("IDology enabled: {}", idology.host);
        }
        if let Some(ref trulioo) = config.trulioo {
            tracing::info!(
                "Trulioo enabled: {} ({} consents)",
                trulioo.host,
                trulioo.consents.len()
            );
        }
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }
}
