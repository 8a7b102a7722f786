//! Session configuration and environment fallback.
//!
//! Declared settings come from the orchestration host (or the CLI). Any field
//! left unset is looked up in the environment:
//!
//! | field            | variable             |
//! |------------------|----------------------|
//! | `server_url`     | `PPS_SERVER_URL`     |
//! | `username`       | `PPS_USERNAME`       |
//! | `password`       | `PPS_PASSWORD`       |
//! | `otp`            | `PPS_OTP`            |
//! | `otp_provider`   | `PPS_OTP_PROVIDER`   |
//! | `allow_insecure` | `PPS_ALLOW_INSECURE` |
//!
//! A declared value always wins, even an empty one. Empty variables count as
//! unset.

use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::api::client::{ClientOptions, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::api::{OtpChallenge, PasswordGrant};
use crate::error::ConfigError;

pub const ENV_SERVER_URL: &str = "PPS_SERVER_URL";
pub const ENV_USERNAME: &str = "PPS_USERNAME";
pub const ENV_PASSWORD: &str = "PPS_PASSWORD";
pub const ENV_OTP: &str = "PPS_OTP";
pub const ENV_OTP_PROVIDER: &str = "PPS_OTP_PROVIDER";
pub const ENV_ALLOW_INSECURE: &str = "PPS_ALLOW_INSECURE";

/// Scheme assumed when the server URL has none.
const DEFAULT_SCHEME: &str = "https";

/// Declared session settings; `None` means "fall back to the environment".
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub server_url: Option<String>,
    pub username: Option<String>,
    #[serde(default, skip_serializing)]
    pub password: Option<String>,
    #[serde(default, skip_serializing)]
    pub otp: Option<String>,
    pub otp_provider: Option<String>,
    pub allow_insecure: Option<bool>,
    /// Per-request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Settings after environment fallback, ready to open a session.
#[derive(Clone)]
pub struct ResolvedConfig {
    pub base_url: Url,
    pub grant: PasswordGrant,
    pub client: ClientOptions,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("server_url", &self.server_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("otp", &self.otp.as_ref().map(|_| "<redacted>"))
            .field("otp_provider", &self.otp_provider)
            .field("allow_insecure", &self.allow_insecure)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field("base_url", &self.base_url.as_str())
            .field("username", &self.grant.username)
            .field("otp", &self.grant.otp.is_some())
            .field("client", &self.client)
            .finish()
    }
}

impl SessionConfig {
    /// Resolve against the process environment.
    pub fn resolve(&self) -> Result<ResolvedConfig, ConfigError> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve against an arbitrary variable lookup.
    pub fn resolve_with<F>(&self, env: F) -> Result<ResolvedConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |declared: &Option<String>, name: &str| -> String {
            match declared {
                Some(value) => value.clone(),
                None => env(name).unwrap_or_default(),
            }
        };

        let allow_insecure = match self.allow_insecure {
            Some(flag) => flag,
            None => match env(ENV_ALLOW_INSECURE).filter(|v| !v.is_empty()) {
                Some(raw) => parse_bool(&raw).ok_or(ConfigError::InvalidBool {
                    env: ENV_ALLOW_INSECURE,
                    value: raw,
                })?,
                None => false,
            },
        };

        let server_url = lookup(&self.server_url, ENV_SERVER_URL);
        if server_url.is_empty() {
            return Err(ConfigError::Missing {
                field: "server_url",
                env: ENV_SERVER_URL,
            });
        }

        let username = lookup(&self.username, ENV_USERNAME);
        if username.is_empty() {
            return Err(ConfigError::Missing {
                field: "username",
                env: ENV_USERNAME,
            });
        }

        let password = lookup(&self.password, ENV_PASSWORD);
        if password.is_empty() {
            return Err(ConfigError::Missing {
                field: "password",
                env: ENV_PASSWORD,
            });
        }

        let otp_code = lookup(&self.otp, ENV_OTP);
        let otp_provider = lookup(&self.otp_provider, ENV_OTP_PROVIDER);
        let otp = match (otp_code.is_empty(), otp_provider.is_empty()) {
            (true, true) => None,
            (true, false) => {
                return Err(ConfigError::Missing {
                    field: "otp",
                    env: ENV_OTP,
                })
            }
            (false, provider_missing) => Some(OtpChallenge {
                code: otp_code,
                provider: (!provider_missing).then_some(otp_provider),
            }),
        };

        let base_url = parse_base_url(&server_url)?;
        let timeout = Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS));

        Ok(ResolvedConfig {
            base_url,
            grant: PasswordGrant {
                username,
                password,
                otp,
            },
            client: ClientOptions {
                allow_insecure,
                timeout,
            },
        })
    }
}

/// Boolean spellings accepted in `PPS_ALLOW_INSECURE`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// Parse the server URL, assuming `https` when no scheme is given.
pub fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let candidate = if raw.contains("://") {
        raw.to_string()
    } else {
        format!("{}://{}", DEFAULT_SCHEME, raw)
    };

    let invalid = |reason: String| ConfigError::InvalidUrl {
        value: raw.to_string(),
        reason,
    };

    let url = Url::parse(&candidate).map_err(|e| invalid(e.to_string()))?;
    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn full_env() -> impl Fn(&str) -> Option<String> {
        env_of(&[
            (ENV_SERVER_URL, "pps.example.com:10001"),
            (ENV_USERNAME, "env-user"),
            (ENV_PASSWORD, "env-pass"),
        ])
    }

    #[test]
    fn test_resolve_from_environment() {
        let resolved = SessionConfig::default().resolve_with(full_env()).unwrap();
        assert_eq!(resolved.base_url.as_str(), "https://pps.example.com:10001/");
        assert_eq!(resolved.grant.username, "env-user");
        assert_eq!(resolved.grant.password, "env-pass");
        assert!(resolved.grant.otp.is_none());
        assert!(!resolved.client.allow_insecure);
        assert_eq!(resolved.client.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_declared_value_wins() {
        let config = SessionConfig {
            username: Some("declared".to_string()),
            allow_insecure: Some(false),
            ..Default::default()
        };
        let env = env_of(&[
            (ENV_SERVER_URL, "https://pps.example.com"),
            (ENV_USERNAME, "env-user"),
            (ENV_PASSWORD, "env-pass"),
            (ENV_ALLOW_INSECURE, "true"),
        ]);
        let resolved = config.resolve_with(env).unwrap();
        assert_eq!(resolved.grant.username, "declared");
        assert!(!resolved.client.allow_insecure);
    }

    #[test]
    fn test_declared_empty_value_is_missing() {
        let config = SessionConfig {
            password: Some(String::new()),
            ..Default::default()
        };
        let err = config.resolve_with(full_env()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { field: "password", .. }));
    }

    #[test]
    fn test_missing_fields_named_in_order() {
        let err = SessionConfig::default().resolve_with(env_of(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { field: "server_url", env: ENV_SERVER_URL }));

        let err = SessionConfig::default()
            .resolve_with(env_of(&[(ENV_SERVER_URL, "h")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { field: "username", .. }));
        assert!(err.to_string().contains(ENV_USERNAME));

        let err = SessionConfig::default()
            .resolve_with(env_of(&[(ENV_SERVER_URL, "h"), (ENV_USERNAME, "u"), (ENV_PASSWORD, "")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { field: "password", .. }));
    }

    #[test]
    fn test_allow_insecure_from_environment() {
        let env = env_of(&[
            (ENV_SERVER_URL, "h"),
            (ENV_USERNAME, "u"),
            (ENV_PASSWORD, "p"),
            (ENV_ALLOW_INSECURE, "1"),
        ]);
        let resolved = SessionConfig::default().resolve_with(env).unwrap();
        assert!(resolved.client.allow_insecure);
    }

    #[test]
    fn test_allow_insecure_unparseable() {
        let env = env_of(&[
            (ENV_SERVER_URL, "h"),
            (ENV_USERNAME, "u"),
            (ENV_PASSWORD, "p"),
            (ENV_ALLOW_INSECURE, "yes"),
        ]);
        let err = SessionConfig::default().resolve_with(env).unwrap_err();
        match err {
            ConfigError::InvalidBool { env, value } => {
                assert_eq!(env, ENV_ALLOW_INSECURE);
                assert_eq!(value, "yes");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_otp_pair() {
        let config = SessionConfig {
            otp: Some("123456".to_string()),
            otp_provider: Some("TOTP".to_string()),
            ..Default::default()
        };
        let resolved = config.resolve_with(full_env()).unwrap();
        assert_eq!(
            resolved.grant.otp,
            Some(OtpChallenge {
                code: "123456".to_string(),
                provider: Some("TOTP".to_string()),
            })
        );
    }

    #[test]
    fn test_otp_provider_without_code() {
        let config = SessionConfig {
            otp_provider: Some("TOTP".to_string()),
            ..Default::default()
        };
        let err = config.resolve_with(full_env()).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { field: "otp", .. }));
    }

    #[test]
    fn test_parse_bool_spellings() {
        for raw in ["1", "t", "T", "TRUE", "true", "True"] {
            assert_eq!(parse_bool(raw), Some(true), "{raw}");
        }
        for raw in ["0", "f", "F", "FALSE", "false", "False"] {
            assert_eq!(parse_bool(raw), Some(false), "{raw}");
        }
        assert_eq!(parse_bool("yes"), None);
        assert_eq!(parse_bool("tRuE"), None);
    }

    #[test]
    fn test_parse_base_url() {
        assert_eq!(
            parse_base_url("http://localhost:8080").unwrap().as_str(),
            "http://localhost:8080/"
        );
        assert!(matches!(
            parse_base_url("ftp://example.com"),
            Err(ConfigError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_base_url("https://"),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_debug_hides_password() {
        let resolved = SessionConfig::default().resolve_with(full_env()).unwrap();
        assert!(!format!("{:?}", resolved).contains("env-pass"));

        let declared = SessionConfig {
            password: Some("declared-pass".to_string()),
            otp: Some("123456".to_string()),
            ..SessionConfig::default()
        };
        let shown = format!("{:?}", declared);
        assert!(!shown.contains("declared-pass"));
        assert!(!shown.contains("123456"));
    }
}
