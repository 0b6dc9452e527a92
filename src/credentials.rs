//! Store credential resolution.
//!
//! Resolved once at the command boundary and handed to the API client; the
//! sync engine never looks at the process environment.

use crate::config::Config;
use crate::error::{Result, SyncError};
use std::fmt;

pub const SITE_ENV: &str = "SHOPIFY_FLAG_STORE";
pub const TOKEN_ENV: &str = "SHOPIFY_ACCESS_TOKEN";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Normalized shop domain, e.g. `my-shop.myshopify.com`
    pub site: String,
    pub access_token: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("site", &self.site)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Values given explicitly on the command line.
#[derive(Debug, Default, Clone)]
pub struct ExplicitCredentials {
    pub site: Option<String>,
    pub access_token: Option<String>,
}

impl Credentials {
    /// Resolve credentials: explicit options, then environment, then config file.
    ///
    /// `env` is injected so callers (and tests) decide where variables come from.
    pub fn resolve<F>(explicit: &ExplicitCredentials, env: F, config: &Config) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let site = non_empty(explicit.site.clone())
            .or_else(|| non_empty(env(SITE_ENV)))
            .or_else(|| non_empty(config.site.clone()));
        let access_token = non_empty(explicit.access_token.clone())
            .or_else(|| non_empty(env(TOKEN_ENV)))
            .or_else(|| non_empty(config.access_token.clone()));

        match (site, access_token) {
            (Some(site), Some(access_token)) => Ok(Self {
                site: normalize_site(&site),
                access_token: access_token.trim().to_string(),
            }),
            (site, token) => {
                let mut missing = Vec::new();
                if site.is_none() {
                    missing.push("store site");
                }
                if token.is_none() {
                    missing.push("access token");
                }
                Err(SyncError::Config(format!(
                    "missing {}. Provide them with --site/--access-token, \
                     the {} and {} environment variables, \
                     or `site`/`access_token` in the config file",
                    missing.join(" and "),
                    SITE_ENV,
                    TOKEN_ENV
                )))
            }
        }
    }
}

/// Strip scheme and trailing slashes; expand a bare shop name to its myshopify domain.
pub fn normalize_site(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_scheme = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or(trimmed);
    let host = without_scheme.trim_end_matches('/');
    if host.contains('.') || host.contains(':') {
        host.to_string()
    } else {
        format!("{}.myshopify.com", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_explicit_wins_over_env() {
        let explicit = ExplicitCredentials {
            site: Some("flag-shop".into()),
            access_token: Some("flag-token".into()),
        };
        let env = env_from(&[(SITE_ENV, "env-shop"), (TOKEN_ENV, "env-token")]);
        let creds = Credentials::resolve(&explicit, env, &Config::default()).unwrap();
        assert_eq!(creds.site, "flag-shop.myshopify.com");
        assert_eq!(creds.access_token, "flag-token");
    }

    #[test]
    fn test_env_then_config() {
        let config = Config {
            site: Some("config-shop.myshopify.com".into()),
            access_token: Some("config-token".into()),
            ..Default::default()
        };
        let env = env_from(&[(TOKEN_ENV, "env-token")]);
        let creds = Credentials::resolve(&ExplicitCredentials::default(), env, &config).unwrap();
        assert_eq!(creds.site, "config-shop.myshopify.com");
        assert_eq!(creds.access_token, "env-token");
    }

    #[test]
    fn test_missing_lists_every_method() {
        let err = Credentials::resolve(
            &ExplicitCredentials::default(),
            env_from(&[]),
            &Config::default(),
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("store site and access token"));
        assert!(msg.contains("--site"));
        assert!(msg.contains(SITE_ENV));
        assert!(msg.contains(TOKEN_ENV));
        assert!(msg.contains("config file"));
    }

    #[test]
    fn test_blank_values_are_missing() {
        let explicit = ExplicitCredentials {
            site: Some("shop".into()),
            access_token: Some("   ".into()),
        };
        let err = Credentials::resolve(&explicit, env_from(&[]), &Config::default()).unwrap_err();
        assert!(err.to_string().contains("missing access token"));
    }

    #[test]
    fn test_normalize_site() {
        assert_eq!(normalize_site("shop"), "shop.myshopify.com");
        assert_eq!(
            normalize_site("https://shop.myshopify.com/"),
            "shop.myshopify.com"
        );
        assert_eq!(normalize_site("store.example.com"), "store.example.com");
        assert_eq!(normalize_site("127.0.0.1:8080"), "127.0.0.1:8080");
    }

    #[test]
    fn test_debug_redacts_token() {
        let creds = Credentials {
            site: "shop.myshopify.com".into(),
            access_token: "shpat_secret".into(),
        };
        assert!(!format!("{:?}", creds).contains("shpat_secret"));
    }
}
