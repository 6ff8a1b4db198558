//! Environment variable overrides.
//!
//! Applied on top of the file layers. Empty values are ignored so that an
//! exported-but-blank variable never clears a configured value.

use std::path::PathBuf;

use crate::{AuthMethod, CopConfig, Result};

pub const URL_ENV: &str = "COP_URL";
pub const TENANT_ENV: &str = "COP_TENANT";
pub const AUTH_METHOD_ENV: &str = "COP_AUTH_METHOD";
pub const USERNAME_ENV: &str = "COP_USERNAME";
pub const PASSWORD_ENV: &str = "COP_PASSWORD";
pub const SECRET_FILE_ENV: &str = "COP_SECRET_FILE";
pub const REFRESH_TOKEN_ENV: &str = "COP_REFRESH_TOKEN";

/// Apply `COP_*` overrides from the process environment.
pub fn apply_env_overrides(config: &mut CopConfig) -> Result<()> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides from an arbitrary lookup (the process env in production).
pub fn apply_overrides_from<F>(config: &mut CopConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(URL_ENV) {
        config.url = Some(url);
    }
    if let Some(tenant) = get(TENANT_ENV) {
        config.tenant = Some(tenant);
    }
    if let Some(method) = get(AUTH_METHOD_ENV) {
        config.auth_method = Some(method.parse::<AuthMethod>()?);
    }
    if let Some(username) = get(USERNAME_ENV) {
        config.username = Some(username);
    }
    if let Some(password) = get(PASSWORD_ENV) {
        config.password = Some(password);
    }
    if let Some(path) = get(SECRET_FILE_ENV) {
        config.secret_file = Some(PathBuf::from(path));
    }
    if let Some(token) = get(REFRESH_TOKEN_ENV) {
        config.refresh_token = Some(token);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ConfigError;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = CopConfig {
            url: Some("https://file.example.com".to_string()),
            tenant: Some("file".to_string()),
            ..Default::default()
        };

        apply_overrides_from(
            &mut config,
            lookup(&[
                (TENANT_ENV, "env-tenant"),
                (AUTH_METHOD_ENV, "service-principal"),
                (SECRET_FILE_ENV, "/tmp/sp.json"),
            ]),
        )
        .unwrap();

        assert_eq!(config.url.as_deref(), Some("https://file.example.com"));
        assert_eq!(config.tenant.as_deref(), Some("env-tenant"));
        assert_eq!(config.auth_method, Some(AuthMethod::ServicePrincipal));
        assert_eq!(config.secret_file, Some(PathBuf::from("/tmp/sp.json")));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = CopConfig {
            tenant: Some("file".to_string()),
            ..Default::default()
        };
        apply_overrides_from(&mut config, lookup(&[(TENANT_ENV, "  ")])).unwrap();
        assert_eq!(config.tenant.as_deref(), Some("file"));
    }

    #[test]
    fn test_unknown_env_method_rejected() {
        let mut config = CopConfig::default();
        let err = apply_overrides_from(&mut config, lookup(&[(AUTH_METHOD_ENV, "saml")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownAuthMethod(_)));
    }

    #[test]
    fn test_refresh_token_from_env() {
        let mut config = CopConfig::default();
        apply_overrides_from(&mut config, lookup(&[(REFRESH_TOKEN_ENV, "r-1")])).unwrap();
        assert_eq!(config.refresh_token.as_deref(), Some("r-1"));
    }
}
