//! Secrets management for holoviz-insights
//!
//! The GitHub token is kept apart from the configuration so that config files
//! can be shared. The secrets file lives at
//! `~/.config/holoviz-insights/secrets.toml` and must have restrictive
//! permissions (0600 on Unix).
//!
//! Loading priority:
//! 1. Environment variables (GH_TOKEN, then GITHUB_TOKEN)
//! 2. Secrets file

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

/// Environment variables checked for a GitHub token, in order
pub const TOKEN_ENV_VARS: [&str; 2] = ["GH_TOKEN", "GITHUB_TOKEN"];

/// Secrets structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    /// GitHub configuration
    pub github: GitHubSecrets,
}

/// GitHub-related secrets
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubSecrets {
    /// GitHub Personal Access Token
    pub token: Option<String>,
}

impl Secrets {
    /// Secrets from the default location, empty when there is no file
    pub fn load() -> Result<Self> {
        match Self::default_secrets_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Read a secrets file, refusing one that others can read
    pub fn load_from_file(path: &Path) -> Result<Self> {
        check_owner_only(path)?;

        let contents = std::fs::read_to_string(path)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;
        secrets.github.token = secrets.github.token.map(|t| t.trim().to_string());
        Ok(secrets)
    }

    /// Get the default secrets file path
    ///
    /// Returns `~/.config/holoviz-insights/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("holoviz-insights").join("secrets.toml"))
    }

    /// Resolve the GitHub token
    ///
    /// Priority: GH_TOKEN > GITHUB_TOKEN > secrets file. The secrets file is
    /// only read when neither variable holds a token.
    pub fn resolve_github_token() -> Result<Option<String>> {
        Self::resolve_with(|name| std::env::var(name).ok(), Self::load)
    }

    fn resolve_with(
        env: impl Fn(&str) -> Option<String>,
        load: impl FnOnce() -> Result<Self>,
    ) -> Result<Option<String>> {
        for name in TOKEN_ENV_VARS {
            let token = env(name).map(|t| t.trim().to_string()).unwrap_or_default();
            if !token.is_empty() {
                debug!(var = name, "Using GitHub token from environment");
                return Ok(Some(token));
            }
        }

        let token = load()?.github.token.filter(|t| !t.is_empty());
        if token.is_some() {
            debug!("Using GitHub token from secrets file");
        }
        Ok(token)
    }
}

#[cfg(unix)]
fn check_owner_only(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode() & 0o777;
    if mode & 0o077 != 0 {
        return Err(Error::Config(format!(
            "Secrets file {} has insecure permissions {:o}. Please run: chmod 600 {}",
            path.display(),
            mode,
            path.display()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn check_owner_only(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_secrets() {
        let toml = r#"
[github]
token = "ghp_xxxxxxxxxxxx"
"#;
        let secrets: Secrets = toml::from_str(toml).unwrap();
        assert_eq!(secrets.github.token, Some("ghp_xxxxxxxxxxxx".to_string()));
    }

    fn file_with(token: &str) -> impl FnOnce() -> Result<Secrets> + '_ {
        move || {
            Ok(Secrets {
                github: GitHubSecrets {
                    token: Some(token.to_string()),
                },
            })
        }
    }

    #[test]
    fn test_env_priority() {
        let both = |name: &str| match name {
            "GH_TOKEN" => Some("gh".to_string()),
            "GITHUB_TOKEN" => Some("github".to_string()),
            _ => None,
        };
        let token = Secrets::resolve_with(both, file_with("from_file")).unwrap();
        assert_eq!(token, Some("gh".to_string()));

        let fallback = |name: &str| (name == "GITHUB_TOKEN").then(|| " github ".to_string());
        let token = Secrets::resolve_with(fallback, file_with("from_file")).unwrap();
        assert_eq!(token, Some("github".to_string()));

        let blank = |_: &str| Some("   ".to_string());
        let token = Secrets::resolve_with(blank, file_with("from_file")).unwrap();
        assert_eq!(token, Some("from_file".to_string()));
    }

    #[test]
    fn test_no_token_anywhere() {
        let token = Secrets::resolve_with(|_| None, || Ok(Secrets::default())).unwrap();
        assert_eq!(token, None);
        let token = Secrets::resolve_with(|_| None, file_with("")).unwrap();
        assert_eq!(token, None);
    }

    #[cfg(unix)]
    #[test]
    fn test_env_token_skips_insecure_secrets_file() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[github]\ntoken = \"test\"").unwrap();
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o644)).unwrap();
        let load = || Secrets::load_from_file(file.path());

        let env = |name: &str| (name == "GH_TOKEN").then(|| "gh".to_string());
        let token = Secrets::resolve_with(env, load).unwrap();
        assert_eq!(token, Some("gh".to_string()));

        let err = Secrets::resolve_with(|_| None, load).unwrap_err();
        assert!(err.to_string().contains("insecure permissions"));
    }

    #[cfg(unix)]
    #[test]
    fn test_insecure_permissions_rejected() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[github]\ntoken = \"test\"").unwrap();

        let perms = std::fs::Permissions::from_mode(0o644);
        std::fs::set_permissions(file.path(), perms).unwrap();

        let result = Secrets::load_from_file(file.path());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("insecure permissions"));
    }

    #[cfg(unix)]
    #[test]
    fn test_secure_permissions_accepted() {
        use std::os::unix::fs::PermissionsExt;

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[github]\ntoken = \"  ghp_test  \"").unwrap();

        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(file.path(), perms).unwrap();

        let secrets = Secrets::load_from_file(file.path()).unwrap();
        assert_eq!(secrets.github.token, Some("ghp_test".to_string()));
    }
}
