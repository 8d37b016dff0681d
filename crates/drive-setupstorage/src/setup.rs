//! Pieces of the setup flow that do not need a terminal or the network

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use drive_oauth::{OAuthConfig, OAuthToken, CLIENT_ID_ENV, CLIENT_SECRET_ENV};
use drive_storage::StoreOptions;

use crate::error::{Result, SetupError};

/// File written under `<where>/<domain>/`
pub const STORE_CONFIG_FILE: &str = "storeconfig";

/// Client credentials from the flags, falling back to `lookup` (the
/// environment in production) for whichever flag is absent.
pub fn oauth_config(
    client_id: Option<String>,
    client_secret: Option<String>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<OAuthConfig> {
    let pick = |flag: Option<String>, name: &str, var: &str| {
        flag.or_else(|| lookup(var))
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                SetupError::Config(format!("the --{} flag or {} must be provided", name, var))
            })
    };
    let client_id = pick(client_id, "client-id", CLIENT_ID_ENV)?;
    let client_secret = pick(client_secret, "client-secret", CLIENT_SECRET_ENV)?;
    Ok(OAuthConfig::drive(client_id, client_secret))
}

/// `$HOME/upspin/deploy`, the conventional home of server configuration
pub fn default_where(home: Option<String>) -> Result<PathBuf> {
    let home = home.filter(|h| !h.is_empty()).ok_or_else(|| {
        SetupError::Config("HOME is not set; the --where flag must be provided".to_string())
    })?;
    Ok(Path::new(&home).join("upspin").join("deploy"))
}

/// Accept either the bare authorization code or the whole URL the browser
/// was redirected to.
pub fn parse_auth_code(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(SetupError::Config("empty authorization code".to_string()));
    }

    let redirect = match url::Url::parse(input) {
        Ok(u) if u.scheme() == "http" || u.scheme() == "https" => u,
        _ => return Ok(input.to_string()),
    };

    let mut code = None;
    for (key, value) in redirect.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => {
                return Err(SetupError::Config(format!(
                    "authorization was not granted: {}",
                    value
                )))
            }
            _ => {}
        }
    }
    code.filter(|c| !c.is_empty()).ok_or_else(|| {
        SetupError::Config(format!("no code= parameter in {}", input))
    })
}

/// Write the token's store configuration to `<where>/<domain>/storeconfig`.
///
/// The lines are parsed back before anything touches the disk so a token
/// the store cannot load is never written.
pub fn write_store_config(where_dir: &Path, domain: &str, token: &OAuthToken) -> Result<PathBuf> {
    if domain.is_empty() || domain == "." || domain == ".." || domain.contains(['/', '\\']) {
        return Err(SetupError::Config(format!("invalid domain name {:?}", domain)));
    }

    let lines = token.store_config();
    StoreOptions::parse_lines(&lines)?;

    let dir = where_dir.join(domain);
    fs::create_dir_all(&dir)?;
    let path = dir.join(STORE_CONFIG_FILE);

    let mut file = open_private(&path)?;
    for line in &lines {
        writeln!(file, "{}", line)?;
    }
    file.sync_all()?;
    Ok(path)
}

// The file holds a refresh token.
#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::File::create(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn token() -> OAuthToken {
        OAuthToken {
            access_token: "ya29.access".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: "1//refresh".to_string(),
            expiry: Utc.with_ymd_and_hms(2017, 5, 1, 12, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_oauth_config_prefers_flags() {
        let config = oauth_config(Some("flag-id".into()), Some("flag-secret".into()), |_| {
            Some("env".to_string())
        })
        .unwrap();
        assert_eq!(config.client_id, "flag-id");
        assert_eq!(config.client_secret, "flag-secret");
    }

    #[test]
    fn test_oauth_config_falls_back_per_field() {
        let config = oauth_config(Some("flag-id".into()), None, |key| {
            (key == CLIENT_SECRET_ENV).then(|| "env-secret".to_string())
        })
        .unwrap();
        assert_eq!(config.client_id, "flag-id");
        assert_eq!(config.client_secret, "env-secret");
    }

    #[test]
    fn test_oauth_config_names_missing_credential() {
        let err = oauth_config(None, None, |_| None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "the --client-id flag or DRIVE_CLIENT_ID must be provided"
        );

        let err = oauth_config(Some("id".into()), Some(String::new()), |_| None).unwrap_err();
        assert!(err.to_string().contains("DRIVE_CLIENT_SECRET"));
    }

    #[test]
    fn test_default_where() {
        assert_eq!(
            default_where(Some("/home/ann".into())).unwrap(),
            PathBuf::from("/home/ann/upspin/deploy")
        );
        assert!(default_where(None).unwrap_err().to_string().contains("--where"));
    }

    #[test]
    fn test_parse_bare_code() {
        assert_eq!(parse_auth_code("  4/0AbCd-ef \n").unwrap(), "4/0AbCd-ef");
    }

    #[test]
    fn test_parse_redirect_url() {
        let code = parse_auth_code(
            "http://127.0.0.1/?state=state-token&code=4%2F0AbCd&scope=https://www.googleapis.com/auth/drive.appdata",
        )
        .unwrap();
        assert_eq!(code, "4/0AbCd");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(parse_auth_code("   ").is_err());
        assert!(parse_auth_code("http://127.0.0.1/?state=x")
            .unwrap_err()
            .to_string()
            .contains("no code="));
        assert!(parse_auth_code("http://127.0.0.1/?error=access_denied")
            .unwrap_err()
            .to_string()
            .contains("access_denied"));
    }

    #[test]
    fn test_write_store_config_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_store_config(dir.path(), "example.com", &token()).unwrap();
        assert_eq!(path, dir.path().join("example.com").join(STORE_CONFIG_FILE));

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("backend=Drive\n"));
        let options = StoreOptions::parse_lines(written.lines()).unwrap();
        assert_eq!(options.token(), &token());
    }

    #[test]
    fn test_write_store_config_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        write_store_config(dir.path(), "example.com", &token()).unwrap();

        let mut newer = token();
        newer.access_token = "ya29.newer".to_string();
        let path = write_store_config(dir.path(), "example.com", &newer).unwrap();

        let options = StoreOptions::parse_lines(fs::read_to_string(path).unwrap().lines()).unwrap();
        assert_eq!(options.token().access_token, "ya29.newer");
    }

    #[cfg(unix)]
    #[test]
    fn test_store_config_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = write_store_config(dir.path(), "example.com", &token()).unwrap();
        let mode = fs::metadata(path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_write_store_config_rejects_bad_domain() {
        let dir = tempfile::tempdir().unwrap();
        for domain in ["", "..", "a/b"] {
            assert!(write_store_config(dir.path(), domain, &token()).is_err());
        }
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
