//! File configuration and the resolved settings of one run.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::download::{CONNECT_TIMEOUT_SECS, HttpTimeouts, READ_TIMEOUT_SECS, SanitizePolicy};
use crate::navigation::DEFAULT_NAVIGATION_TIMEOUT_SECS;

/// Portal the harvester logs into when none is configured.
pub const DEFAULT_PORTAL_URL: &str = "https://egela.ehu.eus";
/// WebDriver server used when none is configured.
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";
/// Name of the portal's session cookie.
pub const DEFAULT_SESSION_COOKIE: &str = "MoodleSessionegela";
/// Allow-list file used when none is configured.
pub const DEFAULT_FILE_TYPES_PATH: &str = "res/fileTypes.txt";

/// Values read from the config file. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileConfig {
    /// Output root for course directories.
    pub output_dir: Option<PathBuf>,
    /// Portal front page.
    pub portal_url: Option<String>,
    /// WebDriver server URL.
    pub webdriver_url: Option<String>,
    /// Session cookie name.
    pub session_cookie: Option<String>,
    /// Extension allow-list file.
    pub file_types: Option<PathBuf>,
    /// Bound on every navigation wait, in seconds.
    pub navigation_timeout_secs: Option<u64>,
    /// HTTP connect timeout, in seconds.
    pub connect_timeout_secs: Option<u64>,
    /// HTTP read timeout, in seconds.
    pub read_timeout_secs: Option<u64>,
    /// Keep `-`, `.` and `_` when sanitizing names.
    pub retain_separators: Option<bool>,
    /// Run the browser without a window.
    pub headless: Option<bool>,
}

impl FileConfig {
    /// Validates value ranges.
    ///
    /// # Errors
    ///
    /// Names the first out-of-range key.
    pub fn validate(&self) -> Result<()> {
        validate_range("navigation_timeout_secs", self.navigation_timeout_secs, 1..=600)?;
        validate_range("connect_timeout_secs", self.connect_timeout_secs, 1..=3600)?;
        validate_range("read_timeout_secs", self.read_timeout_secs, 1..=3600)?;
        for (field, value) in [
            ("portal_url", &self.portal_url),
            ("webdriver_url", &self.webdriver_url),
        ] {
            if let Some(value) = value
                && url::Url::parse(value).is_err()
            {
                bail!("Invalid config value for `{field}`: '{value}' is not a URL");
            }
        }
        if let Some(name) = &self.session_cookie
            && name.trim().is_empty()
        {
            bail!("Invalid config value for `session_cookie`: must not be empty");
        }
        Ok(())
    }
}

fn validate_range(
    field: &str,
    value: Option<u64>,
    range: std::ops::RangeInclusive<u64>,
) -> Result<()> {
    let Some(value) = value else {
        return Ok(());
    };
    if !range.contains(&value) {
        bail!(
            "Invalid config value for `{field}`: {value}. Expected range: {}..={}",
            range.start(),
            range.end()
        );
    }
    Ok(())
}

/// Overrides coming from the command line and the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub output_dir: Option<PathBuf>,
    pub portal_url: Option<String>,
    pub webdriver_url: Option<String>,
    pub file_types: Option<PathBuf>,
    pub navigation_timeout_secs: Option<u64>,
    pub strip_separators: bool,
    pub headless: bool,
}

/// Fully resolved settings of one run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Output root for course directories.
    pub output_dir: PathBuf,
    /// Portal front page.
    pub portal_url: String,
    /// WebDriver server URL.
    pub webdriver_url: String,
    /// Session cookie name.
    pub session_cookie: String,
    /// Extension allow-list file.
    pub file_types: PathBuf,
    /// Bound on every navigation wait.
    pub navigation_timeout: Duration,
    /// HTTP client timeouts.
    pub http_timeouts: HttpTimeouts,
    /// File and directory name sanitizing.
    pub sanitize: SanitizePolicy,
    /// Run the browser without a window.
    pub headless: bool,
}

impl Settings {
    /// Merges overrides over the file config over built-in defaults.
    ///
    /// # Errors
    ///
    /// When no output directory is given anywhere, or an override is out of
    /// range.
    pub fn resolve(overrides: Overrides, file: Option<&FileConfig>) -> Result<Self> {
        let file = file.cloned().unwrap_or_default();

        let Some(output_dir) = overrides.output_dir.or(file.output_dir) else {
            bail!("No output directory: pass --output or set `output_dir` in the config file");
        };
        let navigation_timeout_secs = overrides
            .navigation_timeout_secs
            .or(file.navigation_timeout_secs)
            .unwrap_or(DEFAULT_NAVIGATION_TIMEOUT_SECS);
        validate_range("navigation timeout", Some(navigation_timeout_secs), 1..=600)?;

        let retain = !overrides.strip_separators && file.retain_separators.unwrap_or(true);
        let sanitize = if retain {
            SanitizePolicy::retain_separators()
        } else {
            SanitizePolicy::strip_all()
        };

        Ok(Self {
            output_dir,
            portal_url: overrides
                .portal_url
                .or(file.portal_url)
                .unwrap_or_else(|| DEFAULT_PORTAL_URL.to_string()),
            webdriver_url: overrides
                .webdriver_url
                .or(file.webdriver_url)
                .unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string()),
            session_cookie: file
                .session_cookie
                .unwrap_or_else(|| DEFAULT_SESSION_COOKIE.to_string()),
            file_types: overrides
                .file_types
                .or(file.file_types)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_FILE_TYPES_PATH)),
            navigation_timeout: Duration::from_secs(navigation_timeout_secs),
            http_timeouts: HttpTimeouts {
                connect_secs: file.connect_timeout_secs.unwrap_or(CONNECT_TIMEOUT_SECS),
                read_secs: file.read_timeout_secs.unwrap_or(READ_TIMEOUT_SECS),
            },
            sanitize,
            headless: overrides.headless || file.headless.unwrap_or(false),
        })
    }
}

/// Loaded config metadata.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Resolved config path if a base directory is known.
    pub path: Option<PathBuf>,
    /// Parsed file config when a config file exists and was valid.
    pub config: Option<FileConfig>,
}

/// Resolves default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/harvester/config.toml`
/// 2. `$HOME/.config/harvester/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join("harvester")
                .join("config.toml"),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join("harvester")
            .join("config.toml"),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<std::ffi::OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads config from the default path if present.
///
/// # Errors
///
/// When the file exists but cannot be read or parsed.
pub fn load_default_file_config() -> Result<LoadedConfig> {
    let path = resolve_default_config_path();
    let config = match path.as_deref() {
        Some(path_ref) if path_ref.exists() => Some(load_file_config(path_ref)?),
        _ => None,
    };
    Ok(LoadedConfig { path, config })
}

/// Loads and validates the config file at `path`.
///
/// # Errors
///
/// When the file cannot be read or parsed.
pub fn load_file_config(path: &Path) -> Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
    parse_config_str(&raw)
        .with_context(|| format!("Failed to parse config file '{}'", path.display()))
}

fn parse_config_str(raw: &str) -> Result<FileConfig> {
    let mut cfg = FileConfig::default();
    for (line_index, raw_line) in raw.lines().enumerate() {
        let line = strip_inline_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        let Some((raw_key, raw_value)) = line.split_once('=') else {
            bail!(
                "Invalid config syntax on line {}: expected key = value",
                line_index + 1
            );
        };

        let key = raw_key.trim();
        let value = raw_value.trim();
        let context = || format!("Invalid `{key}` value on line {}", line_index + 1);

        match key {
            "output_dir" => {
                cfg.output_dir = Some(PathBuf::from(parse_string_literal(value).with_context(context)?));
            }
            "portal_url" => cfg.portal_url = Some(parse_string_literal(value).with_context(context)?),
            "webdriver_url" => {
                cfg.webdriver_url = Some(parse_string_literal(value).with_context(context)?);
            }
            "session_cookie" => {
                cfg.session_cookie = Some(parse_string_literal(value).with_context(context)?);
            }
            "file_types" => {
                cfg.file_types = Some(PathBuf::from(parse_string_literal(value).with_context(context)?));
            }
            "navigation_timeout_secs" => {
                cfg.navigation_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "connect_timeout_secs" => {
                cfg.connect_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "read_timeout_secs" => {
                cfg.read_timeout_secs = Some(parse_integer_u64(value).with_context(context)?);
            }
            "retain_separators" => {
                cfg.retain_separators = Some(parse_boolean(value).with_context(context)?);
            }
            "headless" => cfg.headless = Some(parse_boolean(value).with_context(context)?),
            unknown => {
                bail!(
                    "Unknown configuration key: '{}' on line {}",
                    unknown,
                    line_index + 1
                );
            }
        }
    }
    cfg.validate()?;
    Ok(cfg)
}

fn strip_inline_comment(line: &str) -> &str {
    let mut in_string = false;
    for (index, ch) in line.char_indices() {
        match ch {
            '"' => in_string = !in_string,
            '#' if !in_string => return &line[..index],
            _ => {}
        }
    }
    line
}

fn parse_string_literal(raw_value: &str) -> Result<String> {
    if raw_value.len() < 2 || !raw_value.starts_with('"') || !raw_value.ends_with('"') {
        bail!("Expected double-quoted string");
    }
    Ok(raw_value[1..raw_value.len() - 1].to_string())
}

fn parse_integer_u64(raw_value: &str) -> Result<u64> {
    let token = raw_value.trim();
    if token.is_empty() {
        bail!("Expected integer value");
    }
    let value = token.parse::<i128>()?;
    if value < 0 {
        bail!("Expected non-negative integer");
    }
    u64::try_from(value).map_err(|_| anyhow::anyhow!("Integer value out of range for u64"))
}

fn parse_boolean(raw_value: &str) -> Result<bool> {
    match raw_value.trim() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => bail!("Expected 'true' or 'false'"),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config_partial_fields() {
        let cfg = parse_config_str(
            r#"
output_dir = "/srv/egela"
headless = true
"#,
        )
        .expect("partial config should parse");
        assert_eq!(cfg.output_dir, Some(PathBuf::from("/srv/egela")));
        assert_eq!(cfg.headless, Some(true));
        assert!(cfg.portal_url.is_none());
    }

    #[test]
    fn test_parse_config_supports_inline_comments() {
        let cfg = parse_config_str(
            r#"
session_cookie = "MoodleSession#2" # quoted hash is kept
navigation_timeout_secs = 20 # slow portal
"#,
        )
        .expect("config with comments should parse");
        assert_eq!(cfg.session_cookie.as_deref(), Some("MoodleSession#2"));
        assert_eq!(cfg.navigation_timeout_secs, Some(20));
    }

    #[test]
    fn test_parse_config_rejects_unknown_keys() {
        let err = parse_config_str("concurrency = 4").expect_err("unknown key error expected");
        assert!(err.to_string().contains("Unknown configuration key"));
        assert!(err.to_string().contains("concurrency"));
    }

    #[test]
    fn test_parse_config_rejects_out_of_range_navigation_timeout() {
        let err = parse_config_str("navigation_timeout_secs = 0").expect_err("0 is below range");
        assert!(err.to_string().contains("navigation_timeout_secs"));
        let err = parse_config_str("navigation_timeout_secs = 601").expect_err("above range");
        assert!(err.to_string().contains("navigation_timeout_secs"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_boolean() {
        let err = parse_config_str("retain_separators = yes").expect_err("invalid boolean");
        assert!(format!("{err:#}").contains("retain_separators"));
    }

    #[test]
    fn test_parse_config_rejects_unquoted_string() {
        let err = parse_config_str("portal_url = https://egela.ehu.eus").expect_err("unquoted");
        assert!(format!("{err:#}").contains("portal_url"));
    }

    #[test]
    fn test_parse_config_rejects_invalid_url() {
        let err = parse_config_str(r#"webdriver_url = "not a url""#).expect_err("invalid url");
        assert!(err.to_string().contains("webdriver_url"));
    }

    #[test]
    fn test_parse_config_rejects_missing_equals() {
        let err = parse_config_str("headless").expect_err("syntax error expected");
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_resolve_requires_output_dir() {
        let err = Settings::resolve(Overrides::default(), None).expect_err("output required");
        assert!(err.to_string().contains("--output"));
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = Settings::resolve(
            Overrides {
                output_dir: Some(PathBuf::from("out")),
                ..Overrides::default()
            },
            None,
        )
        .unwrap();
        assert_eq!(settings.portal_url, DEFAULT_PORTAL_URL);
        assert_eq!(settings.webdriver_url, DEFAULT_WEBDRIVER_URL);
        assert_eq!(settings.session_cookie, DEFAULT_SESSION_COOKIE);
        assert_eq!(settings.file_types, PathBuf::from(DEFAULT_FILE_TYPES_PATH));
        assert_eq!(settings.navigation_timeout, Duration::from_secs(10));
        assert_eq!(settings.http_timeouts, HttpTimeouts::default());
        assert_eq!(settings.sanitize, SanitizePolicy::retain_separators());
        assert!(!settings.headless);
    }

    #[test]
    fn test_resolve_overrides_win_over_file() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("from-file")),
            portal_url: Some("https://file.example".to_string()),
            navigation_timeout_secs: Some(30),
            retain_separators: Some(true),
            ..FileConfig::default()
        };
        let settings = Settings::resolve(
            Overrides {
                output_dir: Some(PathBuf::from("from-cli")),
                navigation_timeout_secs: Some(5),
                strip_separators: true,
                ..Overrides::default()
            },
            Some(&file),
        )
        .unwrap();
        assert_eq!(settings.output_dir, PathBuf::from("from-cli"));
        assert_eq!(settings.portal_url, "https://file.example");
        assert_eq!(settings.navigation_timeout, Duration::from_secs(5));
        assert_eq!(settings.sanitize, SanitizePolicy::strip_all());
    }

    #[test]
    fn test_resolve_file_can_disable_separators() {
        let file = FileConfig {
            output_dir: Some(PathBuf::from("out")),
            retain_separators: Some(false),
            ..FileConfig::default()
        };
        let settings = Settings::resolve(Overrides::default(), Some(&file)).unwrap();
        assert_eq!(settings.sanitize, SanitizePolicy::strip_all());
    }

    #[test]
    fn test_load_file_config_reads_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "read_timeout_secs = 60\n").unwrap();
        let cfg = load_file_config(&path).unwrap();
        assert_eq!(cfg.read_timeout_secs, Some(60));
    }
}
