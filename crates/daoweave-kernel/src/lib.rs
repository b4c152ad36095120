//! daoweave Kernel
//!
//! Command line front end: logging setup, configuration lookup and the
//! `run` and `hash` commands.

#![warn(unreachable_pub)]
#![warn(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use daoweave_artifact::{embed_hash, CodeHash, HASH_STUB};
use daoweave_core::{BatchDriver, BatchReport, WeaveConfig, CONFIG_FILE};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER: OnceLock<()> = OnceLock::new();

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human readable
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

impl LogFormat {
    /// Parse a `--log-format` value
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Install the global subscriber, once
///
/// `RUST_LOG` wins over the default level (`info`, or `debug` when verbose).
/// Logs go to stderr so stdout carries only the report.
pub fn init_logging(verbose: bool, format: LogFormat) {
    LOGGER.get_or_init(|| {
        let level = if verbose { "debug" } else { "info" };
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
        let layer = match format {
            LogFormat::Text => fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .boxed(),
            LogFormat::Json => fmt::layer()
                .with_writer(std::io::stderr)
                .json()
                .boxed(),
        };
        if tracing_subscriber::registry().with(layer.with_filter(filter)).try_init().is_err() {
            tracing::debug!("global subscriber already set");
        }
    });
}

/// Options of the `run` command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit configuration file
    pub config: Option<PathBuf>,
    /// Source roots overriding the configured ones
    pub paths: Vec<PathBuf>,
    /// Report without writing
    pub dry_run: bool,
    /// Stop at the first failure
    pub fail_fast: bool,
    /// Print the report as JSON
    pub json: bool,
}

/// Resolve the configuration for a run
///
/// An explicit `--config` file is required to exist; otherwise `daoweave.toml`
/// in `cwd` is used when present. Command line flags override the file.
///
/// # Errors
/// If the configuration file cannot be read or parsed
pub fn load_config(options: &RunOptions, cwd: &Path) -> anyhow::Result<WeaveConfig> {
    let mut config = match &options.config {
        Some(path) => WeaveConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => {
            let default = cwd.join(CONFIG_FILE);
            if default.is_file() {
                WeaveConfig::load(&default).with_context(|| format!("loading {}", default.display()))?
            } else {
                WeaveConfig::new()
            }
        }
    };
    if !options.paths.is_empty() {
        config.source_dirs.clone_from(&options.paths);
    }
    if config.source_dirs.is_empty() {
        config.source_dirs.push(cwd.to_path_buf());
    }
    config.dry_run |= options.dry_run;
    config.fail_fast |= options.fail_fast;
    Ok(config)
}

/// Run a batch and render its report
///
/// # Errors
/// Configuration and discovery errors; per-file failures are in the report
pub fn run(options: &RunOptions, cwd: &Path) -> anyhow::Result<(BatchReport, String)> {
    let config = load_config(options, cwd)?;
    tracing::debug!(?config, "resolved configuration");
    let report = BatchDriver::new(config).run().context("discovering sources")?;
    let rendered = if options.json {
        let mut json = report.to_json().context("rendering report")?;
        json.push('\n');
        json
    } else {
        report.render_text()
    };
    Ok((report, rendered))
}

/// Output of the `hash` command
///
/// A template containing the hash placeholder is printed with the hash
/// embedded; any other snippet gets the annotation it would carry.
#[must_use]
pub fn hash_snippet(text: &str) -> String {
    if text.contains(HASH_STUB) {
        let (code, _) = embed_hash(text);
        return code;
    }
    format!("@Generated(hash = {})", CodeHash::compute(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use daoweave_test_utils::NOTE;
    use pretty_assertions::assert_eq;

    #[test]
    fn hash_of_known_constructor() {
        assert_eq!(
            hash_snippet("@Generated(hash = 1272611929)\npublic Note() {\n}"),
            "@Generated(hash = 1272611929)"
        );
        assert_eq!(
            hash_snippet("@Generated(hash = HASH_STUB)\npublic Note() {\n}"),
            "@Generated(hash = 1272611929)\npublic Note() {\n}"
        );
    }

    #[test]
    fn log_formats() {
        assert_eq!(LogFormat::parse("json"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("text"), Some(LogFormat::Text));
        assert_eq!(LogFormat::parse("yaml"), None);
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "source_dirs = [\"java\"]\nfail_fast = true\n").unwrap();

        let config = load_config(&RunOptions::default(), dir.path()).unwrap();
        assert_eq!(config.source_dirs, [dir.path().join("java")]);
        assert!(config.fail_fast);
        assert!(!config.dry_run);

        let options = RunOptions {
            paths: vec![PathBuf::from("other")],
            dry_run: true,
            ..RunOptions::default()
        };
        let config = load_config(&options, dir.path()).unwrap();
        assert_eq!(config.source_dirs, [PathBuf::from("other")]);
        assert!(config.dry_run);
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let options = RunOptions {
            config: Some(dir.path().join("absent.toml")),
            ..RunOptions::default()
        };
        let err = load_config(&options, dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("absent.toml"));
    }

    #[test]
    fn run_renders_json_report() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Note.java"), NOTE).unwrap();
        let options = RunOptions {
            json: true,
            dry_run: true,
            ..RunOptions::default()
        };
        let (report, rendered) = run(&options, dir.path()).unwrap();
        assert_eq!(report.changed(), 1);
        let json: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(json["files"][0]["outcome"], "changed");
        assert_eq!(json["dry_run"], true);
    }
}
