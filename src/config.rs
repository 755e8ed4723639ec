use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;
use crate::parser::ExtractOptions;

const DEFAULT_CONFIG_NAME: &str = "montaigne";
const ENV_PREFIX: &str = "MONTAIGNE";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_path: PathBuf,
    pub bind_addr: String,
    pub fetch: FetchSettings,
    pub ingest: IngestSettings,
    #[serde(default)]
    pub extract: ExtractOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngestSettings {
    pub concurrency: usize,
}

impl Settings {
    /// Defaults, then `montaigne.toml` (or `path`) if present, then `MONTAIGNE_*` variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };

        let settings = Config::builder()
            .set_default("database_path", "data/montaigne.sqlite")?
            .set_default("bind_addr", "0.0.0.0:8080")?
            .set_default("fetch.timeout_secs", 30)?
            .set_default(
                "fetch.user_agent",
                concat!("montaigne/", env!("CARGO_PKG_VERSION")),
            )?
            .set_default("ingest.concurrency", 4)?
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.toml");
        std::fs::File::create(&path).unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.fetch.timeout_secs, 30);
        assert_eq!(settings.ingest.concurrency, 4);
        assert!(settings.fetch.user_agent.starts_with("montaigne/"));
        assert_eq!(settings.extract, ExtractOptions::default());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("montaigne.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
database_path = "/tmp/essays.sqlite"

[ingest]
concurrency = 16

[extract]
keep_leading_text = true
"#
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.database_path, PathBuf::from("/tmp/essays.sqlite"));
        assert_eq!(settings.ingest.concurrency, 16);
        assert!(settings.extract.keep_leading_text);
        assert_eq!(settings.extract.sentinel_heading, "1st subsection");
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
