//! Layered configuration.
//!
//! Sources, lowest precedence first:
//! 1. Built-in defaults
//! 2. A TOML file (`streamcat.toml` in the working directory, or an explicit path)
//! 3. Environment variables prefixed `STREAMCAT_`, with `__` separating sections
//!    (`STREAMCAT_ANALYSIS__MIN_YEAR=1990` sets `analysis.min_year`)

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::data::Service;
use crate::error::ConfigError;

pub const DEFAULT_CONFIG_FILE: &str = "streamcat.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub columns: ColumnMap,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Where each of the five tables lives.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub data_dir: PathBuf,
    pub amazon: PathBuf,
    pub hulu: PathBuf,
    pub netflix: PathBuf,
    pub disney: PathBuf,
    pub genres: PathBuf,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            amazon: PathBuf::from("amazon.csv"),
            hulu: PathBuf::from("hulu.csv"),
            netflix: PathBuf::from("netflix.csv"),
            disney: PathBuf::from("disney.csv"),
            genres: PathBuf::from("genres.csv"),
        }
    }
}

impl SourcesConfig {
    /// Location of a service's catalog, resolved against `data_dir`.
    pub fn catalog_path(&self, service: Service) -> PathBuf {
        let file = match service {
            Service::Amazon => &self.amazon,
            Service::Hulu => &self.hulu,
            Service::Netflix => &self.netflix,
            Service::Disney => &self.disney,
        };
        self.data_dir.join(file)
    }

    pub fn genres_path(&self) -> PathBuf {
        self.data_dir.join(&self.genres)
    }
}

/// Source column names for the fields the pipeline reads.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ColumnMap {
    pub title: String,
    pub kind: String,
    pub year: String,
    pub age: String,
    pub imdb: String,
    pub rotten_tomatoes: String,
    pub film: String,
    pub genre: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            title: "title".into(),
            kind: "type".into(),
            year: "year".into(),
            age: "age".into(),
            imdb: "imdb".into(),
            rotten_tomatoes: "rotten_tomatoes".into(),
            film: "film".into(),
            genre: "genre".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Earliest year included in the divergence queries.
    pub min_year: i32,
    /// Case-insensitive substrings that mark a genre as family content.
    pub family_keywords: Vec<String>,
    /// Multiplier that puts imdb scores on the rotten_tomatoes 0-100 scale.
    pub imdb_scale: f64,
    pub divisive: DivisivePolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            min_year: 2000,
            family_keywords: vec!["kids".into(), "family".into(), "children".into()],
            imdb_scale: 10.0,
            divisive: DivisivePolicy::default(),
        }
    }
}

/// Ranking policy for the most-divisive-titles query.
///
/// With the defaults a title seen once ranks alongside one seen many times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DivisivePolicy {
    /// Titles with fewer qualifying rows are left out.
    pub min_samples: usize,
    /// Keep only the first `limit` titles of the ranking.
    pub limit: Option<usize>,
}

impl Default for DivisivePolicy {
    fn default() -> Self {
        Self {
            min_samples: 1,
            limit: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Parquet => "parquet",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Export directory; nothing is written when unset.
    pub dir: Option<PathBuf>,
    pub format: OutputFormat,
    /// Also emit the unified relation itself as `unified`.
    pub include_unified: bool,
}

impl Config {
    /// Load from defaults, `streamcat.toml` if present, and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(None)
    }

    /// Like [`Config::load`], reading `path` instead of the default file.
    ///
    /// An explicit path that does not exist is an error; the default file is optional.
    pub fn load_from(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path
            && !path.exists()
        {
            return Err(ConfigError::InvalidValue {
                field: "config".into(),
                reason: format!("{} does not exist", path.display()),
            });
        }
        let config: Config = Self::figment(path).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
        if file.exists() {
            figment = figment.merge(Toml::file(file));
        }

        figment.merge(Env::prefixed("STREAMCAT_").split("__"))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let analysis = &self.analysis;
        if analysis.family_keywords.iter().all(|k| k.trim().is_empty()) {
            return Err(invalid(
                "analysis.family_keywords",
                "at least one non-empty keyword is required",
            ));
        }
        if !analysis.imdb_scale.is_finite() || analysis.imdb_scale <= 0.0 {
            return Err(invalid(
                "analysis.imdb_scale",
                "must be a positive finite number",
            ));
        }
        if analysis.divisive.min_samples == 0 {
            return Err(invalid("analysis.divisive.min_samples", "must be at least 1"));
        }
        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.into(),
        reason: reason.into(),
    }
}
