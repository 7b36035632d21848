//! TOML configuration file support.
//!
//! Every setting is optional; missing values fall back to the library defaults:
//!
//! ```toml
//! # speclib.toml
//! [codec]
//! micrometer_threshold = 100.0
//!
//! [mapper]
//! nodata_candidates = [-1.0, -9999.0]
//! strict = false
//!
//! [library]
//! compression = "zstd"
//! compression_level = 9
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::library::{CompressionType, LibraryError};
use crate::mapper::MapperOptions;
use crate::profile::UnitPolicy;

/// Errors raised while loading a configuration file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Root configuration structure for speclib.toml files.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpeclibConfig {
    /// Instrument file parsing.
    #[serde(default)]
    pub codec: CodecConfig,

    /// Table to array mapping.
    #[serde(default)]
    pub mapper: MapperConfig,

    /// Library file output.
    #[serde(default)]
    pub library: LibraryConfig,
}

/// `[codec]` section
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CodecConfig {
    /// Wavelengths below this maximum are read as micrometers.
    pub micrometer_threshold: Option<f64>,
}

/// `[mapper]` section
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MapperConfig {
    /// No-data sentinel candidates, tried in order.
    pub nodata_candidates: Option<Vec<f64>>,

    /// Fail on undecodable profile cells.
    pub strict: Option<bool>,
}

/// `[library]` section
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LibraryConfig {
    /// `zstd`, `snappy` or `none`.
    pub compression: Option<String>,

    /// ZSTD compression level (1-22).
    pub compression_level: Option<i32>,
}

impl SpeclibConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(threshold) = self.codec.micrometer_threshold {
            if !threshold.is_finite() || threshold <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "micrometer_threshold must be a positive number, got {threshold}"
                )));
            }
        }
        if let Some(candidates) = &self.mapper.nodata_candidates {
            if candidates.iter().any(|c| !c.is_finite()) {
                return Err(ConfigError::Invalid(
                    "nodata_candidates must be finite numbers".to_string(),
                ));
            }
        }
        if let Some(level) = self.library.compression_level {
            if !(1..=22).contains(&level) {
                return Err(ConfigError::Invalid(format!(
                    "compression_level must be between 1 and 22, got {level}"
                )));
            }
        }
        Ok(())
    }

    /// Unit policy for codecs and setting caches
    pub fn unit_policy(&self) -> UnitPolicy {
        self.codec
            .micrometer_threshold
            .map(UnitPolicy::new)
            .unwrap_or_default()
    }

    /// Options for [`crate::mapper::to_arrays`]
    pub fn mapper_options(&self) -> MapperOptions {
        let mut options = MapperOptions::default();
        if let Some(candidates) = &self.mapper.nodata_candidates {
            options = options.with_nodata_candidates(candidates.clone());
        }
        if let Some(strict) = self.mapper.strict {
            options = options.with_strict(strict);
        }
        options
    }

    /// Compression for library files, `None` if not configured
    pub fn compression(&self) -> Result<Option<CompressionType>, LibraryError> {
        let compression = match self.library.compression.as_deref() {
            Some(name) => Some(name.parse::<CompressionType>()?),
            None => None,
        };
        Ok(match (compression, self.library.compression_level) {
            (Some(CompressionType::Zstd(_)) | None, Some(level)) => {
                Some(CompressionType::Zstd(level))
            }
            (compression, _) => compression,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::DEFAULT_NODATA_CANDIDATES;

    #[test]
    fn test_parse_config() {
        let toml = r#"
            [codec]
            micrometer_threshold = 50.0

            [mapper]
            nodata_candidates = [-2.0, -32768.0]
            strict = true

            [library]
            compression = "zstd"
            compression_level = 15
        "#;

        let config = SpeclibConfig::from_str(toml).unwrap();
        assert_eq!(config.unit_policy(), UnitPolicy::new(50.0));

        let options = config.mapper_options();
        assert_eq!(options.nodata_candidates, vec![-2.0, -32768.0]);
        assert!(options.strict);

        assert_eq!(config.compression().unwrap(), Some(CompressionType::Zstd(15)));
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [library]
            compression = "snappy"
            compression_level = 5
        "#;

        let config = SpeclibConfig::from_str(toml).unwrap();
        assert_eq!(config.codec.micrometer_threshold, None);
        assert_eq!(config.compression().unwrap(), Some(CompressionType::Snappy));
        assert_eq!(config.unit_policy(), UnitPolicy::default());
    }

    #[test]
    fn test_empty_config() {
        let config = SpeclibConfig::from_str("").unwrap();
        assert_eq!(config, SpeclibConfig::default());
        assert_eq!(
            config.mapper_options().nodata_candidates,
            DEFAULT_NODATA_CANDIDATES.to_vec()
        );
        assert_eq!(config.compression().unwrap(), None);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            SpeclibConfig::from_str("[codec]\nmicrometer_threshold = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SpeclibConfig::from_str("[library]\ncompression_level = 40"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SpeclibConfig::from_str("[codec]\nunknown = 1"),
            Err(ConfigError::TomlError(_))
        ));

        let config = SpeclibConfig::from_str("[library]\ncompression = \"lz4\"").unwrap();
        assert!(config.compression().is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speclib.toml");
        std::fs::write(&path, "[mapper]\nstrict = true\n").unwrap();
        assert!(SpeclibConfig::from_file(&path).unwrap().mapper.strict.unwrap());

        let err = SpeclibConfig::from_file(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }));
    }
}
