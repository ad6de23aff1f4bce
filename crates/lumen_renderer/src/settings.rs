//! Render settings.
//!
//! Everything a render pass needs to know besides the scene and camera.
//! Settings are read from JSON once, validated, and then only read.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bucket::DEFAULT_BUCKET_SIZE;
use crate::bvh::{Bvh, SplitPolicy};
use crate::direct::{DirectLight, DirectMode};
use crate::integrator::{Integrator, PathConfig, PathTracer};
use crate::primary::PrimaryHit;
use crate::tracer::{RayTracer, SeqTracer};

/// Errors that can occur while loading render settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Which accelerator answers ray queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TracerKind {
    /// Test every triangle
    Seq,
    #[default]
    Bvh,
}

/// Which integrator estimates pixel radiance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Algorithm {
    /// Albedo at the first hit, no lighting
    Primary,
    /// One bounce direct lighting
    Direct,
    /// Path tracing that only finds light by hitting it
    SimplePt,
    /// Path tracing with next event estimation
    #[default]
    Pt,
}

/// Configuration of one render pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RenderSettings {
    pub tracer: TracerKind,
    pub split: SplitPolicy,
    pub algorithm: Algorithm,
    /// Sampling strategy of the `direct` algorithm
    pub direct: DirectMode,
    /// Parameters of the path tracing algorithms
    pub path: PathConfig,
    pub samples_per_pixel: u32,
    /// Base seed of the per-bucket random streams
    pub seed: u64,
    /// Bucket edge length in pixels
    pub bucket_size: u32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            tracer: TracerKind::Bvh,
            split: SplitPolicy::ObjectMedian,
            algorithm: Algorithm::Pt,
            direct: DirectMode::Mis,
            path: PathConfig::default(),
            samples_per_pixel: 16,
            seed: 0,
            bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }
}

impl RenderSettings {
    /// Parse and validate settings; missing fields take their defaults.
    pub fn from_json(json: &str) -> SettingsResult<Self> {
        let settings: RenderSettings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> SettingsResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Reject settings no render can run with.
    pub fn validate(&self) -> SettingsResult<()> {
        if self.samples_per_pixel == 0 {
            return Err(SettingsError::Invalid(
                "samples-per-pixel must be positive".to_string(),
            ));
        }
        if self.bucket_size == 0 {
            return Err(SettingsError::Invalid("bucket-size must be positive".to_string()));
        }
        let path_traced = matches!(self.algorithm, Algorithm::SimplePt | Algorithm::Pt);
        if path_traced && self.path.max_path_len == 0 {
            return Err(SettingsError::Invalid(
                "path.max-path-len must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// A fresh, unbuilt tracer of the configured kind.
    pub fn make_tracer(&self) -> Box<dyn RayTracer> {
        match self.tracer {
            TracerKind::Seq => Box::new(SeqTracer::new()),
            TracerKind::Bvh => Box::new(Bvh::new(self.split)),
        }
    }

    pub fn make_integrator(&self) -> Box<dyn Integrator> {
        match self.algorithm {
            Algorithm::Primary => Box::new(PrimaryHit),
            Algorithm::Direct => Box::new(DirectLight::new(self.direct)),
            Algorithm::SimplePt => {
                Box::new(PathTracer::new(self.path.with_next_event(false)))
            }
            Algorithm::Pt => Box::new(PathTracer::new(self.path.with_next_event(true))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrator::BounceMode;

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "tracer": "seq",
            "algorithm": "simple-pt",
            "path": { "max-path-len": 4, "bounce": "cosine" },
            "samples-per-pixel": 8
        }"#;
        let settings = RenderSettings::from_json(json).expect("valid settings");
        assert_eq!(settings.tracer, TracerKind::Seq);
        assert_eq!(settings.split, SplitPolicy::ObjectMedian);
        assert_eq!(settings.path.max_path_len, 4);
        assert_eq!(settings.path.rr_start, 2);
        assert_eq!(settings.path.bounce, BounceMode::Cosine);
        assert!(settings.path.mis);
        assert_eq!(settings.samples_per_pixel, 8);
        assert_eq!(settings.bucket_size, DEFAULT_BUCKET_SIZE);

        assert_eq!(settings.make_tracer().name(), "seq");
        assert_eq!(settings.make_integrator().name(), "simple-pt");
    }

    #[test]
    fn test_enum_names() {
        let json = r#"{ "split": "spatial-median", "algorithm": "direct", "direct": "light" }"#;
        let settings = RenderSettings::from_json(json).expect("valid settings");
        assert_eq!(settings.split, SplitPolicy::SpatialMedian);
        assert_eq!(settings.direct, DirectMode::Light);
        assert_eq!(settings.make_tracer().name(), "bvh");
        assert_eq!(settings.make_integrator().name(), "direct");

        let text = settings.to_json().expect("serializable");
        assert!(text.contains("\"spatial-median\""));
        assert_eq!(RenderSettings::from_json(&text).expect("round trip"), settings);
    }

    #[test]
    fn test_rejects_bad_settings() {
        assert!(matches!(
            RenderSettings::from_json(r#"{ "tracer": "octree" }"#),
            Err(SettingsError::Parse(_))
        ));
        assert!(matches!(
            RenderSettings::from_json(r#"{ "samples-per-pixel": 0 }"#),
            Err(SettingsError::Invalid(_))
        ));
        assert!(matches!(
            RenderSettings::from_json(r#"{ "path": { "max-path-len": 0 } }"#),
            Err(SettingsError::Invalid(_))
        ));
        let direct = r#"{ "algorithm": "direct", "path": { "max-path-len": 0 } }"#;
        assert!(RenderSettings::from_json(direct).is_ok());
    }

    #[test]
    fn test_primary_algorithm() {
        let json = r#"{ "algorithm": "primary", "path": { "max-path-len": 0 } }"#;
        let settings = RenderSettings::from_json(json).expect("valid settings");
        assert_eq!(settings.algorithm, Algorithm::Primary);
        assert_eq!(settings.make_integrator().name(), "primary");
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            RenderSettings::load("/nonexistent/lumen/settings.json"),
            Err(SettingsError::Io(_))
        ));
    }
}
