use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Invalid {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub builder: BuilderConfig,
    pub insertion: InsertionConfig,
    pub progressive: ProgressiveConfig,
    pub expansion: ExpansionConfig,
    pub layout: LayoutConfig,
    pub quality: QualityConfig,
    pub timing: TimingConfig,
    pub camera: CameraConfig,
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| ConfigError::Invalid {
            path: path.display().to_string(),
            source,
        })
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct BuilderConfig {
    pub max_groups: usize,
    pub max_occupations: usize,
    pub min_skills: usize,
    pub node_floor: usize,
    pub max_edges: usize,
    pub max_edges_per_skill: usize,
    pub hierarchy_edges_per_group: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            max_groups: 30,
            max_occupations: 200,
            min_skills: 50,
            node_floor: 500,
            max_edges: 2000,
            max_edges_per_skill: 10,
            hierarchy_edges_per_group: 8,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct InsertionConfig {
    pub node_chunk: usize,
    pub edge_chunk: usize,
}

impl Default for InsertionConfig {
    fn default() -> Self {
        Self {
            node_chunk: 50,
            edge_chunk: 100,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProgressiveConfig {
    pub batch_size: usize,
    pub max_edges_per_skill: usize,
}

impl Default for ProgressiveConfig {
    fn default() -> Self {
        Self {
            batch_size: 2000,
            max_edges_per_skill: 5,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExpansionConfig {
    pub max_occupations: usize,
    pub max_relations: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_occupations: 10,
            max_relations: 15,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub iterations: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { iterations: 30 }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    pub low_above_ratio: f32,
    pub high_at_or_below_ratio: f32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            low_above_ratio: 5.0,
            high_at_or_below_ratio: 0.1,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimingConfig {
    pub hover_delay_ms: u64,
    pub zoom_settle_ms: u64,
    pub interaction_cooldown_ms: u64,
    pub search_expand_delay_ms: u64,
    pub refresh_retry_ms: u64,
    pub attach_retry_ms: u64,
    pub attach_max_retries: u32,
    pub parse_yield_ms: u64,
}

impl TimingConfig {
    pub fn hover_delay(&self) -> Duration {
        Duration::from_millis(self.hover_delay_ms)
    }

    pub fn zoom_settle(&self) -> Duration {
        Duration::from_millis(self.zoom_settle_ms)
    }

    pub fn interaction_cooldown(&self) -> Duration {
        Duration::from_millis(self.interaction_cooldown_ms)
    }

    pub fn search_expand_delay(&self) -> Duration {
        Duration::from_millis(self.search_expand_delay_ms)
    }

    pub fn refresh_retry(&self) -> Duration {
        Duration::from_millis(self.refresh_retry_ms)
    }

    pub fn attach_retry(&self) -> Duration {
        Duration::from_millis(self.attach_retry_ms)
    }

    pub fn parse_yield(&self) -> Duration {
        Duration::from_millis(self.parse_yield_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            hover_delay_ms: 100,
            zoom_settle_ms: 150,
            interaction_cooldown_ms: 300,
            search_expand_delay_ms: 500,
            refresh_retry_ms: 100,
            attach_retry_ms: 100,
            attach_max_retries: 20,
            parse_yield_ms: 10,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub min_ratio: f32,
    pub max_ratio: f32,
}

impl CameraConfig {
    pub fn clamp_ratio(&self, ratio: f32) -> f32 {
        ratio.clamp(self.min_ratio, self.max_ratio)
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_ratio: 0.001,
            max_ratio: 100.0,
        }
    }
}
