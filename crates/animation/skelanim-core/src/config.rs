//! Core configuration for skelanim-core.

use serde::{Deserialize, Serialize};

use crate::error::AnimError;

/// Tuning knobs shared by the data controller and the playback controller.
/// Missing fields fall back to [`Config::default`] when parsed from JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upper bound on bone tracks a single data model may hold.
    pub max_animation_tracks: usize,
    /// Alpha values within this distance of 0 or 1 snap to the nearest key.
    pub key_tolerance: f32,
    /// Smallest loop range (seconds) accepted as a wrap divisor.
    pub loop_range_epsilon: f64,
    /// Cross-fade duration (seconds) applied when the locomotion state changes.
    pub locomotion_blend_time: f32,
    pub default_play_rate: f32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_animation_tracks: 65_535,
            key_tolerance: 1.0e-4,
            loop_range_epsilon: 1.0e-8,
            locomotion_blend_time: 0.2,
            default_play_rate: 1.0,
        }
    }
}

impl Config {
    pub fn from_json_str(s: &str) -> Result<Self, AnimError> {
        Ok(serde_json::from_str(s)?)
    }
}
