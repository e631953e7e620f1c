//! Keyframed bone tracks and their evaluation at a frame time.
//!
//! Model:
//! - One track per animated bone, keyed once per frame: a model with `N`
//!   frames carries `N + 1` keys per track (both ends inclusive).
//! - Position, rotation and scale keys are stored as parallel arrays.
//! - Evaluation samples the keys at the floor and ceil of the frame time and
//!   interpolates (lerp for translation/scale, slerp for rotation).
//!
//! All mutation goes through [`crate::controller::AnimDataController`].

use std::sync::Arc;

use hashbrown::HashMap;
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::controller::AnimDataController;
use crate::error::AnimError;
use crate::frame_time::FrameTime;
use crate::skeleton::ReferenceSkeleton;
use crate::transform::Transform;

/// How the sub-frame is treated when sampling between two keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interpolation {
    #[default]
    Linear,
    /// Round the sub-frame to the nearest key: a hard cut, never a blend.
    Step,
}

/// Keys for one bone. Field order is the persisted order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoneAnimationTrack {
    pub name: String,
    pub skeleton_bone_index: usize,
    pub pos_keys: Vec<Vector3<f32>>,
    pub rot_keys: Vec<UnitQuaternion<f32>>,
    pub scale_keys: Vec<Vector3<f32>>,
}

impl BoneAnimationTrack {
    #[inline]
    pub fn num_keys(&self) -> usize {
        self.pos_keys.len()
    }

    /// The key at `index`, or `None` when the index is negative or past the end.
    pub fn key(&self, index: i32) -> Option<Transform> {
        let i = usize::try_from(index).ok()?;
        Some(Transform::new(
            *self.pos_keys.get(i)?,
            *self.rot_keys.get(i)?,
            *self.scale_keys.get(i)?,
        ))
    }
}

#[derive(Clone, Debug)]
pub struct AnimDataModel {
    pub(crate) tracks: Vec<BoneAnimationTrack>,
    pub(crate) frame_rate: i32,
    pub(crate) number_of_frames: i32,
    pub(crate) number_of_keys: i32,
    pub(crate) track_lookup: HashMap<String, usize>,
    pub(crate) skeleton: Option<Arc<ReferenceSkeleton>>,
    pub(crate) cfg: Config,
}

impl AnimDataModel {
    /// An empty model (zero frames, one key) at `frame_rate` frames per second.
    pub fn new(frame_rate: i32) -> Result<Self, AnimError> {
        Self::with_config(frame_rate, Config::default())
    }

    pub fn with_config(frame_rate: i32, cfg: Config) -> Result<Self, AnimError> {
        if frame_rate <= 0 {
            return Err(AnimError::InvalidFrameRate { rate: frame_rate });
        }
        Ok(Self {
            tracks: Vec::new(),
            frame_rate,
            number_of_frames: 0,
            number_of_keys: 1,
            track_lookup: HashMap::new(),
            skeleton: None,
            cfg,
        })
    }

    /// Builder-style skeleton binding for freshly created models.
    pub fn with_skeleton(mut self, skeleton: Arc<ReferenceSkeleton>) -> Self {
        self.skeleton = Some(skeleton);
        self
    }

    /// The single-writer edit API for this model.
    #[inline]
    pub fn controller(&mut self) -> AnimDataController<'_> {
        AnimDataController::new(self)
    }

    #[inline]
    pub fn tracks(&self) -> &[BoneAnimationTrack] {
        &self.tracks
    }

    #[inline]
    pub fn frame_rate(&self) -> i32 {
        self.frame_rate
    }

    #[inline]
    pub fn number_of_frames(&self) -> i32 {
        self.number_of_frames
    }

    #[inline]
    pub fn number_of_keys(&self) -> i32 {
        self.number_of_keys
    }

    #[inline]
    pub fn skeleton(&self) -> Option<&Arc<ReferenceSkeleton>> {
        self.skeleton.as_ref()
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Length in seconds.
    #[inline]
    pub fn play_length(&self) -> f64 {
        self.number_of_frames as f64 / self.frame_rate as f64
    }

    #[inline]
    pub fn get_bone_track_index(&self, name: &str) -> Option<usize> {
        self.track_lookup.get(name).copied()
    }

    #[inline]
    pub fn find_bone_track(&self, name: &str) -> Option<&BoneAnimationTrack> {
        self.get_bone_track_index(name).map(|i| &self.tracks[i])
    }

    #[inline]
    pub fn is_valid_bone_track_index(&self, index: usize) -> bool {
        index < self.tracks.len()
    }

    pub(crate) fn rebuild_track_lookup(&mut self) {
        self.track_lookup.clear();
        for (i, track) in self.tracks.iter().enumerate() {
            self.track_lookup.insert(track.name.clone(), i);
        }
    }

    /// Sample the named track. Unknown tracks yield the identity transform.
    pub fn evaluate_bone_track_transform(
        &self,
        track_name: &str,
        time: FrameTime,
        interpolation: Interpolation,
    ) -> Transform {
        match self.find_bone_track(track_name) {
            Some(track) => self.evaluate_track(track, time, interpolation),
            None => Transform::identity(),
        }
    }

    /// Sample `track` at `time`. Alphas within the key tolerance of 0 or 1
    /// return the floor or ceil key exactly; a key index outside the track
    /// yields the identity transform.
    pub fn evaluate_track(
        &self,
        track: &BoneAnimationTrack,
        time: FrameTime,
        interpolation: Interpolation,
    ) -> Transform {
        let alpha = match interpolation {
            Interpolation::Step => time.subframe().round(),
            Interpolation::Linear => time.subframe(),
        };
        let tolerance = self.cfg.key_tolerance;
        let floor = time.floor_to_frame().frame();
        let ceil = time.ceil_to_frame().frame();

        let sampled = if (alpha - 1.0).abs() <= tolerance {
            track.key(ceil)
        } else if alpha.abs() <= tolerance {
            track.key(floor)
        } else {
            match (track.key(floor), track.key(ceil)) {
                (Some(a), Some(b)) => Some(Transform::blend(&a, &b, alpha)),
                _ => None,
            }
        };
        sampled.unwrap_or_else(Transform::identity)
    }
}
