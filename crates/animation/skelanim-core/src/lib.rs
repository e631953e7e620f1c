//! Skelanim Core (engine-agnostic)
//!
//! Skeletal animation evaluation and playback: a reference skeleton and the
//! compact bone view used by one evaluation context, keyframed bone tracks
//! sampled at a frame time, two-pose blending, animation notifies, and a
//! per-instance playback controller driven by a small locomotion state machine.
//!
//! Rendering, skinning and asset import live outside this crate; the core
//! consumes a read-only skeleton and produces a local-space pose buffer.

pub mod bone_container;
pub mod config;
pub mod controller;
pub mod data_model;
pub mod error;
pub mod frame_time;
pub mod ids;
pub mod locomotion;
pub mod notify;
pub mod playback;
pub mod pose;
pub mod runtime;
pub mod sequence;
pub mod skeleton;
pub mod stored;
pub mod transform;

// Re-exports for consumers (adapters)
pub use bone_container::BoneContainer;
pub use config::Config;
pub use controller::AnimDataController;
pub use data_model::{AnimDataModel, BoneAnimationTrack, Interpolation};
pub use error::AnimError;
pub use frame_time::{FrameTime, MAX_SUBFRAME};
pub use ids::MeshComponentId;
pub use locomotion::{LocomotionState, LocomotionStateMachine};
pub use notify::{
    AnimNotifyEvent, AnimNotifyTrack, AnimSequenceBase, NotifyCall, NotifyContext, NotifyLog,
    NotifySweep, NotifyTarget,
};
pub use playback::{AnimInstance, PlaybackState};
pub use pose::{BasePose, CompactPose};
pub use runtime::blend_two_poses_together;
pub use sequence::{AnimSequence, AnimationAsset, TwoWayBlend};
pub use skeleton::{BoneInfo, MeshBone, ReferenceSkeleton};
pub use stored::{
    export_anim_data_model_json, parse_anim_sequence_json, parse_reference_skeleton_json,
};
pub use transform::Transform;

/// Crate result type
pub type Result<T> = core::result::Result<T, AnimError>;
