//! Playable assets: a keyframed sequence, or a fixed two-way blend of two
//! sequences. Both expose the same small surface (length, data model, pose
//! evaluation, notifies) through [`AnimationAsset`].

use std::sync::Arc;

use tracing::warn;

use crate::data_model::{AnimDataModel, Interpolation};
use crate::frame_time::FrameTime;
use crate::ids::MeshComponentId;
use crate::notify::{AnimSequenceBase, NotifySweep, NotifyTarget};
use crate::pose::CompactPose;
use crate::runtime::blend_two_poses_together;

/// Keyframed animation over a shared data model. Cloning shares the model but
/// gives the clone its own notify state.
#[derive(Clone, Debug)]
pub struct AnimSequence {
    pub base: AnimSequenceBase,
    pub interpolation: Interpolation,
    model: Arc<AnimDataModel>,
}

impl AnimSequence {
    pub fn new(name: impl Into<String>, model: Arc<AnimDataModel>) -> Self {
        let base = AnimSequenceBase::new(name, model.play_length() as f32);
        Self {
            base,
            interpolation: Interpolation::Linear,
            model,
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.base.name
    }

    #[inline]
    pub fn data_model(&self) -> &Arc<AnimDataModel> {
        &self.model
    }

    #[inline]
    pub fn play_length(&self) -> f64 {
        self.model.play_length()
    }

    /// Frame time sampled at `time` seconds. The frame index wraps by
    /// `number_of_frames - 1`; models with fewer than two frames always
    /// sample frame zero.
    pub fn frame_time_at(&self, time: f64) -> FrameTime {
        let target_key = time * self.model.frame_rate() as f64;
        let whole = target_key.floor();
        let alpha = (target_key - whole) as f32;
        let wrap = self.model.number_of_frames() - 1;
        let frame = if wrap > 0 {
            (whole as i64).rem_euclid(wrap as i64) as i32
        } else {
            0
        };
        FrameTime::new(frame, alpha)
    }

    /// Reset `out` to its reference pose and overwrite every compact bone that
    /// has a track.
    pub fn evaluate_pose(&self, time: f64, out: &mut CompactPose) {
        out.reset_to_ref_pose();
        if self.model.tracks().is_empty() {
            return;
        }
        let frame_time = self.frame_time_at(time);
        let container = Arc::clone(out.container());
        let skeleton = container.skeleton();
        for compact in 0..container.num_bones() {
            let Some(name) = container
                .get_skeleton_index(compact)
                .and_then(|skel| skeleton.bone_name(skel))
            else {
                continue;
            };
            if let Some(track) = self.model.find_bone_track(name) {
                out[compact] = self.model.evaluate_track(track, frame_time, self.interpolation);
            }
        }
    }
}

/// Two sequences played in sync and mixed with a fixed weight.
#[derive(Clone, Debug)]
pub struct TwoWayBlend {
    pub name: String,
    pub a: AnimSequence,
    pub b: AnimSequence,
    /// Weight of `b`; 0 plays `a` only, 1 plays `b` only.
    pub alpha: f32,
}

impl TwoWayBlend {
    pub fn new(name: impl Into<String>, a: AnimSequence, b: AnimSequence, alpha: f32) -> Self {
        Self {
            name: name.into(),
            a,
            b,
            alpha: alpha.clamp(0.0, 1.0),
        }
    }

    /// Length interpolated between the two inputs.
    pub fn play_length(&self) -> f64 {
        let (la, lb) = (self.a.play_length(), self.b.play_length());
        la + (lb - la) * self.alpha as f64
    }

    fn dominant(&self) -> &AnimSequence {
        if self.alpha < 0.5 {
            &self.a
        } else {
            &self.b
        }
    }

    fn dominant_mut(&mut self) -> &mut AnimSequence {
        if self.alpha < 0.5 {
            &mut self.a
        } else {
            &mut self.b
        }
    }

    /// Map blend time onto an input sequence by normalized position.
    fn local_time(&self, time: f64, seq: &AnimSequence) -> f64 {
        let length = self.play_length();
        if length <= 0.0 {
            return 0.0;
        }
        time / length * seq.play_length()
    }

    pub fn evaluate_pose(&self, time: f64, out: &mut CompactPose) {
        let container = Arc::clone(out.container());
        let mut pose_a = CompactPose::new(Arc::clone(&container));
        let mut pose_b = CompactPose::new(container);
        self.a.evaluate_pose(self.local_time(time, &self.a), &mut pose_a);
        self.b.evaluate_pose(self.local_time(time, &self.b), &mut pose_b);
        if !blend_two_poses_together(&pose_a, &pose_b, 1.0 - self.alpha, out) {
            warn!(blend = %self.name, "two-way blend skipped");
        }
    }

    pub fn tick_notifies(
        &mut self,
        mesh_component: MeshComponentId,
        sweep: NotifySweep,
        target: &mut dyn NotifyTarget,
    ) {
        let length = self.play_length();
        let scale = if length > 0.0 {
            (self.dominant().play_length() / length) as f32
        } else {
            0.0
        };
        let local = NotifySweep {
            current_time: sweep.current_time * scale,
            previous_time: sweep.previous_time * scale,
            delta_time: sweep.delta_time * scale,
            ..sweep
        };
        self.dominant_mut().base.tick_notifies(mesh_component, local, target);
    }
}

/// The fixed set of playable asset kinds.
#[derive(Clone, Debug)]
pub enum AnimationAsset {
    Sequence(AnimSequence),
    TwoWayBlend(TwoWayBlend),
}

impl AnimationAsset {
    pub fn name(&self) -> &str {
        match self {
            Self::Sequence(s) => s.name(),
            Self::TwoWayBlend(b) => &b.name,
        }
    }

    pub fn play_length(&self) -> f64 {
        match self {
            Self::Sequence(s) => s.play_length(),
            Self::TwoWayBlend(b) => b.play_length(),
        }
    }

    /// The sampled data model; for blends, the dominant input's.
    pub fn data_model(&self) -> &Arc<AnimDataModel> {
        match self {
            Self::Sequence(s) => s.data_model(),
            Self::TwoWayBlend(b) => b.dominant().data_model(),
        }
    }

    pub fn evaluate_pose(&self, time: f64, out: &mut CompactPose) {
        match self {
            Self::Sequence(s) => s.evaluate_pose(time, out),
            Self::TwoWayBlend(b) => b.evaluate_pose(time, out),
        }
    }

    pub fn tick_notifies(
        &mut self,
        mesh_component: MeshComponentId,
        sweep: NotifySweep,
        target: &mut dyn NotifyTarget,
    ) {
        match self {
            Self::Sequence(s) => s.base.tick_notifies(mesh_component, sweep, target),
            Self::TwoWayBlend(b) => b.tick_notifies(mesh_component, sweep, target),
        }
    }

    pub fn end_active_notify_states(
        &mut self,
        mesh_component: MeshComponentId,
        time: f32,
        target: &mut dyn NotifyTarget,
    ) {
        match self {
            Self::Sequence(s) => s.base.end_active_notify_states(mesh_component, time, target),
            Self::TwoWayBlend(b) => {
                b.a.base.end_active_notify_states(mesh_component, time, target);
                b.b.base.end_active_notify_states(mesh_component, time, target);
            }
        }
    }

    pub fn reset_notify_states(&mut self) {
        match self {
            Self::Sequence(s) => s.base.reset_notify_states(),
            Self::TwoWayBlend(b) => {
                b.a.base.reset_notify_states();
                b.b.base.reset_notify_states();
            }
        }
    }
}

impl From<AnimSequence> for AnimationAsset {
    fn from(value: AnimSequence) -> Self {
        Self::Sequence(value)
    }
}

impl From<TwoWayBlend> for AnimationAsset {
    fn from(value: TwoWayBlend) -> Self {
        Self::TwoWayBlend(value)
    }
}
