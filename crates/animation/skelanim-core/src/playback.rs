//! Per-instance playback controller.
//!
//! An [`AnimInstance`] owns its playback clock, its locomotion state machine,
//! one asset slot per locomotion state and the output pose. Each tick:
//! 1. Update the locomotion state; on a change, switch slots and start a
//!    cross-fade from the last output pose.
//! 2. Advance `elapsed_time` by `delta * play_rate`, negated when reversed.
//! 3. Apply the loop wrap, fire notifies over the swept range, then apply the
//!    non-looping stop. Wrap detection uses the unwrapped clock, and the stop
//!    direction follows the sign of the step.
//! 4. Evaluate the current asset into the output pose and blend in the
//!    cross-fade.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bone_container::BoneContainer;
use crate::config::Config;
use crate::ids::MeshComponentId;
use crate::locomotion::{LocomotionState, LocomotionStateMachine};
use crate::notify::{NotifySweep, NotifyTarget};
use crate::pose::CompactPose;
use crate::runtime::blend_two_poses_together;
use crate::sequence::AnimationAsset;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub elapsed_time: f64,
    pub previous_time: f64,
    pub play_rate: f32,
    pub looping: bool,
    pub reverse: bool,
    pub playing: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            elapsed_time: 0.0,
            previous_time: 0.0,
            play_rate: 1.0,
            looping: true,
            reverse: false,
            playing: true,
        }
    }
}

#[derive(Clone, Debug)]
struct CrossFade {
    from: CompactPose,
    elapsed: f32,
    duration: f32,
}

/// Floored modulo; zero divisor yields zero.
fn fmod(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        return 0.0;
    }
    let m = a % b;
    if (m < 0.0 && b > 0.0) || (m > 0.0 && b < 0.0) {
        m + b
    } else {
        m
    }
}

/// Wrap `t` into `[start, end)`. Returns `None` when `t` is already inside.
fn wrap_time(t: f64, start: f64, end: f64) -> Option<f64> {
    let range = end - start;
    let wrapped = if t >= end {
        start + fmod(t - start, range)
    } else if t < start {
        end - fmod(end - t, range)
    } else {
        return None;
    };
    Some(if wrapped >= end { start } else { wrapped })
}

pub struct AnimInstance {
    mesh_component: MeshComponentId,
    cfg: Config,
    playback: PlaybackState,
    locomotion: LocomotionStateMachine,
    slots: [Option<AnimationAsset>; 5],
    pose: CompactPose,
    scratch: CompactPose,
    fade: Option<CrossFade>,
}

impl AnimInstance {
    pub fn new(
        container: Arc<BoneContainer>,
        mesh_component: MeshComponentId,
        cfg: Config,
    ) -> Self {
        let playback = PlaybackState {
            play_rate: cfg.default_play_rate,
            ..PlaybackState::default()
        };
        Self {
            mesh_component,
            cfg,
            playback,
            locomotion: LocomotionStateMachine::new(),
            slots: Default::default(),
            pose: CompactPose::new(Arc::clone(&container)),
            scratch: CompactPose::new(container),
            fade: None,
        }
    }

    #[inline]
    pub fn mesh_component(&self) -> MeshComponentId {
        self.mesh_component
    }

    #[inline]
    pub fn playback_state(&self) -> &PlaybackState {
        &self.playback
    }

    #[inline]
    pub fn locomotion_state(&self) -> LocomotionState {
        self.locomotion.state()
    }

    #[inline]
    pub fn locomotion(&self) -> &LocomotionStateMachine {
        &self.locomotion
    }

    /// Gameplay signals (`move_fast`, `set_dancing`, ...) go through here.
    #[inline]
    pub fn locomotion_mut(&mut self) -> &mut LocomotionStateMachine {
        &mut self.locomotion
    }

    /// The most recently evaluated pose.
    #[inline]
    pub fn pose(&self) -> &CompactPose {
        &self.pose
    }

    #[inline]
    pub fn is_blending(&self) -> bool {
        self.fade.is_some()
    }

    pub fn set_state_asset(&mut self, state: LocomotionState, asset: impl Into<AnimationAsset>) {
        self.slots[state.index()] = Some(asset.into());
    }

    pub fn clear_state_asset(&mut self, state: LocomotionState) -> Option<AnimationAsset> {
        self.slots[state.index()].take()
    }

    pub fn asset(&self, state: LocomotionState) -> Option<&AnimationAsset> {
        self.slots[state.index()].as_ref()
    }

    pub fn current_asset(&self) -> Option<&AnimationAsset> {
        self.asset(self.locomotion.state())
    }

    /// Rebind the output pose to another container, dropping any cross-fade.
    pub fn set_bone_container(&mut self, container: Arc<BoneContainer>) {
        self.pose.set_bone_container(Arc::clone(&container));
        self.scratch.set_bone_container(container);
        self.fade = None;
    }

    pub fn play(&mut self) {
        self.playback.playing = true;
    }

    pub fn pause(&mut self) {
        self.playback.playing = false;
    }

    /// Stop advancing and end any active state notifies.
    pub fn stop(&mut self, target: &mut dyn NotifyTarget) {
        self.playback.playing = false;
        let time = self.playback.elapsed_time as f32;
        if let Some(asset) = self.slots[self.locomotion.state().index()].as_mut() {
            asset.end_active_notify_states(self.mesh_component, time, target);
        }
        debug!(mesh = self.mesh_component.0, time, "playback stopped");
    }

    pub fn set_play_rate(&mut self, rate: f32) {
        if !rate.is_finite() {
            warn!(rate, "ignored non-finite play rate");
            return;
        }
        self.playback.play_rate = rate;
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.playback.looping = looping;
    }

    pub fn set_reverse(&mut self, reverse: bool) {
        self.playback.reverse = reverse;
    }

    /// Jump to `seconds` (clamped to the current asset) without firing notifies.
    pub fn set_position(&mut self, seconds: f64) {
        let length = self.current_asset().map_or(0.0, AnimationAsset::play_length);
        let t = seconds.clamp(0.0, length.max(0.0));
        self.playback.elapsed_time = t;
        self.playback.previous_time = t;
    }

    /// Advance one tick and re-evaluate the output pose.
    pub fn tick(&mut self, delta_seconds: f32, target: &mut dyn NotifyTarget) {
        let from = self.locomotion.state();
        let to = self.locomotion.update();
        if from != to {
            self.switch_state(from, to, target);
        }

        let mesh = self.mesh_component;
        let Some(asset) = self.slots[to.index()].as_mut() else {
            return;
        };

        if self.playback.playing {
            let direction = if self.playback.reverse { -1.0 } else { 1.0 };
            let delta = delta_seconds as f64 * self.playback.play_rate as f64 * direction;
            let (start, end) = (0.0, asset.play_length());

            self.playback.previous_time = self.playback.elapsed_time;
            self.playback.elapsed_time += delta;

            let mut wrapped = false;
            let mut full_loop = false;
            if self.playback.looping {
                let range = end - start;
                if range <= self.cfg.loop_range_epsilon {
                    warn!(length = range, "loop range too small; holding at start");
                    self.playback.elapsed_time = start;
                } else if let Some(t) = wrap_time(self.playback.elapsed_time, start, end) {
                    wrapped = true;
                    full_loop = delta.abs() >= range;
                    self.playback.elapsed_time = t;
                }
            }

            let sweep = NotifySweep {
                current_time: self.playback.elapsed_time as f32,
                previous_time: self.playback.previous_time as f32,
                delta_time: delta as f32,
                wrapped,
                full_loop,
            };
            asset.tick_notifies(mesh, sweep, target);

            if !self.playback.looping {
                let elapsed = self.playback.elapsed_time;
                let stop_at = if delta > 0.0 && elapsed >= end {
                    Some(start)
                } else if delta < 0.0 && elapsed <= start {
                    Some(end)
                } else {
                    None
                };
                if let Some(t) = stop_at {
                    asset.end_active_notify_states(mesh, elapsed as f32, target);
                    self.playback.elapsed_time = t;
                    self.playback.playing = false;
                    debug!(
                        mesh = mesh.0,
                        asset = asset.name(),
                        time = t,
                        "non-looping playback finished"
                    );
                }
            }
        }

        asset.evaluate_pose(self.playback.elapsed_time, &mut self.pose);

        if let Some(fade) = self.fade.as_mut() {
            fade.elapsed += delta_seconds.abs();
            let weight_of_from = 1.0 - (fade.elapsed / fade.duration).clamp(0.0, 1.0);
            if weight_of_from <= 0.0 {
                self.fade = None;
            } else if self.scratch.copy_from(&self.pose) {
                blend_two_poses_together(&fade.from, &self.scratch, weight_of_from, &mut self.pose);
            }
        }
    }

    fn switch_state(
        &mut self,
        from: LocomotionState,
        to: LocomotionState,
        target: &mut dyn NotifyTarget,
    ) {
        let time = self.playback.elapsed_time as f32;
        if let Some(old) = self.slots[from.index()].as_mut() {
            old.end_active_notify_states(self.mesh_component, time, target);
            old.reset_notify_states();
        }

        let start = match self.slots[to.index()].as_mut() {
            Some(new) => {
                new.reset_notify_states();
                if self.playback.reverse {
                    new.play_length()
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.playback.elapsed_time = start;
        self.playback.previous_time = start;

        self.fade = (self.cfg.locomotion_blend_time > 0.0).then(|| CrossFade {
            from: self.pose.clone(),
            elapsed: 0.0,
            duration: self.cfg.locomotion_blend_time,
        });
        debug!(mesh = self.mesh_component.0, ?from, ?to, "locomotion slot switched");
    }
}
