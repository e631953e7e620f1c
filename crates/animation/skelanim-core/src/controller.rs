//! Single-writer edit API over an [`AnimDataModel`].
//!
//! The controller holds the model's only mutable borrow, so every edit is
//! routed through here. Edits report failure through `bool`/`Option` rather
//! than errors; rejected edits leave the model untouched.

use std::sync::Arc;

use nalgebra::{UnitQuaternion, Vector3};
use tracing::{debug, warn};

use crate::data_model::{AnimDataModel, BoneAnimationTrack};
use crate::skeleton::ReferenceSkeleton;

pub struct AnimDataController<'a> {
    model: &'a mut AnimDataModel,
}

impl<'a> AnimDataController<'a> {
    pub fn new(model: &'a mut AnimDataModel) -> Self {
        Self { model }
    }

    #[inline]
    pub fn model(&self) -> &AnimDataModel {
        self.model
    }

    /// Bind the skeleton used to resolve bone names. Existing tracks keep their
    /// indices; call [`Self::remove_bone_tracks_missing_from_skeleton`] to
    /// reconcile them.
    pub fn set_skeleton(&mut self, skeleton: Arc<ReferenceSkeleton>) {
        self.model.skeleton = Some(skeleton);
    }

    pub fn set_frame_rate(&mut self, frame_rate: i32) -> bool {
        if frame_rate <= 0 {
            warn!(frame_rate, "rejected non-positive frame rate");
            return false;
        }
        self.model.frame_rate = frame_rate;
        debug!(frame_rate, "frame rate set");
        true
    }

    /// Set the frame count, padding every track with copies of its last key
    /// or truncating from the end.
    pub fn set_number_of_frames(&mut self, number_of_frames: i32) -> bool {
        if number_of_frames < 0 {
            warn!(number_of_frames, "rejected negative frame count");
            return false;
        }
        let Some(number_of_keys) = number_of_frames.checked_add(1) else {
            warn!(number_of_frames, "rejected frame count with no room for a trailing key");
            return false;
        };
        let keys = number_of_keys as usize;
        for track in &mut self.model.tracks {
            let last = track.key(track.num_keys() as i32 - 1).unwrap_or_default();
            track.pos_keys.resize(keys, last.translation);
            track.rot_keys.resize(keys, last.rotation);
            track.scale_keys.resize(keys, last.scale);
        }
        self.model.number_of_frames = number_of_frames;
        self.model.number_of_keys = number_of_keys;
        debug!(number_of_frames, "frame count set");
        true
    }

    /// Change the frame count by inserting or removing the frames `[t0, t1)`.
    ///
    /// Growing inserts `t1 - t0` copies of the key at `t0`; shrinking removes
    /// the keys in `[t0, t1)`. The span must match the length change, and an
    /// empty or inverted span (`t0 >= t1`) is always rejected.
    pub fn resize_number_of_frames(&mut self, new_length: i32, t0: i32, t1: i32) -> bool {
        if t0 >= t1 {
            warn!(t0, t1, "rejected resize with empty frame span");
            return false;
        }
        if new_length < 0 || t0 < 0 {
            warn!(new_length, t0, "rejected resize with negative bounds");
            return false;
        }
        let Some(number_of_keys) = new_length.checked_add(1) else {
            warn!(new_length, "rejected frame count with no room for a trailing key");
            return false;
        };
        let delta = new_length - self.model.number_of_frames;
        let span = t1 - t0;
        if delta != 0 && span != delta.abs() {
            warn!(new_length, t0, t1, "resize span does not match length change");
            return false;
        }

        let keys = self.model.number_of_keys as usize;
        let (start, end) = (t0 as usize, t1 as usize);
        if delta > 0 {
            if start > keys {
                warn!(t0, keys, "resize insertion point past the last key");
                return false;
            }
            let count = end - start;
            for track in &mut self.model.tracks {
                let src = start.min(track.num_keys().saturating_sub(1));
                let fill = track.key(src as i32).unwrap_or_default();
                insert_copies(&mut track.pos_keys, start, count, fill.translation);
                insert_copies(&mut track.rot_keys, start, count, fill.rotation);
                insert_copies(&mut track.scale_keys, start, count, fill.scale);
            }
        } else if delta < 0 {
            if end > keys {
                warn!(t1, keys, "resize removal span past the last key");
                return false;
            }
            for track in &mut self.model.tracks {
                track.pos_keys.drain(start..end);
                track.rot_keys.drain(start..end);
                track.scale_keys.drain(start..end);
            }
        }

        self.model.number_of_frames = new_length;
        self.model.number_of_keys = number_of_keys;
        debug!(new_length, t0, t1, "frames resized");
        true
    }

    /// Add an empty track for `name`, keyed with the bone's bind pose.
    ///
    /// Returns `None` for duplicates, when the track budget is exhausted, or
    /// when the bone cannot be resolved against the bound skeleton.
    pub fn add_bone_track(&mut self, name: &str) -> Option<usize> {
        if self.model.track_lookup.contains_key(name) {
            debug!(name, "bone track already present");
            return None;
        }
        if self.model.tracks.len() >= self.model.cfg.max_animation_tracks {
            warn!(name, max = self.model.cfg.max_animation_tracks, "track budget exhausted");
            return None;
        }
        let Some(skeleton) = self.model.skeleton.as_ref() else {
            warn!(name, "no skeleton bound; cannot add bone track");
            return None;
        };
        let Some(bone) = skeleton.find_bone_index(name) else {
            warn!(name, "bone not found on skeleton");
            return None;
        };

        let bind = skeleton.bind_pose()[bone];
        let keys = self.model.number_of_keys as usize;
        let track = BoneAnimationTrack {
            name: name.to_string(),
            skeleton_bone_index: bone,
            pos_keys: vec![bind.translation; keys],
            rot_keys: vec![bind.rotation; keys],
            scale_keys: vec![bind.scale; keys],
        };
        let index = self.model.tracks.len();
        self.model.tracks.push(track);
        self.model.track_lookup.insert(name.to_string(), index);
        debug!(name, index, "bone track added");
        Some(index)
    }

    pub fn remove_bone_track(&mut self, name: &str) -> bool {
        let Some(index) = self.model.get_bone_track_index(name) else {
            return false;
        };
        self.model.tracks.remove(index);
        self.model.rebuild_track_lookup();
        debug!(name, "bone track removed");
        true
    }

    pub fn remove_all_bone_tracks(&mut self) {
        self.model.tracks.clear();
        self.model.track_lookup.clear();
        debug!("all bone tracks removed");
    }

    /// Replace the keys of an existing track. All three arrays must have one
    /// entry per key.
    pub fn set_bone_track_keys(
        &mut self,
        name: &str,
        pos_keys: &[Vector3<f32>],
        rot_keys: &[UnitQuaternion<f32>],
        scale_keys: &[Vector3<f32>],
    ) -> bool {
        let Some(index) = self.model.get_bone_track_index(name) else {
            warn!(name, "no bone track to key");
            return false;
        };
        let len = pos_keys.len();
        if rot_keys.len() != len || scale_keys.len() != len {
            warn!(
                name,
                pos = len,
                rot = rot_keys.len(),
                scale = scale_keys.len(),
                "key arrays differ in length"
            );
            return false;
        }
        if len != self.model.number_of_keys as usize {
            warn!(name, len, expected = self.model.number_of_keys, "key count mismatch");
            return false;
        }
        let track = &mut self.model.tracks[index];
        track.pos_keys = pos_keys.to_vec();
        track.rot_keys = rot_keys.to_vec();
        track.scale_keys = scale_keys.to_vec();
        debug!(name, len, "bone track keyed");
        true
    }

    /// Rebind to `skeleton`: tracks whose bone moved are relocated, tracks
    /// whose bone no longer exists are removed. Returns the removed count.
    pub fn remove_bone_tracks_missing_from_skeleton(
        &mut self,
        skeleton: Arc<ReferenceSkeleton>,
    ) -> usize {
        let before = self.model.tracks.len();
        self.model.tracks.retain_mut(|track| match skeleton.find_bone_index(&track.name) {
            Some(bone) => {
                if bone != track.skeleton_bone_index {
                    debug!(
                        name = %track.name,
                        from = track.skeleton_bone_index,
                        to = bone,
                        "bone track relocated"
                    );
                    track.skeleton_bone_index = bone;
                }
                true
            }
            None => {
                warn!(name = %track.name, "bone missing from skeleton; track removed");
                false
            }
        });
        self.model.rebuild_track_lookup();
        self.model.skeleton = Some(skeleton);
        before - self.model.tracks.len()
    }
}

fn insert_copies<T: Copy>(keys: &mut Vec<T>, at: usize, count: usize, value: T) {
    let at = at.min(keys.len());
    keys.splice(at..at, std::iter::repeat(value).take(count));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::skeleton::MeshBone;
    use crate::transform::Transform;

    fn skeleton(names: &[&str]) -> Arc<ReferenceSkeleton> {
        let bones = names
            .iter()
            .enumerate()
            .map(|(i, n)| MeshBone::new(*n, i.checked_sub(1), Transform::identity()))
            .collect();
        Arc::new(ReferenceSkeleton::new(bones).unwrap())
    }

    fn model_with_frames(frames: i32) -> AnimDataModel {
        let mut model = AnimDataModel::new(30)
            .unwrap()
            .with_skeleton(skeleton(&["root", "spine", "head"]));
        assert!(model.controller().set_number_of_frames(frames));
        model
    }

    fn xs(model: &AnimDataModel, name: &str) -> Vec<f32> {
        model.find_bone_track(name).unwrap().pos_keys.iter().map(|p| p.x).collect()
    }

    fn key_track(ctrl: &mut AnimDataController<'_>, name: &str, xs: &[f32]) -> bool {
        let pos: Vec<_> = xs.iter().map(|x| Vector3::new(*x, 0.0, 0.0)).collect();
        let rot = vec![UnitQuaternion::identity(); xs.len()];
        let scale = vec![Vector3::repeat(1.0); xs.len()];
        ctrl.set_bone_track_keys(name, &pos, &rot, &scale)
    }

    #[test]
    fn frame_count_at_integer_limit_is_rejected() {
        let mut model = model_with_frames(2);
        let mut ctrl = model.controller();
        assert!(!ctrl.set_number_of_frames(i32::MAX));
        assert!(!ctrl.resize_number_of_frames(i32::MAX, 0, i32::MAX - 2));
        assert_eq!(model.number_of_frames(), 2);
        assert_eq!(model.number_of_keys(), 3);
    }

    #[test]
    fn add_bone_track_rejects_duplicates_and_unknown_bones() {
        let mut model = model_with_frames(2);
        let mut ctrl = model.controller();
        assert_eq!(ctrl.add_bone_track("spine"), Some(0));
        assert_eq!(ctrl.add_bone_track("spine"), None);
        assert_eq!(ctrl.add_bone_track("tail"), None);
        assert_eq!(model.tracks().len(), 1);
        assert_eq!(model.tracks()[0].num_keys(), 3);
    }

    #[test]
    fn add_bone_track_requires_skeleton() {
        let mut model = AnimDataModel::new(30).unwrap();
        assert_eq!(model.controller().add_bone_track("root"), None);
    }

    #[test]
    fn add_bone_track_respects_track_budget() {
        let cfg = Config {
            max_animation_tracks: 1,
            ..Config::default()
        };
        let mut model = AnimDataModel::with_config(30, cfg)
            .unwrap()
            .with_skeleton(skeleton(&["root", "spine"]));
        let mut ctrl = model.controller();
        assert!(ctrl.add_bone_track("root").is_some());
        assert_eq!(ctrl.add_bone_track("spine"), None);
    }

    #[test]
    fn set_keys_requires_matching_lengths() {
        let mut model = model_with_frames(2);
        let mut ctrl = model.controller();
        ctrl.add_bone_track("root");
        assert!(!key_track(&mut ctrl, "root", &[0.0, 1.0]));
        let pos = vec![Vector3::zeros(); 3];
        let rot = vec![UnitQuaternion::identity(); 2];
        let scale = vec![Vector3::repeat(1.0); 3];
        assert!(!ctrl.set_bone_track_keys("root", &pos, &rot, &scale));
        assert!(!key_track(&mut ctrl, "head", &[0.0, 1.0, 2.0]));
        assert!(key_track(&mut ctrl, "root", &[0.0, 1.0, 2.0]));
        assert_eq!(xs(&model, "root"), vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn resize_rejects_empty_span() {
        let mut model = model_with_frames(4);
        let mut ctrl = model.controller();
        assert!(!ctrl.resize_number_of_frames(6, 2, 2));
        assert!(!ctrl.resize_number_of_frames(6, 3, 1));
        assert!(!ctrl.resize_number_of_frames(6, 1, 2));
        assert_eq!(model.number_of_frames(), 4);
    }

    #[test]
    fn resize_grows_by_duplicating_the_start_key() {
        let mut model = model_with_frames(3);
        let mut ctrl = model.controller();
        ctrl.add_bone_track("root");
        key_track(&mut ctrl, "root", &[0.0, 1.0, 2.0, 3.0]);
        assert!(ctrl.resize_number_of_frames(5, 1, 3));
        assert_eq!(model.number_of_frames(), 5);
        assert_eq!(model.number_of_keys(), 6);
        assert_eq!(xs(&model, "root"), vec![0.0, 1.0, 1.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn resize_shrinks_by_removing_the_span() {
        let mut model = model_with_frames(4);
        let mut ctrl = model.controller();
        ctrl.add_bone_track("root");
        key_track(&mut ctrl, "root", &[0.0, 1.0, 2.0, 3.0, 4.0]);
        assert!(ctrl.resize_number_of_frames(2, 1, 3));
        assert_eq!(model.number_of_keys(), 3);
        assert_eq!(xs(&model, "root"), vec![0.0, 3.0, 4.0]);
    }

    #[test]
    fn set_number_of_frames_pads_with_last_key() {
        let mut model = model_with_frames(1);
        let mut ctrl = model.controller();
        ctrl.add_bone_track("root");
        key_track(&mut ctrl, "root", &[0.0, 5.0]);
        assert!(ctrl.set_number_of_frames(3));
        assert_eq!(xs(&model, "root"), vec![0.0, 5.0, 5.0, 5.0]);
        assert!(!model.controller().set_number_of_frames(-1));
    }

    #[test]
    fn frame_rate_must_be_positive() {
        let mut model = model_with_frames(1);
        let mut ctrl = model.controller();
        assert!(!ctrl.set_frame_rate(0));
        assert!(ctrl.set_frame_rate(60));
        assert_eq!(model.frame_rate(), 60);
    }

    #[test]
    fn remove_tracks_keeps_lookup_consistent() {
        let mut model = model_with_frames(1);
        let mut ctrl = model.controller();
        ctrl.add_bone_track("root");
        ctrl.add_bone_track("spine");
        ctrl.add_bone_track("head");
        assert!(ctrl.remove_bone_track("spine"));
        assert!(!ctrl.remove_bone_track("spine"));
        assert_eq!(model.get_bone_track_index("head"), Some(1));
        model.controller().remove_all_bone_tracks();
        assert!(model.tracks().is_empty());
        assert_eq!(model.get_bone_track_index("root"), None);
    }

    #[test]
    fn reconciling_with_new_skeleton_relocates_and_removes() {
        let mut model = model_with_frames(1);
        let mut ctrl = model.controller();
        ctrl.add_bone_track("root");
        ctrl.add_bone_track("spine");
        ctrl.add_bone_track("head");
        let removed = ctrl.remove_bone_tracks_missing_from_skeleton(skeleton(&["root", "head"]));
        assert_eq!(removed, 1);
        assert_eq!(model.find_bone_track("head").unwrap().skeleton_bone_index, 1);
        assert!(model.find_bone_track("spine").is_none());
        assert_eq!(model.get_bone_track_index("head"), Some(1));
    }
}
