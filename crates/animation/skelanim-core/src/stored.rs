use std::sync::Arc;

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::data_model::{AnimDataModel, BoneAnimationTrack, Interpolation};
use crate::error::AnimError;
use crate::notify::AnimNotifyEvent;
use crate::sequence::AnimSequence;
use crate::skeleton::{MeshBone, ReferenceSkeleton};
use crate::transform::{quat_from_xyzw, Transform};

/// Public API: parse skeleton JSON (see fixtures/skeletons/*.json) into a
/// validated [`ReferenceSkeleton`].
///
/// Notes:
/// - Bones are listed parent-before-child; `parent` is `null` for roots.
/// - Bind transforms default to identity when omitted.
/// - Rotations are `[x, y, z, w]` and are normalized on load.
pub fn parse_reference_skeleton_json(s: &str) -> Result<ReferenceSkeleton, AnimError> {
    let stored: StoredSkeleton = serde_json::from_str(s)?;
    let bones = stored
        .bones
        .into_iter()
        .map(|b| {
            let bind = Transform::from_arrays(b.translation, b.rotation, b.scale);
            MeshBone::new(b.name, b.parent, bind)
        })
        .collect();
    ReferenceSkeleton::new(bones)
}

/// Public API: parse animation JSON (see fixtures/animations/*.json) into an
/// [`AnimSequence`] bound to `skeleton`.
///
/// Every track edit goes through the data controller, so the usual edit
/// rules apply: duplicate tracks and key arrays that do not hold
/// `number_of_frames + 1` entries are rejected with
/// [`AnimError::TrackRejected`]. Tracks naming a bone the skeleton lacks
/// fail with [`AnimError::BoneNotFound`].
pub fn parse_anim_sequence_json(
    s: &str,
    skeleton: Arc<ReferenceSkeleton>,
) -> Result<AnimSequence, AnimError> {
    let stored: StoredAnimSequence = serde_json::from_str(s)?;

    let mut model = AnimDataModel::new(stored.frame_rate)?.with_skeleton(Arc::clone(&skeleton));
    let mut ctrl = model.controller();
    if !ctrl.set_number_of_frames(stored.number_of_frames) {
        return Err(AnimError::new(format!(
            "invalid frame count {} in {}",
            stored.number_of_frames, stored.name
        )));
    }

    for track in stored.tracks {
        if skeleton.find_bone_index(&track.name).is_none() {
            return Err(AnimError::BoneNotFound { name: track.name });
        }
        if ctrl.add_bone_track(&track.name).is_none() {
            return Err(AnimError::TrackRejected {
                name: track.name,
                reason: "duplicate track or track limit reached".into(),
            });
        }
        let pos: Vec<_> = track.pos_keys.iter().copied().map(Vector3::from).collect();
        let rot: Vec<_> = track.rot_keys.iter().copied().map(quat_from_xyzw).collect();
        let scale: Vec<_> = track.scale_keys.iter().copied().map(Vector3::from).collect();
        if !ctrl.set_bone_track_keys(&track.name, &pos, &rot, &scale) {
            return Err(AnimError::TrackRejected {
                name: track.name,
                reason: format!(
                    "key arrays ({}, {}, {}) do not match {} keys",
                    pos.len(),
                    rot.len(),
                    scale.len(),
                    i64::from(stored.number_of_frames) + 1
                ),
            });
        }
    }

    let mut sequence =
        AnimSequence::new(stored.name, Arc::new(model)).with_interpolation(stored.interpolation);
    for track in stored.notify_tracks {
        sequence.base.add_notify_track(track);
    }
    for n in stored.notifies {
        let event = AnimNotifyEvent::state(n.name, n.time, n.duration, n.track);
        let name = event.name.clone();
        if !sequence.base.add_notify(event) {
            return Err(AnimError::new(format!(
                "notify {name} references missing notify track {}",
                n.track
            )));
        }
    }
    Ok(sequence)
}

/// Public API: serialize a data model's tracks. The output parses back with
/// [`parse_anim_sequence_json`].
pub fn export_anim_data_model_json(name: &str, model: &AnimDataModel) -> Result<String, AnimError> {
    let out = ExportedDataModel {
        name,
        frame_rate: model.frame_rate(),
        number_of_frames: model.number_of_frames(),
        tracks: model.tracks(),
    };
    Ok(serde_json::to_string_pretty(&out)?)
}

// ----- JSON schema (serde) -----

#[derive(Debug, Deserialize)]
struct StoredSkeleton {
    bones: Vec<StoredBone>,
}

#[derive(Debug, Deserialize)]
struct StoredBone {
    name: String,
    #[serde(default)]
    parent: Option<usize>,
    #[serde(default)]
    translation: [f32; 3],
    #[serde(default = "identity_rotation")]
    rotation: [f32; 4],
    #[serde(default = "unit_scale")]
    scale: [f32; 3],
}

fn identity_rotation() -> [f32; 4] {
    [0.0, 0.0, 0.0, 1.0]
}

fn unit_scale() -> [f32; 3] {
    [1.0, 1.0, 1.0]
}

#[derive(Debug, Deserialize)]
struct StoredAnimSequence {
    name: String,
    frame_rate: i32,
    number_of_frames: i32,
    #[serde(default)]
    interpolation: Interpolation,
    #[serde(default)]
    tracks: Vec<StoredTrack>,
    #[serde(default)]
    notify_tracks: Vec<String>,
    #[serde(default)]
    notifies: Vec<StoredNotify>,
}

/// `skeleton_bone_index` may be present (exported files) but is re-resolved
/// by name against the target skeleton.
#[derive(Debug, Deserialize)]
struct StoredTrack {
    name: String,
    pos_keys: Vec<[f32; 3]>,
    rot_keys: Vec<[f32; 4]>,
    scale_keys: Vec<[f32; 3]>,
}

#[derive(Debug, Deserialize)]
struct StoredNotify {
    name: String,
    time: f32,
    #[serde(default)]
    duration: f32,
    #[serde(default)]
    track: usize,
}

#[derive(Serialize)]
struct ExportedDataModel<'a> {
    name: &'a str,
    frame_rate: i32,
    number_of_frames: i32,
    tracks: &'a [BoneAnimationTrack],
}
