use std::sync::Arc;

use skelanim_core::{
    parse_anim_sequence_json, parse_reference_skeleton_json, AnimInstance, AnimSequence,
    AnimationAsset, BasePose, BoneContainer, CompactPose, Config, LocomotionState,
    MeshComponentId, NotifyCall, NotifyLog, ReferenceSkeleton, TwoWayBlend,
};

fn humanoid() -> Arc<ReferenceSkeleton> {
    let json = skelanim_test_fixtures::skeletons::json("humanoid").expect("load humanoid skeleton");
    Arc::new(parse_reference_skeleton_json(&json).expect("parse humanoid skeleton"))
}

fn sequence(name: &str, skeleton: &Arc<ReferenceSkeleton>) -> AnimSequence {
    let json = skelanim_test_fixtures::animations::json(name).expect("load animation fixture");
    parse_anim_sequence_json(&json, Arc::clone(skeleton)).expect("parse animation fixture")
}

fn locomotion_instance() -> (AnimInstance, Arc<ReferenceSkeleton>) {
    let skeleton = humanoid();
    let container = Arc::new(BoneContainer::full(Arc::clone(&skeleton)));
    let mut inst = AnimInstance::new(container, MeshComponentId(7), Config::default());
    inst.set_state_asset(LocomotionState::Idle, sequence("idle", &skeleton));
    inst.set_state_asset(LocomotionState::SlowRun, sequence("slow_run", &skeleton));
    inst.set_state_asset(LocomotionState::NarutoRun, sequence("naruto_run", &skeleton));
    inst.set_state_asset(LocomotionState::Dance, sequence("dance", &skeleton));
    (inst, skeleton)
}

#[test]
fn speed_signals_drive_slot_selection() {
    let (mut inst, _) = locomotion_instance();
    let mut log = NotifyLog::new();
    let mut seen = vec![inst.locomotion_state()];
    for up in [true, true, true, false, false] {
        if up {
            inst.locomotion_mut().move_fast();
        } else {
            inst.locomotion_mut().move_slow();
        }
        inst.tick(0.05, &mut log);
        seen.push(inst.locomotion_state());
        assert_eq!(
            inst.current_asset().map(AnimationAsset::name),
            Some(match inst.locomotion_state() {
                LocomotionState::Idle => "idle",
                LocomotionState::SlowRun => "slow_run",
                LocomotionState::NarutoRun => "naruto_run",
                LocomotionState::Dance => "dance",
                LocomotionState::FastRun => {
                    unreachable!("FastRun is not reachable through signals")
                }
            })
        );
    }
    use LocomotionState::*;
    assert_eq!(seen, vec![Idle, SlowRun, SlowRun, NarutoRun, NarutoRun, SlowRun]);
}

#[test]
fn state_change_restarts_clock_and_cross_fades() {
    let (mut inst, skeleton) = locomotion_instance();
    let mut log = NotifyLog::new();
    inst.tick(0.3, &mut log);
    assert!(!inst.is_blending());

    inst.locomotion_mut().move_fast();
    inst.tick(0.05, &mut log);
    assert_eq!(inst.locomotion_state(), LocomotionState::SlowRun);
    assert!(inst.is_blending());
    assert!((inst.playback_state().elapsed_time - 0.05).abs() < 1e-6);

    let thigh = inst
        .pose()
        .container()
        .get_compact_index(skeleton.find_bone_index("thigh_l").unwrap())
        .unwrap();
    let mut target = CompactPose::new(Arc::clone(inst.pose().container()));
    inst.current_asset()
        .unwrap()
        .evaluate_pose(inst.playback_state().elapsed_time, &mut target);
    assert_ne!(inst.pose()[thigh].rotation, target[thigh].rotation);

    for _ in 0..5 {
        inst.tick(0.05, &mut log);
    }
    assert!(!inst.is_blending());
    inst.current_asset()
        .unwrap()
        .evaluate_pose(inst.playback_state().elapsed_time, &mut target);
    assert_eq!(inst.pose().bones(), target.bones());
}

#[test]
fn dance_overrides_and_returns_to_idle() {
    let (mut inst, _) = locomotion_instance();
    let mut log = NotifyLog::new();
    inst.locomotion_mut().move_fast();
    inst.locomotion_mut().set_dancing(true);
    inst.tick(0.05, &mut log);
    assert_eq!(inst.locomotion_state(), LocomotionState::Dance);

    inst.locomotion_mut().toggle_dance();
    inst.tick(0.05, &mut log);
    assert_eq!(inst.locomotion_state(), LocomotionState::Idle);
}

#[test]
fn leaving_a_state_ends_its_active_notifies() {
    let (mut inst, _) = locomotion_instance();
    let mut log = NotifyLog::new();
    inst.locomotion_mut().set_dancing(true);
    // Dance spotlight window is [0.1, 0.4)
    for _ in 0..3 {
        inst.tick(0.1, &mut log);
    }
    let spotlight_began = log.calls().iter().any(|c| {
        matches!(
            c,
            NotifyCall::Begin { name, mesh_component: 7, .. } if name == "spotlight"
        )
    });
    assert!(spotlight_began);

    inst.locomotion_mut().set_dancing(false);
    inst.tick(0.1, &mut log);
    assert_eq!(inst.locomotion_state(), LocomotionState::Idle);
    let last_spotlight = log.calls().iter().rev().find(|c| c.name() == "spotlight");
    assert!(matches!(last_spotlight, Some(NotifyCall::End { .. })));
    assert!(inst.asset(LocomotionState::Dance).is_some());
}

#[test]
fn two_way_blend_can_fill_a_slot() {
    let (mut inst, skeleton) = locomotion_instance();
    let blend = TwoWayBlend::new(
        "jog",
        sequence("slow_run", &skeleton),
        sequence("naruto_run", &skeleton),
        0.75,
    );
    inst.set_state_asset(LocomotionState::Idle, blend);
    let mut log = NotifyLog::new();
    for _ in 0..20 {
        inst.tick(0.05, &mut log);
        let asset = inst.current_asset().unwrap();
        assert!(inst.playback_state().elapsed_time < asset.play_length());
        assert!(!inst.pose().contains_nan());
    }
    // naruto_run dominates at 0.75, so its footsteps fire
    assert!(log.calls().iter().any(|c| c.name() == "footstep_l"));
    assert!(log.calls().iter().all(|c| c.name() != "spotlight"));
}
