use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use skelanim_core::{
    blend_two_poses_together, parse_anim_sequence_json, parse_reference_skeleton_json, AnimInstance,
    AnimSequence, BoneContainer, CompactPose, Config, LocomotionState, MeshComponentId, NotifyLog,
    ReferenceSkeleton,
};

fn humanoid() -> Arc<ReferenceSkeleton> {
    let json = skelanim_test_fixtures::skeletons::json("humanoid").expect("humanoid fixture");
    Arc::new(parse_reference_skeleton_json(&json).expect("parse humanoid"))
}

fn sequence(name: &str, skeleton: &Arc<ReferenceSkeleton>) -> AnimSequence {
    let json = skelanim_test_fixtures::animations::json(name).expect("animation fixture");
    parse_anim_sequence_json(&json, Arc::clone(skeleton)).expect("parse animation")
}

fn bench_pose_evaluate(c: &mut Criterion) {
    let skeleton = humanoid();
    let container = Arc::new(BoneContainer::full(Arc::clone(&skeleton)));
    let run = sequence("naruto_run", &skeleton);
    let dance = sequence("dance", &skeleton);

    c.bench_function("sequence_evaluate_pose", |b| {
        let mut pose = CompactPose::new(Arc::clone(&container));
        let mut t = 0.0f64;
        b.iter(|| {
            t = (t + 1.0 / 60.0) % run.play_length();
            run.evaluate_pose(black_box(t), &mut pose);
        });
    });

    c.bench_function("blend_two_poses", |b| {
        let mut a = CompactPose::new(Arc::clone(&container));
        let mut d = CompactPose::new(Arc::clone(&container));
        let mut out = CompactPose::new(Arc::clone(&container));
        run.evaluate_pose(0.13, &mut a);
        dance.evaluate_pose(0.31, &mut d);
        b.iter(|| blend_two_poses_together(&a, &d, black_box(0.4), &mut out));
    });

    c.bench_function("instance_tick_60hz", |b| {
        let mut inst =
            AnimInstance::new(Arc::clone(&container), MeshComponentId(0), Config::default());
        inst.set_state_asset(LocomotionState::Idle, run.clone());
        let mut log = NotifyLog::new();
        b.iter(|| {
            inst.tick(black_box(1.0 / 60.0), &mut log);
            log.clear();
        });
    });
}

criterion_group!(benches, bench_pose_evaluate);
criterion_main!(benches);
