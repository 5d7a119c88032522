use criterion::{black_box, criterion_group, criterion_main, Criterion};
use nalgebra::Point3;

use racer_rl_core::Environment;
use racer_rl_env::{
    Arena, CheckpointCourseEnv, DriveAction, EpisodeController, Pose, RacerConfig, SeekCheckpointPolicy,
};

fn bench_controller_tick(c: &mut Criterion) {
    let config = RacerConfig::default();
    let arena = Arena::new(&config.course);
    let course = std::sync::Arc::new(arena.checkpoint_course().unwrap());
    let start = Pose::from(config.course.start);
    let mut controller = EpisodeController::new(config.agent.clone(), course, &start).unwrap();

    let mut z = start.position.z;
    c.bench_function("controller_tick", |b| {
        b.iter(|| {
            z -= 0.01;
            controller.tick(black_box(&Point3::new(start.position.x, start.position.y, z)))
        });
    });

    c.bench_function("controller_observe", |b| {
        b.iter(|| controller.observe(black_box(&start), 0.0, &arena));
    });
}

fn bench_full_episode(c: &mut Criterion) {
    let policy = SeekCheckpointPolicy::default();
    c.bench_function("seek_episode", |b| {
        b.iter(|| {
            tokio_test::block_on(async {
                let mut env = CheckpointCourseEnv::new(RacerConfig::default()).unwrap();
                let (mut obs, _) = env.reset().await.unwrap();
                loop {
                    let step = env.step(policy.decide(&obs)).await.unwrap();
                    if step.done {
                        break step.reward;
                    }
                    obs = step.observation;
                }
            })
        });
    });

    c.bench_function("idle_step", |b| {
        let mut env = CheckpointCourseEnv::new(RacerConfig::default()).unwrap();
        tokio_test::block_on(env.reset()).unwrap();
        b.iter(|| tokio_test::block_on(env.step(DriveAction::IDLE)).unwrap());
    });
}

criterion_group!(benches, bench_controller_tick, bench_full_episode);
criterion_main!(benches);
