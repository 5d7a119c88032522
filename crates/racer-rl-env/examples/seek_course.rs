//! Example: scripted policy driving the default checkpoint course

use racer_rl_core::{Environment, Policy, TrackedEnvironment};
use racer_rl_env::{CheckpointCourseEnv, RacerConfig, SeekCheckpointPolicy, TimeLimit, TracingHooks};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = RacerConfig::default();
    let max_steps = config.max_steps;
    let env = CheckpointCourseEnv::new(config)?.with_hooks(TracingHooks::default());
    let mut env = TrackedEnvironment::new(TimeLimit::new(env, max_steps));
    let policy = SeekCheckpointPolicy::default();

    for episode in 0..3 {
        let (mut observation, _info) = env.reset().await?;
        loop {
            let action = policy.act(&observation).await?;
            let step = env.step(action).await?;
            if step.done || step.truncated {
                break;
            }
            observation = step.observation;
        }

        if let Some(info) = env.episode_info() {
            println!(
                "Episode {}: Total Reward = {:.3}, Steps = {}",
                episode + 1,
                info.total_reward,
                info.steps
            );
        }
    }

    env.close().await?;
    Ok(())
}
