// Command implementations for racerctl

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use racer_rl_core::{Environment, Policy, Step, TrackedEnvironment, Trajectory, Transition};
use racer_rl_env::{
    random_drive_policy, CarObservation, CheckpointCourseEnv, CheckpointStatus, DriveAction, EpisodeState,
    ManualPolicy, MotionConfig, RacerConfig, RewardScale, SeekCheckpointPolicy, TerminationReason, TimeLimit,
    TracingHooks,
};

use crate::PolicyKind;

type CarTrajectory = Trajectory<CarObservation, DriveAction>;
type DynPolicy = dyn Policy<Observation = CarObservation, Action = DriveAction>;

pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub episodes: usize,
    pub policy: PolicyKind,
    pub max_steps: Option<usize>,
    pub reward_scale: f64,
    pub record: Option<PathBuf>,
    pub gamma: f64,
    pub trace_rays: bool,
}

/// What happened in one episode
#[derive(Debug, Clone)]
pub struct EpisodeSummary {
    pub id: String,
    pub steps: usize,
    pub total_reward: f64,
    pub outcome: String,
    pub termination: Option<TerminationReason>,
    pub statuses: Vec<CheckpointStatus>,
    pub elapsed_ms: Option<i64>,
}

#[derive(Serialize)]
struct Recording<'a> {
    created_at: DateTime<Utc>,
    policy: String,
    gamma: f64,
    episodes: Vec<RecordedEpisode<'a>>,
}

#[derive(Serialize)]
struct RecordedEpisode<'a> {
    #[serde(flatten)]
    trajectory: &'a CarTrajectory,
    /// Discounted return from each step onward
    returns: Vec<f64>,
}

impl<'a> Recording<'a> {
    fn new(policy: PolicyKind, gamma: f64, trajectories: &'a [CarTrajectory]) -> Self {
        Self {
            created_at: Utc::now(),
            policy: format!("{policy:?}").to_lowercase(),
            gamma,
            episodes: trajectories
                .iter()
                .map(|trajectory| RecordedEpisode {
                    trajectory,
                    returns: trajectory.returns(gamma),
                })
                .collect(),
        }
    }
}

pub async fn run(options: RunOptions) -> Result<()> {
    let config = load_config(options.config.as_deref())?;
    let max_steps = options.max_steps.unwrap_or(config.max_steps);

    let env = CheckpointCourseEnv::new(config).context("Failed to build course environment")?.with_hooks(
        TracingHooks {
            rays: options.trace_rays,
        },
    );
    let env = RewardScale::new(TimeLimit::new(env, max_steps), options.reward_scale);
    let mut env = TrackedEnvironment::new(env);

    let policy: Box<DynPolicy> = match options.policy {
        PolicyKind::Seek => Box::new(SeekCheckpointPolicy::default()),
        PolicyKind::Random => Box::new(random_drive_policy()),
        PolicyKind::Idle => Box::new(IdlePolicy),
    };

    println!("🏎️  Running {} episode(s) with the {:?} policy", options.episodes, options.policy);
    println!("   Step budget: {max_steps}");

    let mut summaries = Vec::with_capacity(options.episodes);
    let mut trajectories = Vec::new();
    for _ in 0..options.episodes {
        let mut trajectory = options.record.as_ref().map(|_| CarTrajectory::new(String::new()));
        let summary = drive(&mut env, policy.as_ref(), trajectory.as_mut()).await?;
        print_summary(summaries.len() + 1, &summary);

        if let Some(mut trajectory) = trajectory {
            trajectory.episode_id.clone_from(&summary.id);
            trajectories.push(trajectory);
        }
        summaries.push(summary);
    }
    env.close().await?;

    if summaries.len() > 1 {
        let rewards: Vec<f64> = summaries.iter().map(|s| s.total_reward).collect();
        println!();
        for line in reward_graph(&rewards, 50, 10) {
            println!("{line}");
        }
        let completed = summaries
            .iter()
            .filter(|s| s.termination.is_some_and(TerminationReason::is_success))
            .count();
        println!("Completed: {completed}/{}", summaries.len());
    }

    if let Some(path) = options.record {
        let recording = Recording::new(options.policy, options.gamma, &trajectories);
        std::fs::write(&path, serde_json::to_string_pretty(&recording)?)
            .with_context(|| format!("Failed to write recording to {}", path.display()))?;
        println!("\n💾 Recorded {} episode(s) to {}", trajectories.len(), path.display());
    }

    Ok(())
}

pub async fn replay(keys: &Path, config: Option<&Path>, player: bool) -> Result<()> {
    let mut config = load_config(config)?;
    if player {
        config.agent.motion = MotionConfig::player();
    }

    let script = std::fs::read_to_string(keys)
        .with_context(|| format!("Failed to read key frames from {}", keys.display()))?;
    let frames = script.lines().count();
    if frames == 0 {
        bail!("key file {} has no frames", keys.display());
    }

    let policy = ManualPolicy::from_script(&script, config.tick_seconds);
    let limit = frames.min(config.max_steps);
    info!(frames, limit, player, "replaying key frames");

    let env = CheckpointCourseEnv::new(config).context("Failed to build course environment")?;
    let mut env = TrackedEnvironment::new(TimeLimit::new(env, limit));
    let summary = drive(&mut env, &policy, None).await?;
    print_summary(1, &summary);
    if policy.remaining().await > 0 {
        println!("   ({} key frame(s) left unplayed)", policy.remaining().await);
    }

    Ok(())
}

pub fn course(output: Option<&Path>) -> Result<()> {
    let config = RacerConfig::default();
    match output {
        Some(path) => {
            config
                .save(path)
                .with_context(|| format!("Failed to write course to {}", path.display()))?;
            println!("✅ Wrote default course to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(&config)?),
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RacerConfig> {
    match path {
        Some(path) => RacerConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(RacerConfig::default()),
    }
}

/// Run one episode to completion or truncation
async fn drive<E, P>(env: &mut TrackedEnvironment<E>, policy: &P, mut trajectory: Option<&mut CarTrajectory>) -> Result<EpisodeSummary>
where
    E: Environment<Observation = CarObservation, Action = DriveAction, State = EpisodeState>,
    P: Policy<Observation = CarObservation, Action = DriveAction> + ?Sized,
{
    let (mut observation, _info) = env.reset().await?;
    loop {
        let action = policy.act(&observation).await?;
        let step = env.step(action).await?;

        if let Some(trajectory) = trajectory.as_deref_mut() {
            trajectory.push(Transition {
                observation: observation.clone(),
                action,
                reward: step.reward,
                next_observation: step.observation.clone(),
                done: step.done,
            });
        }

        if step.done || step.truncated {
            return Ok(summarize(env, &step));
        }
        observation = step.observation;
    }
}

fn summarize<E: Environment>(env: &TrackedEnvironment<E>, last: &Step<CarObservation, EpisodeState>) -> EpisodeSummary {
    let episode = env.episode_info();
    let termination = last.state.as_ref().and_then(EpisodeState::termination);
    let outcome = if last.truncated {
        "time limit".to_string()
    } else {
        termination
            .map_or_else(|| "running".to_string(), |reason| format!("{reason:?}"))
            .chars()
            .fold(String::new(), |mut label, c| {
                if c.is_uppercase() && !label.is_empty() {
                    label.push(' ');
                }
                label.push(c.to_ascii_lowercase());
                label
            })
    };
    debug!(outcome = %outcome, "episode summarized");

    EpisodeSummary {
        id: episode.as_ref().map(|e| e.id.clone()).unwrap_or_default(),
        steps: episode.as_ref().map_or(0, |e| e.steps),
        total_reward: episode.as_ref().map_or(0.0, |e| e.total_reward),
        outcome,
        termination,
        statuses: last.state.as_ref().map(|s| s.statuses.clone()).unwrap_or_default(),
        elapsed_ms: episode.and_then(|e| e.end_time.map(|end| (end - e.start_time).num_milliseconds())),
    }
}

fn print_summary(index: usize, summary: &EpisodeSummary) {
    let reached = summary
        .statuses
        .iter()
        .filter(|s| **s == CheckpointStatus::Reached)
        .count();
    println!(
        "Episode {index}: Total Reward = {:.3}, Steps = {}, Outcome = {}",
        summary.total_reward, summary.steps, summary.outcome
    );
    println!(
        "   Checkpoints {} {reached}/{}",
        status_line(&summary.statuses),
        summary.statuses.len()
    );
    if let Some(ms) = summary.elapsed_ms {
        println!("   Wall time: {ms} ms ({})", summary.id);
    }
}

/// One glyph per checkpoint: reached, current, pending
pub fn status_line(statuses: &[CheckpointStatus]) -> String {
    statuses
        .iter()
        .map(|status| match status {
            CheckpointStatus::Reached => '■',
            CheckpointStatus::Current => '▶',
            CheckpointStatus::Pending => '□',
        })
        .collect()
}

/// ASCII bar chart of episode rewards
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn reward_graph(rewards: &[f64], width: usize, height: usize) -> Vec<String> {
    if rewards.is_empty() {
        return vec!["No reward data available.".to_string()];
    }

    let max_reward = rewards.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let min_reward = rewards.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let avg_reward = rewards.iter().sum::<f64>() / rewards.len() as f64;

    let mut lines = vec![
        format!("Max: {max_reward:.2}  Avg: {avg_reward:.2}  Min: {min_reward:.2}"),
        format!("┌{}┐", "─".repeat(width)),
    ];
    for h in (0..height).rev() {
        let row: String = (0..width)
            .map(|i| {
                let reward = rewards[(i * rewards.len()) / width];
                let normalized = (reward - min_reward) / (max_reward - min_reward + 1e-6);
                if (normalized * height as f64) as usize >= h {
                    '█'
                } else {
                    ' '
                }
            })
            .collect();
        lines.push(format!("│{row}│"));
    }
    lines.push(format!("└{}┘", "─".repeat(width)));
    lines
}

/// Never touches the controls
struct IdlePolicy;

#[async_trait::async_trait]
impl Policy for IdlePolicy {
    type Observation = CarObservation;
    type Action = DriveAction;

    async fn act(&self, _observation: &Self::Observation) -> racer_rl_core::Result<Self::Action> {
        Ok(DriveAction::IDLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line() {
        let statuses = [
            CheckpointStatus::Reached,
            CheckpointStatus::Current,
            CheckpointStatus::Pending,
        ];
        assert_eq!(status_line(&statuses), "■▶□");
    }

    #[test]
    fn test_reward_graph_shape() {
        let lines = reward_graph(&[0.0, 1.0, 2.0], 6, 4);
        assert_eq!(lines.len(), 2 + 4 + 1);
        assert!(lines[0].starts_with("Max: 2.00"));
        // The lowest reward still fills the bottom row.
        assert_eq!(lines[5], "│██████│");
        assert_eq!(lines[2], "│    ██│");
    }

    #[tokio::test]
    async fn test_drive_seek_completes() {
        let env = CheckpointCourseEnv::new(RacerConfig::default()).unwrap();
        let mut env = TrackedEnvironment::new(TimeLimit::new(env, 5000));
        let mut trajectory = CarTrajectory::new("test");
        let summary = drive(&mut env, &SeekCheckpointPolicy::default(), Some(&mut trajectory))
            .await
            .unwrap();

        assert_eq!(summary.outcome, "course completed");
        assert_eq!(summary.termination, Some(TerminationReason::CourseCompleted));
        assert_eq!(summary.steps, trajectory.len());
        assert!((summary.total_reward - trajectory.total_reward).abs() < 1e-9);

        let trajectories = [trajectory];
        let recording = Recording::new(PolicyKind::Seek, 1.0, &trajectories);
        let json = serde_json::to_value(&recording).unwrap();
        let episode = &json["episodes"][0];
        assert_eq!(json["policy"], "seek");
        assert_eq!(episode["episode_id"], "test");
        assert_eq!(episode["returns"].as_array().unwrap().len(), summary.steps);
        let first_return = episode["returns"][0].as_f64().unwrap();
        assert!((first_return - summary.total_reward).abs() < 1e-9);
        assert_eq!(status_line(&summary.statuses), "■■■");
    }

    #[tokio::test]
    async fn test_drive_idle_hits_time_limit() {
        let env = CheckpointCourseEnv::new(RacerConfig::default()).unwrap();
        let mut env = TrackedEnvironment::new(TimeLimit::new(env, 40));
        let summary = drive(&mut env, &IdlePolicy, None).await.unwrap();
        assert_eq!(summary.outcome, "time limit");
        assert_eq!(summary.steps, 40);
        assert_eq!(status_line(&summary.statuses), "▶□□");
    }
}
