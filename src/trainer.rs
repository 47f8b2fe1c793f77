//! Episodic driver for [`TD3Agent`].
use log::{debug, info};
use serde::{Serialize, Deserialize};

use crate::algorithms::td3::TD3Agent;
use crate::config::TrainerConfig;
use crate::env::{ContinuousEnvironment, Environment};
use crate::error::Result;
use crate::metrics::{MetricsTracker, ScoreWindow, TrainingMetrics};

/// Summary of a finished training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub episodes: usize,
    pub total_steps: usize,
    /// Rolling evaluation mean at the end of the run, once the window filled
    pub final_mean_score: Option<f32>,
    pub goal_reached: bool,
    pub metrics: TrainingMetrics,
}

pub struct Trainer {
    config: TrainerConfig,
}

impl Trainer {
    pub fn new(config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Trainer { config })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train until the rolling evaluation mean reaches the goal or the episode budget runs out.
    ///
    /// Per environment step the order is: interact, store, learn (once warmed
    /// up), then sync the targets. Each episode ends with a greedy evaluation
    /// episode whose return feeds the rolling window.
    pub fn train_td3<E: ContinuousEnvironment + ?Sized>(&self, agent: &mut TD3Agent, env: &mut E) -> Result<TrainingReport> {
        let mut tracker = MetricsTracker::new(self.config.n_episodes.max(self.config.eval_window));
        let mut window = ScoreWindow::new(self.config.eval_window);
        let mut goal_reached = false;
        let mut warmed_up = agent.is_warmed_up();

        for episode in 1..=self.config.n_episodes {
            tracker.start_episode();
            let (mut state, _) = env.reset(self.config.env_seed)?;

            for t_step in 0.. {
                let transition = agent.interact(state.view(), env)?;
                let done = transition.done > 0.0;
                let reward = transition.reward;
                let next_state = transition.next_state.clone();
                agent.store(transition)?;
                tracker.step(reward);

                if agent.is_warmed_up() {
                    if !warmed_up {
                        debug!("replay buffer warmed up with {} transitions", agent.memory().len());
                        warmed_up = true;
                    }
                    let stats = agent.learn()?;
                    tracker.record_learn(&stats);
                }

                if t_step % self.config.sync_every == 0 {
                    agent.sync_weights(self.config.use_polyak)?;
                }

                state = next_state;
                if done {
                    break;
                }
            }

            let episode_return = tracker.end_episode();
            if let Some(value) = agent.training_strategy().exploration_parameter() {
                tracker.record_exploration(value);
            }

            let score = agent.evaluate_one_episode(env, self.config.env_seed)?;
            tracker.record_eval(score);
            window.push(score);

            match window.full_mean() {
                Some(mean) => {
                    info!(
                        "Episode {}\tAverage mean {} eval score: {:.3}",
                        episode,
                        window.capacity(),
                        mean
                    );
                    if mean >= self.config.goal_mean_reward {
                        if let Some(path) = &self.config.model_path {
                            agent.save_policy(path)?;
                            info!("goal reached, policy saved to {}", path.display());
                        }
                        goal_reached = true;
                        break;
                    }
                }
                None => debug!(
                    "Episode {}\treturn {:.3}\teval {:.3}\t({} of {} eval scores)",
                    episode,
                    episode_return,
                    score,
                    window.len(),
                    window.capacity()
                ),
            }
        }

        env.close();
        Ok(TrainingReport {
            episodes: tracker.episode_count(),
            total_steps: tracker.total_steps(),
            final_mean_score: window.full_mean(),
            goal_reached,
            metrics: tracker.metrics().clone(),
        })
    }

    /// Inference only: mean and standard deviation of `n_episodes` greedy returns.
    pub fn evaluate<E: ContinuousEnvironment + ?Sized>(
        agent: &mut TD3Agent,
        env: &mut E,
        n_episodes: usize,
        seed: Option<u64>,
    ) -> Result<(f32, f32)> {
        let mut window = ScoreWindow::new(n_episodes);
        for _ in 0..n_episodes {
            window.push(agent.evaluate_one_episode(env, seed)?);
        }
        Ok((window.mean().unwrap_or(0.0), window.std().unwrap_or(0.0)))
    }
}

impl TrainingReport {
    /// Write the report as pretty JSON
    pub fn save<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TD3Config;
    use crate::env::Pendulum;

    fn small_agent(env: &Pendulum) -> TD3Agent {
        let config = TD3Config::default()
            .hidden_dims(vec![16])
            .batch_size(16)
            .buffer_size(500)
            .n_warmup_batches(2)
            .seed(3);
        TD3Agent::new(env.observation_dim(), env.action_bounds().unwrap(), config).unwrap()
    }

    #[test]
    fn test_train_runs_episode_budget() {
        let mut env = Pendulum::new(20, 0);
        let mut agent = small_agent(&env);
        let trainer = Trainer::new(TrainerConfig::default().n_episodes(4).eval_window(2).goal_mean_reward(f32::INFINITY)).unwrap();

        let report = trainer.train_td3(&mut agent, &mut env).unwrap();
        assert_eq!(report.episodes, 4);
        assert_eq!(report.total_steps, 80);
        assert!(!report.goal_reached);
        assert!(report.final_mean_score.is_some());
        assert_eq!(report.metrics.eval_scores.len(), 4);
        // 80 stored, learning starts after 32
        assert_eq!(agent.learn_calls(), 80 - 32);
    }

    #[test]
    fn test_goal_stops_training_and_saves() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("policy.bin");
        let mut env = Pendulum::new(10, 0);
        let mut agent = small_agent(&env);
        let trainer = Trainer::new(
            TrainerConfig::default()
                .n_episodes(50)
                .eval_window(1)
                .goal_mean_reward(f32::NEG_INFINITY)
                .model_path(&path),
        )
        .unwrap();

        let report = trainer.train_td3(&mut agent, &mut env).unwrap();
        assert!(report.goal_reached);
        assert_eq!(report.episodes, 1);
        assert!(path.exists());
    }

    #[test]
    fn test_evaluate_reports_mean_and_std() {
        let mut env = Pendulum::new(10, 0);
        let mut agent = small_agent(&env);
        let (mean, std) = Trainer::evaluate(&mut agent, &mut env, 3, Some(5)).unwrap();
        assert!(mean <= 0.0);
        // Same seed, greedy policy: identical episodes
        assert!(std < 1e-4);
    }
}
