//! Asynchronous advantage actor-critic over discrete actions.
//!
//! Workers run their own environment and local copies of the policy and
//! value networks. After each n-step segment a worker computes gradients
//! locally and sends them to a single learner, which owns the shared networks
//! and applies updates one at a time. Workers pull the latest shared snapshot
//! at every segment boundary, so their parameters may lag the learner by an
//! unbounded number of updates.

use crossbeam_channel::{unbounded, Sender};
use log::{debug, info, warn};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use std::thread;

use crate::activations::{softmax_batch, Activation};
use crate::config::A3CConfig;
use crate::env::{DiscreteEnvironment, Step};
use crate::error::{PolyakError, Result};
use crate::metrics::ScoreWindow;
use crate::network::{Gradients, NamedParameters, NeuralNetwork, Parameterized};
use crate::optimizer::{GradientClipper, Optimizer, OptimizerWrapper};
use crate::types::Action;
use super::networks::CategoricalPolicy;

/// Gradients and losses from one n-step segment
#[derive(Clone, Debug)]
pub struct A3CUpdate {
    pub policy_gradients: Gradients,
    pub value_gradients: Gradients,
    pub policy_loss: f32,
    pub value_loss: f32,
    pub mean_entropy: f32,
}

/// Discounted returns of `rewards` followed by a bootstrap value.
///
/// Returns `(discounts, returns)`, both of length `rewards.len()`, with
/// `discounts[t] = gamma^t`.
pub fn discounted_returns(rewards: &[f32], bootstrap_value: f32, gamma: f32) -> (Vec<f32>, Vec<f32>) {
    let t_max = rewards.len();
    let discounts: Vec<f32> = (0..t_max).map(|t| gamma.powi(t as i32)).collect();
    let mut returns = vec![0.0; t_max];
    let mut running = bootstrap_value;
    for t in (0..t_max).rev() {
        running = rewards[t] + gamma * running;
        returns[t] = running;
    }
    (discounts, returns)
}

/// One actor-learner: local policy and value networks plus the current segment.
pub struct A3CAgent {
    config: A3CConfig,
    policy: CategoricalPolicy,
    value_model: NeuralNetwork,
    states: Vec<Array1<f32>>,
    actions: Vec<usize>,
    rewards: Vec<f32>,
    version: Option<u64>,
    rng: StdRng,
}

impl A3CAgent {
    pub fn new(state_dim: usize, n_actions: usize, config: A3CConfig) -> Result<Self> {
        config.validate()?;
        let mut init_rng = StdRng::seed_from_u64(config.seed.wrapping_add(3));
        let policy = CategoricalPolicy::new(state_dim, n_actions, &config.policy_hidden_dims, &mut init_rng)?;
        let value_model = NeuralNetwork::mlp(state_dim, &config.value_hidden_dims, 1, Activation::Linear, &mut init_rng)?;
        Ok(A3CAgent {
            rng: StdRng::seed_from_u64(config.seed.wrapping_add(1)),
            config,
            policy,
            value_model,
            states: Vec::new(),
            actions: Vec::new(),
            rewards: Vec::new(),
            version: None,
        })
    }

    pub fn policy(&self) -> &CategoricalPolicy {
        &self.policy
    }

    pub fn value_model(&self) -> &NeuralNetwork {
        &self.value_model
    }

    /// Steps collected since the last [`A3CAgent::reset_metrics`]
    pub fn trajectory_len(&self) -> usize {
        self.rewards.len()
    }

    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    /// Sample an action from the policy, step `env`, and record the step.
    pub fn interact_with_environment<E: DiscreteEnvironment + ?Sized>(
        &mut self,
        state: ArrayView1<f32>,
        env: &mut E,
    ) -> Result<Step> {
        let sample = self.policy.full_pass(state, &mut self.rng)?;
        let step = env.step(&Action::Discrete(sample.action))?;

        self.states.push(state.to_owned());
        self.actions.push(sample.action);
        self.rewards.push(step.reward);
        Ok(step)
    }

    /// Value estimate used to bootstrap a cut-off segment
    pub fn bootstrap_value(&self, state: ArrayView1<f32>) -> f32 {
        self.value_model.forward(state)[0]
    }

    /// Gradients of the actor and critic losses over the current segment.
    ///
    /// Log-probabilities, entropies and values are recomputed from the stored
    /// states in one cached batch pass, which the backward passes need anyway.
    ///
    /// Policy loss is `-mean(gamma^t * A_t * log pi(a_t|s_t)) - beta * mean(H_t)`;
    /// value loss is `0.5 * mean(A_t^2)` with `A_t = G_t - V(s_t)`. Parameters
    /// are not modified.
    pub fn learn(&mut self, bootstrap_value: f32) -> Result<A3CUpdate> {
        let t_max = self.rewards.len();
        if t_max == 0 {
            return Err(PolyakError::InsufficientData { requested: 1, available: 0 });
        }
        let n = t_max as f32;
        let beta = self.config.entropy_loss_weight;
        let (discounts, returns) = discounted_returns(&self.rewards, bootstrap_value, self.config.gamma);

        let state_dim = self.states[0].len();
        let mut states = Array2::zeros((t_max, state_dim));
        for (mut row, s) in states.axis_iter_mut(Axis(0)).zip(&self.states) {
            row.assign(s);
        }

        let values = self.value_model.forward_batch(states.view()).index_axis_move(Axis(1), 0);
        let advantages = Array1::from(returns) - &values;

        let logits = self.policy.forward_batch(states.view());
        let probs = softmax_batch(logits.view());

        let mut logit_errors = Array2::zeros(probs.dim());
        let mut policy_loss = 0.0;
        let mut entropy_sum = 0.0;
        for (t, (mut err, p)) in logit_errors.axis_iter_mut(Axis(0)).zip(probs.axis_iter(Axis(0))).enumerate() {
            let log_p = p.mapv(|v| v.max(f32::MIN_POSITIVE).ln());
            let h = -(&p * &log_p).sum();
            let weight = discounts[t] * advantages[t];
            policy_loss -= weight * log_p[self.actions[t]];
            entropy_sum += h;

            for j in 0..p.len() {
                let onehot = if j == self.actions[t] { 1.0 } else { 0.0 };
                err[j] = -weight * (onehot - p[j]) / n + beta * p[j] * (log_p[j] + h) / n;
            }
        }
        let mean_entropy = entropy_sum / n;
        let policy_loss = policy_loss / n - beta * mean_entropy;

        let mut policy_gradients = self.policy.backward_batch(logit_errors.view())?;
        GradientClipper::from_max_norm(self.config.policy_max_grad_norm).clip(&mut policy_gradients);

        let value_loss = 0.5 * advantages.mapv(|a| a * a).sum() / n;
        let value_errors = (-&advantages / n).insert_axis(Axis(1));
        let (mut value_gradients, _) = self.value_model.backward_batch(value_errors.view())?;
        GradientClipper::from_max_norm(self.config.value_max_grad_norm).clip(&mut value_gradients);

        Ok(A3CUpdate { policy_gradients, value_gradients, policy_loss, value_loss, mean_entropy })
    }

    /// Greedy rollouts; returns mean and standard deviation of the returns.
    pub fn evaluate<E: DiscreteEnvironment + ?Sized>(&self, env: &mut E, n_episodes: usize, seed: Option<u64>) -> Result<(f32, f32)> {
        let mut window = ScoreWindow::new(n_episodes);
        for _ in 0..n_episodes {
            let (mut state, _) = env.reset(seed)?;
            let mut total = 0.0;
            loop {
                let action = self.policy.select_greedy_action(state.view());
                let step = env.step(&Action::Discrete(action))?;
                total += step.reward;
                if step.is_done() {
                    break;
                }
                state = step.next_state;
            }
            window.push(total);
        }
        Ok((window.mean().unwrap_or(0.0), window.std().unwrap_or(0.0)))
    }

    /// Drop the collected segment
    pub fn reset_metrics(&mut self) {
        self.states.clear();
        self.actions.clear();
        self.rewards.clear();
    }

    /// Copy the shared parameters if they changed since the last pull
    pub fn sync_from(&mut self, shared: &RwLock<SharedModels>) -> Result<()> {
        let shared = shared.read().map_err(|_| PolyakError::Training("shared model lock poisoned".to_string()))?;
        if self.version != Some(shared.version) {
            self.policy.load_state_dict(&shared.policy.state_dict())?;
            self.value_model.load_state_dict(&shared.value_model.state_dict())?;
            self.version = Some(shared.version);
        }
        Ok(())
    }

    pub fn save_policy<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.policy.state_dict().save(path)
    }

    pub fn load_policy<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let params = NamedParameters::load(path)?;
        self.policy.load_state_dict(&params)
    }
}

/// Parameters owned by the learner, versioned by update count
#[derive(Clone, Debug)]
pub struct SharedModels {
    pub version: u64,
    pub policy: CategoricalPolicy,
    pub value_model: NeuralNetwork,
}

enum WorkerMessage {
    Gradients { worker: usize, policy: Gradients, value: Gradients },
    EvalScore { worker: usize, episode: usize, score: f32 },
}

/// Outcome of an [`A3CTrainer::run`]
#[derive(Clone, Debug, PartialEq)]
pub struct A3CReport {
    /// Parameter updates applied by the learner
    pub updates: u64,
    /// Worker evaluation scores in arrival order
    pub eval_scores: Vec<f32>,
    pub final_mean_score: Option<f32>,
    pub goal_reached: bool,
}

pub struct A3CTrainer {
    config: A3CConfig,
    state_dim: usize,
    n_actions: usize,
    shared: RwLock<SharedModels>,
}

impl A3CTrainer {
    pub fn new(state_dim: usize, n_actions: usize, config: A3CConfig) -> Result<Self> {
        let seed_agent = A3CAgent::new(state_dim, n_actions, config.clone())?;
        let shared = SharedModels {
            version: 0,
            policy: seed_agent.policy,
            value_model: seed_agent.value_model,
        };
        Ok(A3CTrainer { config, state_dim, n_actions, shared: RwLock::new(shared) })
    }

    /// Snapshot of the shared policy
    pub fn shared_policy(&self) -> Result<CategoricalPolicy> {
        let shared = self.shared.read().map_err(|_| PolyakError::Training("shared model lock poisoned".to_string()))?;
        Ok(shared.policy.clone())
    }

    /// Train with `n_workers` threads, each owning the environment `env_factory(worker)` builds.
    ///
    /// Stops when the rolling mean of worker evaluation scores reaches the goal
    /// (observed by each worker at its next episode boundary) or when every
    /// worker has used its episode budget.
    pub fn run<F, E>(&self, env_factory: F) -> Result<A3CReport>
    where
        F: Fn(usize) -> E + Sync,
        E: DiscreteEnvironment,
    {
        let stop = AtomicBool::new(false);
        let (tx, rx) = unbounded::<WorkerMessage>();

        thread::scope(|scope| {
            let handles: Vec<_> = (0..self.config.n_workers)
                .map(|worker| {
                    let tx = tx.clone();
                    let stop = &stop;
                    let env_factory = &env_factory;
                    scope.spawn(move || {
                        let result = self.worker_loop(worker, env_factory(worker), tx, stop);
                        if result.is_err() {
                            stop.store(true, Ordering::SeqCst);
                        }
                        result
                    })
                })
                .collect();
            drop(tx);

            let learned = self.learner_loop(rx.iter(), &stop);
            if learned.is_err() {
                stop.store(true, Ordering::SeqCst);
            }

            for (worker, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        warn!("worker {} failed: {}", worker, e);
                        return Err(e);
                    }
                    Err(_) => return Err(PolyakError::Training(format!("worker {} panicked", worker))),
                }
            }
            learned
        })
    }

    fn worker_loop<E: DiscreteEnvironment>(
        &self,
        worker: usize,
        mut env: E,
        tx: Sender<WorkerMessage>,
        stop: &AtomicBool,
    ) -> Result<()> {
        let worker_seed = self.config.seed.wrapping_add(1000 * (worker as u64 + 1));
        let config = self.config.clone().seed(worker_seed);
        let mut agent = A3CAgent::new(self.state_dim, self.n_actions, config)?;
        agent.sync_from(&self.shared)?;

        for episode in 0..self.config.n_episodes {
            if stop.load(Ordering::SeqCst) {
                debug!("worker {} stopping at episode {}", worker, episode);
                break;
            }
            let seed = if episode == 0 { Some(worker_seed) } else { None };
            let (mut state, _) = env.reset(seed)?;
            agent.reset_metrics();

            loop {
                let step = agent.interact_with_environment(state.view(), &mut env)?;
                let done = step.is_done();
                state = step.next_state;

                if done || agent.trajectory_len() >= self.config.max_n_steps {
                    let bootstrap = if step.terminated { 0.0 } else { agent.bootstrap_value(state.view()) };
                    let update = agent.learn(bootstrap)?;
                    tx.send(WorkerMessage::Gradients {
                        worker,
                        policy: update.policy_gradients,
                        value: update.value_gradients,
                    })
                    .map_err(|_| PolyakError::Training("learner hung up".to_string()))?;
                    agent.reset_metrics();
                    agent.sync_from(&self.shared)?;
                }
                if done {
                    break;
                }
            }

            let (score, _) = agent.evaluate(&mut env, 1, None)?;
            tx.send(WorkerMessage::EvalScore { worker, episode, score })
                .map_err(|_| PolyakError::Training("learner hung up".to_string()))?;
        }
        Ok(())
    }

    fn learner_loop<I: Iterator<Item = WorkerMessage>>(&self, messages: I, stop: &AtomicBool) -> Result<A3CReport> {
        let mut policy_optimizer = OptimizerWrapper::adam(self.config.policy_learning_rate);
        let mut value_optimizer = OptimizerWrapper::rmsprop(self.config.value_learning_rate);
        let mut window = ScoreWindow::new(self.config.eval_window);
        let mut eval_scores = Vec::new();
        let mut goal_reached = false;

        for message in messages {
            match message {
                WorkerMessage::Gradients { worker, policy, value } => {
                    let mut shared = self
                        .shared
                        .write()
                        .map_err(|_| PolyakError::Training("shared model lock poisoned".to_string()))?;
                    policy_optimizer.step(&mut shared.policy.layers_mut(), &policy)?;
                    value_optimizer.step(&mut shared.value_model.layers_mut(), &value)?;
                    shared.version += 1;
                    if shared.version % 1000 == 0 {
                        debug!("{} shared updates (last from worker {})", shared.version, worker);
                    }
                }
                WorkerMessage::EvalScore { worker, episode, score } => {
                    eval_scores.push(score);
                    window.push(score);
                    if let Some(mean) = window.full_mean() {
                        info!(
                            "Worker {} episode {}\tAverage mean {} eval score: {:.3}",
                            worker,
                            episode,
                            window.capacity(),
                            mean
                        );
                        if !goal_reached && mean >= self.config.goal_mean_reward {
                            goal_reached = true;
                            stop.store(true, Ordering::SeqCst);
                            if let Some(path) = &self.config.model_path {
                                self.shared_policy()?.state_dict().save(path)?;
                                info!("goal reached, shared policy saved to {}", path.display());
                            }
                        }
                    }
                }
            }
        }

        let updates = self
            .shared
            .read()
            .map_err(|_| PolyakError::Training("shared model lock poisoned".to_string()))?
            .version;
        Ok(A3CReport {
            updates,
            eval_scores,
            final_mean_score: window.full_mean(),
            goal_reached,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::{CartPole, Environment};
    use approx::assert_abs_diff_eq;

    fn config() -> A3CConfig {
        A3CConfig::default()
            .hidden_dims(vec![16], vec![16])
            .max_n_steps(10)
            .n_workers(2)
            .n_episodes(3)
            .eval_window(2)
            .seed(7)
    }

    #[test]
    fn test_discounted_returns_include_bootstrap() {
        let (discounts, returns) = discounted_returns(&[1.0, 1.0], 10.0, 0.5);
        assert_eq!(discounts, vec![1.0, 0.5]);
        // G1 = 1 + 0.5 * 10, G0 = 1 + 0.5 * G1
        assert_abs_diff_eq!(returns[1], 6.0, epsilon = 1e-6);
        assert_abs_diff_eq!(returns[0], 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_learn_requires_a_segment() {
        let mut agent = A3CAgent::new(4, 2, config()).unwrap();
        assert!(agent.learn(0.0).is_err());
    }

    #[test]
    fn test_learn_leaves_parameters_untouched() {
        let mut env = CartPole::default();
        let mut agent = A3CAgent::new(4, 2, config()).unwrap();
        let (mut state, _) = env.reset(Some(0)).unwrap();
        for _ in 0..5 {
            let step = agent.interact_with_environment(state.view(), &mut env).unwrap();
            state = step.next_state;
        }
        let before = agent.policy().state_dict();
        let update = agent.learn(agent.bootstrap_value(state.view())).unwrap();
        assert_eq!(agent.policy().state_dict(), before);
        assert!(update.policy_gradients.global_norm() <= 1.0 + 1e-4);
        assert!(update.value_loss >= 0.0);
        assert!(update.mean_entropy > 0.0);

        agent.reset_metrics();
        assert_eq!(agent.trajectory_len(), 0);
    }

    #[test]
    fn test_policy_gradient_matches_finite_difference() {
        let mut env = CartPole::default();
        let mut cfg = config();
        cfg.policy_max_grad_norm = None;
        let mut agent = A3CAgent::new(4, 2, cfg).unwrap();
        let (mut state, _) = env.reset(Some(1)).unwrap();
        for _ in 0..4 {
            let step = agent.interact_with_environment(state.view(), &mut env).unwrap();
            state = step.next_state;
        }
        let update = agent.learn(0.0).unwrap();
        let analytic = update.policy_gradients.layers[1].biases[0];

        let eps = 1e-2;
        let mut plus = agent.policy.clone();
        plus.layers_mut()[1].biases[0] += eps;
        let mut minus = agent.policy.clone();
        minus.layers_mut()[1].biases[0] -= eps;

        agent.policy = plus;
        let loss_plus = agent.learn(0.0).unwrap().policy_loss;
        agent.policy = minus;
        let loss_minus = agent.learn(0.0).unwrap().policy_loss;
        let numeric = (loss_plus - loss_minus) / (2.0 * eps);
        assert_abs_diff_eq!(analytic, numeric, epsilon = 1e-2);
    }

    #[test]
    fn test_sync_from_pulls_new_version() {
        let trainer = A3CTrainer::new(4, 2, config()).unwrap();
        let mut agent = A3CAgent::new(4, 2, config().seed(99)).unwrap();
        assert_ne!(agent.policy().state_dict(), trainer.shared_policy().unwrap().state_dict());
        agent.sync_from(&trainer.shared).unwrap();
        assert_eq!(agent.policy().state_dict(), trainer.shared_policy().unwrap().state_dict());
    }

    #[test]
    fn test_run_with_workers() {
        let trainer = A3CTrainer::new(4, 2, config()).unwrap();
        let report = trainer.run(|worker| CartPole::new(50, worker as u64)).unwrap();
        assert_eq!(report.eval_scores.len(), 2 * 3);
        assert!(report.updates > 0);
        assert!(!report.goal_reached);
    }

    #[test]
    fn test_goal_sets_stop_signal() {
        let trainer = A3CTrainer::new(4, 2, config().n_episodes(100).goal_mean_reward(0.0)).unwrap();
        let report = trainer.run(|worker| CartPole::new(20, worker as u64)).unwrap();
        assert!(report.goal_reached);
        // Each worker notices the stop signal within one episode
        assert!(report.eval_scores.len() < 2 * 100);
    }
}
