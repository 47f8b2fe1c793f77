use log::{debug, trace};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use std::path::Path;

use crate::builders::ReplayBufferBuilder;
use crate::config::TD3Config;
use crate::env::{ContinuousEnvironment, Environment};
use crate::error::{PolyakError, Result};
use crate::exploration::{ExplorationStrategy, GreedyStrategy, NormalNoiseDecayStrategy};
use crate::loss::{Loss, MSE};
use crate::network::{NamedParameters, Parameterized};
use crate::optimizer::{GradientClipper, Optimizer, OptimizerWrapper};
use crate::replay_buffer::{Batch, ReplayBuffer, Transition};
use crate::types::{clamp_rows, Action, ActionBounds};
use super::networks::{DeterministicPolicy, TwinCritic};
use super::target::{SyncMode, TargetPair};

/// Diagnostics from one [`TD3Agent::learn`] call
#[derive(Clone, Debug, PartialEq)]
pub struct LearnStats {
    pub critic_loss: f32,
    pub critic_grad_norm: f32,
    /// `None` on calls where the actor update was delayed
    pub actor_loss: Option<f32>,
    pub actor_grad_norm: Option<f32>,
}

/// Twin Delayed Deep Deterministic Policy Gradient (TD3) Agent
///
/// Holds the online/target policy and twin critic, the replay buffer and the
/// exploration strategy. One learn call samples a batch, regresses both critic
/// streams onto the clipped double-Q target, and on every
/// `train_actor_every`-th call ascends `Qa` with respect to the policy.
///
/// # Example
///
/// ```rust,no_run
/// use polyak::algorithms::TD3Agent;
/// use polyak::config::TD3Config;
/// use polyak::env::{ContinuousEnvironment, Environment, Pendulum};
///
/// let mut env = Pendulum::default();
/// let config = TD3Config::default().batch_size(64).buffer_size(10_000);
/// let mut agent = TD3Agent::new(env.observation_dim(), env.action_bounds().unwrap(), config).unwrap();
///
/// let (mut state, _) = env.reset(Some(0)).unwrap();
/// for _ in 0..1000 {
///     let transition = agent.interact(state.view(), &mut env).unwrap();
///     let done = transition.done > 0.0;
///     state = transition.next_state.clone();
///     agent.store(transition).unwrap();
///     if agent.is_warmed_up() {
///         agent.learn().unwrap();
///     }
///     agent.sync_weights(true).unwrap();
///     if done {
///         state = env.reset(None).unwrap().0;
///     }
/// }
/// ```
pub struct TD3Agent {
    config: TD3Config,
    bounds: ActionBounds,
    policy: TargetPair<DeterministicPolicy>,
    critic: TargetPair<TwinCritic>,
    policy_optimizer: OptimizerWrapper,
    critic_optimizer: OptimizerWrapper,
    memory: ReplayBuffer,
    training_strategy: ExplorationStrategy,
    eval_strategy: GreedyStrategy,
    exploration_rng: StdRng,
    noise_rng: StdRng,
    learn_calls: usize,
    actor_updates: usize,
}

impl TD3Agent {
    /// Create a new TD3 agent. Targets start as exact copies of the online networks.
    pub fn new(state_dim: usize, bounds: ActionBounds, config: TD3Config) -> Result<Self> {
        config.validate()?;
        if state_dim == 0 {
            return Err(PolyakError::configuration("state dimension must be greater than 0"));
        }

        let mut init_rng = StdRng::seed_from_u64(config.seed.wrapping_add(3));
        let policy = DeterministicPolicy::new(state_dim, bounds.clone(), &config.hidden_dims, &mut init_rng)?;
        let critic = TwinCritic::new(state_dim, bounds.dim(), &config.hidden_dims, &mut init_rng)?;

        let training_strategy = ExplorationStrategy::NormalNoiseDecay(NormalNoiseDecayStrategy::new(
            bounds.clone(),
            config.init_noise_ratio,
            config.min_noise_ratio,
            config.noise_decay_steps,
        )?);

        Ok(TD3Agent {
            memory: ReplayBufferBuilder::new()
                .capacity(config.buffer_size)
                .batch_size(config.batch_size)
                .seed(config.seed)
                .build()?,
            policy: TargetPair::new(policy),
            critic: TargetPair::new(critic),
            policy_optimizer: OptimizerWrapper::adam(config.learning_rate),
            critic_optimizer: OptimizerWrapper::adam(config.learning_rate),
            training_strategy,
            eval_strategy: GreedyStrategy::with_bounds(bounds.clone()),
            exploration_rng: StdRng::seed_from_u64(config.seed.wrapping_add(1)),
            noise_rng: StdRng::seed_from_u64(config.seed.wrapping_add(2)),
            learn_calls: 0,
            actor_updates: 0,
            bounds,
            config,
        })
    }

    pub fn config(&self) -> &TD3Config {
        &self.config
    }

    pub fn bounds(&self) -> &ActionBounds {
        &self.bounds
    }

    pub fn policy(&self) -> &TargetPair<DeterministicPolicy> {
        &self.policy
    }

    pub fn critic(&self) -> &TargetPair<TwinCritic> {
        &self.critic
    }

    pub fn memory(&self) -> &ReplayBuffer {
        &self.memory
    }

    pub fn training_strategy(&self) -> &ExplorationStrategy {
        &self.training_strategy
    }

    /// Number of `learn` calls so far
    pub fn learn_calls(&self) -> usize {
        self.learn_calls
    }

    /// Number of actor updates so far
    pub fn actor_updates(&self) -> usize {
        self.actor_updates
    }

    /// Buffer size learning waits for
    pub fn min_samples(&self) -> usize {
        self.config.batch_size * self.config.n_warmup_batches
    }

    /// Whether the buffer holds enough transitions to start learning
    pub fn is_warmed_up(&self) -> bool {
        self.memory.len() > self.min_samples()
    }

    /// Select an action. Training mode explores (maximally until the buffer
    /// reaches the warm-up size); evaluation mode is greedy.
    pub fn act(&mut self, state: ArrayView1<f32>, training: bool) -> Result<Array1<f32>> {
        let action = if training {
            let max_exploration = self.memory.len() < self.min_samples();
            self.training_strategy
                .select_action(&self.policy.online, state, max_exploration, &mut self.exploration_rng)?
        } else {
            self.eval_strategy.select_action(&self.policy.online, state)?
        };
        action.into_continuous()
    }

    /// Act in `env` from `state` and package the step as a transition.
    ///
    /// `done` is set when the episode either terminated or was truncated.
    pub fn interact<E: ContinuousEnvironment + ?Sized>(&mut self, state: ArrayView1<f32>, env: &mut E) -> Result<Transition> {
        let action = self.act(state, true)?;
        let step = env.step(&Action::Continuous(action.clone()))?;
        let done = step.is_done();
        Ok(Transition::new(state.to_owned(), action, step.reward, step.next_state, done))
    }

    pub fn store(&mut self, transition: Transition) -> Result<()> {
        self.memory.add(transition)
    }

    /// Target-policy smoothing noise for `batch_size` actions.
    ///
    /// Drawn from `N(0, policy_noise_ratio * (high - low))` and clamped to
    /// `[low * clip_ratio, high * clip_ratio]`.
    pub fn smoothing_noise(&mut self, batch_size: usize) -> Array2<f32> {
        let ratio = self.config.policy_noise_ratio;
        let clip = self.config.policy_noise_clip_ratio;
        let range = self.bounds.range();
        let rng = &mut self.noise_rng;

        let noise = Array2::from_shape_fn((batch_size, self.bounds.dim()), |(_, j)| {
            rng.sample::<f32, _>(StandardNormal) * ratio * range[j]
        });
        let low = self.bounds.low() * clip;
        let high = self.bounds.high() * clip;
        clamp_rows(noise.view(), low.view(), high.view())
    }

    /// Noisy target-policy actions for `next_states`, clamped into bounds
    pub fn target_actions(&mut self, next_states: ArrayView2<f32>) -> Array2<f32> {
        let noise = self.smoothing_noise(next_states.nrows());
        let actions = self.policy.target.predict_batch(next_states) + noise;
        self.bounds.clamp_batch(actions.view())
    }

    /// Twin target-critic estimates at the smoothed next actions
    pub fn critic_targets(&mut self, next_states: ArrayView2<f32>) -> Result<(Array1<f32>, Array1<f32>)> {
        let next_actions = self.target_actions(next_states);
        self.critic.target.forward(next_states, next_actions.view())
    }

    /// `y = r + gamma * min(Qa, Qb) * (1 - done)`
    pub fn compute_target(
        &mut self,
        rewards: ArrayView1<f32>,
        next_states: ArrayView2<f32>,
        dones: ArrayView1<f32>,
    ) -> Result<Array1<f32>> {
        if rewards.len() != next_states.nrows() || dones.len() != next_states.nrows() {
            return Err(PolyakError::dimension_mismatch(
                format!("{} rows", next_states.nrows()),
                format!("{} rewards / {} dones", rewards.len(), dones.len()),
            ));
        }
        let (qa, qb) = self.critic_targets(next_states)?;
        let gamma = self.config.gamma;
        let mut targets = Array1::zeros(rewards.len());
        ndarray::Zip::from(&mut targets)
            .and(&rewards)
            .and(&dones)
            .and(&qa)
            .and(&qb)
            .for_each(|y, &r, &d, &a, &b| *y = r + gamma * a.min(b) * (1.0 - d));
        Ok(targets)
    }

    /// Regress both critic streams onto `targets`. Returns the loss and the pre-clip gradient norm.
    pub fn update_critic(&mut self, batch: &Batch, targets: ArrayView1<f32>) -> Result<(f32, f32)> {
        let (qa, qb) = self.critic.online.forward_batch(batch.states.view(), batch.actions.view())?;
        let (qa, qb, y) = (qa.insert_axis(Axis(1)), qb.insert_axis(Axis(1)), targets.insert_axis(Axis(1)));

        let loss = MSE.compute_batch(qa.view(), y) + MSE.compute_batch(qb.view(), y);
        let grad_a = MSE.gradient_batch(qa.view(), y).index_axis_move(Axis(1), 0);
        let grad_b = MSE.gradient_batch(qb.view(), y).index_axis_move(Axis(1), 0);

        let mut gradients = self.critic.online.backward(grad_a.view(), grad_b.view())?;
        let norm = GradientClipper::from_max_norm(self.config.critic_max_grad_norm).clip(&mut gradients);
        let mut layers = self.critic.online.layers_mut();
        self.critic_optimizer.step(&mut layers, &gradients)?;
        Ok((loss, norm))
    }

    /// Deterministic policy gradient step through critic stream a.
    /// Returns `-mean(Qa)` and the pre-clip gradient norm.
    pub fn update_actor(&mut self, batch: &Batch) -> Result<(f32, f32)> {
        let predicted_actions = self.policy.online.forward_batch(batch.states.view());
        let q = self.critic.online.qa_forward_batch(batch.states.view(), predicted_actions.view())?;
        let n = q.len().max(1) as f32;
        let loss = -q.mean().unwrap_or(0.0);

        let q_errors = Array1::from_elem(q.len(), -1.0 / n);
        let action_errors = self.critic.online.action_gradient(q_errors.view())?;
        let (mut gradients, _) = self.policy.online.backward_batch(action_errors.view())?;
        let norm = GradientClipper::from_max_norm(self.config.policy_max_grad_norm).clip(&mut gradients);
        let mut layers = self.policy.online.layers_mut();
        self.policy_optimizer.step(&mut layers, &gradients)?;
        Ok((loss, norm))
    }

    /// One learning step: critic every call, actor on every `train_actor_every`-th.
    pub fn learn(&mut self) -> Result<LearnStats> {
        let batch = self.memory.sample()?;
        let targets = self.compute_target(batch.rewards.view(), batch.next_states.view(), batch.dones.view())?;
        let (critic_loss, critic_grad_norm) = self.update_critic(&batch, targets.view())?;

        self.learn_calls += 1;
        let (actor_loss, actor_grad_norm) = if self.learn_calls % self.config.train_actor_every == 0 {
            let (loss, norm) = self.update_actor(&batch)?;
            self.actor_updates += 1;
            (Some(loss), Some(norm))
        } else {
            (None, None)
        };

        trace!(
            "learn #{}: critic_loss={:.5} actor_loss={:?}",
            self.learn_calls, critic_loss, actor_loss
        );
        Ok(LearnStats { critic_loss, critic_grad_norm, actor_loss, actor_grad_norm })
    }

    /// Move both target networks towards the online ones.
    ///
    /// Polyak mode needs `tau`; a missing `tau` is an error, never a silent hard copy.
    pub fn sync_weights(&mut self, use_polyak: bool) -> Result<()> {
        let mode = if use_polyak {
            let tau = self
                .config
                .tau
                .ok_or_else(|| PolyakError::configuration("polyak averaging requires tau, but tau is None"))?;
            SyncMode::Polyak { tau }
        } else {
            SyncMode::Hard
        };
        self.critic.sync(mode)?;
        self.policy.sync(mode)?;
        debug!("targets synced ({:?})", mode);
        Ok(())
    }

    /// Run one greedy episode and return its undiscounted return.
    pub fn evaluate_one_episode<E: ContinuousEnvironment + ?Sized>(&mut self, env: &mut E, seed: Option<u64>) -> Result<f32> {
        let (mut state, _) = env.reset(seed)?;
        let mut total = 0.0;
        loop {
            let action = self.act(state.view(), false)?;
            let step = env.step(&Action::Continuous(action))?;
            total += step.reward;
            if step.is_done() {
                break;
            }
            state = step.next_state;
        }
        Ok(total)
    }

    /// Persist the online policy parameters
    pub fn save_policy<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.policy.online.state_dict().save(path)
    }

    /// Load online policy parameters saved by [`TD3Agent::save_policy`]
    pub fn load_policy<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let params = NamedParameters::load(path)?;
        self.policy.online.load_state_dict(&params)
    }
}

/// Builder for [`TD3Agent`]
pub struct TD3Builder {
    state_dim: usize,
    bounds: ActionBounds,
    config: TD3Config,
}

impl TD3Builder {
    pub fn new(state_dim: usize, bounds: ActionBounds) -> Self {
        TD3Builder { state_dim, bounds, config: TD3Config::default() }
    }

    pub fn config(mut self, config: TD3Config) -> Self {
        self.config = config;
        self
    }

    pub fn hidden_dims(mut self, dims: Vec<usize>) -> Self {
        self.config.hidden_dims = dims;
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    pub fn buffer_size(mut self, buffer_size: usize) -> Self {
        self.config.buffer_size = buffer_size;
        self
    }

    pub fn tau(mut self, tau: Option<f32>) -> Self {
        self.config.tau = tau;
        self
    }

    pub fn gamma(mut self, gamma: f32) -> Self {
        self.config.gamma = gamma;
        self
    }

    pub fn train_actor_every(mut self, k: usize) -> Self {
        self.config.train_actor_every = k;
        self
    }

    pub fn policy_noise(mut self, ratio: f32, clip_ratio: f32) -> Self {
        self.config.policy_noise_ratio = ratio;
        self.config.policy_noise_clip_ratio = clip_ratio;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.config.seed = seed;
        self
    }

    pub fn build(self) -> Result<TD3Agent> {
        TD3Agent::new(self.state_dim, self.bounds, self.config)
    }
}
