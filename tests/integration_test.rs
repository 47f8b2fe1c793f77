use polyak::{
    algorithms::{A3CAgent, A3CTrainer, TD3Agent, TD3Builder},
    config::{A3CConfig, TD3Config, TrainerConfig},
    env::{CartPole, ContinuousEnvironment, DiscreteEnvironment, Environment, Pendulum},
    network::Parameterized,
    trainer::Trainer,
};
use tempfile::TempDir;

fn small_td3(env: &Pendulum, seed: u64) -> TD3Agent {
    let config = TD3Config::default()
        .hidden_dims(vec![32, 32])
        .batch_size(32)
        .buffer_size(2_000)
        .n_warmup_batches(2)
        .tau(Some(0.01))
        .seed(seed);
    TD3Agent::new(env.observation_dim(), env.action_bounds().unwrap(), config).unwrap()
}

#[test]
fn test_td3_pendulum_end_to_end() {
    let mut env = Pendulum::new(50, 0);
    let mut agent = small_td3(&env, 1);
    let trainer = Trainer::new(
        TrainerConfig::default()
            .n_episodes(5)
            .eval_window(3)
            .goal_mean_reward(f32::INFINITY),
    )
    .unwrap();

    let report = trainer.train_td3(&mut agent, &mut env).unwrap();

    assert_eq!(report.episodes, 5);
    assert_eq!(report.total_steps, 250);
    assert_eq!(agent.learn_calls(), 250 - 64);
    // Actor steps on every second learn call
    assert_eq!(agent.actor_updates(), (250 - 64) / 2);
    assert!(report.metrics.critic_losses.iter().all(|l| l.is_finite()));
    assert!(report.final_mean_score.unwrap() <= 0.0);
    assert_eq!(agent.memory().len(), 250);
}

#[test]
fn test_td3_runs_are_reproducible() {
    let run = || {
        let mut env = Pendulum::new(30, 4);
        let mut agent = small_td3(&env, 9);
        let trainer = Trainer::new(TrainerConfig::default().n_episodes(3).eval_window(1).goal_mean_reward(f32::INFINITY).env_seed(Some(4))).unwrap();
        let report = trainer.train_td3(&mut agent, &mut env).unwrap();
        (report.metrics.eval_scores, agent.policy().online.state_dict())
    };
    assert_eq!(run(), run());
}

#[test]
fn test_td3_policy_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("td3_policy.bin");
    let env = Pendulum::default();
    let bounds = env.action_bounds().unwrap();

    let source = TD3Builder::new(env.observation_dim(), bounds.clone()).hidden_dims(vec![16]).seed(1).build().unwrap();
    source.save_policy(&path).unwrap();

    let mut restored = TD3Builder::new(env.observation_dim(), bounds).hidden_dims(vec![16]).seed(2).build().unwrap();
    assert_ne!(restored.policy().online.state_dict(), source.policy().online.state_dict());
    restored.load_policy(&path).unwrap();
    assert_eq!(restored.policy().online.state_dict(), source.policy().online.state_dict());

    // Different topology cannot load these parameters
    let mut other = TD3Builder::new(3, env.action_bounds().unwrap()).hidden_dims(vec![8, 8]).build().unwrap();
    assert!(other.load_policy(&path).is_err());
}

#[test]
fn test_td3_greedy_actions_stay_in_bounds() {
    let mut env = Pendulum::new(20, 3);
    let mut agent = small_td3(&env, 3);
    let bounds = env.action_bounds().unwrap();
    let (mut state, _) = env.reset(Some(3)).unwrap();
    for _ in 0..20 {
        let action = agent.act(state.view(), false).unwrap();
        assert!(bounds.contains(action.view()));
        let explored = agent.act(state.view(), true).unwrap();
        assert!(bounds.contains(explored.view()));
        state = env.step(&polyak::types::Action::Continuous(action)).unwrap().next_state;
    }
}

#[test]
fn test_a3c_cartpole_small_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a3c_policy.bin");
    let env = CartPole::default();
    let config = A3CConfig::default()
        .hidden_dims(vec![32], vec![32])
        .n_workers(3)
        .n_episodes(4)
        .max_n_steps(20)
        .eval_window(3)
        .goal_mean_reward(1.0)
        .model_path(&path)
        .seed(5);

    let trainer = A3CTrainer::new(env.observation_dim(), env.n_actions(), config.clone()).unwrap();
    let before = trainer.shared_policy().unwrap().state_dict();
    let report = trainer.run(|worker| CartPole::new(100, 100 + worker as u64)).unwrap();

    // Every greedy CartPole episode scores at least one, so the goal is met
    // as soon as the window fills.
    assert!(report.goal_reached);
    assert!(report.updates > 0);
    assert!(path.exists());
    assert_ne!(trainer.shared_policy().unwrap().state_dict(), before);

    let mut agent = A3CAgent::new(env.observation_dim(), env.n_actions(), config).unwrap();
    agent.load_policy(&path).unwrap();
    let mut eval_env = CartPole::new(100, 7);
    let (mean, _) = agent.evaluate(&mut eval_env, 2, Some(7)).unwrap();
    assert!(mean >= 1.0);
}
