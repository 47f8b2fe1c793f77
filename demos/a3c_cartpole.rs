//! Train A3C on CartPole with one environment per worker thread.
//!
//! Run with `RUST_LOG=info cargo run --release --example a3c_cartpole`.

use polyak::algorithms::{A3CAgent, A3CTrainer};
use polyak::config::A3CConfig;
use polyak::env::{CartPole, DiscreteEnvironment, Environment};
use polyak::error::Result;
use polyak::network::Parameterized;

fn main() -> Result<()> {
    env_logger::init();

    let config = A3CConfig::default()
        .n_workers(num_cpus::get().clamp(1, 8))
        .model_path("a3c_cartpole_policy.bin");
    let probe = CartPole::default();
    let (state_dim, n_actions) = (probe.observation_dim(), probe.n_actions());

    let trainer = A3CTrainer::new(state_dim, n_actions, config.clone())?;
    let report = trainer.run(|worker| CartPole::new(500, config.seed + worker as u64))?;
    println!(
        "{} shared updates, {} worker episodes, goal reached: {}",
        report.updates,
        report.eval_scores.len(),
        report.goal_reached
    );

    let policy_path = "a3c_cartpole_policy.bin";
    if !report.goal_reached {
        trainer.shared_policy()?.state_dict().save(policy_path)?;
    }
    let mut agent = A3CAgent::new(state_dim, n_actions, config)?;
    agent.load_policy(policy_path)?;
    let (mean, std) = agent.evaluate(&mut CartPole::new(500, 1), 10, None)?;
    println!("greedy score over 10 episodes: {:.1} +/- {:.1}", mean, std);
    Ok(())
}
