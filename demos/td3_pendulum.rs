//! Train TD3 on Pendulum and report greedy evaluation scores.
//!
//! Run with `RUST_LOG=info cargo run --release --example td3_pendulum`.
//! An optional first argument names a YAML file holding a `TD3Config`.

use log::info;
use polyak::algorithms::TD3Agent;
use polyak::config::{TD3Config, TrainerConfig};
use polyak::env::{ContinuousEnvironment, Environment, Pendulum};
use polyak::error::Result;
use polyak::trainer::Trainer;

fn main() -> Result<()> {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => TD3Config::load(path)?,
        None => TD3Config::default().tau(Some(0.005)),
    };

    let mut env = Pendulum::new(200, config.seed);
    let mut agent = TD3Agent::new(env.observation_dim(), env.action_bounds()?, config)?;
    let trainer = Trainer::new(
        TrainerConfig::default()
            .n_episodes(300)
            .goal_mean_reward(-150.0)
            .model_path("td3_pendulum_policy.bin"),
    )?;

    let report = trainer.train_td3(&mut agent, &mut env)?;
    info!(
        "finished after {} episodes ({} steps), goal reached: {}",
        report.episodes, report.total_steps, report.goal_reached
    );

    let (mean, std) = Trainer::evaluate(&mut agent, &mut env, 10, None)?;
    println!("greedy score over 10 episodes: {:.2} +/- {:.2}", mean, std);
    report.save("td3_pendulum_report.json")?;
    Ok(())
}
