use ndarray::{array, Array1, Array2};
use rand::rngs::StdRng;
use rand::SeedableRng;
use crate::activations::{softmax, Activation};
use crate::algorithms::{DeterministicPolicy, SyncMode, TargetPair};
use crate::env::{CartPole, Environment, Pendulum};
use crate::error::PolyakError;
use crate::exploration::{ExplorationStrategy, Model, NormalNoiseDecayStrategy};
use crate::network::{NeuralNetwork, Parameterized};
use crate::types::{Action, ActionBounds};

struct Zeros;

impl Model for Zeros {
    fn predict(&self, _state: ndarray::ArrayView1<f32>) -> Array1<f32> {
        Array1::zeros(2)
    }
}

#[test]
fn test_activation_extreme_values_stay_finite() {
    for activation in [Activation::Relu, Activation::Sigmoid, Activation::Tanh, Activation::LeakyRelu { alpha: 0.01 }] {
        let mut large = array![[1e10, -1e10, f32::MAX / 2.0, f32::MIN / 2.0]];
        activation.apply_batch(&mut large);
        assert!(large.iter().all(|v| v.is_finite()), "{:?} produced non-finite output", activation);
    }
}

#[test]
fn test_softmax_of_equal_extreme_logits() {
    let probs = softmax(array![-1e30, -1e30].view());
    assert!((probs[0] - 0.5).abs() < 1e-6);
}

#[test]
fn test_degenerate_action_bounds() {
    assert!(ActionBounds::uniform(0, -1.0, 1.0).is_err());
    assert!(ActionBounds::uniform(2, 1.0, 1.0).is_err());
    assert!(ActionBounds::new(array![-1.0], array![1.0, 2.0]).is_err());
    match ActionBounds::uniform(1, 2.0, -2.0) {
        Err(e) => assert!(e.is_fatal()),
        Ok(_) => panic!("inverted bounds accepted"),
    }
}

#[test]
fn test_clamp_handles_infinities() {
    let bounds = ActionBounds::new(array![-2.0, 0.0], array![2.0, 1.0]).unwrap();
    let clamped = bounds.clamp(array![f32::INFINITY, f32::NEG_INFINITY].view());
    assert_eq!(clamped, array![2.0, 0.0]);
    assert!(bounds.contains(clamped.view()));
    assert!(!bounds.contains(array![0.0].view()));
}

#[test]
fn test_noise_with_zero_decay_steps_drops_to_minimum() {
    let bounds = ActionBounds::uniform(2, -1.0, 1.0).unwrap();
    let mut strategy = ExplorationStrategy::NormalNoiseDecay(NormalNoiseDecayStrategy::new(bounds.clone(), 0.5, 0.1, 0).unwrap());
    let mut rng = StdRng::seed_from_u64(0);
    for _ in 0..10 {
        let action = strategy.select_action(&Zeros, array![0.0].view(), false, &mut rng).unwrap();
        assert!(bounds.contains(action.to_continuous().unwrap().view()));
    }
    assert!((strategy.exploration_parameter().unwrap() - 0.1).abs() < 1e-6);
}

#[test]
fn test_environments_reject_wrong_action_kind() {
    let mut pendulum = Pendulum::default();
    pendulum.reset(Some(0)).unwrap();
    assert!(matches!(pendulum.step(&Action::Discrete(0)), Err(PolyakError::Environment(_))));

    let mut cartpole = CartPole::default();
    cartpole.reset(Some(0)).unwrap();
    assert!(cartpole.step(&Action::Continuous(array![0.0])).is_err());
    assert!(cartpole.step(&Action::Discrete(2)).is_err());
}

#[test]
fn test_polyak_rejects_out_of_range_tau() {
    let mut rng = StdRng::seed_from_u64(1);
    let net = NeuralNetwork::mlp(2, &[4], 1, Activation::Linear, &mut rng).unwrap();
    let mut pair = TargetPair::new(net);
    assert!(pair.sync(SyncMode::Polyak { tau: 0.0 }).is_err());
    assert!(pair.sync(SyncMode::Polyak { tau: 1.5 }).is_err());
    assert!(pair.sync(SyncMode::Polyak { tau: f32::NAN }).is_err());
    assert!(pair.sync(SyncMode::Polyak { tau: 1.0 }).is_ok());
    assert_eq!(pair.target.state_dict(), pair.online.state_dict());
}

#[test]
fn test_policy_output_respects_bounds_for_wild_states() {
    let mut rng = StdRng::seed_from_u64(2);
    let bounds = ActionBounds::new(array![-2.0, 0.0], array![2.0, 10.0]).unwrap();
    let policy = DeterministicPolicy::new(3, bounds.clone(), &[8], &mut rng).unwrap();
    let states = Array2::from_shape_vec((2, 3), vec![1e6, -1e6, 1e6, 0.0, 0.0, 0.0]).unwrap();
    for row in policy.predict_batch(states.view()).rows() {
        assert!(bounds.contains(row));
    }
}

#[test]
fn test_backward_without_forward_is_an_error() {
    let mut rng = StdRng::seed_from_u64(3);
    let net = NeuralNetwork::mlp(2, &[4], 1, Activation::Linear, &mut rng).unwrap();
    assert!(net.backward_batch(Array2::zeros((1, 1)).view()).is_err());
}
