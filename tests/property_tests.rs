#[cfg(test)]
mod property_tests {
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array2};
    use polyak::activations::Activation;
    use polyak::algorithms::TargetPair;
    use polyak::algorithms::a3c::discounted_returns;
    use polyak::exploration::schedule::linear_decay;
    use polyak::exploration::{ExplorationStrategy, Model, NormalNoiseDecayStrategy};
    use polyak::layers::{DenseLayer, WeightInit};
    use polyak::network::{NeuralNetwork, Parameterized};
    use polyak::replay_buffer::{ReplayBuffer, Transition};
    use polyak::types::ActionBounds;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixed(Array1<f32>);

    impl Model for Fixed {
        fn predict(&self, _state: ndarray::ArrayView1<f32>) -> Array1<f32> {
            self.0.clone()
        }
    }

    fn constant_network(value: f32) -> NeuralNetwork {
        let mut rng = StdRng::seed_from_u64(0);
        let layer = DenseLayer::new(2, 3, Activation::Relu, WeightInit::Zeros, &mut rng)
            .with_weights(Array2::from_elem((2, 3), value))
            .unwrap()
            .with_biases(Array1::from_elem(3, value))
            .unwrap();
        NeuralNetwork::new(&[2, 3], &[Activation::Relu], WeightInit::Zeros, &mut rng)
            .unwrap()
            .with_layers(vec![layer])
    }

    proptest! {
        #[test]
        fn test_ring_buffer_keeps_newest(capacity in 1usize..20, inserts in 0usize..60) {
            let mut buffer = ReplayBuffer::new(capacity, 1, 0).unwrap();
            for i in 0..inserts {
                let x = i as f32;
                buffer.add(Transition::new(Array1::from_elem(1, x), Array1::zeros(1), x, Array1::from_elem(1, x), false)).unwrap();
            }

            prop_assert_eq!(buffer.len(), inserts.min(capacity));
            prop_assert_eq!(buffer.cursor(), inserts % capacity);
            let stored: Vec<f32> = buffer.iter_oldest_first().map(|t| t.reward).collect();
            let expected: Vec<f32> = (inserts.saturating_sub(capacity)..inserts).map(|i| i as f32).collect();
            prop_assert_eq!(stored, expected);
        }

        #[test]
        fn test_noise_ratio_decays_monotonically(
            init in 0.0f32..1.0,
            fraction in 0.0f32..1.0,
            decay_steps in 0usize..500,
            calls in 1usize..600,
        ) {
            let min = init * fraction;
            let bounds = ActionBounds::uniform(2, -1.0, 1.0).unwrap();
            let mut strategy = ExplorationStrategy::NormalNoiseDecay(
                NormalNoiseDecayStrategy::new(bounds.clone(), init, min, decay_steps).unwrap(),
            );
            let model = Fixed(Array1::from_elem(2, 0.3));
            let mut rng = StdRng::seed_from_u64(1);

            let mut previous = f32::INFINITY;
            for _ in 0..calls {
                let action = strategy.select_action(&model, ndarray::array![0.0].view(), false, &mut rng).unwrap();
                prop_assert!(bounds.contains(action.to_continuous().unwrap().view()));
                let ratio = strategy.exploration_parameter().unwrap();
                prop_assert!(ratio >= min - 1e-6 && ratio <= init + 1e-6);
                prop_assert!(ratio <= previous + 1e-6);
                previous = ratio;
            }
        }

        #[test]
        fn test_linear_decay_stays_in_range(init in 0.0f32..10.0, fraction in 0.0f32..1.0, steps in 0usize..1000, t in 0usize..2000) {
            let min = init * fraction;
            let value = linear_decay(init, min, steps, t);
            prop_assert!(value >= min && value <= init);
        }

        #[test]
        fn test_polyak_is_exact_convex_mix(online in -5.0f32..5.0, target in -5.0f32..5.0, tau in 0.001f32..1.0) {
            let mut pair = TargetPair::new(constant_network(online));
            pair.target = constant_network(target);
            pair.polyak(tau).unwrap();

            let expected = (1.0 - tau) * target + tau * online;
            for layer in pair.target.layers() {
                for &w in layer.weights.iter().chain(layer.biases.iter()) {
                    assert_abs_diff_eq!(w, expected, epsilon = 1e-5);
                }
            }
            // Online parameters are never touched
            prop_assert!(pair.online.layers()[0].weights.iter().all(|&w| w == online));
        }

        #[test]
        fn test_returns_satisfy_bellman_recursion(
            rewards in prop::collection::vec(-5.0f32..5.0, 1..30),
            bootstrap in -10.0f32..10.0,
            gamma in 0.0f32..1.0,
        ) {
            let (discounts, returns) = discounted_returns(&rewards, bootstrap, gamma);
            prop_assert_eq!(returns.len(), rewards.len());
            let last = rewards.len() - 1;
            assert_abs_diff_eq!(returns[last], rewards[last] + gamma * bootstrap, epsilon = 1e-4);
            for t in 0..last {
                assert_abs_diff_eq!(returns[t], rewards[t] + gamma * returns[t + 1], epsilon = 1e-3);
                assert_abs_diff_eq!(discounts[t + 1], discounts[t] * gamma, epsilon = 1e-6);
            }
        }
    }
}
