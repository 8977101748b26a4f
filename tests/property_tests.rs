#[cfg(test)]
mod property_tests {
    use nalgebra::{DMatrix, DVector};
    use ndarray::Array1;
    use proptest::prelude::*;
    use tyche::agents::{ActionPosterior, DcbAgent, LinearPosteriorAgent};
    use tyche::bandits::{BanditEnv, BernoulliCB, ContextType, GaussianCB};
    use tyche::db::TransitionDb;
    use tyche::exec::ExecContext;

    fn context_type_strategy() -> impl Strategy<Value = ContextType> {
        prop_oneof![Just(ContextType::OneHot), Just(ContextType::Index)]
    }

    proptest! {
        #[test]
        fn test_reset_yields_empty_history(
            bandits in 1usize..8,
            arms in 1usize..6,
            context_type in context_type_strategy(),
            steps in 0usize..20,
            seed in any::<u64>(),
        ) {
            let mut bandit = BernoulliCB::bernoulli(bandits, arms, None, context_type, &ExecContext::seeded(seed)).unwrap();
            for i in 0..steps {
                bandit.step(i % arms).unwrap();
            }
            let context = bandit.reset();
            prop_assert_eq!(context.len(), bandit.context_dim());
            prop_assert!(bandit.metrics().is_empty());
            prop_assert!(bandit.metrics().cum_regret_hist.is_empty());
        }

        #[test]
        fn test_histories_are_running_sums(
            actions in prop::collection::vec(0usize..4, 1..60),
            seed in any::<u64>(),
        ) {
            let mut bandit = GaussianCB::gaussian(3, 4, None, ContextType::OneHot, &ExecContext::seeded(seed)).unwrap();
            bandit.reset();
            for &action in &actions {
                bandit.step(action).unwrap();
            }

            let m = bandit.metrics();
            prop_assert_eq!(m.reward_hist.len(), actions.len());
            prop_assert_eq!(m.regret_hist.len(), actions.len());
            let reward_sum: f32 = m.reward_hist.iter().sum();
            let regret_sum: f32 = m.regret_hist.iter().sum();
            prop_assert!((m.cum_reward_hist.last().unwrap() - reward_sum).abs() < 1e-3);
            prop_assert!((m.cum_regret_hist.last().unwrap() - regret_sum).abs() < 1e-3);
        }

        #[test]
        fn test_bernoulli_rewards_are_binary(
            actions in prop::collection::vec(0usize..3, 1..50),
            seed in any::<u64>(),
        ) {
            let mut bandit = BernoulliCB::bernoulli(2, 3, None, ContextType::OneHot, &ExecContext::seeded(seed)).unwrap();
            for &action in &actions {
                let (_, reward) = bandit.step(action).unwrap();
                prop_assert!(reward == 0.0 || reward == 1.0);
            }
            prop_assert!(bandit.metrics().regret_hist.iter().all(|&r| r == 0.0 || r == 1.0));
        }

        #[test]
        fn test_gaussian_max_reward_is_row_max(seed in any::<u64>(), action in 0usize..5) {
            let mut bandit = GaussianCB::gaussian(4, 5, None, ContextType::OneHot, &ExecContext::seeded(seed)).unwrap();
            let b = bandit.current_bandit();
            let best = bandit.reward_model().max_mean(b);
            let means = bandit.reward_model().reward_means.row(b).to_owned();
            let (_, reward) = bandit.step(action).unwrap();

            prop_assert!(means.iter().all(|&m| m <= best));
            let regret = bandit.metrics().regret_hist[0];
            prop_assert!((regret - (best - reward)).abs() < 1e-5);
        }

        #[test]
        fn test_db_query_preserves_insertion_order(
            entries in prop::collection::vec((0usize..3, -5.0f32..5.0), 0..40),
        ) {
            let mut db = TransitionDb::new(1, 3);
            for (i, &(action, reward)) in entries.iter().enumerate() {
                db.add(Array1::from_elem(1, i as f32).view(), action, reward).unwrap();
            }

            for action in 0..3 {
                let expected: Vec<(f32, f32)> = entries
                    .iter()
                    .enumerate()
                    .filter(|(_, &(a, _))| a == action)
                    .map(|(i, &(_, r))| (i as f32, r))
                    .collect();
                let (contexts, rewards) = db.get_data_for_action(action);
                let actual: Vec<(f32, f32)> = contexts.column(0).iter().copied().zip(rewards.column(0).iter().copied()).collect();
                prop_assert_eq!(actual, expected);
            }
        }

        #[test]
        fn test_warm_up_pulls_each_action_init_pulls_times(
            n_actions in 1usize..6,
            init_pulls in 1usize..4,
        ) {
            let mut agent = LinearPosteriorAgent::builder(2, n_actions)
                .init_pulls(init_pulls)
                .exec(ExecContext::seeded(0))
                .build()
                .unwrap();
            let context = Array1::from_vec(vec![1.0, 0.0]);

            let mut counts = vec![0usize; n_actions];
            for round in 0..n_actions * init_pulls {
                let action = agent.select_action(context.view()).unwrap();
                prop_assert_eq!(action, round % n_actions);
                counts[action] += 1;
            }
            prop_assert!(counts.iter().all(|&c| c == init_pulls));
        }

        #[test]
        fn test_single_sample_refit_is_consistent(
            x in prop::collection::vec(-3.0f64..3.0, 3),
            y in -2.0f64..2.0,
            lambda in 0.05f64..2.0,
        ) {
            let mut posterior = ActionPosterior::prior(4, lambda, 6.0, 6.0);
            let row = DMatrix::from_row_slice(1, 4, &[x[0], x[1], x[2], 1.0]);
            prop_assert!(posterior.refit(&row, &DVector::from_vec(vec![y]), lambda, 6.0, 6.0, 1));

            prop_assert!((&posterior.cov - posterior.cov.transpose()).amax() < 1e-9);
            prop_assert!(posterior.cov.clone().cholesky().is_some());
            let identity_error = (&posterior.inv_cov * &posterior.cov - DMatrix::<f64>::identity(4, 4)).amax();
            prop_assert!(identity_error < 1e-6);
        }
    }
}
