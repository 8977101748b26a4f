use ndarray::{array, Array1, ArrayView1};
use crate::agents::{
    ActionPosterior, BootstrapConfig, BootstrapNeuralAgent, DcbAgent, LinearPosteriorAgent, LinearPosteriorConfig,
    NeuralGreedyAgent, NeuralGreedyConfig,
};
use crate::config::ExperimentConfig;
use crate::trainer::run_experiment;
use crate::bandits::{BanditEnv, BernoulliCB, ContextType};
use crate::db::TransitionDb;
use crate::error::{Result, TycheError};
use crate::exec::ExecContext;
use crate::model::{BanditModel, ModelConfig};

/// Model with fixed predictions that records how it is used
#[derive(Debug, Clone)]
struct FixedModel {
    predictions: Array1<f32>,
    train_calls: usize,
    trained_on: usize,
    use_dropout: bool,
}

impl FixedModel {
    fn new(predictions: Array1<f32>) -> Self {
        FixedModel {
            predictions,
            train_calls: 0,
            trained_on: 0,
            use_dropout: false,
        }
    }
}

impl BanditModel for FixedModel {
    fn predict(&mut self, _context: ArrayView1<f32>) -> Result<Array1<f32>> {
        Ok(self.predictions.clone())
    }

    fn train(&mut self, db: &TransitionDb, _epochs: usize, _batch_size: usize) -> Result<Option<f32>> {
        self.train_calls += 1;
        self.trained_on = db.len();
        Ok(Some(0.0))
    }

    fn set_use_dropout(&mut self, use_dropout: bool) {
        self.use_dropout = use_dropout;
    }
}

fn linear_agent(init_pulls: usize, seed: u64) -> LinearPosteriorAgent {
    LinearPosteriorAgent::builder(2, 3)
        .init_pulls(init_pulls)
        .exec(ExecContext::seeded(seed))
        .build()
        .unwrap()
}

#[test]
fn test_linear_warm_up_round_robin() {
    let mut agent = linear_agent(2, 0);
    let context = array![1.0, 0.0];
    let actions: Vec<usize> = (0..6).map(|_| agent.select_action(context.view()).unwrap()).collect();
    assert_eq!(actions, vec![0, 1, 2, 0, 1, 2]);
    assert_eq!(agent.rounds(), 6);
}

#[test]
fn test_linear_refits_updated_action_only() {
    let mut agent = linear_agent(1, 0);
    let prior = agent.posterior(1).unwrap().clone();

    agent.select_action(array![1.0, 0.0].view()).unwrap();
    agent.update_params(array![1.0, 0.0].view(), 0, 1.0).unwrap();

    let posterior = agent.posterior(0).unwrap();
    assert_eq!(posterior.dim(), 3);
    assert!(posterior.mu[0] > 0.0);
    assert!((posterior.a - 6.5).abs() < 1e-12);
    assert_eq!(agent.posterior(1).unwrap(), &prior);
    assert!(agent.posterior(3).is_none());
}

#[test]
fn test_linear_update_interval() {
    let config = LinearPosteriorConfig {
        bayesian_update_interval: 2,
        ..LinearPosteriorConfig::default()
    };
    let mut agent = LinearPosteriorAgent::new(2, 3, config, &ExecContext::seeded(0)).unwrap();
    let prior = agent.posterior(0).unwrap().clone();

    agent.update_params(array![1.0, 0.0].view(), 0, 1.0).unwrap();
    assert_eq!(agent.posterior(0).unwrap(), &prior);

    agent.update_params(array![0.0, 1.0].view(), 0, 1.0).unwrap();
    assert_ne!(agent.posterior(0).unwrap(), &prior);
    assert_eq!(agent.db().count_for_action(0), 2);
}

#[test]
fn test_linear_finds_paying_arm() {
    let exec = ExecContext::seeded(5);
    // arm 2 always pays, the others never do
    let probs = array![[1.0, 1.0, 0.0], [1.0, 1.0, 0.0]];
    let mut bandit = BernoulliCB::bernoulli(2, 3, Some(probs), ContextType::OneHot, &exec).unwrap();
    let mut agent = LinearPosteriorAgent::builder(2, 3).init_pulls(2).exec(exec).build().unwrap();

    let mut context = bandit.reset();
    let mut late_picks = Vec::new();
    for t in 0..300 {
        let action = agent.select_action(context.view()).unwrap();
        let (next, reward) = bandit.step(action).unwrap();
        agent.update_params(context.view(), action, reward).unwrap();
        context = next;
        if t >= 200 {
            late_picks.push(action);
        }
    }

    let best = late_picks.iter().filter(|&&a| a == 2).count();
    assert!(best > 80, "arm 2 picked {} of 100 times", best);
}

#[test]
fn test_agents_validate_input() {
    let mut agent = linear_agent(1, 0);
    assert!(matches!(
        agent.select_action(array![1.0].view()),
        Err(TycheError::DimensionMismatch { .. })
    ));
    assert!(matches!(
        agent.update_params(array![1.0, 0.0].view(), 5, 1.0),
        Err(TycheError::InvalidAction { action: 5, .. })
    ));
    assert!(LinearPosteriorAgent::builder(0, 3).build().is_err());
    assert!(LinearPosteriorAgent::builder(2, 3).lambda_prior(0.0).build().is_err());
}

#[test]
fn test_oversized_warm_up_rejected() {
    let init_pulls = usize::MAX / 2;
    let is_init_pulls = |err: TycheError| matches!(err, TycheError::InvalidParameter { ref name, .. } if name == "init_pulls");

    let linear = LinearPosteriorAgent::builder(1, 3).init_pulls(init_pulls).build();
    assert!(is_init_pulls(linear.unwrap_err()));

    let greedy_config = NeuralGreedyConfig {
        init_pulls,
        ..NeuralGreedyConfig::default()
    };
    let greedy = NeuralGreedyAgent::with_model(1, 3, FixedModel::new(array![0.0, 0.0, 0.0]), greedy_config);
    assert!(is_init_pulls(greedy.unwrap_err()));

    let bootstrap_config = BootstrapConfig {
        init_pulls,
        ..BootstrapConfig::default()
    };
    let models = vec![FixedModel::new(array![0.0, 0.0, 0.0])];
    let bootstrap = BootstrapNeuralAgent::with_models(1, 3, models, bootstrap_config, &ExecContext::seeded(0));
    assert!(is_init_pulls(bootstrap.unwrap_err()));

    let json = format!(
        r#"{{"seed": 1, "timesteps": 5, "bandit": {{"bandits": 2, "arms": 3}}, "agent": {{"type": "linear_posterior", "init_pulls": {}}}}}"#,
        init_pulls
    );
    let config = ExperimentConfig::from_json(&json).unwrap();
    assert!(is_init_pulls(run_experiment(&config).unwrap_err()));
}

#[test]
fn test_linear_degenerate_posterior_falls_back_per_action() {
    let mut agent = LinearPosteriorAgent::builder(2, 3)
        .init_pulls(0)
        .exec(ExecContext::seeded(4))
        .build()
        .unwrap();

    // without the fallback action 0 would always win through its bias weight
    let mut broken = ActionPosterior::prior(3, 0.25, 6.0, 6.0);
    broken.mu[2] = 1000.0;
    broken.b = -1.0;
    agent.set_posterior(0, broken).unwrap();

    let mut confident = ActionPosterior::prior(3, 0.25, 6.0, 6.0);
    confident.mu[2] = 100.0;
    confident.cov *= 1e-6;
    confident.inv_cov *= 1e6;
    agent.set_posterior(1, confident).unwrap();

    for _ in 0..20 {
        assert_eq!(agent.select_action(array![1.0, 0.0].view()).unwrap(), 1);
    }
    assert_eq!(agent.posterior(0).unwrap().b, -1.0);

    assert!(matches!(
        agent.set_posterior(0, ActionPosterior::prior(2, 0.25, 6.0, 6.0)),
        Err(TycheError::DimensionMismatch { .. })
    ));
    assert!(matches!(
        agent.set_posterior(3, ActionPosterior::prior(3, 0.25, 6.0, 6.0)),
        Err(TycheError::InvalidAction { action: 3, .. })
    ));
}

#[test]
fn test_neural_greedy_first_max() {
    let model = FixedModel::new(array![0.2, 0.7, 0.7]);
    let config = NeuralGreedyConfig {
        init_pulls: 1,
        ..NeuralGreedyConfig::default()
    };
    let mut agent = NeuralGreedyAgent::with_model(2, 3, model, config).unwrap();
    let context = array![0.0, 1.0];

    let warm_up: Vec<usize> = (0..3).map(|_| agent.select_action(context.view()).unwrap()).collect();
    assert_eq!(warm_up, vec![0, 1, 2]);
    assert_eq!(agent.select_action(context.view()).unwrap(), 1);
}

#[test]
fn test_neural_greedy_retrain_cadence() {
    let config = NeuralGreedyConfig {
        nn_update_interval: 3,
        ..NeuralGreedyConfig::default()
    };
    let mut agent = NeuralGreedyAgent::with_model(1, 2, FixedModel::new(array![0.0, 0.0]), config).unwrap();

    for i in 0..7 {
        agent.update_params(array![i as f32].view(), i % 2, 1.0).unwrap();
    }
    assert_eq!(agent.model().train_calls, 2);
    assert_eq!(agent.model().trained_on, 6);
    assert_eq!(agent.db().len(), 7);
}

#[test]
fn test_neural_greedy_default_model() {
    let config = NeuralGreedyConfig {
        init_pulls: 1,
        nn_update_interval: 2,
        train_epochs: 2,
        batch_size: 4,
        model: ModelConfig {
            hidden_dims: vec![8],
            ..ModelConfig::default()
        },
    };
    let mut agent = NeuralGreedyAgent::new(2, 2, config, &ExecContext::seeded(4)).unwrap();
    for _ in 0..4 {
        let action = agent.select_action(array![1.0, 0.0].view()).unwrap();
        assert!(action < 2);
        agent.update_params(array![1.0, 0.0].view(), action, 0.5).unwrap();
    }
}

fn bootstrap(add_prob: f64, n: usize) -> BootstrapNeuralAgent<FixedModel> {
    let models = (0..n).map(|i| FixedModel::new(array![i as f32, 0.5])).collect();
    let config = BootstrapConfig {
        init_pulls: 0,
        add_prob,
        nn_update_interval: 2,
        ..BootstrapConfig::default()
    };
    BootstrapNeuralAgent::with_models(1, 2, models, config, &ExecContext::seeded(8)).unwrap()
}

#[test]
fn test_bootstrap_first_update_reaches_every_member() {
    let mut agent = bootstrap(0.0, 4);
    agent.update_db(array![1.0].view(), 0, 1.0).unwrap();
    for member in 0..4 {
        assert_eq!(agent.member_db(member).unwrap().len(), 1);
    }
}

#[test]
fn test_bootstrap_add_prob_controls_sharing() {
    let mut never = bootstrap(0.0, 3);
    let mut always = bootstrap(1.0, 3);
    for _ in 0..5 {
        never.update_params(array![1.0].view(), 1, 0.0).unwrap();
        always.update_params(array![1.0].view(), 1, 0.0).unwrap();
    }
    for member in 0..3 {
        assert_eq!(never.member_db(member).unwrap().len(), 1);
        assert_eq!(always.member_db(member).unwrap().len(), 5);
    }
    assert!(always.models().iter().all(|m| m.train_calls == 2));
}

#[test]
fn test_bootstrap_members_diverge() {
    let mut agent = bootstrap(0.5, 5);
    for i in 0..40 {
        agent.update_params(array![i as f32].view(), i % 2, 1.0).unwrap();
    }
    let sizes: Vec<usize> = (0..5).map(|m| agent.member_db(m).unwrap().len()).collect();
    assert!(sizes.iter().all(|&s| s >= 1 && s <= 40));
    assert!(sizes.iter().any(|&s| s != sizes[0]), "sizes {:?}", sizes);
}

#[test]
fn test_bootstrap_samples_members() {
    let mut agent = bootstrap(1.0, 2);
    // member 0 prefers arm 1, member 1 prefers arm 0
    let picks: Vec<usize> = (0..50).map(|_| agent.select_action(array![0.0].view()).unwrap()).collect();
    assert!(picks.contains(&0));
    assert!(picks.contains(&1));
}

#[test]
fn test_bootstrap_eval_with_dropout_flag() {
    let models = vec![FixedModel::new(array![1.0, 0.0])];
    let config = BootstrapConfig {
        init_pulls: 0,
        eval_with_dropout: true,
        ..BootstrapConfig::default()
    };
    let mut agent = BootstrapNeuralAgent::with_models(1, 2, models, config, &ExecContext::seeded(0)).unwrap();
    assert_eq!(agent.select_action(array![0.0].view()).unwrap(), 0);
    assert!(agent.models()[0].use_dropout);
    assert_eq!(agent.config().n, 1);
}

#[test]
fn test_boxed_agents_share_interface() {
    let exec = ExecContext::seeded(2);
    let bandit = BernoulliCB::bernoulli(2, 3, None, ContextType::OneHot, &exec).unwrap();
    let agents: Vec<Box<dyn DcbAgent>> = vec![
        Box::new(LinearPosteriorAgent::new(2, 3, LinearPosteriorConfig::default(), &exec).unwrap()),
        Box::new(NeuralGreedyAgent::with_model(2, 3, FixedModel::new(array![0.0, 1.0, 0.0]), NeuralGreedyConfig::default()).unwrap()),
    ];
    for mut agent in agents {
        assert_eq!(agent.n_actions(), bandit.n_actions());
        assert_eq!(agent.context_dim(), bandit.context_dim());
        let action = agent.select_action(array![1.0, 0.0].view()).unwrap();
        agent.update_params(array![1.0, 0.0].view(), action, 1.0).unwrap();
    }
}
