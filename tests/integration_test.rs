use std::fs;

use tyche::{
    agents::{BootstrapConfig, BootstrapNeuralAgent, DcbAgent, LinearPosteriorAgent},
    bandits::{BanditEnv, BernoulliCB, ContextType, GaussianCB},
    config::{AgentConfig, BanditConfig, BanditKind, ExperimentConfig},
    exec::ExecContext,
    logger::{LogFormat, Logger},
    model::ModelConfig,
    trainer::{run_experiment, DcbTrainer},
};

#[test]
fn test_linear_posterior_end_to_end() {
    let exec = ExecContext::seeded(2024);
    let mut bandit = BernoulliCB::bernoulli(2, 3, None, ContextType::OneHot, &exec).unwrap();
    let mut agent = LinearPosteriorAgent::builder(bandit.context_dim(), bandit.n_actions())
        .exec(exec)
        .build()
        .unwrap();

    let mut context = bandit.reset();
    for _ in 0..200 {
        let action = agent.select_action(context.view()).unwrap();
        let (next, reward) = bandit.step(action).unwrap();
        agent.update_params(context.view(), action, reward).unwrap();
        context = next;
    }

    let metrics = bandit.metrics();
    assert_eq!(metrics.len(), 200);
    assert!(metrics.cum_regret.is_finite());
    assert!(metrics.cum_regret_hist.iter().all(|&r| r >= 0.0));
    assert!(metrics.cum_regret_hist.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn test_trainer_logs_and_summarises() {
    let dir = tempfile::tempdir().unwrap();
    let exec = ExecContext::seeded(11);
    let bandit = GaussianCB::gaussian(3, 2, None, ContextType::OneHot, &exec).unwrap();
    let agent = LinearPosteriorAgent::builder(3, 2).init_pulls(1).exec(exec).build().unwrap();
    let logger = Logger::new(dir.path(), &[LogFormat::Csv, LogFormat::Scalars]).unwrap();

    let mut trainer = DcbTrainer::new(bandit, agent)
        .unwrap()
        .with_logger(logger)
        .with_log_interval(10);
    let summary = trainer.train(50).unwrap();

    assert_eq!(summary.timesteps, 50);
    assert_eq!(summary.regret_history.len(), 50);
    assert!((summary.mean_reward - summary.cumulative_reward / 50.0).abs() < 1e-5);
    assert_eq!(summary.cumulative_regret, *summary.regret_history.last().unwrap());

    let csv = fs::read_to_string(dir.path().join("train.csv")).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next().unwrap(),
        "timestep,reward,regret,cumulative_reward,cumulative_regret"
    );
    assert_eq!(lines.count(), 5);
}

#[test]
fn test_trainer_rejects_mismatched_agent() {
    let exec = ExecContext::seeded(0);
    let bandit = BernoulliCB::bernoulli(2, 3, None, ContextType::OneHot, &exec).unwrap();
    let agent = LinearPosteriorAgent::builder(2, 4).build().unwrap();
    assert!(DcbTrainer::new(bandit, agent).is_err());
}

#[test]
fn test_bootstrap_agent_trains() {
    let exec = ExecContext::seeded(3);
    let bandit = BernoulliCB::bernoulli(2, 2, None, ContextType::OneHot, &exec).unwrap();
    let config = BootstrapConfig {
        n: 3,
        train_epochs: 2,
        batch_size: 16,
        nn_update_interval: 5,
        model: ModelConfig {
            hidden_dims: vec![8],
            ..BootstrapConfig::default().model
        },
        ..BootstrapConfig::default()
    };
    let agent = BootstrapNeuralAgent::new(2, 2, config, &exec).unwrap();

    let mut trainer = DcbTrainer::new(bandit, agent).unwrap();
    let summary = trainer.train(40).unwrap();
    assert!(summary.cumulative_regret.is_finite());

    let agent = trainer.agent();
    assert_eq!(agent.n_members(), 3);
    assert!((0..3).all(|m| agent.member_db(m).unwrap().len() >= 1));
}

#[test]
fn test_seeded_experiments_are_reproducible() {
    let config = ExperimentConfig {
        seed: Some(99),
        timesteps: 60,
        bandit: BanditConfig {
            kind: BanditKind::Bernoulli,
            bandits: 2,
            arms: 3,
            ..BanditConfig::default()
        },
        agent: AgentConfig::default(),
        ..ExperimentConfig::default()
    };

    let first = run_experiment(&config).unwrap();
    let second = run_experiment(&config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_run_experiment_from_json_file() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().join("logs");
    let config_path = dir.path().join("experiment.json");
    let json = format!(
        r#"{{
            "seed": 7,
            "timesteps": 30,
            "log_interval": 10,
            "log_dir": {:?},
            "log_formats": ["csv", "scalars"],
            "bandit": {{"kind": "gaussian", "bandits": 2, "arms": 2, "context_type": "int"}},
            "agent": {{"type": "neural_greedy", "init_pulls": 1, "nn_update_interval": 10,
                       "train_epochs": 2, "batch_size": 8, "model": {{"hidden_dims": [4]}}}}
        }}"#,
        log_dir.to_str().unwrap()
    );
    fs::write(&config_path, json).unwrap();

    let config = ExperimentConfig::load(&config_path).unwrap();
    let summary = run_experiment(&config).unwrap();

    assert_eq!(summary.regret_history.len(), 30);
    assert!(log_dir.join("train.csv").exists());
    assert!(log_dir.join("scalars.csv").exists());
}
