use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, info_span, warn, Instrument};

use ghas_core::{Purpose, RepoRef, Repository};
use ghas_notify::{NoticeTemplates, Notifier};
use ghas_platform::Platform;

use crate::{Config, Executor, Pipeline, RepoOutcome, RunContext, RunReport};

/// Enumerates target repositories and drives each through plan and execution.
pub struct Fleet {
    platform: Arc<dyn Platform>,
    notifier: Arc<dyn Notifier>,
    config: Config,
    templates: NoticeTemplates,
    seed: Option<u64>,
}

impl Fleet {
    pub fn new(platform: Arc<dyn Platform>, notifier: Arc<dyn Notifier>, config: Config) -> Result<Self> {
        let templates = config.notifications.templates.load()?;
        Ok(Self {
            platform,
            notifier,
            config,
            templates,
            seed: None,
        })
    }

    /// Deterministic cron schedules and branch suffixes.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run(&self, purpose: Purpose, only_repo: Option<&str>) -> Result<RunReport> {
        self.run_at(purpose, only_repo, Utc::now()).await
    }

    pub async fn run_at(&self, purpose: Purpose, only_repo: Option<&str>, now: DateTime<Utc>) -> Result<RunReport> {
        let platform = self.platform.as_ref();
        let context = RunContext::load(platform, &self.config, purpose, now).await?;
        let repos = self.targets(purpose, only_repo).await?;
        info!(run_id = %context.run_id, purpose = %purpose, repositories = repos.len(), "processing repositories");

        let pipeline = Pipeline::new(platform, &self.config, &context);
        let executor = Executor {
            platform,
            notifier: self.notifier.as_ref(),
            templates: &self.templates,
            secondary_email: self.config.notifications.secondary_email.as_deref(),
            dry_run: self.config.notifications.dry_run,
        };
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut outcomes = Vec::with_capacity(repos.len());
        for repo in &repos {
            let span = info_span!("repo", repo = %repo.reference(), purpose = %purpose);
            let outcome = process(&pipeline, &executor, repo, &mut rng).instrument(span).await;
            outcomes.push(outcome);
        }

        let report = RunReport {
            run_id: context.run_id.clone(),
            purpose,
            dry_run: self.config.notifications.dry_run,
            outcomes,
        };
        info!(
            event = "finished-processing",
            run_id = %report.run_id,
            acted = report.acted().count(),
            skipped = report.skipped().count(),
            failed = report.failed().count()
        );
        Ok(report)
    }

    async fn targets(&self, purpose: Purpose, only_repo: Option<&str>) -> Result<Vec<Repository>> {
        match only_repo {
            Some(name) => {
                let repo = match name.split_once('/') {
                    Some((owner, name)) => RepoRef::new(owner, name),
                    None => RepoRef::new(&self.config.platform.org, name),
                };
                let found = self
                    .platform
                    .repository(&repo)
                    .await
                    .with_context(|| format!("fetch repository {repo}"))?
                    .ok_or_else(|| anyhow!("repository {repo} not found"))?;
                Ok(vec![found])
            }
            None => {
                let integration = purpose.fleet_integration();
                self.platform
                    .installation_repositories(integration)
                    .await
                    .with_context(|| format!("list {integration} installation repositories"))
            }
        }
    }
}

async fn process(
    pipeline: &Pipeline<'_>,
    executor: &Executor<'_>,
    repo: &Repository,
    rng: &mut StdRng,
) -> RepoOutcome {
    let mut outcome = RepoOutcome {
        repo: repo.reference().to_string(),
        verdict: None,
        actions: vec![],
        failure: None,
    };
    let plan = match pipeline.evaluate(repo, rng).await {
        Ok(plan) => plan,
        Err(failure) => {
            warn!(event = "repository-failed", step = %failure.step, reason = %failure.reason);
            outcome.failure = Some(failure);
            return outcome;
        }
    };

    let result = executor.execute(&plan.commands, rng, &mut outcome.actions).await;
    outcome.verdict = Some(plan.verdict);
    match result {
        Ok(()) => {
            info!(event = outcome.event(), actions = outcome.actions.len());
        }
        Err(failure) => {
            warn!(event = "repository-failed", step = %failure.step, reason = %failure.reason);
            outcome.failure = Some(failure);
        }
    }
    outcome
}
