use std::collections::BTreeMap;

use rand::Rng;
use tracing::debug;

use ghas_core::{
    expected_languages, latest_databases, plan_configure, plan_missing_configuration, plan_promote,
    plan_registration, plan_verify, promotion_target, validate_manifest, AnalysisCoverage, AnalysisQuery,
    AnalysisReconciler, AnalysisRecord, ComplianceManifest, ConfigureFacts, DatabaseArtifact, DefaultSetupState,
    Guard, Integration, LanguageSet, Plan, PromoteFacts, Purpose, RepoRef, Repository, ScanConfig, ScanningSetup,
    SkipReason, Strategy, VerifyFacts, IGNORE_MARKER_PATH, MANIFEST_PATH, SCAN_CONFIG_PATH, TRACKING_LABEL,
};
use ghas_platform::Platform;
use ghas_templates::{generate_workflow, placeholder_manifest, render_pull_request_body, uses_reusable_workflow};

use crate::{AtStep, Config, RepoFailure, RunContext};

/// Evaluates one repository: guard chain, probes, then the purpose's planner.
/// Never mutates remote state.
pub struct Pipeline<'a> {
    pub platform: &'a dyn Platform,
    pub config: &'a Config,
    pub context: &'a RunContext,
    pub strategy: Strategy,
}

impl<'a> Pipeline<'a> {
    pub fn new(platform: &'a dyn Platform, config: &'a Config, context: &'a RunContext) -> Self {
        Self {
            platform,
            config,
            context,
            strategy: Strategy::for_purpose(context.purpose),
        }
    }

    pub async fn evaluate<R: Rng + Send>(&self, repo: &Repository, rng: &mut R) -> Result<Plan, RepoFailure> {
        let reference = repo.reference();
        let mut manifest: Option<ComplianceManifest> = None;

        for guard in &self.strategy.guards {
            match guard {
                Guard::OutOfScope => {
                    if self.out_of_scope(repo) {
                        return Ok(Plan::skip(SkipReason::OutOfScope));
                    }
                }
                Guard::Ignored => {
                    let ignored = self
                        .platform
                        .file_exists(&reference, IGNORE_MARKER_PATH, None)
                        .await
                        .at_step("ignore-marker")?;
                    if ignored {
                        return Ok(Plan::skip(SkipReason::Ignored));
                    }
                }
                Guard::Archived => {
                    if repo.archived {
                        return Ok(Plan::skip(SkipReason::Archived));
                    }
                }
                Guard::AlreadyReconciled => {
                    let reconciled = self
                        .strategy
                        .membership_integration()
                        .is_some_and(|i| self.context.is_member(i, repo.id));
                    if reconciled {
                        return Ok(Plan::skip(SkipReason::AlreadyCompliant));
                    }
                }
                Guard::PolicyConfig => {
                    let found = self.manifest(&reference).await?;
                    let problems = validate_manifest(found.as_ref(), &self.context.system_ids);
                    if !problems.is_empty() {
                        debug!(?problems, "policy configuration incomplete");
                        let open = if self.strategy.notifies_missing_config {
                            self.platform
                                .open_issues(&reference, TRACKING_LABEL)
                                .await
                                .at_step("open-issues")?
                        } else {
                            vec![]
                        };
                        return Ok(plan_missing_configuration(
                            &self.strategy,
                            repo,
                            found.as_ref(),
                            problems,
                            &open,
                        ));
                    }
                    manifest = found;
                }
            }
        }

        if self.strategy.checks_scanning_setup {
            return self.configure(repo, rng).await;
        }
        let manifest = manifest.ok_or_else(|| RepoFailure::new("manifest", "manifest not loaded"))?;
        if self.strategy.promotes_artifacts {
            self.promote(repo, &manifest).await
        } else {
            self.verify(repo, &manifest).await
        }
    }

    fn out_of_scope(&self, repo: &Repository) -> bool {
        match self.strategy.purpose {
            Purpose::Configure => !repo.owner.eq_ignore_ascii_case(&self.config.platform.org),
            Purpose::Promote => repo.owner.eq_ignore_ascii_case(&self.config.promotion.org),
            Purpose::Verify => false,
        }
    }

    async fn manifest(&self, repo: &RepoRef) -> Result<Option<ComplianceManifest>, RepoFailure> {
        let Some(file) = self.platform.file(repo, MANIFEST_PATH, None).await.at_step("manifest")? else {
            return Ok(None);
        };
        ComplianceManifest::parse(&file.text).map(Some).at_step("manifest")
    }

    async fn expected_languages(&self, repo: &RepoRef) -> Result<LanguageSet, RepoFailure> {
        let breakdown = self.platform.languages(repo).await.at_step("languages")?;
        let scan_config = match self
            .platform
            .file(repo, SCAN_CONFIG_PATH, None)
            .await
            .at_step("scan-config")?
        {
            Some(file) => ScanConfig::parse(&file.text).at_step("scan-config")?,
            None => ScanConfig::default(),
        };
        Ok(expected_languages(
            breakdown.keys().map(String::as_str),
            &scan_config.excluded_languages,
        ))
    }

    /// Which of the three scanning states the repository is in.
    pub async fn scanning_setup(&self, repo: &Repository) -> Result<ScanningSetup, RepoFailure> {
        let reference = repo.reference();
        let latest = self
            .platform
            .analyses_page(&reference, &AnalysisQuery::latest_any(), 1)
            .await
            .at_step("latest-analysis")?;
        let Some(analysis) = latest.and_then(|page| page.into_iter().next()) else {
            return Ok(ScanningSetup::NotEnabled);
        };

        let state = self.platform.default_setup(&reference).await.at_step("default-setup")?;
        if state == DefaultSetupState::Configured {
            return Ok(ScanningSetup::DefaultSetup);
        }

        let workflow_path = analysis
            .analysis_key
            .split(':')
            .next()
            .unwrap_or_default()
            .to_string();
        let workflow = if workflow_path.is_empty() {
            None
        } else {
            self.platform
                .file(&reference, &workflow_path, None)
                .await
                .at_step("workflow-file")?
        };
        let reusable = workflow
            .as_ref()
            .is_some_and(|f| uses_reusable_workflow(&f.text, &self.config.configure.reusable_source));
        if reusable {
            Ok(ScanningSetup::ReusableWorkflow { workflow_path })
        } else {
            Ok(ScanningSetup::OtherWorkflow { workflow_path })
        }
    }

    async fn configure<R: Rng + Send>(&self, repo: &Repository, rng: &mut R) -> Result<Plan, RepoFailure> {
        let setup = self.scanning_setup(repo).await?;
        debug!(?setup, "scanning setup");
        if let ScanningSetup::ReusableWorkflow { .. } = setup {
            return Ok(plan_registration(repo));
        }

        let reference = repo.reference();
        let languages = self.expected_languages(&reference).await?;
        if languages.is_empty() {
            return Ok(Plan::skip(SkipReason::NoSupportedLanguages));
        }
        let default_sha = self
            .platform
            .ref_sha(&reference, &repo.default_branch)
            .await
            .at_step("default-branch-sha")?
            .ok_or_else(|| RepoFailure::new("default-branch-sha", format!("{} has no head", repo.default_branch)))?;

        let workflow = generate_workflow(
            &languages,
            &repo.default_branch,
            &self.config.configure.analysis_action,
            rng,
        )
        .at_step("render-workflow")?;
        let manifest = placeholder_manifest().at_step("render-manifest")?;
        let pull_request_body = render_pull_request_body(&self.config.configure.pull_request_body, &languages);

        Ok(plan_configure(ConfigureFacts {
            repo: repo.clone(),
            languages,
            default_sha,
            workflow,
            manifest,
            pull_request_body,
        }))
    }

    /// Walks the analyses feed page by page until the reconciler says stop.
    pub async fn reconcile_analyses(
        &self,
        repo: &RepoRef,
        git_ref: &str,
        expected: LanguageSet,
    ) -> Result<AnalysisCoverage, RepoFailure> {
        let query = AnalysisQuery::codeql_history(git_ref);
        let mut reconciler = AnalysisReconciler::new(expected, self.context.window, self.context.now);
        let mut page = 1;
        loop {
            let Some(records) = self
                .platform
                .analyses_page(repo, &query, page)
                .await
                .at_step("analyses")?
            else {
                break;
            };
            let verdict = reconciler.observe_page(&records);
            debug!(page, records = records.len(), ?verdict, "analyses page");
            if !verdict.should_continue() {
                break;
            }
            page += 1;
        }
        Ok(reconciler.finish())
    }

    async fn latest_databases(&self, repo: &RepoRef) -> Result<BTreeMap<String, DatabaseArtifact>, RepoFailure> {
        let all = self.platform.databases(repo).await.at_step("databases")?;
        Ok(latest_databases(&all, self.context.window, self.context.now))
    }

    async fn verify(&self, repo: &Repository, manifest: &ComplianceManifest) -> Result<Plan, RepoFailure> {
        let reference = repo.reference();
        let expected = self.expected_languages(&reference).await?;
        let coverage = self
            .reconcile_analyses(&reference, &repo.default_ref(), expected.clone())
            .await?;
        let databases = if self.strategy.reconciles_coverage {
            self.latest_databases(&reference).await?
        } else {
            BTreeMap::new()
        };
        let open_issues = self
            .platform
            .open_issues(&reference, TRACKING_LABEL)
            .await
            .at_step("open-issues")?;

        Ok(plan_verify(&self.strategy, &VerifyFacts {
            repo,
            manifest,
            expected: &expected,
            coverage: &coverage,
            latest_databases: &databases,
            latest_versions: &self.context.latest_versions,
            promote_installed: self.context.is_member(Integration::Promote, repo.id),
            open_issues: &open_issues,
        }))
    }

    async fn promote(&self, repo: &Repository, manifest: &ComplianceManifest) -> Result<Plan, RepoFailure> {
        let reference = repo.reference();
        let databases = self.latest_databases(&reference).await?;
        let analyses = self
            .reconcile_analyses(&reference, &repo.default_ref(), LanguageSet::new())
            .await?
            .matched;
        if databases.is_empty() && analyses.is_empty() {
            return Ok(Plan::skip(SkipReason::NothingToPromote));
        }

        let target = promotion_target(&self.config.promotion.org, manifest.system_id, repo);
        let target_exists = self
            .platform
            .repository(&target)
            .await
            .at_step("target-repository")?
            .is_some();
        let (target_databases, target_analyses): (_, BTreeMap<String, AnalysisRecord>) = if target_exists {
            let dbs = self.latest_databases(&target).await?;
            let analyses = self
                .reconcile_analyses(&target, &repo.default_ref(), LanguageSet::new())
                .await?
                .matched;
            (dbs, analyses)
        } else {
            (BTreeMap::new(), BTreeMap::new())
        };

        Ok(plan_promote(PromoteFacts {
            source: repo.clone(),
            target,
            target_exists,
            databases,
            analyses,
            target_databases,
            target_analyses,
        }))
    }
}
