use std::collections::{BTreeMap, BTreeSet};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use ghas_core::{Integration, Purpose, RecencyWindow, RunId, SystemIdList};
use ghas_platform::Platform;

use crate::Config;

/// Read-only snapshots fetched once per run, before any repository is touched.
#[derive(Clone, Debug)]
pub struct RunContext {
    pub run_id: RunId,
    pub purpose: Purpose,
    pub now: DateTime<Utc>,
    pub window: RecencyWindow,
    pub memberships: BTreeMap<Integration, BTreeSet<u64>>,
    pub latest_versions: BTreeSet<String>,
    pub system_ids: SystemIdList,
}

impl RunContext {
    /// Any failure here is fleet-level: no repository can be judged without these.
    pub async fn load(platform: &dyn Platform, config: &Config, purpose: Purpose, now: DateTime<Utc>) -> Result<Self> {
        let mut ctx = Self {
            run_id: RunId::new(),
            purpose,
            now,
            window: RecencyWindow::new(config.policy.days_to_scan),
            memberships: BTreeMap::new(),
            latest_versions: BTreeSet::new(),
            system_ids: SystemIdList::default(),
        };

        match purpose {
            Purpose::Configure => {
                ctx.load_membership(platform, Integration::Verify).await?;
            }
            Purpose::Verify => {
                ctx.latest_versions = latest_versions(platform, config).await?;
                ctx.system_ids = system_ids(platform, config).await?;
                ctx.load_membership(platform, Integration::Promote).await?;
            }
            Purpose::Promote => {
                ctx.system_ids = system_ids(platform, config).await?;
            }
        }

        info!(
            run_id = %ctx.run_id,
            purpose = %purpose,
            versions = ctx.latest_versions.len(),
            system_ids = ctx.system_ids.len(),
            "run caches loaded"
        );
        Ok(ctx)
    }

    async fn load_membership(&mut self, platform: &dyn Platform, integration: Integration) -> Result<()> {
        let ids = platform
            .installation_repositories(integration)
            .await
            .with_context(|| format!("list {integration} installation repositories"))?
            .into_iter()
            .map(|r| r.id)
            .collect();
        self.memberships.insert(integration, ids);
        Ok(())
    }

    pub fn is_member(&self, integration: Integration, repository_id: u64) -> bool {
        self.memberships
            .get(&integration)
            .is_some_and(|ids| ids.contains(&repository_id))
    }
}

async fn latest_versions(platform: &dyn Platform, config: &Config) -> Result<BTreeSet<String>> {
    let repo = config.policy.release_repo();
    let tags = platform
        .latest_releases(&repo, config.policy.latest_versions)
        .await
        .with_context(|| format!("list releases of {repo}"))?;
    let versions: BTreeSet<String> = tags
        .iter()
        .map(|t| t.trim().trim_start_matches('v').to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if versions.is_empty() {
        return Err(anyhow!("no releases found in {repo}"));
    }
    Ok(versions)
}

async fn system_ids(platform: &dyn Platform, config: &Config) -> Result<SystemIdList> {
    let source = &config.policy.system_list;
    let repo = source.repo();
    let file = platform
        .file(&repo, &source.path, source.branch.as_deref())
        .await
        .with_context(|| format!("fetch system list {repo}/{}", source.path))?
        .ok_or_else(|| anyhow!("system list {repo}/{} not found", source.path))?;
    let ids = SystemIdList::parse(&file.text).with_context(|| format!("parse system list {repo}/{}", source.path))?;
    Ok(ids)
}
