use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};

use ghas_core::{ActionRecord, Command, NewIssue, NewPullRequest, Notice, SarifUpload, TRACKING_LABEL};
use ghas_notify::{issue_body, recipients, render, Notification, Notifier, NoticeTemplates};
use ghas_platform::{FileWrite, Platform};

use crate::{AtStep, RepoFailure};

const SUFFIX_LEN: usize = 5;

/// `-` plus five random characters from `[a-z0-9]`.
pub fn branch_suffix<R: Rng>(rng: &mut R) -> String {
    let token: String = rng
        .sample_iter(&Alphanumeric)
        .map(|b| (b as char).to_ascii_lowercase())
        .take(SUFFIX_LEN)
        .collect();
    format!("-{token}")
}

/// State threaded between commands of one plan.
#[derive(Debug, Default)]
struct ExecState {
    working_branch: Option<String>,
    target_sha: Option<String>,
}

impl ExecState {
    fn working_branch(&self, step: &str) -> Result<&str, RepoFailure> {
        self.working_branch
            .as_deref()
            .ok_or_else(|| RepoFailure::new(step, "no working branch created"))
    }
}

/// Runs plan commands strictly in order. The first failure abandons the rest.
pub struct Executor<'a> {
    pub platform: &'a dyn Platform,
    pub notifier: &'a dyn Notifier,
    pub templates: &'a NoticeTemplates,
    pub secondary_email: Option<&'a str>,
    pub dry_run: bool,
}

impl<'a> Executor<'a> {
    pub async fn execute<R: Rng + Send>(
        &self,
        commands: &[Command],
        rng: &mut R,
        records: &mut Vec<ActionRecord>,
    ) -> Result<(), RepoFailure> {
        let mut state = ExecState::default();
        for command in commands {
            if self.dry_run && command.is_owner_facing() {
                info!(action = command.name(), "dry run: suppressed");
                records.push(ActionRecord::suppressed(command.name(), describe(command)));
                continue;
            }
            if let Some(record) = self.apply(command, &mut state, rng).await? {
                debug!(action = %record.action, detail = %record.detail, "applied");
                records.push(record);
            }
        }
        Ok(())
    }

    async fn apply<R: Rng + Send>(
        &self,
        command: &Command,
        state: &mut ExecState,
        rng: &mut R,
    ) -> Result<Option<ActionRecord>, RepoFailure> {
        let step = command.name();
        let p = self.platform;
        match command {
            Command::CreateWorkingBranch { repo, canonical, from_sha } => {
                let taken = p.branch_exists(repo, canonical).await.at_step(step)?;
                let branch = if taken {
                    format!("{canonical}{}", branch_suffix(rng))
                } else {
                    canonical.clone()
                };
                p.create_ref(repo, &branch, from_sha).await.at_step(step)?;
                state.working_branch = Some(branch.clone());
                Ok(Some(ActionRecord::applied(step, branch)))
            }
            Command::UpsertFile { repo, path, content, message } => {
                let branch = state.working_branch(step)?.to_string();
                let existing = p.file(repo, path, Some(branch.as_str())).await.at_step(step)?;
                let write = FileWrite {
                    branch,
                    path: path.clone(),
                    message: message.clone(),
                    content: content.clone(),
                    sha: existing.map(|f| f.sha),
                };
                p.put_file(repo, &write).await.at_step(step)?;
                Ok(Some(ActionRecord::applied(step, path.clone())))
            }
            Command::CreateFileIfAbsent { repo, path, content, message } => {
                let branch = state.working_branch(step)?.to_string();
                if p.file_exists(repo, path, Some(branch.as_str())).await.at_step(step)? {
                    return Ok(None);
                }
                let write = FileWrite {
                    branch,
                    path: path.clone(),
                    message: message.clone(),
                    content: content.clone(),
                    sha: None,
                };
                p.put_file(repo, &write).await.at_step(step)?;
                Ok(Some(ActionRecord::applied(step, path.clone())))
            }
            Command::OpenPullRequest { repo, base, title, body } => {
                let pr = NewPullRequest {
                    title: title.clone(),
                    head: state.working_branch(step)?.to_string(),
                    base: base.clone(),
                    body: body.clone(),
                };
                let number = p.create_pull_request(repo, &pr).await.at_step(step)?;
                Ok(Some(ActionRecord::applied(step, format!("#{number}"))))
            }
            Command::InstallIntegration { integration, repo, repository_id } => {
                p.add_to_installation(*integration, *repository_id).await.at_step(step)?;
                Ok(Some(ActionRecord::applied(step, format!("{integration} <- {repo}"))))
            }
            Command::Notify { notice, owner_email } => {
                let rendered = render(notice, self.templates);
                let notification = Notification {
                    subject: rendered.subject,
                    body: rendered.body,
                    recipients: recipients(self.secondary_email, owner_email.as_deref()),
                };
                self.notifier.deliver(&notification).await.at_step(step)?;
                Ok(Some(ActionRecord::applied(step, notification.recipients.join(","))))
            }
            Command::OpenIssue { repo, notice } => {
                let issue = NewIssue {
                    title: notice.subject().to_string(),
                    body: issue_body(notice, self.templates),
                    labels: vec![TRACKING_LABEL.to_string()],
                };
                let number = p.create_issue(repo, &issue).await.at_step(step)?;
                Ok(Some(ActionRecord::applied(step, format!("#{number}"))))
            }
            Command::UpdateIssue { repo, number, notice } => {
                p.update_issue_body(repo, *number, &issue_body(notice, self.templates))
                    .await
                    .at_step(step)?;
                Ok(Some(ActionRecord::applied(step, format!("#{number}"))))
            }
            Command::CloseIssue { repo, number } => {
                p.close_issue(repo, *number).await.at_step(step)?;
                Ok(Some(ActionRecord::applied(step, format!("#{number}"))))
            }
            Command::CreateRepository { repo } => {
                p.create_repository(repo).await.at_step(step)?;
                Ok(Some(ActionRecord::applied(step, repo.to_string())))
            }
            Command::PromoteDatabase { source, target, database } => {
                let bytes = p.download_database(source, database).await.at_step(step)?;
                p.upload_database(target, database, bytes).await.at_step(step)?;
                Ok(Some(ActionRecord::applied(step, database.language.clone())))
            }
            Command::PrepareTargetBranch { target, branch } => {
                let repository = p
                    .repository(target)
                    .await
                    .at_step(step)?
                    .ok_or_else(|| RepoFailure::new(step, format!("{target} does not exist")))?;
                let sha = match p.ref_sha(target, branch).await.at_step(step)? {
                    Some(sha) => sha,
                    None => {
                        let head = p
                            .ref_sha(target, &repository.default_branch)
                            .await
                            .at_step(step)?
                            .ok_or_else(|| RepoFailure::new(step, format!("{target} has no head commit")))?;
                        p.create_ref(target, branch, &head).await.at_step(step)?;
                        head
                    }
                };
                if repository.default_branch != *branch {
                    p.set_default_branch(target, branch).await.at_step(step)?;
                }
                state.target_sha = Some(sha.clone());
                Ok(Some(ActionRecord::applied(step, format!("{branch}@{sha}"))))
            }
            Command::PromoteAnalysis { source, target, analysis } => {
                let commit_sha = state
                    .target_sha
                    .clone()
                    .ok_or_else(|| RepoFailure::new(step, "target branch not prepared"))?;
                let sarif = p.download_sarif(source, analysis.id).await.at_step(step)?;
                let upload = SarifUpload {
                    commit_sha,
                    git_ref: analysis.git_ref.clone(),
                    sarif,
                };
                p.upload_sarif(target, &upload).await.at_step(step)?;
                Ok(Some(ActionRecord::applied(step, analysis.category.clone())))
            }
        }
    }
}

fn describe(command: &Command) -> String {
    match command {
        Command::Notify { notice, .. } | Command::OpenIssue { notice, .. } => notice_label(notice),
        Command::UpdateIssue { number, notice, .. } => format!("#{number} {}", notice_label(notice)),
        Command::CloseIssue { number, .. } => format!("#{number}"),
        other => other.name().to_string(),
    }
}

fn notice_label(notice: &Notice) -> String {
    notice.subject().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn suffix_is_five_lowercase_alphanumerics() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let s = branch_suffix(&mut rng);
            assert_eq!(s.len(), 6);
            assert!(s.starts_with('-'));
            assert!(s[1..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }
}
