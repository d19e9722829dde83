use std::collections::BTreeMap;

use ghas_core::LanguageSet;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::TemplateError;

/// Repository whose reusable workflow marks a repository as already migrated.
pub const REUSABLE_WORKFLOW_SOURCE: &str = "department-of-veterans-affairs/codeql-tools";
pub const ANALYSIS_ACTION: &str = "department-of-veterans-affairs/codeql-tools/codeql-analysis@main";

#[derive(Debug, Serialize, Deserialize)]
struct Workflow {
    name: String,
    on: Triggers,
    jobs: Jobs,
}

#[derive(Debug, Serialize, Deserialize)]
struct Triggers {
    push: Branches,
    pull_request: Branches,
    schedule: Vec<Schedule>,
    workflow_dispatch: Option<serde_yaml::Value>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Branches {
    branches: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Schedule {
    cron: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Jobs {
    analyze: Job,
}

#[derive(Debug, Serialize, Deserialize)]
struct Job {
    name: String,
    #[serde(rename = "runs-on")]
    runs_on: String,
    concurrency: String,
    permissions: BTreeMap<String, String>,
    strategy: Strategy,
    steps: Vec<Step>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Strategy {
    #[serde(rename = "fail-fast")]
    fail_fast: bool,
    matrix: Matrix,
}

#[derive(Debug, Serialize, Deserialize)]
struct Matrix {
    language: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Step {
    name: String,
    uses: String,
    with: BTreeMap<String, String>,
}

/// `minute hour * * weekday`, each field drawn independently to spread load.
pub fn random_weekly_cron<R: Rng>(rng: &mut R) -> String {
    let minute = rng.gen_range(0..60);
    let hour = rng.gen_range(0..24);
    let weekday = rng.gen_range(0..7);
    format!("{minute} {hour} * * {weekday}")
}

/// CodeQL workflow: push and PR on the default branch, a random weekly
/// schedule, manual dispatch, and one matrix job per language.
pub fn generate_workflow<R: Rng>(
    languages: &LanguageSet,
    default_branch: &str,
    action: &str,
    rng: &mut R,
) -> Result<String, TemplateError> {
    if languages.is_empty() {
        return Err(TemplateError::NoLanguages);
    }
    let permissions = [
        ("actions", "read"),
        ("contents", "read"),
        ("security-events", "write"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let workflow = Workflow {
        name: "CodeQL".to_string(),
        on: Triggers {
            push: Branches {
                branches: vec![default_branch.to_string()],
            },
            pull_request: Branches {
                branches: vec![default_branch.to_string()],
            },
            schedule: vec![Schedule {
                cron: random_weekly_cron(rng),
            }],
            workflow_dispatch: None,
        },
        jobs: Jobs {
            analyze: Job {
                name: "Analyze".to_string(),
                runs_on: "ubuntu-latest".to_string(),
                concurrency: "${{ github.workflow }}-${{ github.ref }}-${{ matrix.language }}".to_string(),
                permissions,
                strategy: Strategy {
                    fail_fast: false,
                    matrix: Matrix {
                        // LanguageSet is ordered, so the matrix is stable.
                        language: languages.iter().cloned().collect(),
                    },
                },
                steps: vec![Step {
                    name: "Run Code Scanning".to_string(),
                    uses: action.to_string(),
                    with: [("languages".to_string(), "${{ matrix.language }}".to_string())]
                        .into_iter()
                        .collect(),
                }],
            },
        },
    };
    Ok(serde_yaml::to_string(&workflow)?)
}

/// True when a workflow file already delegates to the organization's reusable workflow.
pub fn uses_reusable_workflow(content: &str, source: &str) -> bool {
    content.to_lowercase().contains(&source.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn langs(items: &[&str]) -> LanguageSet {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn cron_fields_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let cron = random_weekly_cron(&mut rng);
            let fields: Vec<&str> = cron.split(' ').collect();
            assert_eq!(fields.len(), 5);
            assert!(fields[0].parse::<u32>().unwrap() < 60);
            assert!(fields[1].parse::<u32>().unwrap() < 24);
            assert_eq!(fields[2], "*");
            assert_eq!(fields[3], "*");
            assert!(fields[4].parse::<u32>().unwrap() < 7);
        }
    }

    #[test]
    fn workflow_matrix_is_sorted_and_targets_default_branch() {
        let mut rng = StdRng::seed_from_u64(1);
        let text = generate_workflow(&langs(&["python", "go", "java"]), "trunk", ANALYSIS_ACTION, &mut rng).unwrap();
        let parsed: Workflow = serde_yaml::from_str(&text).unwrap();
        assert_eq!(parsed.name, "CodeQL");
        assert_eq!(parsed.on.push.branches, vec!["trunk"]);
        assert_eq!(parsed.on.pull_request.branches, vec!["trunk"]);
        assert_eq!(parsed.jobs.analyze.strategy.matrix.language, vec!["go", "java", "python"]);
        assert!(!parsed.jobs.analyze.strategy.fail_fast);
        assert_eq!(parsed.jobs.analyze.permissions["security-events"], "write");
        assert_eq!(parsed.jobs.analyze.steps[0].uses, ANALYSIS_ACTION);
        assert!(uses_reusable_workflow(&text, REUSABLE_WORKFLOW_SOURCE));
    }

    #[test]
    fn same_seed_same_schedule() {
        let a = generate_workflow(&langs(&["go"]), "main", ANALYSIS_ACTION, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = generate_workflow(&langs(&["go"]), "main", ANALYSIS_ACTION, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_language_set_is_refused() {
        let err = generate_workflow(&LanguageSet::new(), "main", ANALYSIS_ACTION, &mut StdRng::seed_from_u64(0));
        assert!(matches!(err, Err(TemplateError::NoLanguages)));
    }

    #[test]
    fn reusable_detection_ignores_case() {
        assert!(uses_reusable_workflow(
            "uses: Department-Of-Veterans-Affairs/CodeQL-Tools/codeql-analysis@main",
            REUSABLE_WORKFLOW_SOURCE
        ));
        assert!(!uses_reusable_workflow("uses: github/codeql-action/analyze@v3", REUSABLE_WORKFLOW_SOURCE));
    }
}
