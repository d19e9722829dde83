use ghas_core::LanguageSet;

pub const LANGUAGES_PLACEHOLDER: &str = "<LANGUAGES_PLACEHOLDER>";

pub const DEFAULT_PULL_REQUEST_BODY: &str = "This pull request adds a CodeQL workflow to your repository. \
This workflow will analyze your code for vulnerabilities in the following languages: <LANGUAGES_PLACEHOLDER>";

/// Fills the languages placeholder with a comma-separated list.
pub fn render_pull_request_body(template: &str, languages: &LanguageSet) -> String {
    let joined = languages.iter().cloned().collect::<Vec<_>>().join(", ");
    template.replace(LANGUAGES_PLACEHOLDER, &joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_body_lists_languages() {
        let langs: LanguageSet = ["python".to_string(), "go".to_string()].into_iter().collect();
        assert_eq!(
            render_pull_request_body(DEFAULT_PULL_REQUEST_BODY, &langs),
            "This pull request adds a CodeQL workflow to your repository. This workflow will analyze your code for vulnerabilities in the following languages: go, python"
        );
    }
}
