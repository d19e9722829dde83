use std::collections::BTreeSet;

/// Languages CodeQL can analyse, in their normalized form.
pub const SUPPORTED_LANGUAGES: &[&str] = &[
    "c",
    "cpp",
    "csharp",
    "go",
    "java",
    "javascript",
    "python",
    "ruby",
    "swift",
    "typescript",
];

/// Ordered so anything rendered from it (matrices, notices) is deterministic.
pub type LanguageSet = BTreeSet<String>;

/// Lowercases a platform language name. Kotlin is analysed by the java extractor.
pub fn normalize_language(name: &str) -> String {
    let lower = name.trim().to_lowercase();
    if lower == "kotlin" {
        "java".to_string()
    } else {
        lower
    }
}

pub fn is_supported(language: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&language)
}

/// Whitelisted languages from a breakdown, minus the repository's exclusions.
pub fn expected_languages<'a, I>(breakdown: I, excluded: &[String]) -> LanguageSet
where
    I: IntoIterator<Item = &'a str>,
{
    let excluded: BTreeSet<String> = excluded.iter().map(|l| normalize_language(l)).collect();
    breakdown
        .into_iter()
        .map(normalize_language)
        .filter(|l| is_supported(l) && !excluded.contains(l))
        .collect()
}
