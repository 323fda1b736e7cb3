use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([^{}]+)\}").expect("placeholder pattern is valid"));

/// Placeholder names in order of first appearance, without duplicates.
pub fn extract_variables(text: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for cap in PLACEHOLDER.captures_iter(text) {
        let name = cap[1].trim();
        if !name.is_empty() && !seen.iter().any(|s: &String| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}

/// Fill in known placeholders; unknown ones are left as written.
pub fn render(text: &str, values: &HashMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(text, |cap: &Captures| match values.get(cap[1].trim()) {
            Some(value) => value.clone(),
            None => cap[0].to_string(),
        })
        .into_owned()
}
