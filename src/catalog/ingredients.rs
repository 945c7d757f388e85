/// Parses an ingredient column. Accepts both a literal list
/// (`['chicken', "rice"]`) and a plain delimited string (`chicken; rice`).
/// Terms come back trimmed and lowercased, in original order, empty terms
/// dropped.
pub fn parse_ingredient_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        return Vec::new();
    }

    let is_literal_list = trimmed.starts_with('[') && trimmed.ends_with(']');
    let body = if is_literal_list {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    };

    let separators: &[char] = if is_literal_list || !body.contains(';') {
        &[',']
    } else {
        &[';']
    };

    body.split(separators)
        .map(|term| normalize_ingredient(term.trim().trim_matches(|c| c == '\'' || c == '"')))
        .filter(|term| !term.is_empty())
        .collect()
}

/// Canonical form used for counting and overuse lookups.
pub fn normalize_ingredient(term: &str) -> String {
    term.trim().to_lowercase()
}

/// Normalizes every term and drops empty ones, keeping order.
pub fn normalize_ingredients(terms: &[String]) -> Vec<String> {
    terms
        .iter()
        .map(|term| normalize_ingredient(term))
        .filter(|term| !term.is_empty())
        .collect()
}
