//! Local ranking of command names against a partial query.

/// Prefix the editor puts in front of commands.
const COMMAND_PREFIX: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchKind {
    Exact,
    Prefix,
    Substring,
}

/// Trims `query`, drops a leading `/` and lowercases it.
#[must_use]
pub fn normalise_query(query: &str) -> String {
    let trimmed = query.trim();
    trimmed
        .strip_prefix(COMMAND_PREFIX)
        .unwrap_or(trimmed)
        .trim_start()
        .to_lowercase()
}

fn classify(name: &str, needle: &str) -> Option<MatchKind> {
    let candidate = name.to_lowercase();
    if candidate == needle {
        Some(MatchKind::Exact)
    } else if candidate.starts_with(needle) {
        Some(MatchKind::Prefix)
    } else if candidate.contains(needle) {
        Some(MatchKind::Substring)
    } else {
        None
    }
}

/// Ranks `names` containing `query`, case-insensitively.
///
/// Exact matches come first, then prefix matches, then other substring
/// matches; ties are broken alphabetically. A blank query matches every name.
#[must_use]
pub fn rank_suggestions<'a>(names: impl IntoIterator<Item = &'a str>, query: &str) -> Vec<String> {
    let needle = normalise_query(query);
    let mut ranked: Vec<(MatchKind, &str)> = names
        .into_iter()
        .filter_map(|name| classify(name, &needle).map(|kind| (kind, name)))
        .collect();
    ranked.sort_by(|(left_kind, left), (right_kind, right)| {
        left_kind
            .cmp(right_kind)
            .then_with(|| left.to_lowercase().cmp(&right.to_lowercase()))
            .then_with(|| left.cmp(right))
    });
    ranked.dedup_by(|(_, left), (_, right)| left == right);
    ranked.into_iter().map(|(_, name)| name.to_owned()).collect()
}
