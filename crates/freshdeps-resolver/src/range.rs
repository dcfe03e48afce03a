use semver::{Version, VersionReq};

/// An npm range string translated into `semver` requirements. Alternatives
/// joined by `||` are kept separately; a version satisfies the range when it
/// satisfies any of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpmRange {
    alternatives: Vec<VersionReq>,
}

impl NpmRange {
    /// Returns `None` for strings that are not version ranges at all, such as
    /// dist tags (`latest`) or git and tarball specifiers.
    pub fn parse(input: &str) -> Option<Self> {
        let alternatives: Vec<VersionReq> = input
            .split("||")
            .filter_map(translate_alternative)
            .collect();
        if alternatives.is_empty() {
            return None;
        }
        Some(Self { alternatives })
    }

    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

/// Highest candidate satisfying `range`, returned together with the candidate
/// string it was parsed from. Candidates that are not valid semver are
/// ignored.
pub fn max_satisfying<'a, I>(candidates: I, range: &str) -> Option<(&'a str, Version)>
where
    I: IntoIterator<Item = &'a str>,
{
    let range = NpmRange::parse(range)?;
    candidates
        .into_iter()
        .filter_map(|candidate| Some((candidate, Version::parse(candidate).ok()?)))
        .filter(|(_, version)| range.matches(version))
        .max_by(|a, b| a.1.cmp(&b.1))
}

fn translate_alternative(alternative: &str) -> Option<VersionReq> {
    let tokens = comparator_tokens(alternative);
    if tokens.is_empty() {
        return Some(VersionReq::STAR);
    }

    let comparators = match tokens.as_slice() {
        [low, dash, high] if dash == "-" => vec![
            translate_comparator(&format!(">={low}"))?,
            translate_comparator(&format!("<={high}"))?,
        ],
        _ => tokens
            .iter()
            .map(|token| translate_comparator(token))
            .collect::<Option<Vec<_>>>()?,
    };

    let bounded: Vec<String> = comparators
        .into_iter()
        .filter(|comparator| comparator != "*")
        .collect();
    if bounded.is_empty() {
        return Some(VersionReq::STAR);
    }
    VersionReq::parse(&bounded.join(", ")).ok()
}

// npm allows whitespace between an operator and its version (`>= 1.2.0`);
// glue those back together so every token is one comparator.
fn comparator_tokens(alternative: &str) -> Vec<String> {
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_op = String::new();
    for token in alternative.split_whitespace() {
        if token.chars().all(is_operator_char) {
            pending_op.push_str(token);
            continue;
        }
        tokens.push(format!("{pending_op}{token}"));
        pending_op.clear();
    }
    if !pending_op.is_empty() {
        tokens.push(pending_op);
    }
    tokens
}

fn is_operator_char(ch: char) -> bool {
    matches!(ch, '<' | '>' | '=' | '~' | '^')
}

fn translate_comparator(token: &str) -> Option<String> {
    let op_len = token
        .find(|ch: char| !is_operator_char(ch))
        .unwrap_or(token.len());
    let (op, version) = token.split_at(op_len);
    let op = match op {
        "~>" => "~",
        "" | "=" | ">" | ">=" | "<" | "<=" | "~" | "^" => op,
        _ => return None,
    };

    let version = version.strip_prefix('v').unwrap_or(version);
    let (core, suffix) = match version.find(['-', '+']) {
        Some(index) => version.split_at(index),
        None => (version, ""),
    };

    let mut parts: Vec<&str> = core.split('.').collect();
    while parts.last().is_some_and(|part| is_wildcard(part)) {
        parts.pop();
    }
    if parts.is_empty() {
        // `*`, `x`, `>=x`: anything. `<x`, `>x`: nothing.
        return matches!(op, "" | "=" | ">=" | "<=" | "~" | "^").then(|| "*".to_string());
    }
    if parts.len() > 3
        || parts
            .iter()
            .any(|part| part.is_empty() || !part.chars().all(|ch| ch.is_ascii_digit()))
    {
        return None;
    }
    let partial = parts.len() < 3;
    if partial && !suffix.is_empty() {
        return None;
    }

    // A bare npm version means exactly that version; for partial versions
    // `=` in `semver` already covers the whole `1.2.x` span.
    let op = if op.is_empty() { "=" } else { op };
    Some(format!("{op}{}{suffix}", parts.join(".")))
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}
