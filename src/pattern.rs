//! Glob matching of event types against subscription patterns.
//!
//! A pattern matches if it is exactly equal to the event type or if it is a
//! shell-style glob where `*` matches any run of characters
//! (`"chantier.*"`, `"*.created"`, `"*"`). Matching is case-sensitive and
//! `*` is the only metacharacter.

/// True if any pattern in `patterns` matches `event_type`.
#[must_use]
pub fn matches(event_type: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|p| glob_match(p, event_type))
}

/// Match a single glob pattern against a string.
///
/// Iterative two-pointer matching with backtracking to the last `*`;
/// operates on bytes, which is sound for UTF-8 input because `*` is ASCII
/// and a wildcard may absorb any run of bytes.
#[must_use]
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p = pattern.as_bytes();
    let t = text.as_bytes();

    let (mut pi, mut ti) = (0usize, 0usize);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            star = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((star_pi, star_ti)) = star {
            // Let the last wildcard absorb one more byte.
            pi = star_pi + 1;
            ti = star_ti + 1;
            star = Some((star_pi, star_ti + 1));
        } else {
            return false;
        }
    }

    while pi < p.len() && p[pi] == b'*' {
        pi += 1;
    }
    pi == p.len()
}
