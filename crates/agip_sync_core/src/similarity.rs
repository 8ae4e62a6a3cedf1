//! Normalized edit-distance similarity between proposal texts.
//!
//! # Responsibility
//! - Normalize titles/bodies into a comparable, length-bounded form.
//! - Score two texts in `[0, 1]` from their Levenshtein distance.
//!
//! # Invariants
//! - Two empty normalized strings score `1.0`.
//! - Only the first argument has the sigprop tag prefix stripped, so
//!   `similarity(a, b)` may differ from `similarity(b, a)`.

/// Bracketed title prefix carried by signal proposals.
pub const SIGPROP_PREFIX: &str = "[sigprop]";
/// Normalized texts are truncated to this many characters.
pub const MAX_COMPARE_CHARS: usize = 500;

/// Scores `left` against `right`.
///
/// `left` is expected to be the sigprop side and has [`SIGPROP_PREFIX`]
/// removed before comparison; `right` is only lowercased, trimmed and
/// truncated.
pub fn similarity(left: &str, right: &str) -> f64 {
    let left = normalize(left, true);
    let right = normalize(right, false);

    let longest = left.len().max(right.len());
    if longest == 0 {
        return 1.0;
    }

    let distance = levenshtein(&left, &right);
    1.0 - distance as f64 / longest as f64
}

/// Classic two-row Levenshtein distance over chars.
pub fn levenshtein(left: &[char], right: &[char]) -> usize {
    if left.is_empty() {
        return right.len();
    }
    if right.is_empty() {
        return left.len();
    }

    let mut previous: Vec<usize> = (0..=right.len()).collect();
    let mut current = vec![0; right.len() + 1];

    for (i, left_char) in left.iter().enumerate() {
        current[0] = i + 1;
        for (j, right_char) in right.iter().enumerate() {
            let substitution = previous[j] + usize::from(left_char != right_char);
            let deletion = previous[j + 1] + 1;
            let insertion = current[j] + 1;
            current[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[right.len()]
}

fn normalize(text: &str, strip_tag: bool) -> Vec<char> {
    let lowered = text.to_lowercase();
    let mut view = lowered.trim_start();
    if strip_tag {
        view = view.strip_prefix(SIGPROP_PREFIX).unwrap_or(view);
    }
    view.trim().chars().take(MAX_COMPARE_CHARS).collect()
}
