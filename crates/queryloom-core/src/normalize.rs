//! Term normalization and edit-distance scoring.
//!
//! Every lookup key in the pipeline goes through [`normalize_term`] so that
//! dictionary construction and resolution agree on what "the same text"
//! means: case, punctuation, and whitespace runs never distinguish terms.

/// Normalize a free-text term into a lookup key.
///
/// Lowercases, folds punctuation into word breaks, and collapses whitespace
/// runs, so `"ACME-Hotels,  Ltd."` and `"acme hotels ltd"` produce the same
/// key. Terms that carry no alphanumeric content normalize to the empty
/// string.
pub fn normalize_term(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut word_break = false;
    for c in raw.chars() {
        if c.is_alphanumeric() {
            if word_break && !key.is_empty() {
                key.push(' ');
            }
            word_break = false;
            for lower in c.to_lowercase() {
                key.push(lower);
            }
        } else {
            word_break = true;
        }
    }
    key
}

/// Levenshtein distance between `value` and `needle_chars`, bounded by
/// `max_dist`.
///
/// Two-row dynamic program; as soon as the minimum of a row exceeds the
/// bound the distance can never come back under it, so the scan bails out
/// with `max_dist + 1`. Callers treat any return above the bound as "no
/// match".
pub(crate) fn edit_distance_within(value: &str, needle_chars: &[char], max_dist: usize) -> usize {
    if max_dist == 0 {
        return if value.chars().eq(needle_chars.iter().copied()) {
            0
        } else {
            1
        };
    }

    let n = needle_chars.len();
    if n == 0 {
        return value.chars().count();
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr: Vec<usize> = vec![0; n + 1];

    for (i, c) in value.chars().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for j in 1..=n {
            let cost = if c == needle_chars[j - 1] { 0 } else { 1 };
            let d = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            curr[j] = d;
            row_min = row_min.min(d);
        }
        if row_min > max_dist {
            return max_dist + 1;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}
