//! Approximate string similarity on a 0-100 scale.
//!
//! `ratio` is the normalized indel distance (insertions and deletions only),
//! which reduces to `2 * LCS / (len(a) + len(b))`. `partial_ratio` slides the
//! shorter string over the longer one and keeps the best window.

/// Full-string similarity between `a` and `b`.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Best similarity of the shorter string against any equal-length window of the longer one.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    if short.is_empty() {
        return if long.is_empty() { 100.0 } else { 0.0 };
    }
    if short.len() == long.len() {
        return ratio_chars(&short, &long);
    }

    let mut best = 0.0_f64;
    for window in long.windows(short.len()) {
        let score = ratio_chars(&short, window);
        if score > best {
            best = score;
            if best >= 100.0 {
                break;
            }
        }
    }
    best
}

/// Case-insensitive `ratio`.
pub fn ratio_ignore_case(a: &str, b: &str) -> f64 {
    ratio(&a.to_lowercase(), &b.to_lowercase())
}

/// Case-insensitive `partial_ratio`.
pub fn partial_ratio_ignore_case(a: &str, b: &str) -> f64 {
    partial_ratio(&a.to_lowercase(), &b.to_lowercase())
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    let lcs = lcs_len(a, b);
    100.0 * (2 * lcs) as f64 / total as f64
}

/// Longest common subsequence length using two rolling rows.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

#[cfg(test)]
mod tests {
    use super::{lcs_len, partial_ratio, partial_ratio_ignore_case, ratio, ratio_ignore_case};
    use pretty_assertions::assert_eq;

    fn chars(value: &str) -> Vec<char> {
        value.chars().collect()
    }

    #[test]
    fn lcs_handles_basic_cases() {
        assert_eq!(lcs_len(&chars("abcde"), &chars("ace")), 3);
        assert_eq!(lcs_len(&chars("abc"), &chars("xyz")), 0);
        assert_eq!(lcs_len(&chars(""), &chars("abc")), 0);
    }

    #[test]
    fn ratio_bounds() {
        assert_eq!(ratio("work", "work"), 100.0);
        assert_eq!(ratio("work", "xyz123"), 0.0);
        assert_eq!(ratio("", ""), 100.0);
        assert_eq!(ratio("", "abc"), 0.0);
    }

    #[test]
    fn ratio_matches_indel_formula() {
        // lcs("kitten", "sitting") = 4 ("ittn"), lengths 6 + 7
        let expected = 100.0 * 8.0 / 13.0;
        assert!((ratio("kitten", "sitting") - expected).abs() < 1e-9);
    }

    #[test]
    fn near_match_beats_unrelated() {
        assert!(ratio("works", "work") > ratio("works", "xyz123"));
    }

    #[test]
    fn partial_ratio_finds_substring() {
        assert_eq!(partial_ratio("report", "finish the report today"), 100.0);
        assert_eq!(partial_ratio("finish the report today", "report"), 100.0);
        assert_eq!(partial_ratio("", ""), 100.0);
        assert_eq!(partial_ratio("abc", ""), 0.0);
    }

    #[test]
    fn partial_ratio_tolerates_typos() {
        let score = partial_ratio("reprot", "finish the report today");
        assert!(score > 60.0 && score < 100.0, "score={score}");
    }

    #[test]
    fn partial_ratio_scores_windows_with_unshared_edges() {
        assert_eq!(partial_ratio("meeting notes friday", "###eting notes frid###"), 80.0);
    }

    #[test]
    fn case_insensitive_variants() {
        assert_eq!(ratio_ignore_case("WORK", "work"), 100.0);
        assert_eq!(partial_ratio_ignore_case("Client", "call CLIENT soon"), 100.0);
    }
}
