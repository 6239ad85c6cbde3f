//! Ratcliff–Obershelp sequence similarity.
//!
//! `ratio` reproduces the classic "gestalt pattern matching" score:
//! find the longest matching block, recurse on the pieces to either
//! side, and report `2 * matches / (len_a + len_b)`. Registered-code
//! similarity thresholds were tuned against this exact score, so the
//! recursion (not an LCS or edit distance) is the required metric.

/// Similarity of two strings in `[0, 1]`; 1.0 means equal.
///
/// Two empty strings are identical, hence 1.0.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    let matches = matching_chars(&a, &b);
    2.0 * matches as f64 / total as f64
}

/// Total characters covered by recursively chosen longest common
/// blocks.
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (ai, bj, size) = longest_block(a, b);
    if size == 0 {
        return 0;
    }
    size
        + matching_chars(&a[..ai], &b[..bj])
        + matching_chars(&a[ai + size..], &b[bj + size..])
}

/// Longest common contiguous block, earliest in `a` then `b` on ties.
fn longest_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // j2len[j] = length of the common suffix ending at a[i], b[j].
    let mut j2len = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        let mut next = vec![0usize; b.len() + 1];
        for (j, &cb) in b.iter().enumerate() {
            if ca == cb {
                let k = j2len[j] + 1;
                next[j + 1] = k;
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        j2len = next;
    }
    best
}
