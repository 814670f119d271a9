//! Textual similarity scoring
//!
//! Scores are Ratcliff/Obershelp ratios scaled to `0..=100`: the longest
//! common contiguous block is matched first, then the unmatched regions on
//! either side are matched recursively. The score is
//! `200 * matched / (len(a) + len(b))`, rounded down.

/// Score how close two strings are, from 0 (unrelated) to 100 (identical)
///
/// Comparison is case-insensitive and operates on Unicode scalar values, so
/// accented letters count as one character. The score is symmetric: both
/// argument orders are evaluated and the higher one is kept, because the
/// block search breaks ties by position in its first argument.
#[must_use]
pub fn similarity(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();

    ratio(&a, &b).max(ratio(&b, &a))
}

fn ratio(a: &[char], b: &[char]) -> u8 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100;
    }

    let matched = matching_chars(a, b);

    #[allow(clippy::cast_possible_truncation)]
    let score = (200 * matched / total) as u8;
    score
}

/// Count characters covered by matching blocks between `a` and `b`
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, size) = longest_block(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }

        matched += size;

        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            pending.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common contiguous run within `a[alo..ahi]` and `b[blo..bhi]`
///
/// Returns `(start_in_a, start_in_b, length)`. Among equally long runs the
/// one starting earliest in `a` wins, then the one starting earliest in `b`.
fn longest_block(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

    // run_len[k] = length of the common run ending at a[i - 1], b[blo + k - 1]
    let width = bhi - blo;
    let mut prev = vec![0usize; width + 1];
    let mut curr = vec![0usize; width + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let k = j - blo + 1;
            if a[i] == b[j] {
                let run = prev[k - 1] + 1;
                curr[k] = run;
                if run > best_size {
                    best_i = i + 1 - run;
                    best_j = j + 1 - run;
                    best_size = run;
                }
            } else {
                curr[k] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_size)
}
