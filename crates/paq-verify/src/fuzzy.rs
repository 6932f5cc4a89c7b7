//! OCR-tolerant text matching shared by the Field Locator's label scoring
//! (spec.md §4.5 step A), the Signature Zone Engine's landmark search
//! (spec.md §4.7), and the Value Normalizer's digit cleanup (spec.md §4.6).
//!
//! The substitution table is part of the contract, not an approximation to
//! be tightened later (spec.md §9): changing it changes which documents
//! verify.

use std::collections::HashSet;

const SUBSTITUTION_GROUPS: &[&[&str]] =
    &[&["l", "1", "i"], &["o", "0"], &["s", "5"], &["b", "8"], &["z", "2"], &["g", "6"], &["rn", "m"], &["cl", "d"]];

fn canonical_rep(token: &str) -> String {
    let lower = token.to_lowercase();
    for group in SUBSTITUTION_GROUPS {
        if group.contains(&lower.as_str()) {
            return group[0].to_string();
        }
    }
    lower
}

fn canonical_words(text: &str) -> HashSet<String> {
    text.split_whitespace()
        .map(|w| {
            let cleaned: String = w.chars().filter(|c| c.is_alphanumeric()).collect();
            canonical_rep(&cleaned)
        })
        .filter(|w| !w.is_empty())
        .collect()
}

/// Scores `candidate` against `label`, per spec.md §4.5 step A:
/// exact equality 1.00, prefix/contains `0.85 + 0.1·(short/long)`, else a
/// word-set Jaccard score capped at 0.80.
pub fn label_similarity(candidate: &str, label: &str) -> f64 {
    let candidate_norm = candidate.trim();
    let label_norm = label.trim();

    if candidate_norm.eq_ignore_ascii_case(label_norm) {
        return 1.0;
    }

    let (short, long) =
        if candidate_norm.len() <= label_norm.len() { (candidate_norm, label_norm) } else { (label_norm, candidate_norm) };
    if !short.is_empty() && long.to_lowercase().contains(&short.to_lowercase()) {
        let len_short = short.chars().count() as f64;
        let len_long = long.chars().count() as f64;
        return 0.85 + 0.1 * (len_short / len_long);
    }

    let candidate_words = canonical_words(candidate_norm);
    let label_words = canonical_words(label_norm);
    if candidate_words.is_empty() || label_words.is_empty() {
        return 0.0;
    }
    let intersection = candidate_words.intersection(&label_words).count() as f64;
    let union = candidate_words.union(&label_words).count() as f64;
    (intersection / union) * 0.80
}

/// The minimum [`label_similarity`] score a box must clear to be retained
/// as a label candidate (spec.md §4.5 step A).
pub fn acceptance_threshold(is_digital: bool) -> f64 {
    if is_digital {
        0.60
    } else {
        0.40
    }
}

/// Replaces OCR-confusable letters with the digit they are most often
/// misread as, ahead of numeric parsing (spec.md §4.6).
pub fn digit_substitute(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'l' | 'I' | 'i' => '1',
            'o' | 'O' => '0',
            's' | 'S' => '5',
            'b' | 'B' => '8',
            'z' | 'Z' => '2',
            'g' | 'G' => '6',
            other => other,
        })
        .collect()
}

/// Levenshtein edit distance, used for account-number tolerance (spec.md
/// §3, §4.6).
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (n, m) = (a.len(), b.len());
    let mut prev: Vec<usize> = (0..=m).collect();
    let mut curr = vec![0usize; m + 1];
    for i in 1..=n {
        curr[0] = i;
        for j in 1..=m {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[m]
}
