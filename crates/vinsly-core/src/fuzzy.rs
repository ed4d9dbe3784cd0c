//! Typo-tolerant search matching for agent and skill lists.

pub const DEFAULT_TOLERANCE: usize = 2;

/// Levenshtein edit distance over chars, case-insensitive.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

fn word_matches(word: &str, query: &str, tolerance: usize) -> bool {
    let query_len = query.chars().count();
    if query_len <= 2 {
        return word.starts_with(query);
    }
    if word.starts_with(query) {
        return true;
    }

    let bound = tolerance.min(query_len / 3);
    let word_len = word.chars().count();
    if word_len.abs_diff(query_len) <= bound && levenshtein(word, query) <= bound {
        return true;
    }
    if word_len >= query_len {
        let prefix: String = word.chars().take(query_len).collect();
        return levenshtein(&prefix, query) <= bound;
    }
    false
}

/// Does `query` approximately occur in `text`?
///
/// Substring containment always matches. Otherwise each whitespace-separated
/// word of `text` is compared with the query; queries of one or two chars only
/// match as a word prefix, longer ones tolerate up to
/// `min(tolerance, len / 3)` edits.
pub fn fuzzy_match(text: &str, query: &str, tolerance: usize) -> bool {
    if query.is_empty() {
        return true;
    }
    if text.is_empty() {
        return false;
    }

    let text = text.to_lowercase();
    let query = query.to_lowercase();
    if text.contains(&query) {
        return true;
    }
    text.split_whitespace()
        .any(|word| word_matches(word, &query, tolerance))
}

/// [`fuzzy_match`] with [`DEFAULT_TOLERANCE`].
pub fn matches(text: &str, query: &str) -> bool {
    fuzzy_match(text, query, DEFAULT_TOLERANCE)
}

/// Keep the items for which any of the strings produced by `fields` matches.
pub fn filter<'a, T, F>(items: &'a [T], query: &str, tolerance: usize, fields: F) -> Vec<&'a T>
where
    F: Fn(&T) -> Vec<&str>,
{
    items
        .iter()
        .filter(|item| {
            fields(item)
                .into_iter()
                .any(|text| fuzzy_match(text, query, tolerance))
        })
        .collect()
}
