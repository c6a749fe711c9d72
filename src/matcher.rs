//! Multi-phase fuzzy string matcher (C6, spec.md §4.6).
//!
//! Used by enum resolution and string-literal coercion. Candidates are
//! tried through four sequential phases, returning on the first phase
//! that yields at least one candidate.

use regex::Regex;

/// How a winning match was found. Phases 1–3 (exact, punctuation-stripped,
/// case-insensitive) are all considered "exact enough" and carry no
/// penalty; only phase 4 (substring) produces a flag-worthy outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchFlag {
    Exact,
    Substring,
    OneFromMany(Vec<(String, u32)>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Match { index: usize, flag: MatchFlag },
    Ambiguous(Vec<String>),
    NoMatch,
}

/// Runs the four-phase match of `query` against `candidates`, returning
/// the candidate's *index* in `candidates` on success so callers can look
/// up the schema-declared casing.
pub fn match_string(query: &str, candidates: &[String]) -> MatchOutcome {
    if let Some(outcome) = phase_exact(query, candidates) {
        return outcome;
    }
    if let Some(outcome) = phase_punctuation_stripped(query, candidates) {
        return outcome;
    }
    if let Some(outcome) = phase_case_insensitive(query, candidates) {
        return outcome;
    }
    phase_substring(query, candidates)
}

fn indices_matching(candidates: &[String], mut eq: impl FnMut(&str) -> bool) -> Vec<usize> {
    candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| eq(c))
        .map(|(i, _)| i)
        .collect()
}

fn resolve_exact_phase(candidates: &[String], indices: Vec<usize>) -> Option<MatchOutcome> {
    match indices.len() {
        0 => None,
        1 => Some(MatchOutcome::Match {
            index: indices[0],
            flag: MatchFlag::Exact,
        }),
        _ => Some(MatchOutcome::Ambiguous(
            indices.into_iter().map(|i| candidates[i].clone()).collect(),
        )),
    }
}

fn phase_exact(query: &str, candidates: &[String]) -> Option<MatchOutcome> {
    let indices = indices_matching(candidates, |c| c == query);
    resolve_exact_phase(candidates, indices)
}

/// Strips `[\s._-]` for comparison purposes only; the candidate returned
/// on a match is always the original, unstripped schema-declared string
/// (stripping never changes what gets returned, only what gets compared).
fn strip_punctuation(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace() && *c != '.' && *c != '_' && *c != '-')
        .collect()
}

fn phase_punctuation_stripped(query: &str, candidates: &[String]) -> Option<MatchOutcome> {
    let stripped_query = strip_punctuation(query);
    let indices = indices_matching(candidates, |c| strip_punctuation(c) == stripped_query);
    resolve_exact_phase(candidates, indices)
}

fn phase_case_insensitive(query: &str, candidates: &[String]) -> Option<MatchOutcome> {
    let folded_query = query.to_lowercase();
    let indices = indices_matching(candidates, |c| c.to_lowercase() == folded_query);
    resolve_exact_phase(candidates, indices)
}

struct Span {
    candidate_index: usize,
    start: usize,
    len: usize,
}

/// Greedy, non-overlapping scan: at each query position, among every
/// candidate matching there (case-insensitive), keep the longest; advance
/// past it, otherwise advance one character.
fn find_non_overlapping_spans(query: &str, candidates: &[String]) -> Vec<Span> {
    let q: Vec<char> = query.chars().collect();
    let lowered_candidates: Vec<Vec<char>> = candidates
        .iter()
        .map(|c| c.to_lowercase().chars().collect())
        .collect();

    let mut spans = Vec::new();
    let mut pos = 0;
    while pos < q.len() {
        let mut best: Option<(usize, usize)> = None; // (candidate_index, len)
        for (ci, cand) in lowered_candidates.iter().enumerate() {
            if cand.is_empty() || pos + cand.len() > q.len() {
                continue;
            }
            let window = &q[pos..pos + cand.len()];
            let matches = window
                .iter()
                .zip(cand.iter())
                .all(|(a, b)| a.to_lowercase().eq(b.to_lowercase()));
            if matches {
                let better = match best {
                    Some((_, best_len)) => cand.len() > best_len,
                    None => true,
                };
                if better {
                    best = Some((ci, cand.len()));
                }
            }
        }
        match best {
            Some((ci, len)) => {
                spans.push(Span {
                    candidate_index: ci,
                    start: pos,
                    len,
                });
                pos += len;
            }
            None => pos += 1,
        }
    }
    spans
}

fn whole_word_present(query: &str, candidate: &str) -> bool {
    if candidate.is_empty() {
        return false;
    }
    let pattern = format!(r"(?i)\b{}\b", regex::escape(candidate));
    match Regex::new(&pattern) {
        Ok(re) => re.is_match(query),
        Err(_) => false,
    }
}

fn phase_substring(query: &str, candidates: &[String]) -> MatchOutcome {
    let spans = find_non_overlapping_spans(query, candidates);
    if spans.is_empty() {
        return MatchOutcome::NoMatch;
    }

    let max_len = spans.iter().map(|s| s.len).max().unwrap_or(0);
    let mut winners: Vec<usize> = spans
        .iter()
        .filter(|s| s.len == max_len)
        .map(|s| s.candidate_index)
        .collect();
    winners.sort_unstable();
    winners.dedup();

    if winners.len() > 1 {
        return MatchOutcome::Ambiguous(winners.into_iter().map(|i| candidates[i].clone()).collect());
    }

    let winner = winners[0];

    // Downgrade to ambiguous if the raw text also contains any *other*
    // candidate as a whole word, even if the greedy scan didn't surface it
    // as its own span (spec.md §4.6 "TWO or THREE" rule).
    let other_whole_word_hits: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(i, c)| *i != winner && whole_word_present(query, c))
        .map(|(i, _)| i)
        .collect();
    if !other_whole_word_hits.is_empty() {
        let mut all = vec![winner];
        all.extend(other_whole_word_hits);
        all.sort_unstable();
        all.dedup();
        return MatchOutcome::Ambiguous(all.into_iter().map(|i| candidates[i].clone()).collect());
    }

    // Count how many distinct candidates were found at all (for the
    // StrMatchOneFromMany payload) vs. a single strong substring winner.
    let mut counts: Vec<(String, u32)> = Vec::new();
    for span in &spans {
        let name = candidates[span.candidate_index].clone();
        match counts.iter_mut().find(|(n, _)| *n == name) {
            Some((_, count)) => *count += 1,
            None => counts.push((name, 1)),
        }
    }

    if counts.len() == 1 {
        MatchOutcome::Match {
            index: winner,
            flag: MatchFlag::Substring,
        }
    } else {
        MatchOutcome::Match {
            index: winner,
            flag: MatchFlag::OneFromMany(counts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn exact_match_wins_first_phase() {
        let c = candidates(&["ONE", "TWO", "THREE"]);
        assert_eq!(
            match_string("TWO", &c),
            MatchOutcome::Match { index: 1, flag: MatchFlag::Exact }
        );
    }

    #[test]
    fn case_insensitive_still_reports_exact_flag() {
        let c = candidates(&["RED", "BLUE"]);
        assert_eq!(
            match_string("red", &c),
            MatchOutcome::Match { index: 0, flag: MatchFlag::Exact }
        );
    }

    #[test]
    fn substring_in_prose_matches() {
        let c = candidates(&["ONE", "TWO", "THREE"]);
        let outcome = match_string("I choose **TWO** as the answer.", &c);
        assert_eq!(outcome, MatchOutcome::Match { index: 1, flag: MatchFlag::Substring });
    }

    #[test]
    fn two_whole_word_candidates_are_ambiguous() {
        let c = candidates(&["ONE", "TWO", "THREE"]);
        let outcome = match_string("Maybe ONE or TWO.", &c);
        assert!(matches!(outcome, MatchOutcome::Ambiguous(_)));
    }

    #[test]
    fn no_match_when_nothing_present() {
        let c = candidates(&["ONE", "TWO"]);
        assert_eq!(match_string("nothing here", &c), MatchOutcome::NoMatch);
    }

    #[test]
    fn punctuation_stripped_matches_underscore_variant() {
        let c = candidates(&["CO2_EMISSIONS"]);
        assert_eq!(
            match_string("co2emissions", &c),
            MatchOutcome::Match { index: 0, flag: MatchFlag::Exact }
        );
    }
}
