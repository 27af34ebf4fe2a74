//! Maximal-marginal-relevance selection.

/// Greedily pick up to `k` candidates, each time taking the one maximising
/// `lambda * relevance - (1 - lambda) * max similarity to anything already picked`.
///
/// `relevance[i]` is the query similarity of `candidates[i]`. Returns indices
/// into `candidates` in selection order.
pub fn mmr_select(candidates: &[&[f32]], relevance: &[f32], k: usize, lambda: f32) -> Vec<usize> {
    let mut selected: Vec<usize> = Vec::with_capacity(k.min(candidates.len()));
    // Highest similarity of each candidate to the selected set so far
    let mut redundancy = vec![f32::NEG_INFINITY; candidates.len()];

    while selected.len() < k.min(candidates.len()) {
        let mut best: Option<(usize, f32)> = None;
        for i in 0..candidates.len() {
            if selected.contains(&i) {
                continue;
            }
            let penalty = if selected.is_empty() { 0.0 } else { redundancy[i] };
            let score = lambda * relevance[i] - (1.0 - lambda) * penalty;
            // Strict comparison keeps the earlier (more relevant) candidate on ties
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((i, score));
            }
        }

        let Some((pick, _)) = best else { break };
        selected.push(pick);
        for i in 0..candidates.len() {
            let sim = cosine_similarity(candidates[i], candidates[pick]);
            if sim > redundancy[i] {
                redundancy[i] = sim;
            }
        }
    }

    selected
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for i in 0..a.len() {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_pure_relevance_keeps_ranking() {
        let a = [1.0, 0.0];
        let b = [0.9, 0.1];
        let c = [0.0, 1.0];
        let cands: Vec<&[f32]> = vec![&a, &b, &c];
        let picked = mmr_select(&cands, &[0.99, 0.95, 0.1], 3, 1.0);
        assert_eq!(picked, vec![0, 1, 2]);
    }

    #[test]
    fn test_diversity_skips_near_duplicates() {
        let a = [1.0, 0.0];
        let dup = [1.0, 0.0];
        let other = [0.0, 1.0];
        let cands: Vec<&[f32]> = vec![&a, &dup, &other];
        // The duplicate is slightly more relevant than `other` but fully redundant
        let picked = mmr_select(&cands, &[0.9, 0.89, 0.5], 2, 0.5);
        assert_eq!(picked, vec![0, 2]);
    }

    #[test]
    fn test_k_larger_than_candidates() {
        let a = [1.0, 0.0];
        let cands: Vec<&[f32]> = vec![&a];
        assert_eq!(mmr_select(&cands, &[0.5], 8, 0.5), vec![0]);
        assert!(mmr_select(&[], &[], 8, 0.5).is_empty());
    }
}
