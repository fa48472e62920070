//! Nearest-neighbor ranking over stored embeddings

/// Cosine distance in `[0, 2]`; lower is nearer.
///
/// A zero vector has no direction and is treated as orthogonal to everything.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Rank candidates by distance to `query`, nearest first, keeping at most
/// `n_results`. Equal distances keep their input order.
pub fn rank_nearest<T, V>(query: &[f32], candidates: Vec<(T, V)>, n_results: usize) -> Vec<(T, f32)>
where
    V: AsRef<[f32]>,
{
    let mut scored: Vec<(T, f32)> = candidates
        .into_iter()
        .map(|(item, vector)| {
            let distance = cosine_distance(query, vector.as_ref());
            (item, distance)
        })
        .collect();

    scored.sort_by(|a, b| a.1.total_cmp(&b.1));
    scored.truncate(n_results);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_distance() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[test]
    fn test_rank_nearest_orders_and_truncates() {
        let candidates = vec![
            ("east", vec![1.0, 0.0]),
            ("north", vec![0.0, 1.0]),
            ("north-east", vec![1.0, 1.0]),
        ];
        let ranked = rank_nearest(&[0.9, 0.1], candidates, 2);
        let names: Vec<_> = ranked.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["east", "north-east"]);
        assert!(ranked[0].1 <= ranked[1].1);
    }

    #[test]
    fn test_rank_nearest_ties_keep_input_order() {
        let candidates = vec![("a", vec![1.0, 0.0]), ("b", vec![2.0, 0.0]), ("c", vec![3.0, 0.0])];
        let ranked = rank_nearest(&[1.0, 0.0], candidates, 10);
        let names: Vec<_> = ranked.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
