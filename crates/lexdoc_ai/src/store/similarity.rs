pub fn l2_norm(v: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for x in v {
        sum += x * x;
    }
    sum.sqrt()
}

pub fn cosine_similarity(a: &[f32], b: &[f32], a_norm: f32, b_norm: f32) -> f32 {
    let mut dot = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
    }
    dot / (a_norm * b_norm)
}

/// Cosine similarity clamped into `[0, 1]`; opposite vectors score 0.
pub fn unit_similarity(a: &[f32], b: &[f32], a_norm: f32, b_norm: f32) -> f32 {
    let s = cosine_similarity(a, b, a_norm, b_norm);
    if s.is_nan() {
        0.0
    } else {
        s.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_score_one() {
        let v = [3.0, 4.0];
        let n = l2_norm(&v);
        assert_eq!(n, 5.0);
        assert!((unit_similarity(&v, &v, n, n) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn opposite_vectors_clamp_to_zero() {
        let a = [1.0, 0.0];
        let b = [-1.0, 0.0];
        assert_eq!(unit_similarity(&a, &b, 1.0, 1.0), 0.0);
    }
}
