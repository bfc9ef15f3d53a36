pub const WILSON_Z_95: f64 = 1.96;
pub const HOT_DECAY_HOURS: f64 = 72.0;

const MS_PER_HOUR: f64 = 3_600_000.0;

pub fn wilson_score(positive: f64, total: f64) -> f64 {
    wilson_score_with_z(positive, total, WILSON_Z_95)
}

/// Lower bound of the Wilson score interval for `positive` successes out of
/// `total` trials. Both counts may be fractional (decayed) weights.
pub fn wilson_score_with_z(positive: f64, total: f64, z: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }

    let n = total;
    let p_hat = positive / n;
    let z2 = z * z;

    let denominator = 1.0 + z2 / n;
    let center = p_hat + z2 / (2.0 * n);
    let margin = z * ((p_hat * (1.0 - p_hat) + z2 / (4.0 * n)) / n).sqrt();
    (center - margin) / denominator
}

/// Age of a post in fractional hours. Creation times ahead of `now_ms`
/// (clock skew) count as age zero.
pub fn age_hours(created_at_ms: i64, now_ms: i64) -> f64 {
    let elapsed_ms = now_ms.saturating_sub(created_at_ms).max(0);
    elapsed_ms as f64 / MS_PER_HOUR
}

pub fn decayed_votes(votes_count: u64, age_hours: f64) -> f64 {
    votes_count as f64 * (-age_hours / HOT_DECAY_HOURS).exp()
}

/// Time-decayed popularity used as the default sort key. Every vote is a
/// success, so the trial count is the decayed vote weight itself, floored
/// at one to keep small weights below full confidence.
pub fn hot_score(votes_count: u64, created_at_ms: i64, now_ms: i64) -> f64 {
    let effective = decayed_votes(votes_count, age_hours(created_at_ms, now_ms));
    wilson_score(effective, effective.max(1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;
    const HOUR_MS: i64 = 3_600_000;
    const NOW: i64 = 1_760_000_000_000;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn returns_zero_for_empty_sample() {
        assert_eq!(wilson_score(0.0, 0.0), 0.0);
        assert_eq!(wilson_score(5.0, 0.0), 0.0);
        assert_eq!(wilson_score_with_z(3.0, 0.0, 2.58), 0.0);
    }

    #[test]
    fn known_values_match_reference_outputs() {
        assert_approx(wilson_score(1.0, 1.0), 0.20654329147389294);
        assert_approx(wilson_score(10.0, 10.0), 0.7224598312333834);
        assert_approx(wilson_score(100.0, 100.0), 0.963005192523998);
        assert_approx(wilson_score(0.5, 1.0), 0.0546190651458835);
    }

    #[test]
    fn unanimous_approval_reduces_to_sample_size_discount() {
        let z2 = WILSON_Z_95 * WILSON_Z_95;
        for n in [1.0, 2.5, 7.0, 42.0, 1_000.0] {
            assert_approx(wilson_score(n, n), n / (n + z2));
        }
    }

    #[test]
    fn unanimous_approval_grows_with_sample_but_stays_below_one() {
        let mut previous = 0.0;
        for n in [0.25, 1.0, 2.0, 5.0, 20.0, 100.0, 10_000.0] {
            let score = wilson_score(n, n);
            assert!(score > previous, "wilson({n},{n}) = {score} <= {previous}");
            assert!(score < 1.0);
            previous = score;
        }
    }

    #[test]
    fn zero_votes_score_zero_at_any_age() {
        assert_eq!(hot_score(0, NOW, NOW), 0.0);
        assert_eq!(hot_score(0, NOW - 500 * HOUR_MS, NOW), 0.0);
    }

    #[test]
    fn fresh_post_uses_raw_vote_count() {
        assert_approx(hot_score(1, NOW, NOW), wilson_score(1.0, 1.0));
        assert_approx(hot_score(100, NOW, NOW), wilson_score(100.0, 100.0));
    }

    #[test]
    fn one_decay_period_divides_votes_by_e() {
        let effective = 10.0 * (-1.0f64).exp();
        assert_approx(effective, 3.6787944117144233);
        let score = hot_score(10, NOW - 72 * HOUR_MS, NOW);
        assert_approx(score, wilson_score(effective, effective));
        assert_approx(score, 0.48917572806873155);
        assert!(score < hot_score(10, NOW, NOW));
        assert!(score > hot_score(10, NOW - 720 * HOUR_MS, NOW));
    }

    #[test]
    fn score_decays_with_age() {
        let mut previous = f64::INFINITY;
        for hours in [0, 1, 12, 48, 72, 200, 1_000] {
            let score = hot_score(25, NOW - hours * HOUR_MS, NOW);
            assert!(score < previous, "{hours}h: {score} >= {previous}");
            previous = score;
        }
    }

    #[test]
    fn decayed_weight_below_one_still_decays() {
        let recent = hot_score(1, NOW - 24 * HOUR_MS, NOW);
        let older = hot_score(1, NOW - 96 * HOUR_MS, NOW);
        assert!(recent > older);
        assert!(older > 0.0);
    }

    #[test]
    fn score_grows_with_votes() {
        let created = NOW - 30 * HOUR_MS;
        let mut previous = -1.0;
        for votes in [0, 1, 2, 3, 10, 50, 500] {
            let score = hot_score(votes, created, NOW);
            assert!(score > previous, "{votes} votes: {score} <= {previous}");
            previous = score;
        }
    }

    #[test]
    fn future_creation_time_is_treated_as_fresh() {
        assert_eq!(age_hours(NOW + HOUR_MS, NOW), 0.0);
        assert_eq!(hot_score(7, NOW + 10 * HOUR_MS, NOW), hot_score(7, NOW, NOW));
    }

    #[test]
    fn fractional_age_is_preserved() {
        assert_approx(age_hours(NOW - HOUR_MS / 2, NOW), 0.5);
    }
}
