//! Confidence scoring for aggregated buckets
//!
//! Blends exchange coverage, price agreement and weight concentration into
//! a single value in [0, 1].

/// Exchanges needed for full coverage credit
const FULL_COVERAGE_EXCHANGES: f64 = 5.0;

const EXCHANGE_WEIGHT: f64 = 0.4;
const CONSISTENCY_WEIGHT: f64 = 0.4;
const WEIGHT_WEIGHT: f64 = 0.2;

/// Individual confidence components, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceFactors {
    pub exchange: f64,
    pub consistency: f64,
    pub weight: f64,
}

impl ConfidenceFactors {
    pub fn compute(
        exchange_count: usize,
        price_std_dev: f64,
        avg_price: f64,
        total_weight: f64,
    ) -> Self {
        let exchange = (exchange_count as f64 / FULL_COVERAGE_EXCHANGES).min(1.0);

        // Coefficient of variation: 10% dispersion zeroes the factor
        let consistency = if avg_price != 0.0 {
            (1.0 - (price_std_dev / avg_price).abs() * 10.0).max(0.0)
        } else {
            0.0
        };

        let weight = if exchange_count > 0 {
            (total_weight / exchange_count as f64).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            exchange,
            consistency,
            weight,
        }
    }

    pub fn score(&self) -> f64 {
        let score = EXCHANGE_WEIGHT * self.exchange
            + CONSISTENCY_WEIGHT * self.consistency
            + WEIGHT_WEIGHT * self.weight;
        if score.is_finite() {
            score.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

/// Confidence of one aggregated bucket
pub fn confidence_score(
    exchange_count: usize,
    price_std_dev: f64,
    avg_price: f64,
    total_weight: f64,
) -> f64 {
    ConfidenceFactors::compute(exchange_count, price_std_dev, avg_price, total_weight).score()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perfect_bucket_scores_one() {
        let score = confidence_score(5, 0.0, 100.0, 50.0);
        assert!((score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_bucket_scores_zero() {
        assert_eq!(confidence_score(0, 0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_factors() {
        let f = ConfidenceFactors::compute(2, 1.0, 100.0, 1.0);
        assert!((f.exchange - 0.4).abs() < 1e-9);
        assert!((f.consistency - 0.9).abs() < 1e-9);
        assert!((f.weight - 0.5).abs() < 1e-9);
        assert!((f.score() - (0.16 + 0.36 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_dispersion_zeroes_consistency() {
        let f = ConfidenceFactors::compute(3, 20.0, 100.0, 3.0);
        assert_eq!(f.consistency, 0.0);
    }

    #[test]
    fn test_confidence_increases_with_exchanges() {
        let few = confidence_score(1, 0.5, 100.0, 1.0);
        let many = confidence_score(4, 0.5, 100.0, 4.0);
        assert!(many > few);
    }
}
