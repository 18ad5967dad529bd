//! Statistical tests for the sampler algebra.
//!
//! The tests draw large seeded samples and compare empirical proportions,
//! moments and marginal distributions against their expected values:
//! 1. Every tree returns exactly `size` rows, including `size = 0`.
//! 2. Mixtures split rows in proportion to the branch weights, in random order.
//! 3. Reweighting changes the weight but not the draws.
//! 4. Arithmetic nodes combine independent draws.
//! 5. Dimension expansion yields i.i.d. columns with the leaf's marginal.

use std::sync::{Arc, Mutex};

use mini_sampler::{
    resolve, Backend, Params, Result, Sample, Sampler, SamplerError, TruncateOptions,
};
use ndarray::{Array2, Axis};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SAMPLE_SIZE: usize = 100_000;
    const SEED: u64 = 42;

    fn leaf(name: &str, params: Params) -> Sampler {
        Sampler::leaf(name, params).expect("Expected leaf construction to succeed")
    }

    fn uniform(low: f64, high: f64) -> Sampler {
        leaf("u", Params::new().with("low", low).with("high", high))
    }

    /// Records every size it is asked for and returns zeros.
    struct Recorder(Arc<Mutex<Vec<usize>>>);

    impl Sample for Recorder {
        fn sample(&mut self, size: usize) -> Result<Array2<f64>> {
            self.0.lock().unwrap().push(size);
            Ok(Array2::zeros((size, 1)))
        }
    }

    #[test]
    fn every_tree_returns_requested_rows() {
        let trees: Vec<Box<dyn Fn() -> Sampler>> = vec![
            Box::new(|| leaf("n", Params::new())),
            Box::new(|| leaf("n", Params::new().with("dim", 3))),
            Box::new(|| uniform(0.0, 1.0) | leaf("e", Params::new())),
            Box::new(|| {
                (uniform(0.0, 1.0) & leaf("n", Params::new()))
                    | leaf("u", Params::new().with("dim", 2))
            }),
            Box::new(|| leaf("g", Params::new().with("shape", 2.0)) * uniform(1.0, 2.0) - 3.0),
            Box::new(|| uniform(1.0, 2.0).pow(uniform(0.0, 3.0)).floor_div(0.5) % 4.0),
            Box::new(|| leaf("n", Params::new()).truncate(TruncateOptions::between(-1.0, 1.0))),
        ];
        for build in &trees {
            let mut sampler = build().set_seed(SEED);
            for size in [0, 1, 7, 1000] {
                let draw = sampler.sample(size).unwrap();
                assert_eq!(draw.nrows(), size, "wrong row count for {sampler:?}");
            }
        }
    }

    #[test]
    fn empty_mixture_never_requests_negative_sizes() {
        let sizes = Arc::new(Mutex::new(Vec::new()));
        let mut mixture = Sampler::custom(Recorder(sizes.clone()))
            | Sampler::custom(Recorder(sizes.clone()));
        let draw = mixture.sample(0).unwrap();
        assert_eq!(draw.shape(), &[0, 1]);
        assert!(sizes.lock().unwrap().iter().all(|&s| s == 0));

        mixture.sample(500).unwrap();
        let requested: usize = sizes.lock().unwrap().iter().sum();
        assert_eq!(requested, 500);
    }

    #[test]
    fn mixture_proportions_follow_weights() {
        // Branch one draws from [0, 1), branch two from [10, 11).
        for (w1, w2) in [(1.0, 1.0), (1.0, 3.0), (9.0, 1.0)] {
            let mut mixture =
                ((uniform(0.0, 1.0) & w1) | (uniform(10.0, 11.0) & w2)).set_seed(SEED);
            let draw = mixture.sample(SAMPLE_SIZE).unwrap();
            let share = draw.iter().filter(|&&x| x < 5.0).count() as f64 / SAMPLE_SIZE as f64;
            assert_abs_diff_eq!(share, w1 / (w1 + w2), epsilon = 0.01);
        }
    }

    #[test]
    fn nested_mixtures_compose_weights() {
        let inner = (uniform(0.0, 1.0) & 1.0) | (uniform(10.0, 11.0) & 1.0);
        assert_eq!(inner.weight(), 2.0);
        let mut outer = (inner | (uniform(20.0, 21.0) & 2.0)).set_seed(SEED);
        let draw = outer.sample(SAMPLE_SIZE).unwrap();
        let n = SAMPLE_SIZE as f64;
        let low = draw.iter().filter(|&&x| x < 5.0).count() as f64 / n;
        let high = draw.iter().filter(|&&x| x > 15.0).count() as f64 / n;
        assert_abs_diff_eq!(low, 0.25, epsilon = 0.01);
        assert_abs_diff_eq!(high, 0.5, epsilon = 0.01);
    }

    #[test]
    fn mixture_rows_are_shuffled() {
        const N: usize = 10_000;
        let mut mixture = (Sampler::constant(0.0) | Sampler::constant(1.0)).set_seed(SEED);
        let labels = mixture.sample(N).unwrap();
        let labels = labels.column(0);

        let first = labels.slice(ndarray::s![..N / 2]).mean().unwrap();
        let second = labels.slice(ndarray::s![N / 2..]).mean().unwrap();
        assert_abs_diff_eq!(first, 0.5, epsilon = 0.05);
        assert_abs_diff_eq!(second, 0.5, epsilon = 0.05);

        // A random arrangement switches label about every other row.
        let switches = labels
            .iter()
            .zip(labels.iter().skip(1))
            .filter(|(a, b)| a != b)
            .count();
        assert!(
            (4_500..5_500).contains(&switches),
            "Expected about {} label switches, got {switches}",
            N / 2
        );
    }

    #[test]
    fn reweighting_keeps_draws_and_scales_weight() {
        let plain = leaf("n", Params::new().with("loc", 1.0));
        let heavy = leaf("n", Params::new().with("loc", 1.0)) & 3.0;
        assert_eq!(plain.weight(), 1.0);
        assert_eq!(heavy.weight(), 3.0);
        assert_eq!((heavy & 0.5).weight(), 1.5);

        let a = plain.set_seed(SEED).sample(100).unwrap();
        let b = (leaf("n", Params::new().with("loc", 1.0)) & 3.0)
            .set_seed(SEED)
            .sample(100)
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn arithmetic_moments_combine() {
        let normal = || leaf("n", Params::new().with("loc", 2.0));
        let uniform04 = || uniform(0.0, 4.0);

        let sum = (normal() + uniform04()).set_seed(SEED).sample(SAMPLE_SIZE).unwrap();
        assert_abs_diff_eq!(sum.mean().unwrap(), 4.0, epsilon = 0.05);
        // Independent operands: variances add.
        assert_abs_diff_eq!(sum.var(1.0), 1.0 + 16.0 / 12.0, epsilon = 0.1);

        let diff = (normal() - uniform04()).set_seed(SEED).sample(SAMPLE_SIZE).unwrap();
        assert_abs_diff_eq!(diff.mean().unwrap(), 0.0, epsilon = 0.05);

        let prod = (normal() * uniform04()).set_seed(SEED).sample(SAMPLE_SIZE).unwrap();
        assert_abs_diff_eq!(prod.mean().unwrap(), 4.0, epsilon = 0.1);
    }

    #[test]
    fn identical_subtrees_draw_independently() {
        let mut diff = (leaf("n", Params::new()) - leaf("n", Params::new())).set_seed(SEED);
        let draw = diff.sample(SAMPLE_SIZE).unwrap();
        assert_abs_diff_eq!(draw.var(1.0), 2.0, epsilon = 0.1);
    }

    #[test]
    fn expanded_columns_match_the_plain_leaf() {
        const N: usize = 2_000;
        let params = Params::new().with("shape", 2.0).with("scale", 1.5);
        let mut expanded = leaf("g", params.clone().with("dim", 3)).set_seed(SEED);
        let mut plain = leaf("g", params).set_seed(SEED + 1);

        let columns = expanded.sample(N).unwrap();
        assert_eq!(columns.ncols(), 3);
        let reference = plain.sample(N).unwrap().column(0).to_vec();
        for column in columns.axis_iter(Axis(1)) {
            let result = kolmogorov_smirnov::test_f64(&column.to_vec(), &reference, 0.999);
            assert!(
                !result.is_rejected,
                "Expected column to follow the leaf's distribution, KS statistic {}",
                result.statistic
            );
        }
    }

    #[test]
    fn expanded_columns_are_uncorrelated() {
        let mut expanded = leaf("n", Params::new().with("dim", 2)).set_seed(SEED);
        let draw = expanded.sample(SAMPLE_SIZE).unwrap();
        let x = draw.column(0);
        let y = draw.column(1);
        let corr = (&x * &y).mean().unwrap() - x.mean().unwrap() * y.mean().unwrap();
        assert_abs_diff_eq!(corr, 0.0, epsilon = 0.02);
        assert_ne!(x, y);
    }

    #[test]
    fn truncation_keeps_rows_in_bounds() {
        let mut truncated = leaf("n", Params::new().with("dim", 2))
            .truncate(TruncateOptions::between(-1.0, 0.5))
            .set_seed(SEED);
        let draw = truncated.sample(5_000).unwrap();
        assert_eq!(draw.shape(), &[5_000, 2]);
        assert!(draw.iter().all(|&x| (-1.0..=0.5).contains(&x)));
    }

    #[test]
    fn unlikely_truncation_fails() {
        let mut truncated = leaf("n", Params::new())
            .truncate(TruncateOptions::between(8.0, 9.0))
            .set_seed(SEED);
        assert!(matches!(
            truncated.sample(10),
            Err(SamplerError::Truncation { .. })
        ));
    }

    #[test]
    fn truncation_gives_up_after_max_iters() {
        let options = TruncateOptions {
            max_iters: Some(1),
            ..TruncateOptions::between(-1.0, 1.0)
        };
        let mut truncated = leaf("n", Params::new()).truncate(options).set_seed(SEED);
        assert!(matches!(
            truncated.sample(1_000),
            Err(SamplerError::MaxItersExceeded { iters: 1, .. })
        ));
    }

    #[test]
    fn disabled_share_check_is_bounded_by_max_iters() {
        let options = TruncateOptions {
            min_share: 0.0,
            max_iters: Some(3),
            ..TruncateOptions::between(50.0, 51.0)
        };
        let mut truncated = leaf("n", Params::new()).truncate(options).set_seed(SEED);
        assert!(matches!(
            truncated.sample(10),
            Err(SamplerError::MaxItersExceeded { iters: 3, .. })
        ));

        let unbounded = TruncateOptions {
            min_share: 0.0,
            ..TruncateOptions::between(50.0, 51.0)
        };
        let mut truncated = leaf("n", Params::new()).truncate(unbounded);
        assert!(matches!(
            truncated.sample(10),
            Err(SamplerError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn misspelled_parameters_fail_at_construction() {
        assert!(matches!(
            Sampler::leaf("n", Params::new().with("sacle", 5.0)),
            Err(SamplerError::InvalidParameter { .. })
        ));
        let params = Params::new().with("shape", 2.0).with("dim", 2).with("lam", 1.0);
        assert!(Sampler::leaf("g", params).is_err());
    }

    #[test]
    fn alias_resolution_is_stable_and_strict() {
        for _ in 0..5 {
            assert_eq!(resolve("mvn", Backend::Stats).unwrap(), "multivariate_normal");
            assert!(matches!(
                resolve("mvn", Backend::Tensor),
                Err(SamplerError::UnsupportedDistribution { .. })
            ));
        }
    }

    #[test]
    fn unresolvable_names_fail_before_sampling() {
        for name in ["norm", "Normal", "mystery"] {
            assert!(matches!(
                Sampler::leaf(name, Params::new()),
                Err(SamplerError::UnsupportedDistribution { .. })
            ));
        }
        assert!(Sampler::leaf("nope", Params::new().with("dim", 3)).is_err());
    }
}
