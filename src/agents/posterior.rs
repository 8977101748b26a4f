//! Normal-Inverse-Gamma posterior for Bayesian linear regression.

use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand_distr::{Distribution, Gamma, StandardNormal};

/// Outcome of a posterior weight draw.
#[derive(Debug, Clone, PartialEq)]
pub enum PosteriorDraw {
    /// Weights drawn from the posterior
    Sampled(DVector<f64>),
    /// The posterior could not be sampled; weights drawn from `N(0, I)` instead
    Degenerate(DVector<f64>),
}

impl PosteriorDraw {
    pub fn weights(&self) -> &DVector<f64> {
        match self {
            PosteriorDraw::Sampled(w) | PosteriorDraw::Degenerate(w) => w,
        }
    }

    pub fn into_weights(self) -> DVector<f64> {
        match self {
            PosteriorDraw::Sampled(w) | PosteriorDraw::Degenerate(w) => w,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        matches!(self, PosteriorDraw::Degenerate(_))
    }
}

/// Posterior over the weights and noise variance of one action's linear model.
///
/// Weights `w | s2 ~ N(mu, s2 * cov)` and noise `s2 ~ InvGamma(a, b)`.
/// `cov` and `inv_cov` are kept as mutual inverses.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionPosterior {
    pub mu: DVector<f64>,
    pub cov: DMatrix<f64>,
    pub inv_cov: DMatrix<f64>,
    pub a: f64,
    pub b: f64,
}

impl ActionPosterior {
    /// The prior `N(0, I / lambda)` with `InvGamma(a0, b0)` noise
    pub fn prior(dim: usize, lambda_prior: f64, a0: f64, b0: f64) -> Self {
        ActionPosterior {
            mu: DVector::zeros(dim),
            cov: DMatrix::identity(dim, dim) / lambda_prior,
            inv_cov: DMatrix::identity(dim, dim) * lambda_prior,
            a: a0,
            b: b0,
        }
    }

    pub fn dim(&self) -> usize {
        self.mu.len()
    }

    /// Draw a noise variance, then weights given that variance.
    ///
    /// Never fails: an unusable shape/scale or a covariance without a Cholesky
    /// factor produces [`PosteriorDraw::Degenerate`] with standard-normal weights.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> PosteriorDraw {
        match self.try_sample(rng) {
            Some(weights) => PosteriorDraw::Sampled(weights),
            None => PosteriorDraw::Degenerate(standard_normal(self.dim(), rng)),
        }
    }

    fn try_sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<DVector<f64>> {
        if !(self.a.is_finite() && self.a > 0.0 && self.b.is_finite() && self.b > 0.0) {
            return None;
        }

        // s2 = b * X with X ~ InvGamma(a, 1), i.e. b / Gamma(a, 1)
        let gamma = Gamma::new(self.a, 1.0).ok()?;
        let g: f64 = gamma.sample(rng);
        let variance = self.b / g;
        if !variance.is_finite() || variance <= 0.0 {
            return None;
        }

        let chol = (&self.cov * variance).cholesky()?;
        let z = standard_normal(self.dim(), rng);
        let weights = &self.mu + chol.l() * z;
        weights.iter().all(|w| w.is_finite()).then_some(weights)
    }

    /// Refit exactly from every observation of this action.
    ///
    /// `x` holds one row per observation with the bias column already
    /// appended, `y` the matching rewards, `t` the number of rounds played.
    /// Returns `false` and leaves the posterior untouched when there is no data
    /// or the result would not be finite.
    pub fn refit(&mut self, x: &DMatrix<f64>, y: &DVector<f64>, lambda_prior: f64, a0: f64, b0: f64, t: usize) -> bool {
        if x.nrows() == 0 || x.nrows() != y.len() || x.ncols() != self.dim() {
            return false;
        }

        let dim = self.dim();
        let inv_cov = x.transpose() * x + DMatrix::identity(dim, dim) * lambda_prior;
        let cov = match inv_cov.clone().try_inverse() {
            Some(cov) => (&cov + cov.transpose()) * 0.5,
            None => return false,
        };
        let mu = &cov * (x.transpose() * y);

        let a = a0 + t as f64 / 2.0;
        let b = b0 + (y.dot(y) - mu.dot(&(&inv_cov * &mu))) / 2.0;

        let finite = mu.iter().chain(cov.iter()).all(|v| v.is_finite()) && a.is_finite() && b.is_finite();
        if !finite {
            return false;
        }

        self.mu = mu;
        self.cov = cov;
        self.inv_cov = inv_cov;
        self.a = a;
        self.b = b;
        true
    }
}

fn standard_normal<R: Rng + ?Sized>(dim: usize, rng: &mut R) -> DVector<f64> {
    DVector::from_iterator(dim, (0..dim).map(|_| StandardNormal.sample(rng)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_prior_is_consistent() {
        let p = ActionPosterior::prior(3, 0.25, 6.0, 6.0);
        let product = &p.inv_cov * &p.cov;
        assert_abs_diff_eq!(product, DMatrix::identity(3, 3), epsilon = 1e-12);
    }

    #[test]
    fn test_single_sample_refit() {
        let mut p = ActionPosterior::prior(3, 0.25, 6.0, 6.0);
        let x = DMatrix::from_row_slice(1, 3, &[1.0, 0.0, 1.0]);
        let y = DVector::from_vec(vec![1.0]);

        assert!(p.refit(&x, &y, 0.25, 6.0, 6.0, 10));

        assert_abs_diff_eq!(p.cov, p.cov.transpose(), epsilon = 1e-12);
        assert!(p.cov.clone().cholesky().is_some());
        assert_abs_diff_eq!(&p.inv_cov * &p.cov, DMatrix::identity(3, 3), epsilon = 1e-9);
        assert_abs_diff_eq!(p.a, 11.0);
        assert!(p.b > 6.0);
    }

    #[test]
    fn test_empty_refit_keeps_prior() {
        let mut p = ActionPosterior::prior(2, 0.5, 1.0, 1.0);
        let before = p.clone();
        assert!(!p.refit(&DMatrix::zeros(0, 2), &DVector::zeros(0), 0.5, 1.0, 1.0, 3));
        assert_eq!(p, before);
    }

    #[test]
    fn test_refit_recovers_linear_weights() {
        let mut p = ActionPosterior::prior(2, 0.01, 1.0, 1.0);
        let rows: Vec<f64> = (0..50).flat_map(|i| [i as f64 / 10.0, 1.0]).collect();
        let x = DMatrix::from_row_slice(50, 2, &rows);
        let y = DVector::from_iterator(50, (0..50).map(|i| 2.0 * (i as f64 / 10.0) + 0.5));

        assert!(p.refit(&x, &y, 0.01, 1.0, 1.0, 50));
        assert_abs_diff_eq!(p.mu[0], 2.0, epsilon = 1e-2);
        assert_abs_diff_eq!(p.mu[1], 0.5, epsilon = 5e-2);
    }

    #[test]
    fn test_zero_shape_is_degenerate() {
        let p = ActionPosterior::prior(4, 0.5, 0.0, 0.0);
        let mut rng = StdRng::seed_from_u64(0);
        let draw = p.sample(&mut rng);
        assert!(draw.is_degenerate());
        assert_eq!(draw.weights().len(), 4);
    }

    #[test]
    fn test_non_pd_covariance_is_degenerate() {
        let mut p = ActionPosterior::prior(2, 1.0, 6.0, 6.0);
        p.cov = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(p.sample(&mut rng).is_degenerate());
    }

    #[test]
    fn test_valid_posterior_samples() {
        let p = ActionPosterior::prior(3, 0.25, 6.0, 6.0);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(!p.sample(&mut rng).is_degenerate());
    }
}
