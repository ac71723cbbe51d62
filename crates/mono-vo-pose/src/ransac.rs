//! Hypothesize-and-verify consensus search.
//!
//! The caller supplies two closures: one turning a minimal sample of data
//! indices into a hypothesis, one measuring a hypothesis against a single
//! datum. Samples are drawn without replacement from a seeded generator, so
//! a run is reproducible for a given seed.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RansacOptions {
    /// Upper bound on the number of drawn samples.
    pub max_iters: usize,
    /// Inlier threshold in residual units (pixels for pose estimation).
    pub thresh: f64,
    /// Smallest consensus set that is accepted.
    pub min_inliers: usize,
    /// Stop early once a clean sample has been drawn with this probability.
    pub confidence: f64,
    pub seed: u64,
    /// Polish the winning pose by Levenberg–Marquardt on its inliers.
    pub refine: bool,
}

impl Default for RansacOptions {
    fn default() -> Self {
        Self {
            max_iters: 100,
            thresh: 8.0,
            min_inliers: 4,
            confidence: 0.99,
            seed: 1_234_567,
            refine: true,
        }
    }
}

/// Best hypothesis found and the data that agree with it.
#[derive(Debug, Clone)]
pub struct Consensus<H> {
    pub hypothesis: H,
    /// Ascending data indices within the threshold.
    pub inliers: Vec<usize>,
    /// RMS residual over `inliers`.
    pub rms: f64,
    pub samples_drawn: usize,
}

/// Samples needed to have drawn one outlier-free minimal sample with
/// probability `confidence` when a fraction `inlier_fraction` of the data is
/// clean. `None` when no finite bound exists.
pub fn required_samples(confidence: f64, inlier_fraction: f64, sample_size: usize) -> Option<usize> {
    if !(0.0..1.0).contains(&confidence) || inlier_fraction <= 0.0 {
        return None;
    }
    if inlier_fraction >= 1.0 {
        return Some(1);
    }
    let clean = inlier_fraction.powi(sample_size as i32);
    let miss = (1.0 - clean).ln();
    if miss >= 0.0 || !miss.is_finite() {
        return None;
    }
    Some(((1.0 - confidence).ln() / miss).ceil().max(1.0) as usize)
}

/// Indices whose residual is within `thresh`, with their RMS residual.
pub fn inlier_set<H>(
    hypothesis: &H,
    len: usize,
    thresh: f64,
    residual: impl Fn(&H, usize) -> f64,
) -> (Vec<usize>, f64) {
    let mut inliers = Vec::new();
    let mut sum_sq = 0.0;
    for i in 0..len {
        let r = residual(hypothesis, i);
        if r <= thresh {
            inliers.push(i);
            sum_sq += r * r;
        }
    }
    let rms = if inliers.is_empty() {
        f64::INFINITY
    } else {
        (sum_sq / inliers.len() as f64).sqrt()
    };
    (inliers, rms)
}

/// Search `len` data for the hypothesis with the largest consensus set;
/// ties go to the lower RMS residual.
///
/// `hypothesize` receives `sample_size` distinct indices and returns `None`
/// for degenerate samples. Returns `None` when no hypothesis gathers
/// `max(min_inliers, sample_size)` inliers.
pub fn find_consensus<H>(
    len: usize,
    sample_size: usize,
    opts: &RansacOptions,
    mut hypothesize: impl FnMut(&[usize]) -> Option<H>,
    residual: impl Fn(&H, usize) -> f64,
) -> Option<Consensus<H>> {
    if sample_size == 0 || len < sample_size {
        return None;
    }
    let needed = opts.min_inliers.max(sample_size);
    let mut rng = StdRng::seed_from_u64(opts.seed);
    let mut budget = opts.max_iters;
    let mut drawn = 0;
    let mut best: Option<Consensus<H>> = None;

    while drawn < budget {
        drawn += 1;
        let sample = index::sample(&mut rng, len, sample_size).into_vec();
        let Some(hypothesis) = hypothesize(&sample) else {
            continue;
        };
        let (inliers, rms) = inlier_set(&hypothesis, len, opts.thresh, &residual);
        if inliers.len() < needed {
            continue;
        }
        let improves = best.as_ref().is_none_or(|b| {
            inliers.len() > b.inliers.len() || (inliers.len() == b.inliers.len() && rms < b.rms)
        });
        if !improves {
            continue;
        }
        let fraction = inliers.len() as f64 / len as f64;
        if let Some(n) = required_samples(opts.confidence, fraction, sample_size) {
            budget = budget.min(n.max(drawn));
        }
        best = Some(Consensus {
            hypothesis,
            inliers,
            rms,
            samples_drawn: drawn,
        });
    }

    if let Some(b) = best.as_mut() {
        b.samples_drawn = drawn;
    }
    best
}
