// Isolation forest over (solar_wind_speed, particle_flux).
//
// Each tree is grown on a random subsample by picking a random feature and a
// uniform split threshold between that feature's min and max, until a point
// is alone or the depth limit ceil(log2(sample_size)) is reached. Points that
// isolate in few splits are outliers.
//
// Scoring follows the usual convention: anomaly score
// s(x) = 2^(-E[h(x)] / c(psi)), sample score = -s(x), and the decision
// offset is the `contamination` percentile of the training sample scores.
// A point is an outlier when its sample score is strictly below the offset.
//
// All randomness comes from one StdRng seeded from the config, so the same
// input always yields the same flags.

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};

use super::DetectorError;
use crate::telemetry::TelemetrySeries;

/// One row of the joint feature matrix: `[speed, flux]`.
pub type FeatureRow = [f64; 2];

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestConfig {
    pub n_trees: usize,
    /// Subsample size per tree, capped at the row count
    pub max_samples: usize,
    /// Expected outlier fraction, in (0, 0.5]
    pub contamination: f64,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_samples: 256,
            contamination: 0.1,
            seed: 42,
        }
    }
}

impl ForestConfig {
    pub fn validate(&self) -> Result<(), DetectorError> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(DetectorError::InvalidContamination(self.contamination));
        }
        if self.n_trees == 0 {
            return Err(DetectorError::NoTrees);
        }
        if self.max_samples < 2 {
            return Err(DetectorError::SampleSizeTooSmall(self.max_samples));
        }
        Ok(())
    }
}

#[derive(Debug)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn grow(
        rows: &[FeatureRow],
        members: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> Node {
        if depth >= max_depth || members.len() <= 1 {
            return Node::Leaf {
                size: members.len(),
            };
        }

        // Only features that still vary inside this node can split it
        let splittable: Vec<(usize, f64, f64)> = (0..2)
            .filter_map(|feature| {
                let (lo, hi) = members.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                    (lo.min(rows[i][feature]), hi.max(rows[i][feature]))
                });
                (lo.is_finite() && hi.is_finite() && hi > lo).then_some((feature, lo, hi))
            })
            .collect();

        if splittable.is_empty() {
            return Node::Leaf {
                size: members.len(),
            };
        }

        let (feature, lo, hi) = splittable[rng.random_range(0..splittable.len())];
        // Interpolate rather than sample `lo..hi`: the span itself may overflow
        let t: f64 = rng.random();
        let threshold = (lo * (1.0 - t) + hi * t).clamp(lo, hi);
        let (left, right): (Vec<usize>, Vec<usize>) =
            members.into_iter().partition(|&i| rows[i][feature] < threshold);

        Node::Split {
            feature,
            threshold,
            left: Box::new(Node::grow(rows, left, depth + 1, max_depth, rng)),
            right: Box::new(Node::grow(rows, right, depth + 1, max_depth, rng)),
        }
    }

    fn path_length(&self, row: &FeatureRow) -> f64 {
        let mut node = self;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] < *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Expected path length of an unsuccessful BST search over `n` points, c(n).
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        n => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// A fitted isolation forest.
#[derive(Debug)]
pub struct IsolationForest {
    trees: Vec<Node>,
    sample_size: usize,
    offset: f64,
}

impl IsolationForest {
    /// Grow the forest on `rows` and calibrate the outlier offset.
    ///
    /// Fails on an empty matrix, or when every row is identical (nothing to isolate).
    pub fn fit(rows: &[FeatureRow], config: &ForestConfig) -> Result<Self, DetectorError> {
        config.validate()?;
        let Some(first) = rows.first() else {
            return Err(DetectorError::EmptyFeatures);
        };
        if rows.iter().all(|r| r == first) {
            return Err(DetectorError::DegenerateFeatures { rows: rows.len() });
        }

        let n = rows.len();
        let sample_size = config.max_samples.min(n);
        let max_depth = (sample_size as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let trees = (0..config.n_trees)
            .map(|_| {
                let members = index::sample(&mut rng, n, sample_size).into_vec();
                Node::grow(rows, members, 0, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            sample_size,
            offset: 0.0,
        };
        let scores = forest.score_samples(rows);
        forest.offset = percentile(&scores, config.contamination);
        Ok(forest)
    }

    /// Anomaly score s(x) in (0, 1]; higher isolates faster.
    pub fn anomaly_score(&self, row: &FeatureRow) -> f64 {
        let mean_depth = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>()
            / self.trees.len() as f64;
        2f64.powf(-mean_depth / average_path_length(self.sample_size))
    }

    /// Negated anomaly scores; lower is more abnormal.
    pub fn score_samples(&self, rows: &[FeatureRow]) -> Vec<f64> {
        rows.iter().map(|r| -self.anomaly_score(r)).collect()
    }

    pub fn offset(&self) -> f64 {
        self.offset
    }

    /// Positions of `rows` whose sample score falls strictly below the offset.
    pub fn outliers(&self, rows: &[FeatureRow]) -> Vec<usize> {
        self.score_samples(rows)
            .into_iter()
            .enumerate()
            .filter(|(_, s)| *s < self.offset)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Linear-interpolated percentile, `q` in [0, 1].
fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if sorted.is_empty() {
        return f64::NAN;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Build the feature matrix for the forest.
///
/// Gaps and non-finite values are forward-filled from the last finite value
/// of the same column, and leading gaps become 0.0. The series itself is
/// untouched.
pub fn feature_matrix(series: &TelemetrySeries) -> Vec<FeatureRow> {
    let mut last = [None::<f64>; 2];
    series
        .iter()
        .map(|r| {
            let mut row = [0.0; 2];
            for (col, value) in [r.solar_wind_speed, r.particle_flux].into_iter().enumerate() {
                if let Some(v) = value.filter(|v| v.is_finite()) {
                    last[col] = Some(v);
                }
                row[col] = last[col].unwrap_or(0.0);
            }
            row
        })
        .collect()
}

/// Fit on the series and return outlier positions.
pub fn detect_outliers(series: &TelemetrySeries, config: &ForestConfig) -> Result<Vec<usize>, DetectorError> {
    let rows = feature_matrix(series);
    let forest = IsolationForest::fit(&rows, config)?;
    Ok(forest.outliers(&rows))
}
