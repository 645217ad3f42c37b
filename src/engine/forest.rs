//! Classifier backends.
//!
//! - `RandomForest`: bagged CART trees (Gini impurity, √d candidate features
//!   per split). Class probabilities are the mean of per-tree leaf class
//!   fractions; the predicted class is their argmax.
//! - `NearestCentroid`: distance to per-class means. Has no probability
//!   output, so prediction falls back to a fixed distribution.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::types::{Classifier, TriageError};

/// Forest hyper-parameters.
#[derive(Debug, Clone, Copy)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: crate::config::DEFAULT_ESTIMATORS,
            min_samples_split: 2,
            seed: crate::config::DEFAULT_SEED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        proba: Vec<f64>,
    },
    /// Samples with `x[feature] <= threshold` go left.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single fitted CART tree stored as a flat node arena; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [usize],
    n_classes: usize,
    max_features: usize,
    min_samples_split: usize,
    rng: StdRng,
    nodes: Vec<Node>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

impl<'a> TreeBuilder<'a> {
    fn class_counts(&self, samples: &[usize]) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in samples {
            counts[self.y[i]] += 1.0;
        }
        counts
    }

    fn grow(&mut self, samples: Vec<usize>) -> usize {
        let id = self.nodes.len();
        let counts = self.class_counts(&samples);
        let n = samples.len() as f64;
        self.nodes.push(Node::Leaf {
            proba: counts.iter().map(|c| c / n).collect(),
        });

        let pure = counts.iter().filter(|c| **c > 0.0).count() <= 1;
        if pure || samples.len() < self.min_samples_split {
            return id;
        }

        let Some(split) = self.best_split(&samples) else {
            return id;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|&i| self.x[i][split.feature] <= split.threshold);

        let left_id = self.grow(left);
        let right_id = self.grow(right);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_id,
            right: right_id,
        };
        id
    }

    /// Search √d random features (more if the drawn ones are constant here)
    /// for the split that maximises Σ c²/n over both children, i.e. minimises
    /// weighted Gini impurity.
    fn best_split(&mut self, samples: &[usize]) -> Option<BestSplit> {
        let n_features = self.x[samples[0]].len();
        let mut features: Vec<usize> = (0..n_features).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<BestSplit> = None;
        let mut informative = 0;
        let mut order = samples.to_vec();

        for feature in features {
            if informative >= self.max_features {
                break;
            }
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));
            let first = self.x[order[0]][feature];
            let last = self.x[order[order.len() - 1]][feature];
            if first == last {
                continue;
            }
            informative += 1;

            let mut left = vec![0.0; self.n_classes];
            let mut right = self.class_counts(&order);
            let total = order.len();

            for pos in 0..total - 1 {
                let cls = self.y[order[pos]];
                left[cls] += 1.0;
                right[cls] -= 1.0;

                let here = self.x[order[pos]][feature];
                let next = self.x[order[pos + 1]][feature];
                if here == next {
                    continue;
                }

                let nl = (pos + 1) as f64;
                let nr = (total - pos - 1) as f64;
                let score = left.iter().map(|c| c * c).sum::<f64>() / nl
                    + right.iter().map(|c| c * c).sum::<f64>() / nr;

                if best.as_ref().map_or(true, |b| score > b.score) {
                    // The midpoint of adjacent floats can round up to `next`.
                    let mid = here + (next - here) / 2.0;
                    best = Some(BestSplit {
                        feature,
                        threshold: if mid < next { mid } else { here },
                        score,
                    });
                }
            }
        }

        best
    }
}

impl DecisionTree {
    fn leaf_proba(&self, x: &[f64]) -> Result<&[f64], TriageError> {
        let mut id = 0;
        // A well-formed tree reaches a leaf in at most `nodes.len()` steps.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(id) {
                Some(Node::Leaf { proba }) => return Ok(proba.as_slice()),
                Some(Node::Split { feature, threshold, left, right }) => {
                    let v = x.get(*feature).ok_or_else(|| {
                        TriageError::Inference(format!("split on missing feature {feature}"))
                    })?;
                    id = if *v <= *threshold { *left } else { *right };
                }
                None => return Err(TriageError::Inference(format!("dangling node {id}"))),
            }
        }
        Err(TriageError::Inference("tree contains a cycle".into()))
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), TriageError> {
        if self.nodes.is_empty() {
            return Err(TriageError::ArtifactInconsistent("empty tree".into()));
        }
        for node in &self.nodes {
            let ok = match node {
                Node::Leaf { proba } => proba.len() == n_classes && is_distribution(proba),
                Node::Split { feature, threshold, left, right } => {
                    *feature < n_features
                        && threshold.is_finite()
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                }
            };
            if !ok {
                return Err(TriageError::ArtifactInconsistent(format!(
                    "malformed tree node {node:?}"
                )));
            }
        }
        Ok(())
    }
}

/// Tolerance on the sum of a leaf distribution.
const LEAF_SUM_TOLERANCE: f64 = 1e-6;

fn is_distribution(proba: &[f64]) -> bool {
    proba.iter().all(|p| (0.0..=1.0).contains(p))
        && (proba.iter().sum::<f64>() - 1.0).abs() <= LEAF_SUM_TOLERANCE
}

/// Bagged ensemble of decision trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub n_classes: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn fit(
        x: &[Vec<f64>],
        y: &[usize],
        n_classes: usize,
        params: ForestParams,
    ) -> Result<Self, TriageError> {
        let n_features = check_training_set(x, y, n_classes)?;
        if params.n_estimators == 0 {
            return Err(TriageError::Training("forest needs at least one tree".into()));
        }

        let max_features = ((n_features as f64).sqrt() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(params.seed);
        let n = x.len();

        let trees = (0..params.n_estimators)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let mut builder = TreeBuilder {
                    x,
                    y,
                    n_classes,
                    max_features,
                    min_samples_split: params.min_samples_split.max(2),
                    rng: StdRng::seed_from_u64(rng.gen()),
                    nodes: Vec::new(),
                };
                builder.grow(bootstrap);
                DecisionTree { nodes: builder.nodes }
            })
            .collect();

        Ok(Self { n_features, n_classes, trees })
    }

    pub(crate) fn validate(&self) -> Result<(), TriageError> {
        if self.trees.is_empty() {
            return Err(TriageError::ArtifactInconsistent("forest has no trees".into()));
        }
        self.trees
            .iter()
            .try_for_each(|t| t.validate(self.n_features, self.n_classes))
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict(&self, x: &[f64]) -> Result<usize, TriageError> {
        let proba = self
            .predict_proba(x)?
            .ok_or_else(|| TriageError::Inference("forest produced no distribution".into()))?;
        Ok(argmax(&proba))
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Option<Vec<f64>>, TriageError> {
        check_width(x, self.n_features)?;
        let mut sum = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (acc, p) in sum.iter_mut().zip(tree.leaf_proba(x)?) {
                *acc += p;
            }
        }
        let n = self.trees.len() as f64;
        Ok(Some(sum.into_iter().map(|s| s / n).collect()))
    }
}

/// Nearest class mean. Deterministic, no probability output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearestCentroid {
    pub centroids: Vec<Vec<f64>>,
}

impl NearestCentroid {
    pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<Self, TriageError> {
        let n_features = check_training_set(x, y, n_classes)?;
        let mut sums = vec![vec![0.0; n_features]; n_classes];
        let mut counts = vec![0usize; n_classes];
        for (row, &cls) in x.iter().zip(y) {
            counts[cls] += 1;
            for (s, v) in sums[cls].iter_mut().zip(row) {
                *s += v;
            }
        }
        if let Some(empty) = counts.iter().position(|c| *c == 0) {
            return Err(TriageError::Training(format!("class {empty} has no samples")));
        }
        let centroids = sums
            .into_iter()
            .zip(counts)
            .map(|(s, c)| s.into_iter().map(|v| v / c as f64).collect())
            .collect();
        Ok(Self { centroids })
    }
}

impl Classifier for NearestCentroid {
    fn n_features(&self) -> usize {
        self.centroids.first().map_or(0, Vec::len)
    }

    fn n_classes(&self) -> usize {
        self.centroids.len()
    }

    fn predict(&self, x: &[f64]) -> Result<usize, TriageError> {
        check_width(x, self.n_features())?;
        let distances: Vec<f64> = self
            .centroids
            .iter()
            .map(|c| -c.iter().zip(x).map(|(a, b)| (a - b).powi(2)).sum::<f64>())
            .collect();
        Ok(argmax(&distances))
    }

    fn predict_proba(&self, _x: &[f64]) -> Result<Option<Vec<f64>>, TriageError> {
        Ok(None)
    }
}

/// The persisted classifier blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    RandomForest(RandomForest),
    NearestCentroid(NearestCentroid),
}

impl ClassifierModel {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RandomForest(_) => "random_forest",
            Self::NearestCentroid(_) => "nearest_centroid",
        }
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            Self::RandomForest(m) => m,
            Self::NearestCentroid(m) => m,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), TriageError> {
        match self {
            Self::RandomForest(m) => m.validate(),
            Self::NearestCentroid(m) => {
                let width = m.n_features();
                if m.centroids.is_empty() || m.centroids.iter().any(|c| c.len() != width) {
                    return Err(TriageError::ArtifactInconsistent("ragged centroids".into()));
                }
                Ok(())
            }
        }
    }
}

impl Classifier for ClassifierModel {
    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn n_classes(&self) -> usize {
        self.inner().n_classes()
    }

    fn predict(&self, x: &[f64]) -> Result<usize, TriageError> {
        self.inner().predict(x)
    }

    fn predict_proba(&self, x: &[f64]) -> Result<Option<Vec<f64>>, TriageError> {
        self.inner().predict_proba(x)
    }
}

/// Index of the first maximum.
fn argmax(values: &[f64]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |(bi, bv), (i, &v)| if v > bv { (i, v) } else { (bi, bv) })
        .0
}

fn check_width(x: &[f64], expected: usize) -> Result<(), TriageError> {
    if x.len() != expected {
        return Err(TriageError::FeatureCount { expected, got: x.len() });
    }
    if x.iter().any(|v| !v.is_finite()) {
        return Err(TriageError::Inference("non-finite feature value".into()));
    }
    Ok(())
}

/// Returns the feature width of a well-formed training set.
fn check_training_set(x: &[Vec<f64>], y: &[usize], n_classes: usize) -> Result<usize, TriageError> {
    let width = x
        .first()
        .map(Vec::len)
        .ok_or_else(|| TriageError::Training("empty training set".into()))?;
    if x.len() != y.len() {
        return Err(TriageError::Training(format!(
            "{} rows but {} labels",
            x.len(),
            y.len()
        )));
    }
    if width == 0 || x.iter().any(|r| r.len() != width) {
        return Err(TriageError::Training("ragged feature rows".into()));
    }
    if let Some(bad) = y.iter().find(|&&c| c >= n_classes) {
        return Err(TriageError::Training(format!("label {bad} >= {n_classes} classes")));
    }
    Ok(width)
}
