use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

use super::utils::first_argmax;

/// One node of a fitted decision tree.
///
/// Nodes are stored in a flat array with the root at index 0. A split sends
/// the sample to `left` when `x[feature] <= threshold` and to `right`
/// otherwise. A leaf holds the per-class sample counts (or fractions) seen
/// during training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

impl TreeNode {
    pub fn split(feature: usize, threshold: f64, left: usize, right: usize) -> Self {
        TreeNode::Split { feature, threshold, left, right }
    }

    pub fn leaf(value: Vec<f64>) -> Self {
        TreeNode::Leaf { value }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Checks that the tree is non-empty, that children always point forward,
    /// and that every leaf has a usable class distribution.
    fn validate(&self, n_features: usize, n_classes: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".into());
        }
        let n_nodes = self.nodes.len();
        for (idx, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split { feature, threshold, left, right } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "Node {} splits on feature {} but the forest has {} features",
                            idx, feature, n_features
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("Node {} has a NaN threshold", idx));
                    }
                    for child in [left, right] {
                        if *child <= idx || *child >= n_nodes {
                            return Err(format!("Node {} has invalid child index {}", idx, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.len() != n_classes {
                        return Err(format!(
                            "Leaf {} has {} class values, expected {}",
                            idx, value.len(), n_classes
                        ));
                    }
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                        return Err(format!("Leaf {} has a negative or non-finite class value", idx));
                    }
                    if value.iter().sum::<f64>() <= 0.0 {
                        return Err(format!("Leaf {} has an empty class distribution", idx));
                    }
                }
            }
        }
        Ok(())
    }

    /// Walks from the root to a leaf and returns its class distribution
    fn leaf_for(&self, x: ArrayView1<f64>) -> &[f64] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split { feature, threshold, left, right } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => return value,
            }
        }
    }

    /// Class probabilities of the leaf reached by `x`
    pub(crate) fn predict_proba(&self, x: ArrayView1<f64>) -> Array1<f64> {
        let counts = self.leaf_for(x);
        let total: f64 = counts.iter().sum();
        counts.iter().map(|c| c / total).collect()
    }
}

/// A fitted binary random-forest classifier.
///
/// Probabilities are the mean of each tree's normalized leaf distribution.
/// Unless the artifact pins a `decision_threshold`, the predicted label is
/// the class with the highest mean probability, the first class winning ties.
///
/// Every constructor checks the forest's structure, so a `RandomForest`
/// value, including one produced by deserialization, is always well formed.
/// Its width is the length of `feature_importances`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawForest")]
pub struct RandomForest {
    classes: Vec<u8>,
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    decision_threshold: Option<f64>,
}

/// Wire form of [`RandomForest`] before its structure is checked.
#[derive(Debug, Clone, Deserialize)]
pub struct RawForest {
    classes: Vec<u8>,
    trees: Vec<DecisionTree>,
    feature_importances: Vec<f64>,
    #[serde(default)]
    decision_threshold: Option<f64>,
}

impl TryFrom<RawForest> for RandomForest {
    type Error = String;

    fn try_from(raw: RawForest) -> Result<Self, Self::Error> {
        let forest = Self {
            classes: raw.classes,
            trees: raw.trees,
            feature_importances: raw.feature_importances,
            decision_threshold: raw.decision_threshold,
        };
        forest.validate()?;
        Ok(forest)
    }
}

impl RandomForest {
    pub fn new(classes: Vec<u8>, trees: Vec<DecisionTree>, feature_importances: Vec<f64>) -> Result<Self, String> {
        Self::try_from(RawForest {
            classes,
            trees,
            feature_importances,
            decision_threshold: None,
        })
    }

    /// Pins an operating threshold on the positive-class probability
    pub fn with_decision_threshold(mut self, threshold: f64) -> Result<Self, String> {
        self.decision_threshold = Some(threshold);
        self.validate()?;
        Ok(self)
    }

    pub fn classes(&self) -> &[u8] {
        &self.classes
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of features the trees split on
    pub fn n_features(&self) -> usize {
        self.feature_importances.len()
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    pub fn decision_threshold(&self) -> Option<f64> {
        self.decision_threshold
    }

    fn validate(&self) -> Result<(), String> {
        if self.classes != [0, 1] {
            return Err(format!("Expected binary classes [0, 1], found {:?}", self.classes));
        }
        if self.trees.is_empty() {
            return Err("Forest has no trees".into());
        }
        if self.feature_importances.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err("Feature importances must be finite and non-negative".into());
        }
        if let Some(t) = self.decision_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(format!("Decision threshold {} is outside [0, 1]", t));
            }
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features(), self.classes.len())
                .map_err(|e| format!("Tree {}: {}", i, e))?;
        }
        Ok(())
    }

    /// Mean class-probability vector over all trees; `x` must have `n_features()` entries
    pub(crate) fn predict_proba(&self, x: ArrayView1<f64>) -> Array1<f64> {
        let mut proba = Array1::<f64>::zeros(self.classes.len());
        for tree in &self.trees {
            proba += &tree.predict_proba(x);
        }
        proba / self.trees.len() as f64
    }

    /// Applies the forest's decision rule to a probability vector from `predict_proba`
    pub(crate) fn decide(&self, proba: &Array1<f64>) -> u8 {
        match self.decision_threshold {
            Some(threshold) => {
                if proba[1] >= threshold { self.classes[1] } else { self.classes[0] }
            }
            None => self.classes[first_argmax(proba.view())],
        }
    }
}
