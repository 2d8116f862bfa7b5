//! Gradient-boosted decision trees with a logistic link.
//!
//! Splits send a row left when `value < threshold`; NaN values take the `missing`
//! branch (left when unset). Node covers are the training-sample weights reaching each
//! node and drive the expectation used for attribution.

use serde::{Deserialize, Serialize};

use super::{Classifier, check_row_len, invalid, sigmoid};
use crate::error::{ConfigError, PredictError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub base_margin: f64,
    pub trees: Vec<Tree>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        #[serde(default)]
        missing: Option<usize>,
        cover: f64,
    },
    Leaf {
        leaf: f64,
        cover: f64,
    },
}

impl TreeNode {
    fn cover(&self) -> f64 {
        match self {
            Self::Split { cover, .. } | Self::Leaf { cover, .. } => *cover,
        }
    }
}

impl Tree {
    fn validate(&self, tree_idx: usize, n_features: usize) -> Result<(), ConfigError> {
        if self.nodes.is_empty() {
            return Err(invalid(format!("tree {tree_idx} has no nodes")));
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            let cover = node.cover();
            if !cover.is_finite() || cover < 0.0 {
                return Err(invalid(format!(
                    "tree {tree_idx} node {idx} has invalid cover {cover}"
                )));
            }
            match node {
                TreeNode::Leaf { leaf, .. } => {
                    if !leaf.is_finite() {
                        return Err(invalid(format!("tree {tree_idx} leaf {idx} is not finite")));
                    }
                }
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    missing,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(invalid(format!(
                            "tree {tree_idx} node {idx} splits on feature {feature}, model has {n_features}"
                        )));
                    }
                    if !threshold.is_finite() {
                        return Err(invalid(format!(
                            "tree {tree_idx} node {idx} threshold is not finite"
                        )));
                    }
                    // Children always sit after their parent, which also rules out cycles.
                    for child in [*left, *right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(invalid(format!(
                                "tree {tree_idx} node {idx} has bad child index {child}"
                            )));
                        }
                    }
                    if let Some(m) = missing
                        && *m != *left
                        && *m != *right
                    {
                        return Err(invalid(format!(
                            "tree {tree_idx} node {idx} missing branch {m} is not a child"
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_value(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Leaf { leaf, .. } => return *leaf,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    missing,
                    ..
                } => {
                    idx = next_child(row[*feature], *threshold, *left, *right, *missing);
                }
            }
        }
    }

    /// Cover-weighted expectation of the leaf value with only `known` features fixed.
    fn expected_value(&self, idx: usize, row: &[f64], known: &[bool]) -> f64 {
        match &self.nodes[idx] {
            TreeNode::Leaf { leaf, .. } => *leaf,
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
                missing,
                ..
            } => {
                if known[*feature] {
                    let child = next_child(row[*feature], *threshold, *left, *right, *missing);
                    return self.expected_value(child, row, known);
                }
                let cover_left = self.nodes[*left].cover();
                let cover_right = self.nodes[*right].cover();
                let total = cover_left + cover_right;
                let (w_left, w_right) = if total > 0.0 {
                    (cover_left / total, cover_right / total)
                } else {
                    (0.5, 0.5)
                };
                w_left * self.expected_value(*left, row, known)
                    + w_right * self.expected_value(*right, row, known)
            }
        }
    }
}

fn next_child(value: f64, threshold: f64, left: usize, right: usize, missing: Option<usize>) -> usize {
    if value.is_nan() {
        missing.unwrap_or(left)
    } else if value < threshold {
        left
    } else {
        right
    }
}

impl TreeEnsemble {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feature_names.is_empty() {
            return Err(invalid("tree ensemble declares no features"));
        }
        if self.trees.is_empty() {
            return Err(invalid("tree ensemble has no trees"));
        }
        if !self.base_margin.is_finite() {
            return Err(invalid("base margin is not finite"));
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(idx, self.feature_names.len())?;
        }
        Ok(())
    }

    pub fn margin(&self, row: &[f64]) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.leaf_value(row)).sum::<f64>()
    }
}

impl Classifier for TreeEnsemble {
    fn kind(&self) -> &str {
        "tree_ensemble"
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], PredictError> {
        check_row_len(self.feature_names.len(), row)?;
        let p = sigmoid(self.margin(row));
        Ok([1.0 - p, p])
    }

    fn expected_proba(&self, row: &[f64], known: &[bool]) -> Option<f64> {
        if row.len() != self.feature_names.len() || known.len() != row.len() {
            return None;
        }
        let margin = self.base_margin
            + self
                .trees
                .iter()
                .map(|t| t.expected_value(0, row, known))
                .sum::<f64>();
        Some(sigmoid(margin))
    }
}
