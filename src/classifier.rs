use anyhow::{Context, Result, bail, ensure};
use serde::Deserialize;
use std::collections::HashMap;

/// A probabilistic binary classifier over a fixed, ordered feature vector
pub trait Classifier {
    /// Ordered names of the features each input row must carry
    fn feature_names(&self) -> &[String];

    /// Positive-class probability for each row
    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>>;
}

/// Gradient-boosted tree ensemble read from an XGBoost JSON model export
#[derive(Debug, Clone)]
pub struct BoostedTreeModel {
    feature_names: Vec<String>,
    base_margin: f64,
    trees: Vec<Tree>,
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
    Leaf(f32),
}

impl Tree {
    fn leaf_value(&self, row: &[f64]) -> f32 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    // Inputs are compared in single precision, as the model was trained
                    let value = row[feature] as f32;
                    index = if value.is_nan() {
                        if default_left { left } else { right }
                    } else if value < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

impl BoostedTreeModel {
    /// Load a model saved with XGBoost's `save_model("model.json")`
    pub fn load_from_file(path: &str) -> Result<BoostedTreeModel> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model file '{path}'"))?;
        Self::from_json(&content).with_context(|| format!("Invalid model file '{path}'"))
    }

    pub fn from_json(json: &str) -> Result<BoostedTreeModel> {
        let file: ModelFile = serde_json::from_str(json)?;
        let learner = file.learner;

        let objective = learner.objective.name.as_str();
        ensure!(
            objective == "binary:logistic" || objective == "reg:logistic",
            "unsupported objective '{objective}', expected a logistic objective"
        );
        ensure!(
            !learner.feature_names.is_empty(),
            "model does not carry feature names"
        );
        if learner.gradient_booster.name != "gbtree" {
            bail!(
                "unsupported booster '{}', expected gbtree",
                learner.gradient_booster.name
            );
        }
        let Some(ensemble) = learner.gradient_booster.model else {
            bail!("gbtree booster has no model section");
        };

        let base_score = parse_base_score(&learner.learner_model_param.base_score)?;
        let feature_count = learner.feature_names.len();
        let tree_limit = ensemble.tree_limit(&learner.attributes)?;
        let trees = ensemble
            .trees
            .into_iter()
            .take(tree_limit)
            .enumerate()
            .map(|(i, raw)| {
                raw.into_tree(feature_count)
                    .with_context(|| format!("tree {i} is malformed"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(BoostedTreeModel {
            feature_names: learner.feature_names,
            base_margin: (base_score / (1.0 - base_score)).ln(),
            trees,
        })
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }
}

impl Classifier for BoostedTreeModel {
    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_proba(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.iter()
            .enumerate()
            .map(|(i, row)| {
                ensure!(
                    row.len() == self.feature_names.len(),
                    "row {i} has {} features, model expects {}",
                    row.len(),
                    self.feature_names.len()
                );
                let margin = self.base_margin
                    + self
                        .trees
                        .iter()
                        .map(|tree| f64::from(tree.leaf_value(row)))
                        .sum::<f64>();
                Ok(sigmoid(margin))
            })
            .collect()
    }
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

/// Newer exports wrap the base score in brackets, e.g. "[5E-1]"
fn parse_base_score(raw: &str) -> Result<f64> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let score: f64 = trimmed
        .parse()
        .with_context(|| format!("invalid base_score '{raw}'"))?;
    ensure!(
        score > 0.0 && score < 1.0,
        "base_score {score} is not a probability"
    );
    Ok(score)
}

#[derive(Debug, Deserialize)]
struct ModelFile {
    learner: Learner,
}

#[derive(Debug, Deserialize)]
struct Learner {
    #[serde(default)]
    attributes: HashMap<String, String>,
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: GradientBooster,
    learner_model_param: LearnerModelParam,
    objective: Objective,
}

#[derive(Debug, Deserialize)]
struct GradientBooster {
    name: String,
    model: Option<TreeEnsemble>,
}

#[derive(Debug, Deserialize)]
struct TreeEnsemble {
    gbtree_model_param: Option<GbTreeModelParam>,
    trees: Vec<RawTree>,
}

#[derive(Debug, Deserialize)]
struct GbTreeModelParam {
    num_parallel_tree: Option<String>,
}

impl TreeEnsemble {
    /// Number of leading trees to evaluate. Early-stopped models record
    /// `best_iteration` and are scored only up to and including it.
    fn tree_limit(&self, attributes: &HashMap<String, String>) -> Result<usize> {
        let Some(best_iteration) = attributes.get("best_iteration") else {
            return Ok(self.trees.len());
        };
        let best_iteration: usize = best_iteration
            .parse()
            .with_context(|| format!("invalid best_iteration '{best_iteration}'"))?;
        let per_iteration = match self
            .gbtree_model_param
            .as_ref()
            .and_then(|param| param.num_parallel_tree.as_deref())
        {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("invalid num_parallel_tree '{raw}'"))?
                .max(1),
            None => 1,
        };
        Ok(((best_iteration + 1) * per_iteration).min(self.trees.len()))
    }
}

#[derive(Debug, Deserialize)]
struct LearnerModelParam {
    base_score: String,
}

#[derive(Debug, Deserialize)]
struct Objective {
    name: String,
}

/// Older exports write `default_left` as 0/1, newer ones as booleans
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(u8),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawTree {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<usize>,
    split_conditions: Vec<f32>, // holds the leaf value on leaf nodes
    default_left: Vec<Flag>,
}

impl RawTree {
    fn into_tree(self, feature_count: usize) -> Result<Tree> {
        let len = self.left_children.len();
        ensure!(len > 0, "tree has no nodes");
        ensure!(
            self.right_children.len() == len
                && self.split_indices.len() == len
                && self.split_conditions.len() == len
                && self.default_left.len() == len,
            "node arrays have inconsistent lengths"
        );

        let mut nodes = Vec::with_capacity(len);
        for index in 0..len {
            let left = self.left_children[index];
            let right = self.right_children[index];
            if left == -1 {
                nodes.push(Node::Leaf(self.split_conditions[index]));
                continue;
            }

            // Children always follow their parent, which rules out cycles
            let child = |raw: i64| -> Result<usize> {
                let child = usize::try_from(raw).ok().filter(|c| *c > index && *c < len);
                child.with_context(|| format!("node {index} has invalid child {raw}"))
            };
            let feature = self.split_indices[index];
            ensure!(
                feature < feature_count,
                "node {index} splits on unknown feature {feature}"
            );
            nodes.push(Node::Split {
                feature,
                threshold: self.split_conditions[index],
                left: child(left)?,
                right: child(right)?,
                default_left: self.default_left[index].is_set(),
            });
        }
        Ok(Tree { nodes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const TWO_TREE_MODEL: &str = r#"{
        "learner": {
            "attributes": {},
            "feature_names": ["energy", "artist_followers_log"],
            "feature_types": ["float", "float"],
            "gradient_booster": {
                "model": {
                    "gbtree_model_param": {"num_parallel_tree": "1", "num_trees": "2"},
                    "tree_info": [0, 0],
                    "trees": [
                        {"id": 0, "left_children": [1, -1, -1], "right_children": [2, -1, -1],
                         "split_indices": [0, 0, 0], "split_conditions": [0.5, -0.4, 0.6],
                         "default_left": [0, 0, 0]},
                        {"id": 1, "left_children": [1, -1, -1], "right_children": [2, -1, -1],
                         "split_indices": [1, 0, 0], "split_conditions": [10.0, 0.1, 0.3],
                         "default_left": [true, false, false]}
                    ]
                },
                "name": "gbtree"
            },
            "learner_model_param": {"base_score": "[5E-1]", "num_class": "0", "num_feature": "2"},
            "objective": {"name": "binary:logistic", "reg_loss_param": {"scale_pos_weight": "1"}}
        },
        "version": [2, 1, 0]
    }"#;

    #[test]
    fn test_loads_feature_names_and_trees() {
        let model = BoostedTreeModel::from_json(TWO_TREE_MODEL).unwrap();

        assert_eq!(model.feature_names(), ["energy", "artist_followers_log"]);
        assert_eq!(model.tree_count(), 2);
    }

    #[test]
    fn test_predict_proba_sums_leaves_through_sigmoid() {
        let model = BoostedTreeModel::from_json(TWO_TREE_MODEL).unwrap();

        let probabilities = model
            .predict_proba(&[vec![0.7, 20.0], vec![0.2, 3.0], vec![0.2, f64::NAN]])
            .unwrap();

        assert_relative_eq!(probabilities[0], sigmoid(0.9), epsilon = 1e-6);
        assert_relative_eq!(probabilities[1], sigmoid(-0.3), epsilon = 1e-6);
        // NaN follows default_left on the second tree
        assert_relative_eq!(probabilities[2], sigmoid(-0.3), epsilon = 1e-6);
    }

    #[test]
    fn test_best_iteration_truncates_the_ensemble() {
        let json = TWO_TREE_MODEL.replace(
            "\"attributes\": {}",
            "\"attributes\": {\"best_iteration\": \"0\", \"best_score\": \"0.41\"}",
        );
        let model = BoostedTreeModel::from_json(&json).unwrap();

        assert_eq!(model.tree_count(), 1);
        let probabilities = model.predict_proba(&[vec![0.7, 20.0]]).unwrap();
        assert_relative_eq!(probabilities[0], sigmoid(0.6), epsilon = 1e-6);
    }

    #[test]
    fn test_best_iteration_past_the_end_keeps_every_tree() {
        let json = TWO_TREE_MODEL.replace(
            "\"attributes\": {}",
            "\"attributes\": {\"best_iteration\": \"9\"}",
        );
        let model = BoostedTreeModel::from_json(&json).unwrap();

        assert_eq!(model.tree_count(), 2);
    }

    #[test]
    fn test_rejects_malformed_best_iteration() {
        let json = TWO_TREE_MODEL.replace(
            "\"attributes\": {}",
            "\"attributes\": {\"best_iteration\": \"last\"}",
        );
        assert!(BoostedTreeModel::from_json(&json).is_err());
    }

    #[test]
    fn test_split_threshold_goes_right_when_equal() {
        let model = BoostedTreeModel::from_json(TWO_TREE_MODEL).unwrap();

        let probabilities = model.predict_proba(&[vec![0.5, 10.0]]).unwrap();
        assert_relative_eq!(probabilities[0], sigmoid(0.9), epsilon = 1e-6);
    }

    #[test]
    fn test_rejects_wrong_row_width() {
        let model = BoostedTreeModel::from_json(TWO_TREE_MODEL).unwrap();
        assert!(model.predict_proba(&[vec![0.1]]).is_err());
    }

    #[test]
    fn test_rejects_non_logistic_objective() {
        let json = TWO_TREE_MODEL.replace("binary:logistic", "reg:squarederror");
        assert!(BoostedTreeModel::from_json(&json).is_err());
    }

    #[test]
    fn test_rejects_unknown_split_feature() {
        let json = TWO_TREE_MODEL.replace(
            "\"split_indices\": [1, 0, 0]",
            "\"split_indices\": [7, 0, 0]",
        );
        assert!(BoostedTreeModel::from_json(&json).is_err());
    }

    #[test]
    fn test_parse_base_score_formats() {
        assert_relative_eq!(parse_base_score("5E-1").unwrap(), 0.5);
        assert_relative_eq!(parse_base_score("[2.5E-1]").unwrap(), 0.25);
        assert!(parse_base_score("1").is_err());
        assert!(parse_base_score("abc").is_err());
    }
}
