//! Scenario discovery with classification trees (CART)
//!
//! Fits a binary tree over the uncertainty columns that separates rows of a
//! class of interest (e.g. SOWs where a decision has zero regret) from the
//! rest. Each leaf dominated by that class is a discovered scenario: a box
//! of uncertainty ranges, reported with its density and coverage.

use crate::domain::{DataSet, ModelSpec};
use crate::error::{RdmError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};

/// Tree growth limits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartConfig {
    /// Smallest number of rows allowed in a leaf
    pub min_samples_leaf: usize,
    /// Smallest node that may still be split
    pub min_samples_split: usize,
    /// Depth limit, unlimited when `None`
    pub max_depth: Option<usize>,
}

impl Default for CartConfig {
    fn default() -> Self {
        Self {
            min_samples_leaf: 50,
            min_samples_split: 2,
            max_depth: None,
        }
    }
}

/// Side of a split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleOp {
    LessEqual,
    Greater,
}

/// One bound on the path to a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub feature: String,
    pub op: RuleOp,
    pub threshold: f64,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            RuleOp::LessEqual => "<=",
            RuleOp::Greater => ">",
        };
        write!(f, "{} {} {:.6}", self.feature, op, self.threshold)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum NodeKind {
    Leaf,
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
struct Node {
    depth: usize,
    /// Rows per class
    counts: Vec<usize>,
    kind: NodeKind,
}

impl Node {
    fn samples(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Majority class; ties go to the lower class index
    fn majority(&self) -> usize {
        let mut best = 0;
        for (i, &c) in self.counts.iter().enumerate() {
            if c > self.counts[best] {
                best = i;
            }
        }
        best
    }
}

/// A leaf dominated by the class of interest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioNode {
    /// Pre-order node number
    pub node: usize,
    pub class: String,
    pub samples: usize,
    /// Share of the leaf's rows in the class
    pub density: f64,
    /// Share of all rows of the class that fall in the leaf
    pub coverage: f64,
    /// Bounds on the path from the root, outermost first
    pub rules: Vec<Rule>,
}

impl ScenarioNode {
    /// The scenario as a box: `(name, lower, upper)` per uncertainty,
    /// starting from each uncertainty's full range
    pub fn bounds(&self, spec: &ModelSpec) -> Vec<(String, f64, f64)> {
        spec.uncertainties
            .iter()
            .map(|u| {
                let (mut lo, mut hi) = u.bounds();
                for rule in self.rules.iter().filter(|r| r.feature == u.name) {
                    match rule.op {
                        RuleOp::LessEqual => hi = hi.min(rule.threshold),
                        RuleOp::Greater => lo = lo.max(rule.threshold),
                    }
                }
                (u.name.clone(), lo, hi)
            })
            .collect()
    }

    /// Only the uncertainties the rules restrict
    pub fn restricted_bounds(&self, spec: &ModelSpec) -> Vec<(String, f64, f64)> {
        self.bounds(spec)
            .into_iter()
            .filter(|(name, _, _)| self.rules.iter().any(|r| &r.feature == name))
            .collect()
    }
}

/// Fitted classification tree
#[derive(Debug, Clone)]
pub struct Cart {
    features: Vec<String>,
    classes: Vec<String>,
    nodes: Vec<Node>,
}

/// Candidate split found for one node
struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl Cart {
    /// Fit a tree predicting `labels` from the `features` columns of `data`
    pub fn fit(
        data: &DataSet,
        labels: &[String],
        features: &[String],
        config: &CartConfig,
    ) -> Result<Self> {
        if labels.len() != data.len() {
            return Err(RdmError::InvalidInput(format!(
                "{} labels for {} rows",
                labels.len(),
                data.len()
            )));
        }
        if data.is_empty() {
            return Err(RdmError::InvalidInput("cannot fit a tree to no rows".to_string()));
        }
        if features.is_empty() {
            return Err(RdmError::InvalidInput("no features to split on".to_string()));
        }
        if config.min_samples_leaf == 0 {
            return Err(RdmError::InvalidInput("min_samples_leaf must be at least 1".to_string()));
        }

        let columns = features
            .iter()
            .map(|f| data.column(f))
            .collect::<Result<Vec<_>>>()?;

        // Sorted so class indices do not depend on row order
        let mut classes: Vec<String> = labels.to_vec();
        classes.sort();
        classes.dedup();
        let targets: Vec<usize> = labels
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or_default())
            .collect();

        let mut builder = Builder {
            columns: &columns,
            targets: &targets,
            n_classes: classes.len(),
            config,
            nodes: Vec::new(),
        };
        let mut rows: Vec<usize> = (0..data.len()).collect();
        builder.grow(&mut rows, 0);

        let tree = Self {
            features: features.to_vec(),
            classes,
            nodes: builder.nodes,
        };
        tracing::debug!(
            nodes = tree.node_count(),
            leaves = tree.leaf_count(),
            "fitted classification tree"
        );
        Ok(tree)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Leaf)
            .count()
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn depth(&self) -> usize {
        self.nodes.iter().map(|n| n.depth).max().unwrap_or(0)
    }

    /// Predicted class for a row
    pub fn predict(&self, record: &crate::domain::Record) -> Result<&str> {
        let mut id = 0;
        loop {
            let node = &self.nodes[id];
            match node.kind {
                NodeKind::Leaf => return Ok(&self.classes[node.majority()]),
                NodeKind::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let name = &self.features[feature];
                    let value = record
                        .get(name)
                        .copied()
                        .ok_or_else(|| RdmError::UnknownColumn(name.clone()))?;
                    id = if value <= threshold { left } else { right };
                }
            }
        }
    }

    /// Leaves whose majority class is `class`, in node order
    pub fn scenarios(&self, class: &str) -> Result<Vec<ScenarioNode>> {
        let Some(target) = self.classes.iter().position(|c| c == class) else {
            return Err(RdmError::InvalidInput(format!("unknown class {class}")));
        };
        let total = self.nodes[0].counts[target];

        let mut out = Vec::new();
        let mut path = Vec::new();
        self.collect_scenarios(0, target, total, &mut path, &mut out);
        Ok(out)
    }

    fn collect_scenarios(
        &self,
        id: usize,
        target: usize,
        total: usize,
        path: &mut Vec<Rule>,
        out: &mut Vec<ScenarioNode>,
    ) {
        let node = &self.nodes[id];
        match node.kind {
            NodeKind::Leaf => {
                if node.majority() == target {
                    let samples = node.samples();
                    out.push(ScenarioNode {
                        node: id,
                        class: self.classes[target].clone(),
                        samples,
                        density: node.counts[target] as f64 / samples as f64,
                        coverage: if total == 0 {
                            0.0
                        } else {
                            node.counts[target] as f64 / total as f64
                        },
                        rules: path.clone(),
                    });
                }
            }
            NodeKind::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let name = self.features[feature].clone();
                path.push(Rule {
                    feature: name.clone(),
                    op: RuleOp::LessEqual,
                    threshold,
                });
                self.collect_scenarios(left, target, total, path, out);
                path.pop();

                path.push(Rule {
                    feature: name,
                    op: RuleOp::Greater,
                    threshold,
                });
                self.collect_scenarios(right, target, total, path, out);
                path.pop();
            }
        }
    }

    /// Indented text rendering of the tree
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_node(0, 0, &mut out);
        out
    }

    fn render_node(&self, id: usize, indent: usize, out: &mut String) {
        let node = &self.nodes[id];
        let prefix = "|   ".repeat(indent);
        match node.kind {
            NodeKind::Leaf => {
                let class = node.majority();
                let samples = node.samples();
                let _ = writeln!(
                    out,
                    "{prefix}|--- [{id}] class: {} (samples={}, density={:.2}%)",
                    self.classes[class],
                    samples,
                    100.0 * node.counts[class] as f64 / samples as f64
                );
            }
            NodeKind::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                let name = &self.features[feature];
                let _ = writeln!(out, "{prefix}|--- {name} <= {threshold:.6}");
                self.render_node(left, indent + 1, out);
                let _ = writeln!(out, "{prefix}|--- {name} >  {threshold:.6}");
                self.render_node(right, indent + 1, out);
            }
        }
    }
}

struct Builder<'a> {
    columns: &'a [Vec<f64>],
    targets: &'a [usize],
    n_classes: usize,
    config: &'a CartConfig,
    nodes: Vec<Node>,
}

impl Builder<'_> {
    /// Grow the subtree over `rows`, returning its node id
    fn grow(&mut self, rows: &mut [usize], depth: usize) -> usize {
        let counts = self.class_counts(rows);
        let id = self.nodes.len();
        self.nodes.push(Node {
            depth,
            counts: counts.clone(),
            kind: NodeKind::Leaf,
        });

        let n = rows.len();
        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        let depth_reached = self.config.max_depth.is_some_and(|d| depth >= d);
        if pure
            || depth_reached
            || n < self.config.min_samples_split
            || n < 2 * self.config.min_samples_leaf
        {
            return id;
        }

        let Some(split) = self.best_split(rows) else {
            return id;
        };

        let column = &self.columns[split.feature];
        rows.sort_by(|&a, &b| column[a].total_cmp(&column[b]));
        let cut = rows.partition_point(|&r| column[r] <= split.threshold);
        let (left_rows, right_rows) = rows.split_at_mut(cut);

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[id].kind = NodeKind::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    fn class_counts(&self, rows: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &r in rows {
            counts[self.targets[r]] += 1;
        }
        counts
    }

    /// Lowest weighted Gini split, taken even when it does not lower the
    /// parent's impurity
    fn best_split(&self, rows: &[usize]) -> Option<Split> {
        let n = rows.len();
        let min_leaf = self.config.min_samples_leaf;
        let total = self.class_counts(rows);
        let mut best: Option<Split> = None;

        let mut order: Vec<usize> = rows.to_vec();
        for (feature, column) in self.columns.iter().enumerate() {
            order.sort_by(|&a, &b| column[a].total_cmp(&column[b]));

            let mut left = vec![0usize; self.n_classes];
            for i in 0..n - 1 {
                left[self.targets[order[i]]] += 1;
                let n_left = i + 1;
                let n_right = n - n_left;
                if n_left < min_leaf {
                    continue;
                }
                if n_right < min_leaf {
                    break;
                }

                let here = column[order[i]];
                let next = column[order[i + 1]];
                if here == next {
                    continue;
                }

                let right: Vec<usize> = total.iter().zip(&left).map(|(t, l)| t - l).collect();
                let impurity = (n_left as f64 * gini(&left, n_left)
                    + n_right as f64 * gini(&right, n_right))
                    / n as f64;

                if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                    let mut threshold = here + (next - here) / 2.0;
                    if threshold >= next {
                        threshold = here;
                    }
                    best = Some(Split {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }

        best
    }
}

fn gini(counts: &[usize], n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / n;
            p * p
        })
        .sum::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Parameter, Record, Uncertainty};
    use approx::assert_relative_eq;

    /// Grid over x in [0, 1) and y in [0, 1); class A when x <= 0.3
    fn separable() -> (DataSet, Vec<String>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            for j in 0..20 {
                let x = i as f64 / 20.0;
                let y = j as f64 / 20.0;
                rows.push(
                    [("x".to_string(), x), ("y".to_string(), y)]
                        .into_iter()
                        .collect::<Record>(),
                );
                labels.push(if x <= 0.3 { "A" } else { "B" }.to_string());
            }
        }
        (DataSet::from_rows(rows), labels)
    }

    fn features() -> Vec<String> {
        vec!["x".to_string(), "y".to_string()]
    }

    #[test]
    fn test_finds_separating_split() {
        let (data, labels) = separable();
        let config = CartConfig {
            min_samples_leaf: 10,
            ..Default::default()
        };
        let tree = Cart::fit(&data, &labels, &features(), &config).unwrap();

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.leaf_count(), 2);

        let scenarios = tree.scenarios("A").unwrap();
        assert_eq!(scenarios.len(), 1);
        let s = &scenarios[0];
        assert_eq!(s.node, 1);
        assert_relative_eq!(s.density, 1.0);
        assert_relative_eq!(s.coverage, 1.0);
        assert_eq!(s.rules.len(), 1);
        assert_eq!(s.rules[0].feature, "x");
        assert_eq!(s.rules[0].op, RuleOp::LessEqual);
        assert_relative_eq!(s.rules[0].threshold, 0.325, epsilon = 1e-12);
    }

    #[test]
    fn test_min_samples_leaf_limits_growth() {
        let (data, labels) = separable();
        // A has 140 rows; leaves must hold at least 150
        let config = CartConfig {
            min_samples_leaf: 150,
            ..Default::default()
        };
        let tree = Cart::fit(&data, &labels, &features(), &config).unwrap();
        assert!(tree.nodes.iter().all(|n| n.samples() >= 150));
    }

    #[test]
    fn test_single_class_gives_single_leaf() {
        let (data, _) = separable();
        let labels = vec!["A".to_string(); data.len()];
        let tree = Cart::fit(&data, &labels, &features(), &CartConfig::default()).unwrap();
        assert_eq!(tree.node_count(), 1);

        let scenarios = tree.scenarios("A").unwrap();
        assert_eq!(scenarios.len(), 1);
        assert!(scenarios[0].rules.is_empty());
        assert!(tree.scenarios("B").is_err());
    }

    #[test]
    fn test_predict_follows_splits() {
        let (data, labels) = separable();
        let config = CartConfig {
            min_samples_leaf: 10,
            ..Default::default()
        };
        let tree = Cart::fit(&data, &labels, &features(), &config).unwrap();

        let row: Record = [("x".to_string(), 0.1), ("y".to_string(), 0.9)]
            .into_iter()
            .collect();
        assert_eq!(tree.predict(&row).unwrap(), "A");
        let row: Record = [("x".to_string(), 0.8), ("y".to_string(), 0.1)]
            .into_iter()
            .collect();
        assert_eq!(tree.predict(&row).unwrap(), "B");
    }

    #[test]
    fn test_splits_without_impurity_gain() {
        let (data, _) = separable();
        // No single cut lowers the impurity of a checkerboard
        let labels: Vec<String> = data
            .iter()
            .map(|r| if (r["x"] < 0.5) ^ (r["y"] < 0.5) { "A" } else { "B" }.to_string())
            .collect();
        let config = CartConfig {
            min_samples_leaf: 1,
            ..Default::default()
        };
        let tree = Cart::fit(&data, &labels, &features(), &config).unwrap();

        assert!(tree.node_count() > 1);
        for (row, label) in data.iter().zip(&labels) {
            assert_eq!(tree.predict(row).unwrap(), label);
        }
    }

    #[test]
    fn test_max_depth() {
        let (data, _) = separable();
        // Checkerboard needs depth > 1
        let labels: Vec<String> = data
            .iter()
            .map(|r| if (r["x"] < 0.5) ^ (r["y"] < 0.5) { "A" } else { "B" }.to_string())
            .collect();
        let config = CartConfig {
            min_samples_leaf: 5,
            max_depth: Some(1),
            ..Default::default()
        };
        let tree = Cart::fit(&data, &labels, &features(), &config).unwrap();
        assert!(tree.depth() <= 1);
    }

    #[test]
    fn test_scenario_bounds() {
        let (data, labels) = separable();
        let config = CartConfig {
            min_samples_leaf: 10,
            ..Default::default()
        };
        let tree = Cart::fit(&data, &labels, &features(), &config).unwrap();
        let scenario = &tree.scenarios("A").unwrap()[0];

        let spec = ModelSpec::new()
            .with_parameters(vec![Parameter::new("x"), Parameter::new("y")])
            .with_uncertainties(vec![
                Uncertainty::uniform("x", 0.0, 1.0),
                Uncertainty::uniform("y", 0.0, 1.0),
            ]);
        let bounds = scenario.bounds(&spec);
        assert_eq!(bounds[0].0, "x");
        assert_relative_eq!(bounds[0].1, 0.0);
        assert_relative_eq!(bounds[0].2, 0.325, epsilon = 1e-12);
        assert_relative_eq!(bounds[1].2, 1.0);

        assert_eq!(scenario.restricted_bounds(&spec).len(), 1);
    }

    #[test]
    fn test_render_lists_every_leaf() {
        let (data, labels) = separable();
        let config = CartConfig {
            min_samples_leaf: 10,
            ..Default::default()
        };
        let tree = Cart::fit(&data, &labels, &features(), &config).unwrap();
        let text = tree.render();
        assert_eq!(text.matches("class:").count(), tree.leaf_count());
        assert!(text.contains("x <= 0.325000"));
    }

    #[test]
    fn test_label_count_mismatch() {
        let (data, _) = separable();
        let labels = vec!["A".to_string(); 3];
        assert!(Cart::fit(&data, &labels, &features(), &CartConfig::default()).is_err());
    }
}
