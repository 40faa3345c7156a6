//! Model description: parameters, responses, levers and uncertainties

use super::dataset::Record;
use super::uncertainty::Uncertainty;
use crate::error::{RdmError, Result};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A model input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Used when a SOW does not set the parameter
    #[serde(default)]
    pub default_value: Option<f64>,
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_value: None,
        }
    }

    pub fn with_default(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            default_value: Some(value),
        }
    }
}

/// Optimisation sense of a response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Reported but not optimised
    Info,
    Minimize,
    Maximize,
}

/// A model output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub name: String,
    pub direction: Direction,
}

impl Response {
    pub fn new(name: impl Into<String>, direction: Direction) -> Self {
        Self {
            name: name.into(),
            direction,
        }
    }

    pub fn info(name: impl Into<String>) -> Self {
        Self::new(name, Direction::Info)
    }

    pub fn minimize(name: impl Into<String>) -> Self {
        Self::new(name, Direction::Minimize)
    }

    pub fn maximize(name: impl Into<String>) -> Self {
        Self::new(name, Direction::Maximize)
    }
}

/// Values a lever can take
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LeverKind {
    /// `length` evenly spaced values from `min` to `max`
    Real { min: f64, max: f64, length: usize },
    /// Every integer in `min..=max`
    Integer { min: i64, max: i64 },
    Categorical { levels: Vec<f64> },
}

/// A decision variable under the analyst's control
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lever {
    pub name: String,
    pub kind: LeverKind,
}

impl Lever {
    pub fn real(name: impl Into<String>, min: f64, max: f64, length: usize) -> Self {
        Self {
            name: name.into(),
            kind: LeverKind::Real { min, max, length },
        }
    }

    pub fn integer(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self {
            name: name.into(),
            kind: LeverKind::Integer { min, max },
        }
    }

    pub fn categorical(name: impl Into<String>, levels: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            kind: LeverKind::Categorical { levels },
        }
    }

    /// All admissible values in ascending order of definition
    pub fn levels(&self) -> Vec<f64> {
        match &self.kind {
            LeverKind::Real { min, max, length } => match *length {
                0 => Vec::new(),
                1 => vec![*min],
                n => (0..n)
                    .map(|i| min + (max - min) * i as f64 / (n - 1) as f64)
                    .collect(),
            },
            LeverKind::Integer { min, max } => (*min..=*max).map(|v| v as f64).collect(),
            LeverKind::Categorical { levels } => levels.clone(),
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        match &self.kind {
            LeverKind::Real { min, max, .. } => (*min..=*max).contains(&value),
            LeverKind::Integer { min, max } => {
                value.fract() == 0.0 && (*min as f64..=*max as f64).contains(&value)
            }
            LeverKind::Categorical { levels } => levels.contains(&value),
        }
    }
}

/// Everything an analysis needs to know about a model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub parameters: Vec<Parameter>,
    pub responses: Vec<Response>,
    pub levers: Vec<Lever>,
    pub uncertainties: Vec<Uncertainty>,
}

impl ModelSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameters(mut self, parameters: Vec<Parameter>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_responses(mut self, responses: Vec<Response>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_levers(mut self, levers: Vec<Lever>) -> Self {
        self.levers = levers;
        self
    }

    pub fn with_uncertainties(mut self, uncertainties: Vec<Uncertainty>) -> Self {
        self.uncertainties = uncertainties;
        self
    }

    /// Check names are unique and every lever and uncertainty is a parameter
    pub fn validate(&self) -> Result<()> {
        fn unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
            let mut seen = HashSet::new();
            for name in names {
                if name.is_empty() {
                    return Err(RdmError::InvalidSpec(format!("empty {kind} name")));
                }
                if !seen.insert(name) {
                    return Err(RdmError::InvalidSpec(format!("duplicate {kind}: {name}")));
                }
            }
            Ok(())
        }

        unique("parameter", self.parameters.iter().map(|p| p.name.as_str()))?;
        unique("response", self.responses.iter().map(|r| r.name.as_str()))?;
        unique("lever", self.levers.iter().map(|l| l.name.as_str()))?;
        unique("uncertainty", self.uncertainties.iter().map(|u| u.name.as_str()))?;

        let params: HashSet<&str> = self.parameters.iter().map(|p| p.name.as_str()).collect();
        for name in self
            .levers
            .iter()
            .map(|l| l.name.as_str())
            .chain(self.uncertainties.iter().map(|u| u.name.as_str()))
        {
            if !params.contains(name) {
                return Err(RdmError::InvalidSpec(format!(
                    "{name} is a lever or uncertainty but not a parameter"
                )));
            }
        }

        for lever in &self.levers {
            if lever.levels().is_empty() {
                return Err(RdmError::InvalidSpec(format!("lever {} has no levels", lever.name)));
            }
        }

        for uncertainty in &self.uncertainties {
            uncertainty.validate()?;
        }
        Ok(())
    }

    pub fn uncertainty(&self, name: &str) -> Option<&Uncertainty> {
        self.uncertainties.iter().find(|u| u.name == name)
    }

    pub fn lever(&self, name: &str) -> Option<&Lever> {
        self.levers.iter().find(|l| l.name == name)
    }

    pub fn uncertainty_names(&self) -> Vec<String> {
        self.uncertainties.iter().map(|u| u.name.clone()).collect()
    }

    pub fn response_names(&self) -> Vec<String> {
        self.responses.iter().map(|r| r.name.clone()).collect()
    }

    /// Parameter defaults, for filling inputs a SOW leaves unset
    pub fn defaults(&self) -> Record {
        self.parameters
            .iter()
            .filter_map(|p| p.default_value.map(|v| (p.name.clone(), v)))
            .collect()
    }

    /// Check that every lever set in `policy` exists and admits the value
    pub fn check_policy(&self, policy: &Record) -> Result<()> {
        for (name, &value) in policy {
            let lever = self
                .lever(name)
                .ok_or_else(|| RdmError::InvalidInput(format!("{name} is not a lever")))?;
            if !lever.contains(value) {
                return Err(RdmError::InvalidInput(format!(
                    "lever {name} does not admit {value}"
                )));
            }
        }
        Ok(())
    }
}

/// A model that can be evaluated in one state of the world
///
/// `evaluate` receives the SOW's inputs (uncertainties, levers and defaults)
/// and returns its responses. Each call gets its own seeded RNG so stochastic
/// models stay reproducible under parallel evaluation.
pub trait Model: Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn spec(&self) -> &ModelSpec;

    fn evaluate(&self, inputs: &Record, rng: &mut StdRng) -> std::result::Result<Record, Self::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spec() -> ModelSpec {
        ModelSpec::new()
            .with_parameters(vec![
                Parameter::new("decision"),
                Parameter::with_default("rate", 0.06),
                Parameter::new("price"),
            ])
            .with_responses(vec![Response::maximize("npv")])
            .with_levers(vec![Lever::real("decision", 0.0, 1.0, 2)])
            .with_uncertainties(vec![Uncertainty::uniform("price", 10.0, 20.0)])
    }

    #[test]
    fn test_real_lever_levels() {
        let lever = Lever::real("x", 0.0, 1.0, 2);
        assert_eq!(lever.levels(), vec![0.0, 1.0]);

        let lever = Lever::real("x", 0.0, 1.0, 5);
        let levels = lever.levels();
        assert_eq!(levels.len(), 5);
        assert_relative_eq!(levels[2], 0.5);
        assert!(lever.contains(0.3));
        assert!(!lever.contains(1.5));
    }

    #[test]
    fn test_integer_lever() {
        let lever = Lever::integer("y", 2030, 2032);
        assert_eq!(lever.levels(), vec![2030.0, 2031.0, 2032.0]);
        assert!(lever.contains(2031.0));
        assert!(!lever.contains(2031.5));
    }

    #[test]
    fn test_valid_spec() {
        assert!(spec().validate().is_ok());
        assert_eq!(spec().defaults().get("rate"), Some(&0.06));
        assert_eq!(spec().uncertainty_names(), vec!["price".to_string()]);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut s = spec();
        s.parameters.push(Parameter::new("price"));
        assert!(matches!(s.validate(), Err(RdmError::InvalidSpec(_))));
    }

    #[test]
    fn test_uncertainty_must_be_parameter() {
        let mut s = spec();
        s.uncertainties.push(Uncertainty::uniform("ghost", 0.0, 1.0));
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_check_policy() {
        let s = spec();
        let ok: Record = [("decision".to_string(), 1.0)].into_iter().collect();
        assert!(s.check_policy(&ok).is_ok());

        let bad: Record = [("decision".to_string(), 3.0)].into_iter().collect();
        assert!(s.check_policy(&bad).is_err());

        let unknown: Record = [("price".to_string(), 3.0)].into_iter().collect();
        assert!(s.check_policy(&unknown).is_err());
    }
}
