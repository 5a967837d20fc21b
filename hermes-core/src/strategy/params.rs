//! Strategy parameters: raw request values, declared schemas, validated sets.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A single parameter value as it arrives in a request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            ParamValue::Number(_) => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Number(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        ParamValue::Number(v as f64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Number(v) => write!(f, "{v}"),
        }
    }
}

/// Parse a CLI-style value: `true`/`false` or a number.
impl std::str::FromStr for ParamValue {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "true" => Ok(ParamValue::Bool(true)),
            "false" => Ok(ParamValue::Bool(false)),
            other => other
                .parse::<f64>()
                .map(ParamValue::Number)
                .map_err(|_| EngineError::validation(format!("invalid parameter value '{s}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    Int,
    Float,
    Bool,
}

/// Declared type and range of one strategy parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// When set, `min` itself is not allowed.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub exclusive_min: bool,
    pub default: ParamValue,
    pub description: &'static str,
}

impl ParamSpec {
    pub fn int(name: &'static str, default: i64, min: i64, max: i64, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Int,
            min: Some(min as f64),
            max: Some(max as f64),
            exclusive_min: false,
            default: ParamValue::Number(default as f64),
            description,
        }
    }

    pub fn float(name: &'static str, default: f64, min: f64, max: f64, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Float,
            min: Some(min),
            max: Some(max),
            exclusive_min: false,
            default: ParamValue::Number(default),
            description,
        }
    }

    pub fn flag(name: &'static str, default: bool, description: &'static str) -> Self {
        Self {
            name,
            kind: ParamKind::Bool,
            min: None,
            max: None,
            exclusive_min: false,
            default: ParamValue::Bool(default),
            description,
        }
    }

    pub fn exclusive_min(mut self) -> Self {
        self.exclusive_min = true;
        self
    }

    fn check(&self, strategy: &str, value: ParamValue) -> EngineResult<ParamValue> {
        let name = self.name;
        match (self.kind, value) {
            (ParamKind::Bool, ParamValue::Bool(_)) => Ok(value),
            (ParamKind::Bool, ParamValue::Number(_)) => Err(EngineError::validation(format!(
                "{strategy}: parameter '{name}' must be a boolean"
            ))),
            (_, ParamValue::Bool(_)) => Err(EngineError::validation(format!(
                "{strategy}: parameter '{name}' must be a number"
            ))),
            (kind, ParamValue::Number(v)) => {
                if !v.is_finite() {
                    return Err(EngineError::validation(format!(
                        "{strategy}: parameter '{name}' must be finite"
                    )));
                }
                if kind == ParamKind::Int && v.fract() != 0.0 {
                    return Err(EngineError::validation(format!(
                        "{strategy}: parameter '{name}' must be an integer, got {v}"
                    )));
                }
                if let Some(min) = self.min {
                    let below = if self.exclusive_min { v <= min } else { v < min };
                    if below {
                        let bound = if self.exclusive_min { ">" } else { ">=" };
                        return Err(EngineError::validation(format!(
                            "{strategy}: parameter '{name}' must be {bound} {min}, got {v}"
                        )));
                    }
                }
                if let Some(max) = self.max {
                    if v > max {
                        return Err(EngineError::validation(format!(
                            "{strategy}: parameter '{name}' must be <= {max}, got {v}"
                        )));
                    }
                }
                Ok(value)
            }
        }
    }
}

/// The full parameter schema of one strategy.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ParamSchema {
    specs: Vec<ParamSpec>,
}

impl ParamSchema {
    pub fn new(specs: Vec<ParamSpec>) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &[ParamSpec] {
        &self.specs
    }

    pub fn get(&self, name: &str) -> Option<&ParamSpec> {
        self.specs.iter().find(|s| s.name == name)
    }

    /// Check `raw` against the schema and fill omitted parameters with their
    /// defaults. Unknown names, wrong kinds and out-of-range values fail.
    pub fn validate(
        &self,
        strategy: &str,
        raw: &BTreeMap<String, ParamValue>,
    ) -> EngineResult<Params> {
        if let Some(unknown) = raw.keys().find(|k| self.get(k).is_none()) {
            let known: Vec<&str> = self.specs.iter().map(|s| s.name).collect();
            return Err(EngineError::validation(format!(
                "{strategy}: unknown parameter '{unknown}' (expected one of: {})",
                known.join(", ")
            )));
        }

        let mut values = BTreeMap::new();
        for spec in &self.specs {
            let value = match raw.get(spec.name) {
                Some(v) => spec.check(strategy, *v)?,
                None => spec.default,
            };
            values.insert(spec.name.to_string(), value);
        }
        Ok(Params { values })
    }
}

/// A complete, schema-checked parameter set. Every declared parameter is present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params {
    values: BTreeMap<String, ParamValue>,
}

impl Params {
    pub fn get(&self, name: &str) -> Option<ParamValue> {
        self.values.get(name).copied()
    }

    pub fn f64(&self, name: &str) -> EngineResult<f64> {
        self.get(name)
            .and_then(|v| v.as_f64())
            .ok_or_else(|| EngineError::validation(format!("missing numeric parameter '{name}'")))
    }

    pub fn usize(&self, name: &str) -> EngineResult<usize> {
        let v = self.f64(name)?;
        if v < 0.0 {
            return Err(EngineError::validation(format!(
                "parameter '{name}' must be non-negative"
            )));
        }
        Ok(v as usize)
    }

    pub fn bool(&self, name: &str) -> EngineResult<bool> {
        self.get(name)
            .and_then(|v| v.as_bool())
            .ok_or_else(|| EngineError::validation(format!("missing boolean parameter '{name}'")))
    }

    pub fn as_map(&self) -> &BTreeMap<String, ParamValue> {
        &self.values
    }
}

/// Strategy selection as it arrives in a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub strategy_name: String,
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl StrategyConfig {
    pub fn new(strategy_name: impl Into<String>) -> Self {
        Self {
            strategy_name: strategy_name.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> ParamSchema {
        ParamSchema::new(vec![
            ParamSpec::int("period", 14, 2, 1000, "lookback"),
            ParamSpec::float("k", 2.0, 0.0, 10.0, "width").exclusive_min(),
            ParamSpec::flag("strict", false, "strict mode"),
        ])
    }

    fn raw(pairs: &[(&str, ParamValue)]) -> BTreeMap<String, ParamValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn defaults_fill_omitted() {
        let p = schema().validate("x", &BTreeMap::new()).unwrap();
        assert_eq!(p.usize("period").unwrap(), 14);
        assert_eq!(p.f64("k").unwrap(), 2.0);
        assert!(!p.bool("strict").unwrap());
    }

    #[test]
    fn unknown_parameter_rejected() {
        let err = schema()
            .validate("x", &raw(&[("bogus", 1.0.into())]))
            .unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn range_and_kind_checks() {
        let s = schema();
        assert!(s.validate("x", &raw(&[("period", 1.0.into())])).is_err());
        assert!(s.validate("x", &raw(&[("period", 14.5.into())])).is_err());
        assert!(s.validate("x", &raw(&[("period", true.into())])).is_err());
        assert!(s.validate("x", &raw(&[("k", 0.0.into())])).is_err());
        assert!(s.validate("x", &raw(&[("k", 10.0.into())])).is_ok());
        assert!(s.validate("x", &raw(&[("strict", 1.0.into())])).is_err());
    }

    #[test]
    fn untagged_deserialization() {
        let m: BTreeMap<String, ParamValue> =
            serde_json::from_str(r#"{"a": 5, "b": 2.5, "c": true}"#).unwrap();
        assert_eq!(m["a"], ParamValue::Number(5.0));
        assert_eq!(m["b"], ParamValue::Number(2.5));
        assert_eq!(m["c"], ParamValue::Bool(true));
    }

    #[test]
    fn parse_cli_values() {
        assert_eq!("true".parse::<ParamValue>().unwrap(), ParamValue::Bool(true));
        assert_eq!("20".parse::<ParamValue>().unwrap(), ParamValue::Number(20.0));
        assert!("abc".parse::<ParamValue>().is_err());
    }
}
