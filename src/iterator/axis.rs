//! Declarative axis specs and their cartesian product

use crate::error::ConfigError;
use crate::request::source::TensorOverrides;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One concrete axis value: a scalar, or one value per table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisValue {
    Scalar(u64),
    PerTable(Vec<u64>),
}

impl AxisValue {
    /// Value as a single number
    pub fn as_scalar(&self, field: &'static str) -> Result<u64, ConfigError> {
        match self {
            AxisValue::Scalar(v) => Ok(*v),
            AxisValue::PerTable(_) => Err(ConfigError::NotScalar { field }),
        }
    }

    /// Value as one entry per table
    ///
    /// A scalar is broadcast to every table; a single table always resolves
    /// to a length-1 list.
    pub fn resolve(&self, field: &'static str, num_tables: usize) -> Result<Vec<u64>, ConfigError> {
        match self {
            AxisValue::Scalar(v) => Ok(vec![*v; num_tables]),
            AxisValue::PerTable(values) if values.len() == num_tables => Ok(values.clone()),
            AxisValue::PerTable(values) => Err(ConfigError::TableCount {
                field,
                expected: num_tables,
                found: values.len(),
            }),
        }
    }
}

impl fmt::Display for AxisValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisValue::Scalar(v) => write!(f, "{}", v),
            AxisValue::PerTable(values) => write!(f, "{:?}", values),
        }
    }
}

/// Declared axis of the input product
///
/// In TOML: a literal (`32` or `[4, 8]`), `{ value = 32 }`,
/// `{ __range__ = [32, 128, 32] }` or `{ __list__ = [4, 8, 16] }`. Ranges
/// include `stop`; `step` defaults to 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisSpec {
    Range {
        #[serde(rename = "__range__")]
        range: Vec<u64>,
    },
    List {
        #[serde(rename = "__list__")]
        values: Vec<AxisValue>,
    },
    Value {
        value: AxisValue,
    },
    Literal(AxisValue),
}

/// Axis entry of an input group
///
/// The table forms may carry tensor paths next to the axis keys, e.g.
/// `{ value = 4, indices_tensor = "i.bin", offsets_tensor = "o.bin" }`.
/// Unrelated keys such as `type` are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisArg {
    Annotated {
        #[serde(flatten)]
        spec: AxisSpec,
        #[serde(flatten)]
        overrides: TensorOverrides,
    },
    Plain(AxisSpec),
}

impl AxisArg {
    pub fn spec(&self) -> &AxisSpec {
        match self {
            AxisArg::Annotated { spec, .. } | AxisArg::Plain(spec) => spec,
        }
    }

    pub fn overrides(&self) -> Option<&TensorOverrides> {
        match self {
            AxisArg::Annotated { overrides, .. } => Some(overrides),
            AxisArg::Plain(_) => None,
        }
    }
}

impl From<AxisSpec> for AxisArg {
    fn from(spec: AxisSpec) -> Self {
        AxisArg::Plain(spec)
    }
}

impl AxisSpec {
    /// Concrete values of this axis in declaration order
    pub fn expand(&self) -> Result<Vec<AxisValue>, ConfigError> {
        match self {
            AxisSpec::Literal(value) | AxisSpec::Value { value } => Ok(vec![value.clone()]),
            AxisSpec::List { values } => Ok(values.clone()),
            AxisSpec::Range { range } => {
                let (start, stop, step) = match range.as_slice() {
                    [start, stop] => (*start, *stop, 1),
                    [start, stop, step] => (*start, *stop, *step),
                    _ => return Err(ConfigError::InvalidRange(range.clone())),
                };
                if step == 0 {
                    return Err(ConfigError::InvalidRange(range.clone()));
                }
                Ok((start..=stop)
                    .step_by(step as usize)
                    .map(AxisValue::Scalar)
                    .collect())
            }
        }
    }
}

/// Odometer over axis positions, last axis fastest
///
/// Yields one `Vec<usize>` of positions per point of the product. Any empty
/// axis makes the product empty.
#[derive(Debug, Clone)]
pub struct CartesianProduct {
    lengths: Vec<usize>,
    cursor: Vec<usize>,
    done: bool,
}

impl CartesianProduct {
    pub fn new(lengths: Vec<usize>) -> Self {
        let done = lengths.is_empty() || lengths.iter().any(|&len| len == 0);
        let cursor = vec![0; lengths.len()];
        Self {
            lengths,
            cursor,
            done,
        }
    }

    /// Number of points in the product
    pub fn size(&self) -> usize {
        if self.lengths.is_empty() {
            0
        } else {
            self.lengths.iter().product()
        }
    }
}

impl Iterator for CartesianProduct {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let point = self.cursor.clone();
        for axis in (0..self.lengths.len()).rev() {
            self.cursor[axis] += 1;
            if self.cursor[axis] < self.lengths[axis] {
                return Some(point);
            }
            self.cursor[axis] = 0;
        }
        self.done = true;
        Some(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_and_list_expand() {
        let literal = AxisSpec::Literal(AxisValue::Scalar(32));
        assert_eq!(literal.expand().unwrap(), vec![AxisValue::Scalar(32)]);

        let per_table = AxisSpec::Literal(AxisValue::PerTable(vec![4, 8]));
        assert_eq!(per_table.expand().unwrap().len(), 1);

        let list = AxisSpec::List {
            values: vec![AxisValue::Scalar(4), AxisValue::Scalar(8)],
        };
        assert_eq!(list.expand().unwrap().len(), 2);
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = AxisSpec::Range {
            range: vec![32, 128, 32],
        };
        let values: Vec<u64> = range
            .expand()
            .unwrap()
            .iter()
            .map(|v| v.as_scalar("batch_size").unwrap())
            .collect();
        assert_eq!(values, vec![32, 64, 96, 128]);

        let unit_step = AxisSpec::Range { range: vec![1, 3] };
        assert_eq!(unit_step.expand().unwrap().len(), 3);
    }

    #[test]
    fn test_range_rejects_bad_shape() {
        assert!(AxisSpec::Range { range: vec![1, 4, 0] }.expand().is_err());
        assert!(AxisSpec::Range { range: vec![1] }.expand().is_err());
    }

    #[test]
    fn test_axis_spec_from_toml() {
        #[derive(Deserialize)]
        struct Holder {
            args: Vec<AxisSpec>,
        }

        let holder: Holder = ::toml::from_str(
            "args = [32, [4, 8], { __range__ = [1, 2] }, { __list__ = [3, [1, 2]] }]",
        )
        .unwrap();
        assert_eq!(holder.args[0], AxisSpec::Literal(AxisValue::Scalar(32)));
        assert_eq!(holder.args[1], AxisSpec::Literal(AxisValue::PerTable(vec![4, 8])));
        assert_eq!(holder.args[2], AxisSpec::Range { range: vec![1, 2] });
        assert_eq!(
            holder.args[3],
            AxisSpec::List {
                values: vec![AxisValue::Scalar(3), AxisValue::PerTable(vec![1, 2])]
            }
        );
    }

    #[test]
    fn test_axis_arg_carries_tensor_paths() {
        #[derive(Deserialize)]
        struct Holder {
            args: Vec<AxisArg>,
        }

        let holder: Holder = serde_json::from_str(
            r#"{ "args": [
                32,
                { "type": "int", "value": 4, "indices_tensor": "i.bin", "offsets_tensor": "o.bin" },
                { "__list__": [1, 2], "weights_tensor": "w.bin" }
            ] }"#,
        )
        .unwrap();

        assert_eq!(holder.args[0].spec(), &AxisSpec::Literal(AxisValue::Scalar(32)));
        assert!(holder.args[0].overrides().map_or(true, |o| o == &TensorOverrides::default()));

        assert_eq!(
            holder.args[1].spec(),
            &AxisSpec::Value {
                value: AxisValue::Scalar(4)
            }
        );
        let overrides = holder.args[1].overrides().unwrap();
        assert_eq!(overrides.indices_tensor, Some("i.bin".into()));
        assert_eq!(overrides.offsets_tensor, Some("o.bin".into()));
        assert_eq!(holder.args[1].spec().expand().unwrap(), vec![AxisValue::Scalar(4)]);

        assert_eq!(holder.args[2].spec().expand().unwrap().len(), 2);
        assert_eq!(
            holder.args[2].overrides().unwrap().weights_tensor,
            Some("w.bin".into())
        );
    }

    #[test]
    fn test_resolve_per_table() {
        assert_eq!(AxisValue::Scalar(7).resolve("rows", 3).unwrap(), vec![7, 7, 7]);
        assert_eq!(AxisValue::Scalar(7).resolve("rows", 1).unwrap(), vec![7]);
        assert_eq!(
            AxisValue::PerTable(vec![1, 2]).resolve("rows", 3).unwrap_err(),
            ConfigError::TableCount {
                field: "rows",
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn test_product_order() {
        let points: Vec<Vec<usize>> = CartesianProduct::new(vec![2, 3]).collect();
        assert_eq!(
            points,
            vec![
                vec![0, 0],
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 1],
                vec![1, 2]
            ]
        );
    }

    #[test]
    fn test_product_empty_axis() {
        let product = CartesianProduct::new(vec![2, 0]);
        assert_eq!(product.size(), 0);
        assert_eq!(product.count(), 0);
    }
}
