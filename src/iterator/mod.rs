//! Input configuration iteration
//!
//! Expands the declared input groups of a [`BenchConfig`] into concrete
//! [`RequestConfig`]s, one per point of each group's `batch_size x
//! pooling_factor` product. The build-time parameters (table count, rows,
//! dims, weighting, precision) are fixed for every point.
//!
//! Every item carries an id `"{var_id}_{config_id}"`: the group position and
//! the position inside that group's product.
//!
//! # Example
//!
//! ```
//! use embpulse::config::toml::parse_toml_string;
//! use embpulse::iterator::InputIterator;
//!
//! let config = parse_toml_string(r#"
//! [build]
//! num_tables = 1
//! rows = 1000
//! dims = 64
//!
//! [[input]]
//! args = [{ __list__ = [32, 64] }, { __list__ = [4, 8] }]
//! "#).unwrap();
//!
//! let ids: Vec<String> = InputIterator::new(&config).unwrap().map(|(id, _)| id).collect();
//! assert_eq!(ids, ["0_0", "0_1", "0_2", "0_3"]);
//! ```

pub mod axis;

use crate::config::workload::SparseType;
use crate::config::BenchConfig;
use crate::error::ConfigError;
use crate::request::source::TensorOverrides;
use crate::request::RequestConfig;
use crate::Result;
use axis::CartesianProduct;
use tracing::debug;

/// Axes each input group must declare
const INPUT_AXES: usize = 2;

/// Input group with its axes expanded and checked
#[derive(Debug, Clone)]
struct ExpandedGroup {
    batch_sizes: Vec<u64>,
    pooling_factors: Vec<Vec<u64>>,
    overrides: TensorOverrides,
}

/// Lazy iterator over `(id, RequestConfig)` pairs
///
/// All axes are expanded and checked up front, so iteration itself cannot
/// fail. Construct a new iterator to start over.
#[derive(Debug, Clone)]
pub struct InputIterator {
    num_tables: usize,
    rows: Vec<u64>,
    dims: Vec<u64>,
    weighted: bool,
    weights_precision: SparseType,
    groups: Vec<ExpandedGroup>,
    var_id: usize,
    config_id: usize,
    current: Option<CartesianProduct>,
}

impl InputIterator {
    pub fn new(config: &BenchConfig) -> Result<Self> {
        let build = &config.build;
        let num_tables = build.num_tables;
        let rows = build.rows.resolve("rows", num_tables)?;
        let dims = build.dims.resolve("dims", num_tables)?;

        let mut groups = Vec::with_capacity(config.input.len());
        for (index, group) in config.input.iter().enumerate() {
            if group.args.len() != INPUT_AXES {
                return Err(ConfigError::AxisCount {
                    group: index,
                    expected: INPUT_AXES,
                    found: group.args.len(),
                }
                .into());
            }

            let batch_sizes = group.args[0]
                .spec()
                .expand()?
                .iter()
                .map(|v| v.as_scalar("batch_size"))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            let pooling_factors = group.args[1]
                .spec()
                .expand()?
                .iter()
                .map(|v| v.resolve("pooling_factor", num_tables))
                .collect::<std::result::Result<Vec<_>, _>>()?;

            groups.push(ExpandedGroup {
                batch_sizes,
                pooling_factors,
                overrides: group.tensor_overrides(),
            });
        }

        Ok(Self {
            num_tables,
            rows,
            dims,
            weighted: build.weighted,
            weights_precision: build.weights_precision,
            groups,
            var_id: 0,
            config_id: 0,
            current: None,
        })
    }

    /// Total number of configurations this iterator yields from the start
    pub fn total(&self) -> usize {
        self.groups
            .iter()
            .map(|g| {
                CartesianProduct::new(vec![g.batch_sizes.len(), g.pooling_factors.len()]).size()
            })
            .sum()
    }
}

impl Iterator for InputIterator {
    type Item = (String, RequestConfig);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(product) = self.current.as_mut() {
                if let Some(point) = product.next() {
                    let group = &self.groups[self.var_id];
                    let config = RequestConfig {
                        num_tables: self.num_tables,
                        rows: self.rows.clone(),
                        dims: self.dims.clone(),
                        batch_size: group.batch_sizes[point[0]],
                        pooling_factors: group.pooling_factors[point[1]].clone(),
                        weighted: self.weighted,
                        weights_precision: self.weights_precision,
                        overrides: group.overrides.clone(),
                    };
                    let id = format!("{}_{}", self.var_id, self.config_id);
                    self.config_id += 1;
                    debug!(%id, ?config, "Input config");
                    return Some((id, config));
                }
                self.current = None;
                self.var_id += 1;
                self.config_id = 0;
            }

            let group = self.groups.get(self.var_id)?;
            self.current = Some(CartesianProduct::new(vec![
                group.batch_sizes.len(),
                group.pooling_factors.len(),
            ]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml::parse_toml_string;
    use std::collections::HashSet;

    fn config(body: &str) -> BenchConfig {
        let text = format!(
            "[build]\nnum_tables = 2\nrows = [100, 200]\ndims = [8, 16]\nweighted = true\n{}",
            body
        );
        parse_toml_string(&text).unwrap()
    }

    #[test]
    fn test_product_yields_four_unique_ids() {
        let cfg = config("[[input]]\nargs = [{ __list__ = [32, 64] }, { __list__ = [4, 8] }]\n");
        let items: Vec<_> = InputIterator::new(&cfg).unwrap().collect();

        assert_eq!(items.len(), 4);
        let ids: HashSet<&str> = items.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids.len(), 4);

        let shapes: Vec<(u64, Vec<u64>)> = items
            .iter()
            .map(|(_, c)| (c.batch_size, c.pooling_factors.clone()))
            .collect();
        assert_eq!(
            shapes,
            vec![
                (32, vec![4, 4]),
                (32, vec![8, 8]),
                (64, vec![4, 4]),
                (64, vec![8, 8]),
            ]
        );
    }

    #[test]
    fn test_build_parameters_are_fixed() {
        let cfg = config("[[input]]\nargs = [{ __range__ = [1, 3] }, [2, 5]]\n");
        for (_, request) in InputIterator::new(&cfg).unwrap() {
            assert_eq!(request.num_tables, 2);
            assert_eq!(request.rows, vec![100, 200]);
            assert_eq!(request.dims, vec![8, 16]);
            assert!(request.weighted);
            assert_eq!(request.pooling_factors, vec![2, 5]);
        }
    }

    #[test]
    fn test_ids_per_group() {
        let cfg = config(
            "[[input]]\nargs = [{ __list__ = [1, 2] }, 4]\n\n[[input]]\nargs = [8, { __list__ = [1, 2, 3] }]\n",
        );
        let iter = InputIterator::new(&cfg).unwrap();
        assert_eq!(iter.total(), 5);

        let ids: Vec<String> = iter.map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["0_0", "0_1", "1_0", "1_1", "1_2"]);
    }

    #[test]
    fn test_total_counts_empty_axis_as_zero() {
        let cfg = config(
            "[[input]]\nargs = [{ __list__ = [] }, 4]\n\n[[input]]\nargs = [{ __list__ = [1, 2] }, { __range__ = [2, 6, 2] }]\n",
        );
        let iter = InputIterator::new(&cfg).unwrap();
        assert_eq!(iter.total(), 6);
        assert_eq!(iter.count(), 6);
    }

    #[test]
    fn test_exhaustion_and_restart() {
        let cfg = config("[[input]]\nargs = [16, 4]\n");
        let mut iter = InputIterator::new(&cfg).unwrap();
        assert!(iter.next().is_some());
        assert!(iter.next().is_none());
        assert!(iter.next().is_none());

        assert_eq!(InputIterator::new(&cfg).unwrap().count(), 1);
    }

    #[test]
    fn test_missing_axis_fails_fast() {
        let cfg = config("[[input]]\nargs = [16]\n");
        let err = InputIterator::new(&cfg).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::AxisCount {
                group: 0,
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_per_table_pooling_length_checked() {
        let cfg = config("[[input]]\nargs = [16, [1, 2, 3]]\n");
        assert!(InputIterator::new(&cfg).is_err());
    }

    #[test]
    fn test_batch_size_must_be_scalar() {
        let cfg = config("[[input]]\nargs = [[16, 32], 4]\n");
        assert!(InputIterator::new(&cfg).is_err());
    }

    #[test]
    fn test_overrides_carried_to_requests() {
        let cfg = config(
            "[[input]]\nargs = [2, 3]\nindices_tensor = \"i.bin\"\noffsets_tensor = \"o.bin\"\n",
        );
        let (_, request) = InputIterator::new(&cfg).unwrap().next().unwrap();
        assert_eq!(request.overrides.indices_tensor, Some("i.bin".into()));
        assert_eq!(request.overrides.offsets_tensor, Some("o.bin".into()));
        assert_eq!(request.overrides.weights_tensor, None);
    }

    #[test]
    fn test_pooling_axis_overrides_carried_to_requests() {
        let cfg = config(
            "[[input]]\nweights_tensor = \"group_w.bin\"\nargs = [2, { value = 3, indices_tensor = \"i.bin\", offsets_tensor = \"o.bin\", weights_tensor = \"w.bin\" }]\n",
        );
        let (_, request) = InputIterator::new(&cfg).unwrap().next().unwrap();
        assert_eq!(request.pooling_factors, vec![3, 3]);
        assert_eq!(request.overrides.indices_tensor, Some("i.bin".into()));
        assert_eq!(request.overrides.offsets_tensor, Some("o.bin".into()));
        assert_eq!(request.overrides.weights_tensor, Some("group_w.bin".into()));
    }
}
