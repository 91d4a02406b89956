//! Name -> factory registry
//!
//! The bench loop finds its input iterator, data generator and operator by
//! name. [`Registry::global`] is the process-wide instance holding the
//! built-in entries; tests build their own with [`Registry::builtin`] or
//! [`Registry::empty`] and register replacements.

use crate::config::{BenchConfig, RunConfig};
use crate::iterator::InputIterator;
use crate::operator::reference::ReferenceOperator;
use crate::operator::{EmbeddingBagOperator, KernelFactory, OperatorSpec};
use crate::request::generator::{DataGenerator, SplitTableInputDataGenerator};
use crate::request::RequestConfig;
use crate::Result;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

pub const INPUT_ITERATOR: &str = "SplitTableBatchedEmbeddingInputIterator";
pub const DATA_GENERATOR: &str = "SplitTableBatchedEmbeddingInputDataGenerator";
pub const OPERATOR: &str = "split_table_batched_embedding_bags";

/// Stream of `(id, config)` pairs
pub type ConfigIter = Box<dyn Iterator<Item = (String, RequestConfig)>>;

pub type IteratorFactory = fn(&BenchConfig) -> Result<ConfigIter>;
pub type GeneratorFactory = fn(&RunConfig) -> Box<dyn DataGenerator>;

#[derive(Default)]
pub struct Registry {
    iterators: BTreeMap<String, IteratorFactory>,
    generators: BTreeMap<String, GeneratorFactory>,
    operators: BTreeMap<String, KernelFactory>,
}

impl Registry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry holding the built-in iterator, generator and operator
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register_iterator(INPUT_ITERATOR, |config| {
            Ok(Box::new(InputIterator::new(config)?) as ConfigIter)
        });
        registry.register_generator(DATA_GENERATOR, |run| {
            Box::new(SplitTableInputDataGenerator::new(run))
        });
        registry.register_operator(
            OPERATOR,
            Arc::new(|spec: &OperatorSpec| {
                Ok(Box::new(ReferenceOperator::new(spec)?) as Box<dyn EmbeddingBagOperator>)
            }),
        );
        registry
    }

    /// Process-wide registry, built on first use
    pub fn global() -> &'static Registry {
        static GLOBAL: OnceLock<Registry> = OnceLock::new();
        GLOBAL.get_or_init(Registry::builtin)
    }

    pub fn register_iterator(&mut self, name: &str, factory: IteratorFactory) {
        self.iterators.insert(name.to_string(), factory);
    }

    pub fn register_generator(&mut self, name: &str, factory: GeneratorFactory) {
        self.generators.insert(name.to_string(), factory);
    }

    pub fn register_operator(&mut self, name: &str, factory: KernelFactory) {
        self.operators.insert(name.to_string(), factory);
    }

    pub fn iterator(&self, name: &str) -> Result<IteratorFactory> {
        self.iterators
            .get(name)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Unknown input iterator: {}", name))
    }

    pub fn generator(&self, name: &str) -> Result<GeneratorFactory> {
        self.generators
            .get(name)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("Unknown data generator: {}", name))
    }

    pub fn operator(&self, name: &str) -> Result<KernelFactory> {
        self.operators
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Unknown operator: {}", name))
    }

    /// Every registered name, grouped by kind
    pub fn names(&self) -> Vec<(&'static str, &str)> {
        let iterators = self.iterators.keys().map(|k| ("iterator", k.as_str()));
        let generators = self.generators.keys().map(|k| ("data_generator", k.as_str()));
        let operators = self.operators.keys().map(|k| ("operator", k.as_str()));
        iterators.chain(generators).chain(operators).collect()
    }
}
