//! Method registration.
//!
//! The host side of the plugin contract: each provider module exports named
//! factories, and `build_registry` resolves a fixed table of
//! (identifier, provider, symbol) entries into a populated `MethodRegistry`.
//! The caller owns the returned registry; nothing here touches global state,
//! so two calls produce two independent, content-equal registries.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::method::{EnergyMethod, MethodError};
use crate::methods::cbs::{FellerProvider, HelgakerProvider};
use crate::methods::cp::CpProvider;
use crate::methods::custom::CustomProvider;
use crate::methods::fpa::FpaProvider;
use crate::methods::optimizer::OptimizerProvider;
use crate::methods::qmmm::QmmmProvider;

/// A factory constructs an unconfigured method instance.
pub type MethodFactory = fn() -> Box<dyn EnergyMethod>;

/// A provider module exports its factories under stable symbol names.
pub trait MethodProvider {
    fn name(&self) -> &'static str;
    fn factory(&self, symbol: &str) -> Option<MethodFactory>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate method identifier {0:?} in registration table")]
    DuplicateIdentifier(String),
    #[error("provider {provider:?} does not export a factory named {symbol:?}")]
    MissingFactory {
        provider: &'static str,
        symbol: &'static str,
    },
    #[error("no provider named {0:?} is available")]
    UnknownProvider(&'static str),
}

/// One row of the registration table.
#[derive(Debug, Clone, Copy)]
pub struct Entry {
    pub identifier: &'static str,
    pub provider: &'static str,
    pub symbol: &'static str,
}

/// The supermodule table. Identifiers are unique by construction; the two
/// CBS-related identifiers deliberately resolve to two distinct symbols of
/// the same provider.
const SUPERMODULE: &[Entry] = &[
    Entry { identifier: "CP", provider: "cp", symbol: "CP" },
    Entry { identifier: "CorrelationEnergy", provider: "helgaker_cbs", symbol: "CorrelationEnergy" },
    Entry { identifier: "HelgakerCBS", provider: "helgaker_cbs", symbol: "HelgakerCBS" },
    Entry { identifier: "FellerCBS", provider: "feller_cbs", symbol: "FellerCBS" },
    Entry { identifier: "FPA", provider: "fpa", symbol: "FPA" },
    Entry { identifier: "MyCrzyCompMeth", provider: "custom", symbol: "MyCrzyCompMeth" },
    Entry { identifier: "GeometryOptimizer", provider: "optimizer", symbol: "GeometryOptimizer" },
    Entry { identifier: "EEQMMM", provider: "qmmm", symbol: "EEQMMM" },
];

/// Mapping from method identifier to its constructing factory.
#[derive(Debug, Default)]
pub struct MethodRegistry {
    creators: HashMap<String, MethodFactory>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        MethodRegistry {
            creators: HashMap::new(),
        }
    }

    /// Insert a factory under a unique identifier.
    pub fn insert(
        &mut self,
        identifier: impl Into<String>,
        factory: MethodFactory,
    ) -> Result<(), RegistryError> {
        let identifier = identifier.into();
        if self.creators.contains_key(&identifier) {
            return Err(RegistryError::DuplicateIdentifier(identifier));
        }
        self.creators.insert(identifier, factory);
        Ok(())
    }

    pub fn get(&self, identifier: &str) -> Option<MethodFactory> {
        self.creators.get(identifier).copied()
    }

    /// Instantiate the method registered under `identifier`.
    pub fn create(&self, identifier: &str) -> Result<Box<dyn EnergyMethod>, MethodError> {
        let factory = self
            .get(identifier)
            .ok_or_else(|| MethodError::UnknownMethod(identifier.to_string()))?;
        Ok(factory())
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.creators.contains_key(identifier)
    }

    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.creators.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.creators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.creators.is_empty()
    }
}

fn default_providers() -> Vec<Box<dyn MethodProvider>> {
    vec![
        Box::new(CpProvider),
        Box::new(HelgakerProvider),
        Box::new(FellerProvider),
        Box::new(FpaProvider),
        Box::new(CustomProvider),
        Box::new(OptimizerProvider),
        Box::new(QmmmProvider),
    ]
}

/// Resolve a registration table against a set of providers. All-or-nothing:
/// any failure aborts and no registry is returned.
pub fn build_from(
    providers: &[Box<dyn MethodProvider>],
    entries: &[Entry],
) -> Result<MethodRegistry, RegistryError> {
    let mut registry = MethodRegistry::new();
    for entry in entries {
        let provider = providers
            .iter()
            .find(|p| p.name() == entry.provider)
            .ok_or(RegistryError::UnknownProvider(entry.provider))?;
        let factory = provider
            .factory(entry.symbol)
            .ok_or(RegistryError::MissingFactory {
                provider: entry.provider,
                symbol: entry.symbol,
            })?;
        registry.insert(entry.identifier, factory)?;
        debug!(
            "registered {} from {}::{}",
            entry.identifier, entry.provider, entry.symbol
        );
    }
    Ok(registry)
}

/// Build the registry of composite methods shipped by this crate.
pub fn build_registry() -> Result<MethodRegistry, RegistryError> {
    build_from(&default_providers(), SUPERMODULE)
}
