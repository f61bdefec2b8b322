//! Identifier and name resolution for record descriptors.
//!
//! A registry is populated once through [`RegistryBuilder`] and then frozen
//! into an immutable [`Registry`]. The engine only ever reads from it, so a
//! single registry can back any number of engines and threads.

use std::collections::HashMap;
use std::hash::BuildHasher;
use std::sync::Arc;

use lazy_static::lazy_static;
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::catalog;
use crate::error::RegistryError;
use crate::limits::CHARACTERISTIC_NAME_PREFIX;
use crate::model::{RecordDescriptor, RecordId};

/// Maps identifiers (and optionally names) to descriptors.
pub trait Resolve {
    /// Returns the descriptor registered for `id`.
    fn resolve(&self, id: &RecordId) -> Option<&RecordDescriptor>;

    /// Returns the descriptor registered under a human-readable name.
    fn resolve_name(&self, _name: &str) -> Option<&RecordDescriptor> {
        None
    }
}

impl<T: Resolve + ?Sized> Resolve for &T {
    fn resolve(&self, id: &RecordId) -> Option<&RecordDescriptor> {
        (**self).resolve(id)
    }

    fn resolve_name(&self, name: &str) -> Option<&RecordDescriptor> {
        (**self).resolve_name(name)
    }
}

impl<T: Resolve + ?Sized> Resolve for Arc<T> {
    fn resolve(&self, id: &RecordId) -> Option<&RecordDescriptor> {
        (**self).resolve(id)
    }

    fn resolve_name(&self, name: &str) -> Option<&RecordDescriptor> {
        (**self).resolve_name(name)
    }
}

impl<S: BuildHasher> Resolve for HashMap<RecordId, RecordDescriptor, S> {
    fn resolve(&self, id: &RecordId) -> Option<&RecordDescriptor> {
        self.get(id)
    }
}

/// Normalises a record name for lookup.
///
/// Case-insensitive; runs of whitespace, `-` and `_` collapse into a single
/// space; a leading `org.bluetooth.characteristic.` is stripped.
///
/// ```rust
/// use gatt_codec::registry::normalize_name;
///
/// assert_eq!(normalize_name("org.bluetooth.characteristic.battery_level"), "battery level");
/// assert_eq!(normalize_name("  Battery-Level "), "battery level");
/// ```
pub fn normalize_name(name: &str) -> String {
    let name = name.trim();
    let name = match name.get(..CHARACTERISTIC_NAME_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(CHARACTERISTIC_NAME_PREFIX) => {
            &name[CHARACTERISTIC_NAME_PREFIX.len()..]
        }
        _ => name,
    };

    let mut out = String::with_capacity(name.len());
    let mut pending_space = false;
    for ch in name.chars() {
        if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.extend(ch.to_lowercase());
    }
    out
}

// =============================================================================
// BUILDER
// =============================================================================

/// Mutable registry under construction.
#[derive(Debug, Clone, Default)]
pub struct RegistryBuilder {
    descriptors: FxHashMap<RecordId, RecordDescriptor>,
    names: FxHashMap<String, RecordId>,
    order: Vec<RecordId>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor.
    ///
    /// Fails if the identifier or normalised name is taken, or if the
    /// descriptor names itself (or one dependency twice, as both required
    /// and optional). Dependencies on unregistered identifiers are allowed.
    pub fn register(&mut self, descriptor: RecordDescriptor) -> Result<&mut Self, RegistryError> {
        let id = descriptor.id();
        if descriptor.depends_on(&id) {
            return Err(RegistryError::SelfDependency { id });
        }
        if let Some(dependency) = descriptor
            .required_dependencies()
            .iter()
            .find(|dep| descriptor.optional_dependencies().contains(*dep))
        {
            return Err(RegistryError::ConflictingDependency {
                id,
                dependency: *dependency,
            });
        }
        if self.descriptors.contains_key(&id) {
            return Err(RegistryError::DuplicateIdentifier { id });
        }
        let name = normalize_name(descriptor.name());
        if self.names.contains_key(&name) {
            return Err(RegistryError::DuplicateName {
                name: descriptor.name().to_string(),
            });
        }

        self.names.insert(name, id);
        self.order.push(id);
        self.descriptors.insert(id, descriptor);
        Ok(self)
    }

    /// Registers every record in the reference catalogue.
    pub fn register_standard(&mut self) -> Result<&mut Self, RegistryError> {
        for descriptor in catalog::standard_descriptors() {
            self.register(descriptor)?;
        }
        Ok(self)
    }

    /// Returns true if `id` has been registered.
    pub fn contains(&self, id: &RecordId) -> bool {
        self.descriptors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Freezes the registry.
    pub fn build(self) -> Registry {
        Registry {
            descriptors: self.descriptors,
            names: self.names,
            order: self.order,
        }
    }
}

// =============================================================================
// REGISTRY
// =============================================================================

lazy_static! {
    static ref STANDARD: Registry = {
        let mut builder = RegistryBuilder::new();
        for descriptor in catalog::standard_descriptors() {
            let id = descriptor.id();
            let registered = builder.register(descriptor).map(|_| ());
            // A catalogue conflict is a bug in this crate
            debug_assert!(registered.is_ok(), "standard record {id} rejected: {registered:?}");
            if let Err(err) = registered {
                warn!(id = %id, error = %err, "skipping standard record");
            }
        }
        builder.build()
    };
}

/// Frozen set of descriptors, looked up by identifier or normalised name.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    descriptors: FxHashMap<RecordId, RecordDescriptor>,
    names: FxHashMap<String, RecordId>,
    order: Vec<RecordId>,
}

impl Registry {
    /// Starts an empty builder.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// The shared reference catalogue.
    pub fn standard() -> &'static Registry {
        &STANDARD
    }

    /// An owned copy of the reference catalogue.
    pub fn with_standard_records() -> Registry {
        (*STANDARD).clone()
    }

    pub fn get(&self, id: &RecordId) -> Option<&RecordDescriptor> {
        self.descriptors.get(id)
    }

    /// Looks up a descriptor by name (see [`normalize_name`]).
    pub fn get_by_name(&self, name: &str) -> Option<&RecordDescriptor> {
        self.names
            .get(&normalize_name(name))
            .and_then(|id| self.descriptors.get(id))
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.descriptors.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Identifiers in registration order.
    pub fn ids(&self) -> &[RecordId] {
        &self.order
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> impl Iterator<Item = &RecordDescriptor> {
        self.order.iter().filter_map(|id| self.descriptors.get(id))
    }

    /// Reopens the registry for further registrations.
    pub fn into_builder(self) -> RegistryBuilder {
        RegistryBuilder {
            descriptors: self.descriptors,
            names: self.names,
            order: self.order,
        }
    }
}

impl Resolve for Registry {
    fn resolve(&self, id: &RecordId) -> Option<&RecordDescriptor> {
        self.get(id)
    }

    fn resolve_name(&self, name: &str) -> Option<&RecordDescriptor> {
        self.get_by_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{BatteryLevel, GlucoseMeasurement, GlucoseMeasurementContext};
    use crate::model::{DescriptorBuilder, KnownRecord};

    const A: RecordId = RecordId::from_u16(0xFE01);
    const B: RecordId = RecordId::from_u16(0xFE02);

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("Heart Rate Measurement"), "heart rate measurement");
        assert_eq!(normalize_name("heart_rate__measurement"), "heart rate measurement");
        assert_eq!(
            normalize_name("ORG.BLUETOOTH.CHARACTERISTIC.heart_rate_measurement"),
            "heart rate measurement"
        );
        assert_eq!(normalize_name("-Battery-"), "battery");
        assert_eq!(normalize_name(""), "");
        assert_eq!(normalize_name("Température"), "température");
    }

    #[test]
    fn test_register_and_resolve() {
        let mut builder = RegistryBuilder::new();
        builder
            .register(DescriptorBuilder::new(A, "Alpha Record").build())
            .unwrap()
            .register(DescriptorBuilder::new(B, "Beta").requires(A).build())
            .unwrap();
        let registry = builder.build();

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.ids(), &[A, B]);
        assert_eq!(registry.resolve(&A).map(|d| d.name()), Some("Alpha Record"));
        assert_eq!(registry.resolve_name("alpha_record").map(|d| d.id()), Some(A));
        assert!(registry.resolve(&RecordId::from_u16(0xFE03)).is_none());
    }

    #[test]
    fn test_registration_rejects_conflicts() {
        let mut builder = RegistryBuilder::new();
        builder.register(DescriptorBuilder::new(A, "Alpha").build()).unwrap();

        assert_eq!(
            builder.register(DescriptorBuilder::new(A, "Other").build()).err(),
            Some(RegistryError::DuplicateIdentifier { id: A })
        );
        assert_eq!(
            builder.register(DescriptorBuilder::new(B, "ALPHA").build()).err(),
            Some(RegistryError::DuplicateName { name: "ALPHA".to_string() })
        );
        assert_eq!(
            builder.register(DescriptorBuilder::new(B, "Beta").requires(B).build()).err(),
            Some(RegistryError::SelfDependency { id: B })
        );
        assert_eq!(
            builder
                .register(DescriptorBuilder::new(B, "Beta").requires(A).enriched_by(A).build())
                .err(),
            Some(RegistryError::ConflictingDependency { id: B, dependency: A })
        );
        // Failed registrations leave no trace
        assert_eq!(builder.len(), 1);
        assert!(!builder.contains(&B));
    }

    #[test]
    fn test_standard_catalogue_registers_cleanly() {
        let mut builder = RegistryBuilder::new();
        for descriptor in catalog::standard_descriptors() {
            let id = descriptor.id();
            assert!(builder.register(descriptor).is_ok(), "{id} rejected");
        }
        assert_eq!(builder.build().len(), Registry::standard().len());
    }

    #[test]
    fn test_standard_registry() {
        let registry = Registry::standard();
        assert_eq!(registry.len(), catalog::standard_descriptors().len());
        assert!(registry.contains(&BatteryLevel::ID));
        assert_eq!(
            registry
                .resolve_name("org.bluetooth.characteristic.glucose_measurement")
                .map(RecordDescriptor::id),
            Some(GlucoseMeasurement::ID)
        );
        let context = registry.get(&GlucoseMeasurementContext::ID).unwrap();
        assert_eq!(context.required_dependencies(), &[GlucoseMeasurement::ID]);

        // Registering the catalogue twice collides on the first record
        let mut builder = Registry::with_standard_records().into_builder();
        assert!(matches!(
            builder.register_standard(),
            Err(RegistryError::DuplicateIdentifier { .. })
        ));
    }

    #[test]
    fn test_blanket_resolvers() {
        let registry = Arc::new(Registry::with_standard_records());
        let by_arc: &dyn Resolve = &registry;
        assert!(by_arc.resolve(&BatteryLevel::ID).is_some());
        assert!(by_arc.resolve_name("battery level").is_some());

        let mut map: HashMap<RecordId, RecordDescriptor> = HashMap::new();
        map.insert(A, DescriptorBuilder::new(A, "Alpha").build());
        assert!(map.resolve(&A).is_some());
        assert!(map.resolve_name("Alpha").is_none());
    }
}
