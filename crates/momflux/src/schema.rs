//! Append-only typed measurement schema.
//!
//! Plugins register the fields they own at construction time and receive
//! typed [`Key`] handles back; records are sized against the frozen schema
//! and addressed through those keys. Field names are unique across the
//! schema, so two plugins can never silently share a field.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Storage class of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// 64-bit float measurement value.
    Float,
    /// Boolean failure flag.
    Flag,
}

/// Definition of one registered field.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Full field name, e.g. `ext_ngmixmom_NgmixMomFlux_instFlux`.
    pub name: String,
    /// Human-readable description.
    pub doc: String,
    /// Storage class.
    pub ty: FieldType,
    /// Slot within the per-type storage of a record.
    pub(crate) slot: usize,
}

/// Typed handle to a registered field.
///
/// Obtained from [`Schema`] registration; only valid for records created
/// against the same schema.
pub struct Key<T> {
    pub(crate) slot: usize,
    _marker: PhantomData<T>,
}

impl<T> Key<T> {
    fn new(slot: usize) -> Self {
        Self {
            slot,
            _marker: PhantomData,
        }
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Key<T> {}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.slot)
    }
}

/// Errors from schema registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    /// A field with this name is already registered.
    DuplicateField {
        /// The conflicting field name.
        name: String,
    },
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateField { name } => {
                write!(f, "field already registered in schema: {}", name)
            }
        }
    }
}

impl std::error::Error for SchemaError {}

/// Append-only registry of named measurement fields.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    fields: Vec<FieldDef>,
    by_name: HashMap<String, usize>,
    n_floats: usize,
    n_flags: usize,
}

impl Schema {
    /// Empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    fn add_field(&mut self, name: &str, doc: &str, ty: FieldType) -> Result<usize, SchemaError> {
        if self.by_name.contains_key(name) {
            return Err(SchemaError::DuplicateField {
                name: name.to_string(),
            });
        }
        let slot = match ty {
            FieldType::Float => {
                self.n_floats += 1;
                self.n_floats - 1
            }
            FieldType::Flag => {
                self.n_flags += 1;
                self.n_flags - 1
            }
        };
        self.by_name.insert(name.to_string(), self.fields.len());
        self.fields.push(FieldDef {
            name: name.to_string(),
            doc: doc.to_string(),
            ty,
            slot,
        });
        Ok(slot)
    }

    /// Register a float field and return its typed key.
    pub fn add_float_field(&mut self, name: &str, doc: &str) -> Result<Key<f64>, SchemaError> {
        self.add_field(name, doc, FieldType::Float).map(Key::new)
    }

    /// Register a flag field and return its typed key.
    pub fn add_flag_field(&mut self, name: &str, doc: &str) -> Result<Key<bool>, SchemaError> {
        self.add_field(name, doc, FieldType::Flag).map(Key::new)
    }

    /// Look up a field definition by full name.
    pub fn find(&self, name: &str) -> Option<&FieldDef> {
        self.by_name.get(name).map(|&i| &self.fields[i])
    }

    /// All registered fields, in registration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// No fields registered yet.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn n_floats(&self) -> usize {
        self.n_floats
    }

    pub(crate) fn n_flags(&self) -> usize {
        self.n_flags
    }
}

/// Key pair for a flux measurement: `<name>_instFlux` and
/// `<name>_instFluxErr`, registered together.
#[derive(Debug, Clone, Copy)]
pub struct FluxResultKey {
    /// Key for `<name>_instFlux`.
    pub flux: Key<f64>,
    /// Key for `<name>_instFluxErr`.
    pub err: Key<f64>,
}

impl FluxResultKey {
    /// Register both flux fields for a measurement base name.
    pub fn add_fields(schema: &mut Schema, name: &str, doc: &str) -> Result<Self, SchemaError> {
        let flux = schema.add_float_field(&format!("{}_instFlux", name), doc)?;
        let err = schema.add_float_field(
            &format!("{}_instFluxErr", name),
            &format!("1-sigma uncertainty on {}_instFlux", name),
        )?;
        Ok(Self { flux, err })
    }
}
