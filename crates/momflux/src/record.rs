//! Per-object source record.

use crate::coord::SkyCoord;
use crate::schema::{FieldType, Key, Schema};

/// Value of a named record field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// Float measurement value.
    Float(f64),
    /// Boolean failure flag.
    Flag(bool),
}

/// One mutable row of the measurement table.
///
/// Holds the object identity, its pixel centroid and sky coordinate, and the
/// value storage for every field registered in the schema the record was
/// created against. Float fields start as NaN, flags as `false`.
///
/// Ownership contract: a plugin writes only through the keys it registered
/// at construction and never touches fields owned by other plugins. The
/// name-based accessors exist for hosts and tests reading results back out.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    id: u64,
    centroid: [f64; 2],
    coord: SkyCoord,
    floats: Vec<f64>,
    flags: Vec<bool>,
}

impl SourceRecord {
    /// Create an empty record sized against `schema`.
    pub fn new(id: u64, schema: &Schema) -> Self {
        Self {
            id,
            centroid: [f64::NAN, f64::NAN],
            coord: SkyCoord::nan(),
            floats: vec![f64::NAN; schema.n_floats()],
            flags: vec![false; schema.n_flags()],
        }
    }

    /// Object identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Pixel centroid (x, y).
    pub fn centroid(&self) -> [f64; 2] {
        self.centroid
    }

    /// Set the pixel centroid.
    pub fn set_centroid(&mut self, centroid: [f64; 2]) {
        self.centroid = centroid;
    }

    /// Sky coordinate.
    pub fn coord(&self) -> SkyCoord {
        self.coord
    }

    /// Set the sky coordinate.
    pub fn set_coord(&mut self, coord: SkyCoord) {
        self.coord = coord;
    }

    /// Read a float field through its typed key.
    pub fn float(&self, key: Key<f64>) -> f64 {
        self.floats[key.slot]
    }

    /// Write a float field through its typed key.
    pub fn set_float(&mut self, key: Key<f64>, value: f64) {
        self.floats[key.slot] = value;
    }

    /// Read a flag field through its typed key.
    pub fn flag(&self, key: Key<bool>) -> bool {
        self.flags[key.slot]
    }

    /// Write a flag field through its typed key.
    pub fn set_flag(&mut self, key: Key<bool>, value: bool) {
        self.flags[key.slot] = value;
    }

    /// Read any field by full name. `None` for unregistered names.
    pub fn value_by_name(&self, schema: &Schema, name: &str) -> Option<FieldValue> {
        let def = schema.find(name)?;
        Some(match def.ty {
            FieldType::Float => FieldValue::Float(self.floats[def.slot]),
            FieldType::Flag => FieldValue::Flag(self.flags[def.slot]),
        })
    }

    /// Read a float field by full name. `None` if missing or not a float.
    pub fn float_by_name(&self, schema: &Schema, name: &str) -> Option<f64> {
        match self.value_by_name(schema, name)? {
            FieldValue::Float(v) => Some(v),
            FieldValue::Flag(_) => None,
        }
    }

    /// Read a flag field by full name. `None` if missing or not a flag.
    pub fn flag_by_name(&self, schema: &Schema, name: &str) -> Option<bool> {
        match self.value_by_name(schema, name)? {
            FieldValue::Flag(v) => Some(v),
            FieldValue::Float(_) => None,
        }
    }

    /// Write any field by full name. `false` if the name is unknown or the
    /// value type does not match the field type.
    pub fn set_by_name(&mut self, schema: &Schema, name: &str, value: FieldValue) -> bool {
        let Some(def) = schema.find(name) else {
            return false;
        };
        match (def.ty, value) {
            (FieldType::Float, FieldValue::Float(v)) => {
                self.floats[def.slot] = v;
                true
            }
            (FieldType::Flag, FieldValue::Flag(v)) => {
                self.flags[def.slot] = v;
                true
            }
            _ => false,
        }
    }
}
