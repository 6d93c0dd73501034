use log::debug;

use crate::{
    diff::{diff_mask::DiffMask, error::PropertyDiffError},
    PropertyMap, Value,
};

/// Whether local code may write a property, or only the paired context
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PropertyAccess {
    ReadWrite,
    ReadOnly,
}

/// Static description of one mirrored property
#[derive(Clone, Copy, Debug)]
pub struct PropertyDef {
    pub name: &'static str,
    pub access: PropertyAccess,
    /// Re-sent in full when a session is re-established
    pub persistent: bool,
}

impl PropertyDef {
    pub const fn read_write(name: &'static str) -> Self {
        Self {
            name,
            access: PropertyAccess::ReadWrite,
            persistent: false,
        }
    }

    pub const fn persistent(name: &'static str) -> Self {
        Self {
            name,
            access: PropertyAccess::ReadWrite,
            persistent: true,
        }
    }

    pub const fn read_only(name: &'static str) -> Self {
        Self {
            name,
            access: PropertyAccess::ReadOnly,
            persistent: false,
        }
    }
}

/// The local shadow of a mirrored object's properties.
///
/// Local writes are applied immediately and recorded in a [`DiffMask`]; the
/// next [`take_diff`](Self::take_diff) yields only the fields that changed.
/// Updates from the paired context are applied without touching the mask, so
/// they are never echoed back.
#[derive(Clone, Debug)]
pub struct MirroredProperties {
    defs: &'static [PropertyDef],
    values: Vec<Value>,
    mask: DiffMask,
}

impl MirroredProperties {
    pub fn new(defs: &'static [PropertyDef]) -> Self {
        let count = defs.len().min(u8::MAX as usize);
        Self {
            defs: &defs[..count],
            values: vec![Value::Null; count],
            mask: DiffMask::new(count as u8),
        }
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.defs.iter().position(|def| def.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.index_of(name).map(|index| &self.values[index])
    }

    /// Initial value, neither marked dirty nor access-checked
    pub fn init(&mut self, name: &str, value: Value) {
        if let Some(index) = self.index_of(name) {
            self.values[index] = value;
        }
    }

    /// Index of `name` if local code may write it
    fn writable_index(&self, name: &str) -> Result<usize, PropertyDiffError> {
        let index = self
            .index_of(name)
            .ok_or_else(|| PropertyDiffError::UnknownProperty {
                name: name.to_string(),
            })?;
        if self.defs[index].access == PropertyAccess::ReadOnly {
            return Err(PropertyDiffError::ReadOnly {
                name: name.to_string(),
            });
        }
        Ok(index)
    }

    /// Check a local write without performing it
    pub fn check_writable(&self, name: &str) -> Result<(), PropertyDiffError> {
        self.writable_index(name).map(|_| ())
    }

    /// Write from local code. Returns `Ok(true)` when the value changed and
    /// will be part of the next diff, `Ok(false)` when the write was a no-op.
    pub fn set_local(&mut self, name: &str, value: Value) -> Result<bool, PropertyDiffError> {
        let index = self.writable_index(name)?;
        if self.values[index] == value {
            return Ok(false);
        }
        self.values[index] = value;
        self.mask.set_bit(index as u8, true);
        Ok(true)
    }

    /// Local removal: the property returns to `null` and the removal is diffed
    pub fn reset_local(&mut self, name: &str) -> Result<bool, PropertyDiffError> {
        self.set_local(name, Value::Null)
    }

    /// Apply a partial update that arrived from the paired context.
    ///
    /// Unknown fields are skipped. Returns the names whose value actually changed.
    pub fn apply_remote(&mut self, properties: &PropertyMap) -> Vec<&'static str> {
        let mut changed = Vec::new();
        for (name, value) in properties {
            let Some(index) = self.index_of(name) else {
                debug!("MirroredProperties: skipping unknown property '{}'", name);
                continue;
            };
            if self.values[index] != *value {
                self.values[index] = value.clone();
                changed.push(self.defs[index].name);
            }
        }
        changed
    }

    pub fn is_dirty(&self) -> bool {
        !self.mask.is_clear()
    }

    pub fn diff_mask(&self) -> &DiffMask {
        &self.mask
    }

    /// Drain the pending local changes into a partial update
    pub fn take_diff(&mut self) -> Option<PropertyMap> {
        if self.mask.is_clear() {
            return None;
        }
        let diff: PropertyMap = self
            .mask
            .set_bits()
            .filter_map(|index| {
                let index = index as usize;
                let def = self.defs.get(index)?;
                Some((def.name.to_string(), self.values[index].clone()))
            })
            .collect();
        self.mask.clear();
        Some(diff)
    }

    /// Full state of every persistent property that currently holds a value
    pub fn persistent_snapshot(&self) -> PropertyMap {
        self.defs
            .iter()
            .zip(self.values.iter())
            .filter(|(def, value)| def.persistent && !value.is_null())
            .map(|(def, value)| (def.name.to_string(), value.clone()))
            .collect()
    }
}
