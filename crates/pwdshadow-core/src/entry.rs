//! In-memory directory records and modification descriptors.
//!
//! These are the shapes exchanged with the surrounding directory server:
//! the engine reads attribute values from an [`Entry`] and appends
//! [`Modification`]s to a pending modification list.

use serde::{Deserialize, Serialize};

use crate::attributes::AttributeId;

/// One attribute of an entry and its values, in stored order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    /// Attribute identity.
    pub id: AttributeId,
    /// Values in stored order.
    pub values: Vec<String>,
}

/// A directory record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    dn: String,
    attributes: Vec<Attribute>,
}

impl Entry {
    /// Create an empty entry.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attributes: Vec::new(),
        }
    }

    /// Builder: set `id` to the given values.
    #[must_use]
    pub fn with<I, V>(mut self, id: AttributeId, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.set(id, values.into_iter().map(Into::into).collect());
        self
    }

    /// Distinguished name.
    pub fn dn(&self) -> &str {
        &self.dn
    }

    /// All values of `id`; empty when the attribute is absent.
    pub fn values(&self, id: AttributeId) -> &[String] {
        self.attribute(id)
            .map(|a| a.values.as_slice())
            .unwrap_or_default()
    }

    /// First value of `id`, if present.
    pub fn first_value(&self, id: AttributeId) -> Option<&str> {
        self.values(id).first().map(String::as_str)
    }

    /// Whether `id` holds at least one value.
    pub fn contains(&self, id: AttributeId) -> bool {
        !self.values(id).is_empty()
    }

    /// Replace all values of `id`. An empty list removes the attribute.
    pub fn set(&mut self, id: AttributeId, values: Vec<String>) {
        if values.is_empty() {
            let _ = self.remove(id);
            return;
        }
        match self.attributes.iter_mut().find(|a| a.id == id) {
            Some(attr) => attr.values = values,
            None => self.attributes.push(Attribute { id, values }),
        }
    }

    /// Append one value to `id`, creating the attribute if needed.
    pub fn merge_one(&mut self, id: AttributeId, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.id == id) {
            Some(attr) => {
                if !attr.values.contains(&value) {
                    attr.values.push(value);
                }
            }
            None => self.attributes.push(Attribute {
                id,
                values: vec![value],
            }),
        }
    }

    /// Remove `id`, returning its former values.
    pub fn remove(&mut self, id: AttributeId) -> Option<Vec<String>> {
        let pos = self.attributes.iter().position(|a| a.id == id)?;
        Some(self.attributes.remove(pos).values)
    }

    /// Iterate attributes in stored order.
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.iter()
    }

    /// Apply modifications in order, as the entry store would.
    ///
    /// Deleting values that are absent is a no-op. An increment leaves
    /// non-integer values, and values that would overflow, unchanged.
    pub fn apply(&mut self, mods: &[Modification]) {
        for m in mods {
            match m.op {
                ModOp::Add => {
                    for v in &m.values {
                        self.merge_one(m.attribute, v.clone());
                    }
                }
                ModOp::Replace => self.set(m.attribute, m.values.clone()),
                ModOp::Delete if m.values.is_empty() => {
                    let _ = self.remove(m.attribute);
                }
                ModOp::Delete => {
                    let remaining: Vec<String> = self
                        .values(m.attribute)
                        .iter()
                        .filter(|v| !m.values.contains(v))
                        .cloned()
                        .collect();
                    self.set(m.attribute, remaining);
                }
                ModOp::Increment => {
                    let delta = m.first_value().and_then(|v| v.parse::<i64>().ok()).unwrap_or(0);
                    let bumped: Vec<String> = self
                        .values(m.attribute)
                        .iter()
                        .map(|v| match v.parse::<i64>().ok().and_then(|n| n.checked_add(delta)) {
                            Some(n) => n.to_string(),
                            None => v.clone(),
                        })
                        .collect();
                    self.set(m.attribute, bumped);
                }
            }
        }
    }

    fn attribute(&self, id: AttributeId) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.id == id)
    }
}

/// Modification operation type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModOp {
    /// Add values.
    Add,
    /// Delete the listed values, or every value when none are listed.
    Delete,
    /// Replace all values; no values means delete.
    Replace,
    /// Add the first value to every integer value (RFC 4525).
    Increment,
}

/// One element of a pending modification list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    /// Operation type.
    pub op: ModOp,
    /// Target attribute.
    pub attribute: AttributeId,
    /// Operation values.
    #[serde(default)]
    pub values: Vec<String>,
    /// Generated by the server rather than the client.
    #[serde(default)]
    pub internal: bool,
}

impl Modification {
    fn new(op: ModOp, attribute: AttributeId, values: Vec<String>) -> Self {
        Self {
            op,
            attribute,
            values,
            internal: false,
        }
    }

    /// Add `values` to `attribute`.
    pub fn add<V: Into<String>>(attribute: AttributeId, values: impl IntoIterator<Item = V>) -> Self {
        Self::new(ModOp::Add, attribute, values.into_iter().map(Into::into).collect())
    }

    /// Delete `values` from `attribute`.
    pub fn delete<V: Into<String>>(attribute: AttributeId, values: impl IntoIterator<Item = V>) -> Self {
        Self::new(ModOp::Delete, attribute, values.into_iter().map(Into::into).collect())
    }

    /// Delete every value of `attribute`.
    pub fn delete_all(attribute: AttributeId) -> Self {
        Self::new(ModOp::Delete, attribute, Vec::new())
    }

    /// Replace the values of `attribute`.
    pub fn replace<V: Into<String>>(attribute: AttributeId, values: impl IntoIterator<Item = V>) -> Self {
        Self::new(ModOp::Replace, attribute, values.into_iter().map(Into::into).collect())
    }

    /// Increment the integer values of `attribute` by `delta`.
    pub fn increment(attribute: AttributeId, delta: i64) -> Self {
        Self::new(ModOp::Increment, attribute, vec![delta.to_string()])
    }

    /// Mark as server-generated.
    #[must_use]
    pub fn internal(mut self) -> Self {
        self.internal = true;
        self
    }

    /// First value carried by the modification.
    pub fn first_value(&self) -> Option<&str> {
        self.values.first().map(String::as_str)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
