//! Ordered field document for a content-store entry
//!
//! Store entries are maps of field name to locale map
//! (`{"content": {"en-US": [...]}, "title": {"en-US": "..."}}`). This sync
//! owns exactly one field; everything else must be written back untouched
//! and in its original order, including fields this code has never heard
//! of. [`EntryFields`] keeps the whole document as an insertion-ordered JSON
//! map instead of a fixed struct so nothing is silently dropped.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Default locale written by this tool
pub const DEFAULT_LOCALE: &str = "en-US";

/// Insertion-ordered entry fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryFields(Map<String, Value>);

impl EntryFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Field names in stored order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Raw value of a field (the locale map)
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Read one locale of a field
    ///
    /// Falls back to the first locale present when `locale` is missing.
    /// Returns `Ok(None)` when the field itself is absent, and an error when
    /// the field is not a locale map.
    pub fn localized(&self, field: &str, locale: &str) -> Result<Option<&Value>> {
        let Some(value) = self.0.get(field) else {
            return Ok(None);
        };

        let locales = value.as_object().ok_or_else(|| {
            Error::InvalidInput(format!("field '{}' is not locale-wrapped", field))
        })?;

        Ok(locales.get(locale).or_else(|| locales.values().next()))
    }

    /// Read and decode one locale of a field
    pub fn localized_as<T: DeserializeOwned>(&self, field: &str, locale: &str) -> Result<Option<T>> {
        match self.localized(field, locale)? {
            Some(value) => Ok(Some(T::deserialize(value)?)),
            None => Ok(None),
        }
    }

    /// Replace a field with a single-locale value
    ///
    /// An existing field keeps its position; a new one is appended. Other
    /// locales of a replaced field are dropped, matching a full overwrite of
    /// the field.
    pub fn set_localized<T: Serialize>(&mut self, field: &str, locale: &str, value: &T) -> Result<()> {
        let mut locales = Map::new();
        locales.insert(locale.to_string(), serde_json::to_value(value)?);
        self.0.insert(field.to_string(), Value::Object(locales));
        Ok(())
    }

    /// Copy of this document with one field replaced
    pub fn with_localized<T: Serialize>(&self, field: &str, locale: &str, value: &T) -> Result<Self> {
        let mut fields = self.clone();
        fields.set_localized(field, locale, value)?;
        Ok(fields)
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for EntryFields {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
