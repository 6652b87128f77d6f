//! Typed property bags attached to diagram elements.
//!
//! Each element kind fixes the *schema* of its property bag when the element
//! is constructed: which [`PropertyName`]s exist and which [`PropertyValue`]
//! variant each one holds. Later updates may change values but never the
//! schema, so a property sheet (an external collaborator) can rely on the
//! shape of the bag for a given kind.

use std::{fmt, mem};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Names of element properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropertyName {
    Name,
    Attributes,
    Methods,
    Contents,
    Value,
    OpenBottom,
    MiddleLabel,
    StartLabel,
    EndLabel,
    Directionality,
    GeneralizationType,
    AggregationType,
    Signal,
    UseCaseDependencyType,
}

impl PropertyName {
    /// Returns the external (camel case) name of the property.
    pub fn as_str(self) -> &'static str {
        match self {
            PropertyName::Name => "name",
            PropertyName::Attributes => "attributes",
            PropertyName::Methods => "methods",
            PropertyName::Contents => "contents",
            PropertyName::Value => "value",
            PropertyName::OpenBottom => "openBottom",
            PropertyName::MiddleLabel => "middleLabel",
            PropertyName::StartLabel => "startLabel",
            PropertyName::EndLabel => "endLabel",
            PropertyName::Directionality => "directionality",
            PropertyName::GeneralizationType => "generalizationType",
            PropertyName::AggregationType => "aggregationType",
            PropertyName::Signal => "signal",
            PropertyName::UseCaseDependencyType => "useCaseDependencyType",
        }
    }
}

impl fmt::Display for PropertyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Navigability of an association or dependency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Directionality {
    #[default]
    None,
    Start,
    End,
    Bidirectional,
}

/// Flavor of a class-diagram generalization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneralizationType {
    #[default]
    Inheritance,
    Implementation,
}

/// Flavor of a class-diagram aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AggregationType {
    #[default]
    Aggregation,
    Composition,
}

/// Stereotype of a use-case dependency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UseCaseDependencyType {
    #[default]
    None,
    Include,
    Extend,
}

/// A property value.
///
/// Serializes untagged: text as a string, flags as a boolean and the
/// enumerated values as their variant name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Flag(bool),
    Directionality(Directionality),
    Generalization(GeneralizationType),
    Aggregation(AggregationType),
    UseCaseDependency(UseCaseDependencyType),
}

impl PropertyValue {
    /// Creates a text value.
    pub fn text(value: impl Into<String>) -> Self {
        PropertyValue::Text(value.into())
    }

    /// Checks whether both values are of the same variant.
    pub fn same_variant(&self, other: &PropertyValue) -> bool {
        mem::discriminant(self) == mem::discriminant(other)
    }

    /// Returns a short name for the variant, used in error messages.
    pub fn variant_name(&self) -> &'static str {
        match self {
            PropertyValue::Text(_) => "text",
            PropertyValue::Flag(_) => "flag",
            PropertyValue::Directionality(_) => "directionality",
            PropertyValue::Generalization(_) => "generalization type",
            PropertyValue::Aggregation(_) => "aggregation type",
            PropertyValue::UseCaseDependency(_) => "use case dependency type",
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(text) => f.write_str(text),
            PropertyValue::Flag(flag) => write!(f, "{flag}"),
            PropertyValue::Directionality(value) => write!(f, "{value:?}"),
            PropertyValue::Generalization(value) => write!(f, "{value:?}"),
            PropertyValue::Aggregation(value) => write!(f, "{value:?}"),
            PropertyValue::UseCaseDependency(value) => write!(f, "{value:?}"),
        }
    }
}

/// Errors raised when a property update does not fit the schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PropertyError {
    #[error("property `{0}` is not defined for this element")]
    Unknown(PropertyName),

    #[error("property `{name}` expects a {expected} value, found {found}")]
    TypeMismatch {
        name: PropertyName,
        expected: &'static str,
        found: &'static str,
    },
}

/// An ordered bag of named, typed properties.
///
/// # Examples
///
/// ```
/// use astrolabe_core::property::{Properties, PropertyName, PropertyValue};
///
/// let mut properties = Properties::from_schema([(PropertyName::Name, PropertyValue::text(""))]);
/// let previous = properties
///     .set(PropertyName::Name, PropertyValue::text("client"))
///     .unwrap();
///
/// assert_eq!(previous, PropertyValue::text(""));
/// assert_eq!(properties.text(PropertyName::Name), Some("client"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Properties {
    values: IndexMap<PropertyName, PropertyValue>,
}

impl Properties {
    /// Creates a property bag whose schema is given by the default entries.
    pub fn from_schema(entries: impl IntoIterator<Item = (PropertyName, PropertyValue)>) -> Self {
        Self {
            values: entries.into_iter().collect(),
        }
    }

    /// Returns the value of a property.
    pub fn get(&self, name: PropertyName) -> Option<&PropertyValue> {
        self.values.get(&name)
    }

    /// Returns the value of a text property.
    pub fn text(&self, name: PropertyName) -> Option<&str> {
        match self.values.get(&name) {
            Some(PropertyValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Returns the value of a flag property.
    pub fn flag(&self, name: PropertyName) -> Option<bool> {
        match self.values.get(&name) {
            Some(PropertyValue::Flag(flag)) => Some(*flag),
            _ => None,
        }
    }

    /// Checks whether the schema defines the property.
    pub fn contains(&self, name: PropertyName) -> bool {
        self.values.contains_key(&name)
    }

    /// Checks that `value` can be stored under `name` without changing the schema.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyError::Unknown`] if the schema has no such property and
    /// [`PropertyError::TypeMismatch`] if the value variant differs.
    pub fn check(&self, name: PropertyName, value: &PropertyValue) -> Result<(), PropertyError> {
        let current = self.values.get(&name).ok_or(PropertyError::Unknown(name))?;
        if !current.same_variant(value) {
            return Err(PropertyError::TypeMismatch {
                name,
                expected: current.variant_name(),
                found: value.variant_name(),
            });
        }
        Ok(())
    }

    /// Stores a value and returns the previous one.
    ///
    /// # Errors
    ///
    /// See [`Properties::check`]. The bag is left untouched on error.
    pub fn set(
        &mut self,
        name: PropertyName,
        value: PropertyValue,
    ) -> Result<PropertyValue, PropertyError> {
        self.check(name, &value)?;
        let slot = self
            .values
            .get_mut(&name)
            .ok_or(PropertyError::Unknown(name))?;
        Ok(mem::replace(slot, value))
    }

    /// Returns an iterator over the properties in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (PropertyName, &PropertyValue)> {
        self.values.iter().map(|(name, value)| (*name, value))
    }

    /// Returns the number of properties in the schema.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Checks whether the schema is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
