//! Hunter record model
//!
//! One canonical record type shared by both stores:
//! - `HunterDraft`: unvalidated create input, every field optional
//! - `Hunter`: a validated record with all five fields present
//! - `HunterPatch`: partial update, only provided fields change
//! - `Stored<Id>`: a record together with the identifier its store assigned
//!
//! The document store and the relational store hand out unrelated identifiers
//! (`DocumentId` and `RowId`). They are never compared or converted.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A validated hunter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hunter {
    pub name: String,
    pub age: i64,
    pub height: f64,
    pub weight: f64,
    pub image_url: String,
}

impl Hunter {
    pub fn new(
        name: impl Into<String>,
        age: i64,
        height: f64,
        weight: f64,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            age,
            height,
            weight,
            image_url: image_url.into(),
        }
    }
}

/// Create input as received from a caller.
///
/// Type conformance is enforced by deserialization; presence and emptiness
/// are checked by [`HunterDraft::validate`] so every problem is reported at once.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HunterDraft {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub image_url: Option<String>,
}

impl HunterDraft {
    pub fn validate(self) -> Result<Hunter> {
        let mut problems = Vec::new();

        let name = required("name", self.name, &mut problems);
        let age = required("age", self.age, &mut problems);
        let height = required("height", self.height, &mut problems);
        let weight = required("weight", self.weight, &mut problems);
        let image_url = required("imageUrl", self.image_url, &mut problems);

        if let Some(name) = &name {
            check_text("name", name, &mut problems);
        }
        if let Some(height) = height {
            check_number("height", height, &mut problems);
        }
        if let Some(weight) = weight {
            check_number("weight", weight, &mut problems);
        }
        if let Some(image_url) = &image_url {
            check_text("imageUrl", image_url, &mut problems);
        }

        match (name, age, height, weight, image_url) {
            (Some(name), Some(age), Some(height), Some(weight), Some(image_url))
                if problems.is_empty() =>
            {
                Ok(Hunter {
                    name,
                    age,
                    height,
                    weight,
                    image_url,
                })
            }
            _ => Err(Error::Validation(problems.join(", "))),
        }
    }
}

fn required<T>(field: &str, value: Option<T>, problems: &mut Vec<String>) -> Option<T> {
    if value.is_none() {
        problems.push(format!("{} is required", field));
    }
    value
}

impl From<Hunter> for HunterDraft {
    fn from(hunter: Hunter) -> Self {
        Self {
            name: Some(hunter.name),
            age: Some(hunter.age),
            height: Some(hunter.height),
            weight: Some(hunter.weight),
            image_url: Some(hunter.image_url),
        }
    }
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HunterPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl HunterPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.age.is_none()
            && self.height.is_none()
            && self.weight.is_none()
            && self.image_url.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();
        if let Some(name) = &self.name {
            check_text("name", name, &mut problems);
        }
        if let Some(height) = self.height {
            check_number("height", height, &mut problems);
        }
        if let Some(weight) = self.weight {
            check_number("weight", weight, &mut problems);
        }
        if let Some(image_url) = &self.image_url {
            check_text("imageUrl", image_url, &mut problems);
        }
        into_result(problems)
    }
}

fn check_text(field: &str, value: &str, problems: &mut Vec<String>) {
    if value.trim().is_empty() {
        problems.push(format!("{} must not be empty", field));
    }
}

fn check_number(field: &str, value: f64, problems: &mut Vec<String>) {
    if !value.is_finite() {
        problems.push(format!("{} must be a finite number", field));
    }
}

fn into_result(problems: Vec<String>) -> Result<()> {
    if problems.is_empty() {
        Ok(())
    } else {
        Err(Error::Validation(problems.join(", ")))
    }
}

/// Identifier generated by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Auto-increment row id assigned by the relational store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub i64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A hunter as held by one store, flattened on the wire:
/// `{"id": .., "name": .., "age": .., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stored<Id> {
    pub id: Id,
    #[serde(flatten)]
    pub hunter: Hunter,
}

impl<Id> Stored<Id> {
    pub fn new(id: Id, hunter: Hunter) -> Self {
        Self { id, hunter }
    }
}

pub type StoredDocument = Stored<DocumentId>;
pub type StoredRow = Stored<RowId>;

#[cfg(test)]
impl Hunter {
    /// Expected result of applying `patch`, for comparing store output.
    pub(crate) fn patched(&self, patch: &HunterPatch) -> Hunter {
        Hunter {
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            age: patch.age.unwrap_or(self.age),
            height: patch.height.unwrap_or(self.height),
            weight: patch.weight.unwrap_or(self.weight),
            image_url: patch
                .image_url
                .clone()
                .unwrap_or_else(|| self.image_url.clone()),
        }
    }
}
