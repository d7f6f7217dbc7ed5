//! Shared types for the intake → generation → export flow.
//!
//! [`LookCollection`] is what the generation collaborator hands back and what
//! every export path reads. It is serialized as camelCase JSON so collections
//! produced by the generation service can be loaded as-is.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Approximate face shape selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaceShape {
    #[default]
    Oval,
    Round,
    Square,
    Heart,
    Diamond,
    Long,
}

impl FaceShape {
    pub const ALL: [FaceShape; 6] = [
        FaceShape::Oval,
        FaceShape::Round,
        FaceShape::Square,
        FaceShape::Heart,
        FaceShape::Diamond,
        FaceShape::Long,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FaceShape::Oval => "oval",
            FaceShape::Round => "round",
            FaceShape::Square => "square",
            FaceShape::Heart => "heart",
            FaceShape::Diamond => "diamond",
            FaceShape::Long => "long",
        }
    }
}

/// Current hair length selected by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HairLength {
    /// Chin-length or shorter.
    Short,
    /// Shoulder-length.
    #[default]
    Medium,
    /// Below the shoulders.
    Long,
}

impl HairLength {
    pub const ALL: [HairLength; 3] = [HairLength::Short, HairLength::Medium, HairLength::Long];

    pub fn as_str(self) -> &'static str {
        match self {
            HairLength::Short => "short",
            HairLength::Medium => "medium",
            HairLength::Long => "long",
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown {kind} '{value}'")]
pub struct ParseAttributeError {
    kind: &'static str,
    value: String,
}

impl FromStr for FaceShape {
    type Err = ParseAttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FaceShape::ALL
            .into_iter()
            .find(|shape| shape.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseAttributeError {
                kind: "face shape",
                value: s.to_string(),
            })
    }
}

impl FromStr for HairLength {
    type Err = ParseAttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HairLength::ALL
            .into_iter()
            .find(|length| length.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseAttributeError {
                kind: "hair length",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for FaceShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for HairLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated hairstyle preview plus its display metadata.
///
/// `image_url` points at the generation service's hosting; nothing in this
/// crate ever rewrites it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HairstyleLook {
    pub id: String,
    pub image_url: String,
    pub label: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub alt: String,
}

/// The two result galleries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Natural,
    Glamorous,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Natural, Category::Glamorous];

    /// Folder name used inside the exported archive.
    pub fn folder(self) -> &'static str {
        match self {
            Category::Natural => "natural-looks",
            Category::Glamorous => "glamorous-looks",
        }
    }

    /// Gallery heading.
    pub fn title(self) -> &'static str {
        match self {
            Category::Natural => "Natural & Everyday Looks",
            Category::Glamorous => "Glamorous & Evening Looks",
        }
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CollectionError {
    #[error("duplicate look id '{0}'")]
    DuplicateId(String),
    #[error("look '{0}' has an empty image URL")]
    MissingImageUrl(String),
    #[error("invalid collection JSON: {0}")]
    Json(String),
}

/// The full result set of one generation request.
///
/// Construct through [`LookCollection::new`] (or deserialize and call
/// [`LookCollection::validate`]) so the id-uniqueness invariant holds. Once
/// built the collection is never mutated; share it behind an `Arc`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LookCollection {
    natural_looks: Vec<HairstyleLook>,
    glamorous_looks: Vec<HairstyleLook>,
}

impl LookCollection {
    pub fn new(
        natural_looks: Vec<HairstyleLook>,
        glamorous_looks: Vec<HairstyleLook>,
    ) -> Result<Self, CollectionError> {
        let collection = Self {
            natural_looks,
            glamorous_looks,
        };
        collection.validate()?;
        Ok(collection)
    }

    /// Parse a collection from the generation service's JSON payload.
    pub fn from_json(json: &str) -> Result<Self, CollectionError> {
        let collection: LookCollection =
            serde_json::from_str(json).map_err(|e| CollectionError::Json(e.to_string()))?;
        collection.validate()?;
        Ok(collection)
    }

    /// Check that ids are unique across both galleries and every look has a URL.
    pub fn validate(&self) -> Result<(), CollectionError> {
        let mut seen = HashSet::new();
        for (_, look) in self.iter() {
            if !seen.insert(look.id.as_str()) {
                return Err(CollectionError::DuplicateId(look.id.clone()));
            }
            if look.image_url.trim().is_empty() {
                return Err(CollectionError::MissingImageUrl(look.id.clone()));
            }
        }
        Ok(())
    }

    pub fn natural_looks(&self) -> &[HairstyleLook] {
        &self.natural_looks
    }

    pub fn glamorous_looks(&self) -> &[HairstyleLook] {
        &self.glamorous_looks
    }

    pub fn looks(&self, category: Category) -> &[HairstyleLook] {
        match category {
            Category::Natural => &self.natural_looks,
            Category::Glamorous => &self.glamorous_looks,
        }
    }

    /// All looks in display order, natural first, tagged with their category.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &HairstyleLook)> {
        Category::ALL
            .into_iter()
            .flat_map(move |category| self.looks(category).iter().map(move |l| (category, l)))
    }

    pub fn find(&self, id: &str) -> Option<(Category, &HairstyleLook)> {
        self.iter().find(|(_, look)| look.id == id)
    }

    pub fn len(&self) -> usize {
        self.natural_looks.len() + self.glamorous_looks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
