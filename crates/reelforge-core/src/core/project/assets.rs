//! Reference Assets
//!
//! Uploaded character, prop, and location references, and the symbolic
//! shot-to-asset links the script planner emits.

use serde::{Deserialize, Serialize};

use crate::core::{AssetId, ImageData};

/// Upper bound on prop/VFX anchors per scene.
pub const MAX_EXTRA_ANCHORS: usize = 5;

// =============================================================================
// Assets
// =============================================================================

/// Asset slot within the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Hero,
    Support,
    Item,
    Location,
}

impl AssetKind {
    /// Wire prefix used in focus references (`hero-0`, `loc-2`, ...).
    pub fn prefix(&self) -> &'static str {
        match self {
            AssetKind::Hero => "hero",
            AssetKind::Support => "support",
            AssetKind::Item => "item",
            AssetKind::Location => "loc",
        }
    }

    fn from_prefix(prefix: &str) -> Option<Self> {
        match prefix {
            "hero" => Some(AssetKind::Hero),
            "support" => Some(AssetKind::Support),
            "item" => Some(AssetKind::Item),
            "loc" => Some(AssetKind::Location),
            _ => None,
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

/// An uploaded reference image with a display name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceAsset {
    pub id: AssetId,
    pub name: String,
    pub image: ImageData,
}

impl ReferenceAsset {
    pub fn new(name: impl Into<String>, image: ImageData) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            name: name.into(),
            image,
        }
    }
}

/// All reference assets of a project, grouped by slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssetLibrary {
    #[serde(default)]
    pub heroes: Vec<ReferenceAsset>,
    #[serde(default)]
    pub supports: Vec<ReferenceAsset>,
    #[serde(default)]
    pub items: Vec<ReferenceAsset>,
    #[serde(default)]
    pub locations: Vec<ReferenceAsset>,
}

impl AssetLibrary {
    pub fn list(&self, kind: AssetKind) -> &[ReferenceAsset] {
        match kind {
            AssetKind::Hero => &self.heroes,
            AssetKind::Support => &self.supports,
            AssetKind::Item => &self.items,
            AssetKind::Location => &self.locations,
        }
    }

    fn list_mut(&mut self, kind: AssetKind) -> &mut Vec<ReferenceAsset> {
        match kind {
            AssetKind::Hero => &mut self.heroes,
            AssetKind::Support => &mut self.supports,
            AssetKind::Item => &mut self.items,
            AssetKind::Location => &mut self.locations,
        }
    }

    /// Adds an asset, returning its id.
    pub fn add(&mut self, kind: AssetKind, asset: ReferenceAsset) -> AssetId {
        let id = asset.id.clone();
        self.list_mut(kind).push(asset);
        id
    }

    /// Removes an asset by id. Missing ids are a no-op.
    pub fn remove(&mut self, kind: AssetKind, id: &str) {
        self.list_mut(kind).retain(|asset| asset.id != id);
    }

    /// Renames an asset by id, returning whether it was found.
    pub fn rename(&mut self, kind: AssetKind, id: &str, name: impl Into<String>) -> bool {
        if let Some(asset) = self.list_mut(kind).iter_mut().find(|a| a.id == id) {
            asset.name = name.into();
            true
        } else {
            false
        }
    }

    pub fn get(&self, kind: AssetKind, index: usize) -> Option<&ReferenceAsset> {
        self.list(kind).get(index)
    }

    pub fn has_heroes(&self) -> bool {
        !self.heroes.is_empty()
    }

    /// Lead hero reference, used for style analysis.
    pub fn first_hero(&self) -> Option<&ReferenceAsset> {
        self.heroes.first()
    }
}

// =============================================================================
// Focus references
// =============================================================================

/// A shot's link to a reference asset.
///
/// Wire form is symbolic (`hero-0`, `support-1`, `item-0`, `loc-0`, `none`)
/// so the planner can emit it as plain text. A dangling index resolves to
/// no asset rather than an error; the shot simply renders without an
/// identity reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetRef {
    #[default]
    None,
    Asset {
        kind: AssetKind,
        index: usize,
    },
}

impl AssetRef {
    pub fn hero(index: usize) -> Self {
        AssetRef::Asset {
            kind: AssetKind::Hero,
            index,
        }
    }

    pub fn support(index: usize) -> Self {
        AssetRef::Asset {
            kind: AssetKind::Support,
            index,
        }
    }

    /// Parses a symbolic reference. Anything unrecognized is `None`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_lowercase();
        if raw.is_empty() || raw == "none" {
            return AssetRef::None;
        }
        let Some((prefix, index)) = raw.rsplit_once('-') else {
            return AssetRef::None;
        };
        let Some(kind) = AssetKind::from_prefix(prefix) else {
            return AssetRef::None;
        };
        match index.parse::<usize>() {
            Ok(index) => AssetRef::Asset { kind, index },
            Err(_) => AssetRef::None,
        }
    }

    pub fn as_wire(&self) -> String {
        match self {
            AssetRef::None => "none".to_string(),
            AssetRef::Asset { kind, index } => format!("{}-{}", kind.prefix(), index),
        }
    }

    /// Looks the reference up in the library.
    pub fn resolve<'a>(&self, library: &'a AssetLibrary) -> Option<&'a ReferenceAsset> {
        match self {
            AssetRef::None => None,
            AssetRef::Asset { kind, index } => library.get(*kind, *index),
        }
    }

    pub fn is_hero(&self) -> bool {
        matches!(
            self,
            AssetRef::Asset {
                kind: AssetKind::Hero,
                ..
            }
        )
    }

    pub fn is_none(&self) -> bool {
        matches!(self, AssetRef::None)
    }
}

impl From<String> for AssetRef {
    fn from(raw: String) -> Self {
        AssetRef::parse(&raw)
    }
}

impl From<AssetRef> for String {
    fn from(value: AssetRef) -> Self {
        value.as_wire()
    }
}

impl std::fmt::Display for AssetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_wire())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(name: &str) -> ReferenceAsset {
        ReferenceAsset::new(name, ImageData::new("image/jpeg", vec![1, 2, 3]))
    }

    #[test]
    fn test_parse_wire_forms() {
        assert_eq!(AssetRef::parse("hero-0"), AssetRef::hero(0));
        assert_eq!(AssetRef::parse("support-2"), AssetRef::support(2));
        assert_eq!(
            AssetRef::parse("item-1"),
            AssetRef::Asset {
                kind: AssetKind::Item,
                index: 1
            }
        );
        assert_eq!(
            AssetRef::parse("loc-0"),
            AssetRef::Asset {
                kind: AssetKind::Location,
                index: 0
            }
        );
        assert_eq!(AssetRef::parse("none"), AssetRef::None);
        assert_eq!(AssetRef::parse(""), AssetRef::None);
    }

    #[test]
    fn test_parse_tolerates_model_noise() {
        // Planners occasionally emit uppercase or padded refs.
        assert_eq!(AssetRef::parse(" HERO-1 "), AssetRef::hero(1));
        assert_eq!(AssetRef::parse("Hero-0"), AssetRef::hero(0));
        assert_eq!(AssetRef::parse("the protagonist"), AssetRef::None);
        assert_eq!(AssetRef::parse("hero-x"), AssetRef::None);
        assert_eq!(AssetRef::parse("villain-0"), AssetRef::None);
    }

    #[test]
    fn test_wire_round_trip() {
        for reference in [
            AssetRef::None,
            AssetRef::hero(3),
            AssetRef::support(0),
            AssetRef::Asset {
                kind: AssetKind::Location,
                index: 7,
            },
        ] {
            assert_eq!(AssetRef::parse(&reference.as_wire()), reference);
        }
    }

    #[test]
    fn test_serde_as_string() {
        let json = serde_json::to_string(&AssetRef::hero(2)).unwrap();
        assert_eq!(json, r#""hero-2""#);

        let parsed: AssetRef = serde_json::from_str(r#""support-1""#).unwrap();
        assert_eq!(parsed, AssetRef::support(1));

        // Unknown refs deserialize to None instead of failing the load.
        let parsed: AssetRef = serde_json::from_str(r#""garbage""#).unwrap();
        assert_eq!(parsed, AssetRef::None);
    }

    #[test]
    fn test_resolution_degrades_gracefully() {
        let mut library = AssetLibrary::default();
        library.add(AssetKind::Hero, asset("Mira"));

        assert_eq!(
            AssetRef::hero(0).resolve(&library).map(|a| a.name.as_str()),
            Some("Mira")
        );
        assert!(AssetRef::hero(5).resolve(&library).is_none());
        assert!(AssetRef::support(0).resolve(&library).is_none());
        assert!(AssetRef::None.resolve(&library).is_none());
    }

    #[test]
    fn test_library_add_remove_rename() {
        let mut library = AssetLibrary::default();
        let id = library.add(AssetKind::Support, asset("Kai"));
        assert_eq!(library.supports.len(), 1);

        assert!(library.rename(AssetKind::Support, &id, "Kai Ren"));
        assert_eq!(library.supports[0].name, "Kai Ren");

        library.remove(AssetKind::Support, &id);
        assert!(library.supports.is_empty());

        // Removing twice is harmless.
        library.remove(AssetKind::Support, &id);
    }
}
