//! Material definitions and the registry that resolves them.
//!
//! Materials are immutable configuration: the table is loaded once before the
//! first step (from the built-in set or from JSON) and never mutated at
//! runtime. Only three attributes differentiate materials today - density,
//! slide resistance and dispersion rate - while gravity, friction and momentum
//! transfer are shared constants in the physics module.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a material. Id 0 is reserved for Empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MaterialId(pub u8);

impl MaterialId {
    pub const EMPTY: MaterialId = MaterialId(0);

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Category controlling which physics phases a cell undergoes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorType {
    /// No cell present. Skipped by the kernel.
    Empty,
    /// Immovable. Skipped by the kernel, blocks everything else.
    Solid,
    /// Falls, piles up, slides down slopes steeper than its resting angle.
    Powder,
    /// Falls, spreads laterally, splashes on impact.
    Liquid,
    /// Rises and disperses toward empty space.
    Gas,
}

impl Default for BehaviorType {
    fn default() -> Self {
        Self::Empty
    }
}

impl BehaviorType {
    /// Whether cells of this behavior can be displaced by a denser mover.
    #[inline]
    pub fn is_movable(self) -> bool {
        matches!(self, Self::Powder | Self::Liquid | Self::Gas)
    }

    /// Whether the kernel skips this behavior entirely.
    #[inline]
    pub fn is_static(self) -> bool {
        matches!(self, Self::Empty | Self::Solid)
    }
}

/// Physical properties of one material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaterialDef {
    /// Display name, used in snapshots and diagnostics.
    pub name: String,
    pub behavior: BehaviorType,
    /// Displacement ordering key: denser movable materials sink below
    /// less dense ones.
    #[serde(default)]
    pub density: u8,
    /// Angle-of-repose threshold for powders. A powder slides diagonally when
    /// the neighbor column drops by more than this many cells.
    #[serde(default)]
    pub slide_resistance: u8,
    /// Maximum lateral spread per step for liquids and gases.
    #[serde(default)]
    pub dispersion_rate: u8,
}

impl MaterialDef {
    fn empty() -> Self {
        Self {
            name: "empty".to_string(),
            behavior: BehaviorType::Empty,
            density: 0,
            slide_resistance: 0,
            dispersion_rate: 0,
        }
    }

    /// Placeholder for unregistered ids: inert, blocks everything.
    fn unregistered() -> Self {
        Self {
            name: "unregistered".to_string(),
            behavior: BehaviorType::Solid,
            density: u8::MAX,
            slide_resistance: 0,
            dispersion_rate: 0,
        }
    }
}

/// Entry in a JSON material table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct MaterialEntry {
    id: u8,
    #[serde(flatten)]
    def: MaterialDef,
}

/// Errors raised while loading or validating material configuration.
///
/// These are load-time failures only; simulation logic never produces them
/// because every id stored in the grid was validated when it was written.
#[derive(Debug)]
pub enum ConfigError {
    /// A material id was referenced that is not in the table.
    UnknownMaterial(u8),
    /// The same id appeared twice in a material table.
    DuplicateMaterial(u8),
    /// Id 0 is reserved for Empty and cannot be redefined.
    ReservedId,
    /// The material table JSON could not be parsed.
    Parse(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::UnknownMaterial(id) => write!(f, "unregistered material id {}", id),
            ConfigError::DuplicateMaterial(id) => write!(f, "duplicate material id {}", id),
            ConfigError::ReservedId => write!(f, "material id 0 is reserved for empty"),
            ConfigError::Parse(err) => write!(f, "material table parse error: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err)
    }
}

/// Immutable table mapping material ids to their physical properties.
///
/// Lookups on the simulation hot path are plain array indexing: the table is
/// dense over the full id space, with unregistered slots filled by an inert
/// placeholder. Validation happens at the write boundary (`try_lookup`),
/// never inside the kernel.
pub struct MaterialRegistry {
    defs: Vec<MaterialDef>,
    registered: Vec<bool>,
}

impl MaterialRegistry {
    /// Create a registry containing only Empty (id 0).
    pub fn new() -> Self {
        let mut defs = Vec::with_capacity(256);
        defs.push(MaterialDef::empty());
        for _ in 1..256 {
            defs.push(MaterialDef::unregistered());
        }
        let mut registered = vec![false; 256];
        registered[0] = true;
        Self { defs, registered }
    }

    /// Register a material definition under the given id.
    pub fn register(&mut self, id: MaterialId, def: MaterialDef) -> Result<(), ConfigError> {
        if id.is_empty() {
            return Err(ConfigError::ReservedId);
        }
        if self.registered[id.index()] {
            return Err(ConfigError::DuplicateMaterial(id.0));
        }
        self.defs[id.index()] = def;
        self.registered[id.index()] = true;
        Ok(())
    }

    /// Load a registry from a JSON material table.
    ///
    /// Expected shape: `[{"id": 1, "name": "sand", "behavior": "powder",
    /// "density": 3, "slide_resistance": 1}, ...]`.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let entries: Vec<MaterialEntry> = serde_json::from_str(json)?;
        let mut registry = Self::new();
        for entry in entries {
            registry.register(MaterialId(entry.id), entry.def)?;
        }
        Ok(registry)
    }

    /// The built-in material set used by demos and tests.
    pub fn default_set() -> Self {
        let mut registry = Self::new();
        for (id, name, behavior, density, slide, dispersion) in [
            (STONE, "stone", BehaviorType::Solid, u8::MAX, 0, 0),
            (SAND, "sand", BehaviorType::Powder, 30, 1, 0),
            (WATER, "water", BehaviorType::Liquid, 20, 0, 5),
            (STEAM, "steam", BehaviorType::Gas, 1, 0, 4),
        ] {
            // Static table with unique ids, register cannot fail here.
            let _ = registry.register(
                id,
                MaterialDef {
                    name: name.to_string(),
                    behavior,
                    density,
                    slide_resistance: slide,
                    dispersion_rate: dispersion,
                },
            );
        }
        registry
    }

    /// Resolve a material id. Total over the id space; ids that were never
    /// registered resolve to an inert placeholder.
    #[inline]
    pub fn lookup(&self, id: MaterialId) -> &MaterialDef {
        &self.defs[id.index()]
    }

    /// Resolve a material id, failing for unregistered ids. This is the
    /// config-boundary lookup used to validate external writes.
    pub fn try_lookup(&self, id: MaterialId) -> Result<&MaterialDef, ConfigError> {
        if self.registered[id.index()] {
            Ok(&self.defs[id.index()])
        } else {
            Err(ConfigError::UnknownMaterial(id.0))
        }
    }

    /// Whether the id is registered.
    #[inline]
    pub fn is_registered(&self, id: MaterialId) -> bool {
        self.registered[id.index()]
    }

    /// Shorthand for the behavior of an id on the hot path.
    #[inline]
    pub fn behavior(&self, id: MaterialId) -> BehaviorType {
        self.defs[id.index()].behavior
    }

    /// Shorthand for the density of an id on the hot path.
    #[inline]
    pub fn density(&self, id: MaterialId) -> u8 {
        self.defs[id.index()].density
    }
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::default_set()
    }
}

/// Ids of the built-in material set.
pub const STONE: MaterialId = MaterialId(1);
pub const SAND: MaterialId = MaterialId(2);
pub const WATER: MaterialId = MaterialId(3);
pub const STEAM: MaterialId = MaterialId(4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_set_lookups() {
        let registry = MaterialRegistry::default_set();
        assert_eq!(registry.behavior(SAND), BehaviorType::Powder);
        assert_eq!(registry.behavior(WATER), BehaviorType::Liquid);
        assert_eq!(registry.behavior(MaterialId::EMPTY), BehaviorType::Empty);
        assert!(registry.density(SAND) > registry.density(WATER));
    }

    #[test]
    fn test_unregistered_id_is_error_at_boundary() {
        let registry = MaterialRegistry::default_set();
        assert!(registry.try_lookup(MaterialId(200)).is_err());
        // Hot-path lookup degrades to an inert solid instead of panicking.
        assert_eq!(registry.lookup(MaterialId(200)).behavior, BehaviorType::Solid);
    }

    #[test]
    fn test_reserved_and_duplicate_ids() {
        let mut registry = MaterialRegistry::new();
        let def = MaterialDef {
            name: "ash".to_string(),
            behavior: BehaviorType::Powder,
            density: 5,
            slide_resistance: 2,
            dispersion_rate: 0,
        };
        assert!(matches!(
            registry.register(MaterialId::EMPTY, def.clone()),
            Err(ConfigError::ReservedId)
        ));
        assert!(registry.register(MaterialId(7), def.clone()).is_ok());
        assert!(matches!(
            registry.register(MaterialId(7), def),
            Err(ConfigError::DuplicateMaterial(7))
        ));
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"id": 1, "name": "rock", "behavior": "solid", "density": 255},
            {"id": 2, "name": "dust", "behavior": "powder", "density": 10, "slide_resistance": 2},
            {"id": 3, "name": "oil", "behavior": "liquid", "density": 8, "dispersion_rate": 3}
        ]"#;
        let registry = MaterialRegistry::from_json(json).unwrap();
        assert_eq!(registry.lookup(MaterialId(2)).name, "dust");
        assert_eq!(registry.lookup(MaterialId(2)).slide_resistance, 2);
        assert_eq!(registry.behavior(MaterialId(3)), BehaviorType::Liquid);
        assert_eq!(registry.lookup(MaterialId(3)).dispersion_rate, 3);
        assert!(!registry.is_registered(MaterialId(4)));
    }

    #[test]
    fn test_from_json_rejects_bad_tables() {
        assert!(MaterialRegistry::from_json("not json").is_err());
        let dup = r#"[
            {"id": 1, "name": "a", "behavior": "solid"},
            {"id": 1, "name": "b", "behavior": "solid"}
        ]"#;
        assert!(matches!(
            MaterialRegistry::from_json(dup),
            Err(ConfigError::DuplicateMaterial(1))
        ));
    }
}
