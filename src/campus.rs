use anyhow::{bail, Context, Result};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;

const EMBEDDED_BUILDINGS: &str = include_str!("../assets/campus/buildings.json");

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingId(String);

impl BuildingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for BuildingId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BuildingId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BuildingCategory {
    Residential,
    Academic,
    Library,
    Dining,
    Cafe,
    #[serde(alias = "athletics")]
    Athletic,
    Administrative,
    EatingClub,
    Religious,
    Research,
}

impl BuildingCategory {
    pub fn label(self) -> &'static str {
        match self {
            BuildingCategory::Residential => "Residential",
            BuildingCategory::Academic => "Academic",
            BuildingCategory::Library => "Library",
            BuildingCategory::Dining => "Dining",
            BuildingCategory::Cafe => "Cafe",
            BuildingCategory::Athletic => "Athletic",
            BuildingCategory::Administrative => "Administrative",
            BuildingCategory::EatingClub => "Eating Club",
            BuildingCategory::Religious => "Religious",
            BuildingCategory::Research => "Research",
        }
    }
}

/// Architectural style tag. Geometry parameters live in `scene::style`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ArchitecturalStyle {
    Colonial,
    #[serde(rename = "collegiate-gothic", alias = "gothic")]
    Gothic,
    Tudor,
    Modern,
    Victorian,
    Classical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    pub id: BuildingId,
    pub name: String,
    pub category: BuildingCategory,
    pub position: Vec3,
    /// Width, height, depth.
    pub size: Vec3,
    pub color: String,
    pub style: ArchitecturalStyle,
    pub description: String,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub open_hours: Option<String>,
    #[serde(default)]
    pub has_study_rooms: bool,
    #[serde(default)]
    pub has_cafe: bool,
    #[serde(default)]
    pub has_dining: bool,
    #[serde(default = "Building::default_interactable")]
    pub interactable: bool,
}

impl Building {
    const fn default_interactable() -> bool {
        true
    }

    /// Distance on the ground plane, ignoring height.
    pub fn ground_distance(&self, position: Vec3) -> f32 {
        let dx = self.position.x - position.x;
        let dz = self.position.z - position.z;
        (dx * dx + dz * dz).sqrt()
    }

    /// World-space bounds; buildings sit on the ground with their origin at the footprint centre.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let half = Vec3::new(self.size.x * 0.5, 0.0, self.size.z * 0.5);
        (self.position - half, self.position + half + Vec3::new(0.0, self.size.y, 0.0))
    }
}

/// Immutable table of campus buildings, built once at startup.
pub struct BuildingRegistry {
    buildings: Vec<Building>,
    index: HashMap<BuildingId, usize>,
}

impl BuildingRegistry {
    pub fn embedded() -> Result<Self> {
        Self::from_json(EMBEDDED_BUILDINGS).context("parsing embedded campus building table")
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let buildings: Vec<Building> = serde_json::from_str(json).context("invalid building table")?;
        Self::from_buildings(buildings)
    }

    pub fn from_buildings(buildings: Vec<Building>) -> Result<Self> {
        let mut index = HashMap::with_capacity(buildings.len());
        for (slot, building) in buildings.iter().enumerate() {
            if !building.size.is_finite() || building.size.min_element() <= 0.0 {
                bail!("building '{}' needs a finite positive size", building.id);
            }
            if index.insert(building.id.clone(), slot).is_some() {
                bail!("duplicate building id '{}'", building.id);
            }
        }
        Ok(Self { buildings, index })
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Building> {
        self.buildings.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Building> {
        self.index.get(id).map(|slot| &self.buildings[*slot])
    }

    pub fn by_category(&self, category: BuildingCategory) -> Vec<&Building> {
        self.buildings.iter().filter(|b| b.category == category).collect()
    }

    pub fn nearest(&self, position: Vec3, category: BuildingCategory, limit: usize) -> Vec<&Building> {
        let mut ranked: Vec<(f32, &Building)> = self
            .buildings
            .iter()
            .filter(|b| b.category == category)
            .map(|b| (b.ground_distance(position), b))
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0));
        ranked.into_iter().take(limit).map(|(_, b)| b).collect()
    }

    pub fn with_amenity(&self, amenity: &str) -> Vec<&Building> {
        let needle = amenity.to_lowercase();
        self.buildings
            .iter()
            .filter(|b| b.amenities.iter().any(|a| a.to_lowercase().contains(&needle)))
            .collect()
    }

    pub fn study_locations(&self) -> Vec<&Building> {
        self.buildings.iter().filter(|b| b.has_study_rooms).collect()
    }

    pub fn cafes(&self) -> Vec<&Building> {
        self.buildings.iter().filter(|b| b.has_cafe).collect()
    }

    pub fn dining_locations(&self) -> Vec<&Building> {
        self.buildings.iter().filter(|b| b.has_dining).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_table_parses() {
        let registry = BuildingRegistry::embedded().expect("embedded table");
        assert_eq!(registry.len(), 33);
        let nassau = registry.get("nassau-hall").expect("nassau hall present");
        assert_eq!(nassau.category, BuildingCategory::Administrative);
        assert_eq!(nassau.style, ArchitecturalStyle::Colonial);
        assert!(nassau.interactable);
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let json = r##"[
            {"id": "a", "name": "A", "category": "cafe", "position": [0,0,0], "size": [1,1,1],
             "color": "#fff", "style": "modern", "description": ""},
            {"id": "a", "name": "A2", "category": "cafe", "position": [1,0,0], "size": [1,1,1],
             "color": "#fff", "style": "modern", "description": ""}
        ]"##;
        let err = BuildingRegistry::from_json(json).err().expect("duplicate should fail");
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn degenerate_sizes_are_rejected() {
        let json = r##"[{"id": "a", "name": "A", "category": "cafe", "position": [0,0,0], "size": [1,1,1],
             "color": "#fff", "style": "modern", "description": ""}]"##;
        let template: Vec<Building> = serde_json::from_str(json).expect("template building");
        for size in [Vec3::new(f32::NAN, 1.0, 1.0), Vec3::new(1.0, f32::INFINITY, 1.0), Vec3::new(1.0, 0.0, 1.0)] {
            let mut buildings = template.clone();
            buildings[0].size = size;
            let err = BuildingRegistry::from_buildings(buildings).err().expect("degenerate size should fail");
            assert!(err.to_string().contains("finite positive size"), "{size:?}: {err}");
        }
    }

    #[test]
    fn bounds_rest_on_ground() {
        let registry = BuildingRegistry::embedded().unwrap();
        let (min, max) = registry.get("firestone").unwrap().bounds();
        assert_eq!(min, Vec3::new(-17.5, 0.0, 62.5));
        assert_eq!(max, Vec3::new(17.5, 20.0, 77.5));
    }
}
