use super::style::{style_geometry, StyleGeometry};
use crate::campus::{ArchitecturalStyle, BuildingCategory, BuildingId, BuildingRegistry};
use crate::config::SceneConfig;
use crate::picking::ray_hit_footprint;
use bevy_ecs::prelude::{Component, Entity, With, World};
use glam::{Quat, Vec2, Vec3};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::debug;

pub const GROUND_SIZE: Vec2 = Vec2::new(300.0, 300.0);
pub const GROUND_COLOR: &str = "#3d5a3d";
pub const PATH_COLOR: &str = "#a89988";
pub const GATE_POSITION: Vec3 = Vec3::new(0.0, 0.0, -40.0);

/// Walkway centres and ground extents (x, z).
const PATHS: [(Vec3, Vec2); 4] = [
    (Vec3::new(0.0, 0.02, 20.0), Vec2::new(10.0, 120.0)),
    (Vec3::new(0.0, 0.02, -20.0), Vec2::new(80.0, 4.0)),
    (Vec3::new(0.0, 0.02, 40.0), Vec2::new(80.0, 5.0)),
    (Vec3::new(50.0, 0.02, 15.0), Vec2::new(5.0, 100.0)),
];

const TREE_POSITIONS: [[f32; 2]; 31] = [
    [-12.0, -15.0], [12.0, -15.0], [-12.0, -5.0], [12.0, -5.0],
    [-25.0, 35.0], [25.0, 35.0], [-15.0, 50.0], [15.0, 50.0],
    [-8.0, 20.0], [8.0, 20.0], [-8.0, 30.0], [8.0, 30.0],
    [-45.0, -35.0], [-45.0, -20.0], [-45.0, 5.0],
    [45.0, -35.0], [45.0, -20.0], [45.0, 5.0],
    [-10.0, 65.0], [10.0, 65.0], [0.0, 75.0],
    [45.0, -5.0], [45.0, 10.0], [45.0, 25.0], [45.0, 40.0],
    [70.0, -5.0], [70.0, 10.0], [70.0, 25.0],
    [-65.0, 25.0], [-65.0, 45.0], [-50.0, 70.0],
];

/// Unscaled tree extents: widest foliage cone radius and top of the crown.
const TREE_RADIUS: f32 = 2.0;
const TREE_HEIGHT: f32 = 8.0;
const TREE_PARTS: usize = 4;
const GATE_PARTS: usize = 4;

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform3D {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

impl Transform3D {
    pub fn at(translation: Vec3) -> Self {
        Self { translation, ..Default::default() }
    }
}

/// Local-space pick volume.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Footprint {
    pub min: Vec3,
    pub max: Vec3,
}

impl Footprint {
    /// Box resting on the local origin, centred in x and z.
    pub fn from_size(size: Vec3) -> Self {
        Self { min: Vec3::new(-size.x / 2.0, 0.0, -size.z / 2.0), max: Vec3::new(size.x / 2.0, size.y, size.z / 2.0) }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }
}

#[derive(Component, Debug, Clone)]
pub struct BuildingTag {
    pub id: BuildingId,
    pub category: BuildingCategory,
    pub style: ArchitecturalStyle,
    pub color: String,
}

/// Present only on entities that react to clicks.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Interactable;

#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hovered(pub bool);

#[derive(Component, Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    /// Height above the entity origin.
    pub height: f32,
    pub font_size: f32,
    pub color: &'static str,
}

impl Label {
    pub fn for_building(name: &str, category: BuildingCategory, height: f32) -> Self {
        let font_size = if category == BuildingCategory::Residential { 0.9 } else { 0.7 };
        let color = if category == BuildingCategory::EatingClub { "#8B6B47" } else { "#ff6600" };
        Self { text: name.to_uppercase(), height: height + 2.0, font_size, color }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropKind {
    Ground,
    Path,
    Gate,
    Tree,
}

#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct SceneProp {
    pub kind: PropKind,
    pub size: Vec3,
}

/// Visual emphasis of one building. Selection wins over hover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Highlight {
    #[default]
    None,
    Hovered,
    Selected,
}

impl Highlight {
    /// Emissive colour and intensity.
    pub fn emissive(self) -> Option<(&'static str, f32)> {
        match self {
            Highlight::None => None,
            Highlight::Hovered => Some(("#ffa500", 0.3)),
            Highlight::Selected => Some(("#ff6600", 0.5)),
        }
    }

    /// Inner and outer radius of the ground ring drawn under a highlighted building.
    pub fn ring(self, building_width: f32) -> Option<(f32, f32)> {
        match self {
            Highlight::None => None,
            Highlight::Hovered | Highlight::Selected => Some((building_width * 0.6, building_width * 0.7)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PickHit {
    pub entity: Entity,
    pub distance: f32,
    pub building: Option<BuildingId>,
    pub interactable: bool,
}

/// Everything drawn in the campus world, composed once from the registry.
pub struct CampusScene {
    world: World,
    buildings: HashMap<BuildingId, Entity>,
    disposed: bool,
}

impl CampusScene {
    pub fn compose(registry: &BuildingRegistry, config: &SceneConfig) -> Self {
        let mut world = World::new();
        let mut buildings = HashMap::with_capacity(registry.len());

        world.spawn((
            Transform3D::default(),
            SceneProp { kind: PropKind::Ground, size: Vec3::new(GROUND_SIZE.x, 0.0, GROUND_SIZE.y) },
        ));
        for (centre, extent) in PATHS {
            world.spawn((
                Transform3D::at(centre),
                SceneProp { kind: PropKind::Path, size: Vec3::new(extent.x, 0.0, extent.y) },
            ));
        }
        world.spawn((
            Transform3D::at(GATE_POSITION),
            Footprint { min: Vec3::new(-4.4, 0.0, -0.4), max: Vec3::new(4.4, 6.0, 0.5) },
            SceneProp { kind: PropKind::Gate, size: Vec3::new(8.8, 6.0, 0.9) },
        ));

        for building in registry.iter() {
            let mut entity = world.spawn((
                Transform3D::at(building.position),
                Footprint::from_size(building.size),
                BuildingTag {
                    id: building.id.clone(),
                    category: building.category,
                    style: building.style,
                    color: building.color.clone(),
                },
                Hovered::default(),
                Label::for_building(&building.name, building.category, building.size.y),
            ));
            if building.interactable {
                entity.insert(Interactable);
            }
            buildings.insert(building.id.clone(), entity.id());
        }

        let mut rng = StdRng::seed_from_u64(config.tree_seed);
        let (low, high) = if config.tree_scale_min <= config.tree_scale_max {
            (config.tree_scale_min, config.tree_scale_max)
        } else {
            (config.tree_scale_max, config.tree_scale_min)
        };
        for [x, z] in TREE_POSITIONS {
            let scale = if high > low { rng.gen_range(low..=high) } else { low };
            world.spawn((
                Transform3D { translation: Vec3::new(x, 0.0, z), rotation: Quat::IDENTITY, scale: Vec3::splat(scale) },
                Footprint::from_size(Vec3::new(TREE_RADIUS * 2.0, TREE_HEIGHT, TREE_RADIUS * 2.0)),
                SceneProp { kind: PropKind::Tree, size: Vec3::new(TREE_RADIUS * 2.0, TREE_HEIGHT, TREE_RADIUS * 2.0) * scale },
            ));
        }

        debug!(buildings = buildings.len(), trees = TREE_POSITIONS.len(), "campus scene composed");
        Self { world, buildings, disposed: false }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    pub fn prop_count(&mut self, kind: PropKind) -> usize {
        let mut query = self.world.query::<&SceneProp>();
        query.iter(&self.world).filter(|prop| prop.kind == kind).count()
    }

    pub fn building_entity(&self, id: &str) -> Option<Entity> {
        self.buildings.get(id).copied()
    }

    pub fn building_id(&self, entity: Entity) -> Option<&BuildingId> {
        self.world.get::<BuildingTag>(entity).map(|tag| &tag.id)
    }

    pub fn is_interactable(&self, entity: Entity) -> bool {
        self.world.get::<Interactable>(entity).is_some()
    }

    pub fn transform(&self, entity: Entity) -> Option<Transform3D> {
        self.world.get::<Transform3D>(entity).copied()
    }

    /// Closest entity with a pick volume along the ray. Ground and paths are never hit.
    pub fn pick(&mut self, origin: Vec3, direction: Vec3) -> Option<PickHit> {
        let dir = direction.normalize_or_zero();
        if dir.length_squared() <= f32::EPSILON {
            return None;
        }
        let mut query = self.world.query::<(Entity, &Transform3D, &Footprint)>();
        let mut closest: Option<(Entity, f32)> = None;
        for (entity, transform, footprint) in query.iter(&self.world) {
            let Some(distance) = ray_hit_footprint(origin, dir, transform, footprint) else {
                continue;
            };
            if closest.map_or(true, |(_, best)| distance < best) {
                closest = Some((entity, distance));
            }
        }
        let (entity, distance) = closest?;
        Some(PickHit {
            entity,
            distance,
            building: self.building_id(entity).cloned(),
            interactable: self.is_interactable(entity),
        })
    }

    /// Hover is stored per entity; several buildings may be hovered at once.
    pub fn set_hover(&mut self, entity: Entity, hovered: bool) -> bool {
        match self.world.get_mut::<Hovered>(entity) {
            Some(mut flag) => {
                flag.0 = hovered;
                true
            }
            None => false,
        }
    }

    pub fn is_hovered(&self, entity: Entity) -> bool {
        self.world.get::<Hovered>(entity).is_some_and(|h| h.0)
    }

    pub fn clear_hover(&mut self) {
        let mut query = self.world.query::<&mut Hovered>();
        for mut hovered in query.iter_mut(&mut self.world) {
            hovered.0 = false;
        }
    }

    pub fn highlight(&self, entity: Entity, selected: Option<&BuildingId>) -> Highlight {
        let is_selected = match (selected, self.building_id(entity)) {
            (Some(selected), Some(id)) => selected == id,
            _ => false,
        };
        if is_selected {
            Highlight::Selected
        } else if self.is_hovered(entity) {
            Highlight::Hovered
        } else {
            Highlight::None
        }
    }

    /// World-space anchors for building labels; empty while labels are hidden.
    pub fn labels(&mut self, visible: bool) -> Vec<(Vec3, Label)> {
        if !visible {
            return Vec::new();
        }
        let mut query = self.world.query::<(&Transform3D, &Label)>();
        query
            .iter(&self.world)
            .map(|(transform, label)| (transform.translation + Vec3::Y * label.height, label.clone()))
            .collect()
    }

    pub fn style_geometry(&self, entity: Entity) -> Option<StyleGeometry> {
        let tag = self.world.get::<BuildingTag>(entity)?;
        let footprint = self.world.get::<Footprint>(entity)?;
        Some(style_geometry(tag.style, footprint.size()))
    }

    /// Rough count of meshes a renderer would allocate for the current scene.
    pub fn estimated_geometries(&mut self) -> usize {
        let mut query = self.world.query_filtered::<(&BuildingTag, &Footprint), With<Hovered>>();
        let buildings: usize = query
            .iter(&self.world)
            .map(|(tag, footprint)| {
                let geometry = style_geometry(tag.style, footprint.size());
                1 + usize::from(geometry.roof.is_some())
                    + geometry.windows.map_or(0, |w| w.count() as usize)
                    + geometry.ornaments.len()
            })
            .sum();
        let mut props = self.world.query::<&SceneProp>();
        let props: usize = props
            .iter(&self.world)
            .map(|prop| match prop.kind {
                PropKind::Tree => TREE_PARTS,
                PropKind::Gate => GATE_PARTS,
                PropKind::Ground | PropKind::Path => 1,
            })
            .sum();
        buildings + props
    }

    /// Drops every entity. Used as the last step before a forced reload.
    pub fn dispose(&mut self) {
        self.world.clear_entities();
        self.buildings.clear();
        self.disposed = true;
        debug!("campus scene disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene() -> CampusScene {
        let registry = BuildingRegistry::embedded().expect("registry");
        CampusScene::compose(&registry, &SceneConfig::default())
    }

    #[test]
    fn composes_every_static_entity() {
        let mut scene = scene();
        assert_eq!(scene.building_count(), 33);
        assert_eq!(scene.prop_count(PropKind::Tree), 31);
        assert_eq!(scene.prop_count(PropKind::Path), 4);
        assert_eq!(scene.prop_count(PropKind::Ground), 1);
        assert_eq!(scene.prop_count(PropKind::Gate), 1);
    }

    #[test]
    fn tree_scales_are_seeded() {
        let registry = BuildingRegistry::embedded().unwrap();
        let config = SceneConfig::default();
        let mut a = CampusScene::compose(&registry, &config);
        let mut b = CampusScene::compose(&registry, &config);
        let scales = |scene: &mut CampusScene| {
            let mut query = scene.world.query::<(&Transform3D, &SceneProp)>();
            query
                .iter(&scene.world)
                .filter(|(_, prop)| prop.kind == PropKind::Tree)
                .map(|(t, _)| t.scale.x)
                .collect::<Vec<_>>()
        };
        let first = scales(&mut a);
        assert_eq!(first, scales(&mut b));
        assert!(first.iter().all(|s| (0.8..=1.3).contains(s)));
    }

    #[test]
    fn pick_hits_nearest_building_from_above() {
        let mut scene = scene();
        let hit = scene.pick(Vec3::new(0.0, 100.0, 70.0), Vec3::NEG_Y).expect("firestone hit");
        assert_eq!(hit.building.as_ref().map(|id| id.as_str()), Some("firestone"));
        assert!(hit.interactable);
        assert!((hit.distance - 80.0).abs() < 1e-3);
    }

    #[test]
    fn pick_misses_open_ground() {
        let mut scene = scene();
        assert!(scene.pick(Vec3::new(120.0, 50.0, 120.0), Vec3::NEG_Y).is_none());
    }

    #[test]
    fn selection_outranks_hover() {
        let mut scene = scene();
        let entity = scene.building_entity("nassau-hall").unwrap();
        assert!(scene.set_hover(entity, true));
        assert_eq!(scene.highlight(entity, None), Highlight::Hovered);
        let id = BuildingId::new("nassau-hall");
        assert_eq!(scene.highlight(entity, Some(&id)), Highlight::Selected);
        scene.clear_hover();
        assert_eq!(scene.highlight(entity, None), Highlight::None);
        assert_eq!(Highlight::Selected.emissive(), Some(("#ff6600", 0.5)));
    }

    #[test]
    fn labels_follow_visibility_flag() {
        let mut scene = scene();
        assert!(scene.labels(false).is_empty());
        let labels = scene.labels(true);
        assert_eq!(labels.len(), 33);
        assert!(labels.iter().all(|(_, label)| label.text == label.text.to_uppercase()));
    }
}
