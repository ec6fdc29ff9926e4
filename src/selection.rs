use crate::campus::{Building, BuildingCategory, BuildingId, BuildingRegistry};
use crate::scene::composer::PickHit;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickOutcome {
    Selected(BuildingId),
    /// The click landed on something that does not take part in selection.
    Unchanged,
    Cleared,
}

/// At most one selected building. Holds the id only; the registry owns the record.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    selected: Option<BuildingId>,
}

impl Selection {
    pub fn selected(&self) -> Option<&BuildingId> {
        self.selected.as_ref()
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected.as_ref().is_some_and(|selected| selected.as_str() == id)
    }

    /// Interactable building hit: replace the selection. Other hit: keep it. Miss: clear it.
    pub fn click(&mut self, hit: Option<&PickHit>) -> ClickOutcome {
        match hit {
            Some(PickHit { building: Some(id), interactable: true, .. }) => {
                info!(building = %id, "building selected");
                self.selected = Some(id.clone());
                ClickOutcome::Selected(id.clone())
            }
            Some(_) => ClickOutcome::Unchanged,
            None => self.close(),
        }
    }

    pub fn close(&mut self) -> ClickOutcome {
        match self.selected.take() {
            Some(id) => {
                info!(building = %id, "selection cleared");
                ClickOutcome::Cleared
            }
            None => ClickOutcome::Unchanged,
        }
    }

    pub fn info_panel(&self, registry: &BuildingRegistry) -> Option<InfoPanelContent> {
        let id = self.selected.as_ref()?;
        registry.get(id.as_str()).map(InfoPanelContent::from_building)
    }
}

/// Text shown in the building info panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoPanelContent {
    pub id: BuildingId,
    pub title: String,
    pub category: &'static str,
    pub description: String,
    pub amenities: Vec<String>,
    pub capacity: Option<String>,
    pub open_hours: Option<String>,
    pub services: Vec<&'static str>,
}

impl InfoPanelContent {
    pub fn from_building(building: &Building) -> Self {
        let capacity = building.capacity.map(|count| match building.category {
            BuildingCategory::Residential => format!("{count} students"),
            _ => format!("{count} people"),
        });
        let services = [
            (building.has_study_rooms, "Study rooms"),
            (building.has_cafe, "Cafe"),
            (building.has_dining, "Dining"),
        ]
        .into_iter()
        .filter_map(|(present, label)| present.then_some(label))
        .collect();
        Self {
            id: building.id.clone(),
            title: building.name.clone(),
            category: building.category.label(),
            description: building.description.clone(),
            amenities: building.amenities.clone(),
            capacity,
            open_hours: building.open_hours.clone(),
            services,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy_ecs::entity::Entity;

    fn hit(building: Option<&str>, interactable: bool) -> PickHit {
        PickHit {
            entity: Entity::from_raw(7),
            distance: 10.0,
            building: building.map(BuildingId::from),
            interactable,
        }
    }

    #[test]
    fn new_selection_replaces_previous() {
        let mut selection = Selection::default();
        selection.click(Some(&hit(Some("frist"), true)));
        let outcome = selection.click(Some(&hit(Some("firestone"), true)));
        assert_eq!(outcome, ClickOutcome::Selected(BuildingId::new("firestone")));
        assert!(selection.is_selected("firestone"));
        assert!(!selection.is_selected("frist"));
    }

    #[test]
    fn non_interactable_hit_keeps_selection() {
        let mut selection = Selection::default();
        selection.click(Some(&hit(Some("frist"), true)));
        assert_eq!(selection.click(Some(&hit(Some("chapel"), false))), ClickOutcome::Unchanged);
        assert_eq!(selection.click(Some(&hit(None, false))), ClickOutcome::Unchanged);
        assert!(selection.is_selected("frist"));
    }

    #[test]
    fn miss_and_close_clear() {
        let mut selection = Selection::default();
        selection.click(Some(&hit(Some("frist"), true)));
        assert_eq!(selection.click(None), ClickOutcome::Cleared);
        assert!(selection.selected().is_none());
        assert_eq!(selection.close(), ClickOutcome::Unchanged);
    }

    #[test]
    fn panel_content_comes_from_registry() {
        let registry = BuildingRegistry::embedded().unwrap();
        let mut selection = Selection::default();
        selection.click(Some(&hit(Some("firestone"), true)));
        let panel = selection.info_panel(&registry).expect("panel");
        assert_eq!(panel.category, "Library");
        assert!(panel.services.contains(&"Study rooms"));
    }
}
