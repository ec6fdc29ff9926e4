//! Maps an architectural style tag to the parameters a renderer needs to build the building.
//! Kept free of any renderer types so the mapping stays testable.

use crate::campus::ArchitecturalStyle;
use glam::{Vec2, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BodyShape {
    Box,
    Rotunda { segments: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceParams {
    pub roughness: f32,
    pub metalness: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Roof {
    /// Added to width and depth of the body.
    pub overhang: f32,
    pub thickness: f32,
    pub color: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowGrid {
    pub rows: u32,
    pub columns: u32,
    /// Horizontal distance between window centres, starting 2 units in from the left edge.
    pub spacing: f32,
    pub first_row_height: f32,
    pub row_step: f32,
    pub pane: Vec2,
    pub color: &'static str,
    pub opacity: f32,
}

impl WindowGrid {
    pub fn count(&self) -> u32 {
        self.rows * self.columns
    }

    /// Pane centres in building-local space on the front face.
    pub fn centres(&self, size: Vec3) -> Vec<Vec3> {
        let mut out = Vec::with_capacity(self.count() as usize);
        for row in 0..self.rows {
            for col in 0..self.columns {
                let x = -size.x / 2.0 + 2.0 + col as f32 * self.spacing;
                let y = self.first_row_height + row as f32 * self.row_step;
                out.push(Vec3::new(x, y, size.z / 2.0 + 0.1));
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Ornament {
    Dome { radius: f32, color: &'static str, metalness: f32, roughness: f32 },
    Colonnade { count: u32, ring_radius: f32, column_radius: f32, height: f32 },
    Portico { offsets: [f32; 2], column_radius: f32, height: f32, color: &'static str },
    Entrance { width: f32, height: f32, color: &'static str },
    GlassFacade { width: f32, height: f32, depth: f32, opacity: f32, metalness: f32, color: &'static str },
    Turret { offset: Vec3, radius: f32, height: f32, cap_radius: f32, cap_height: f32, cap_color: &'static str },
    HalfTimbering { beams: u32, color: &'static str },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleGeometry {
    pub body: BodyShape,
    pub surface: SurfaceParams,
    pub roof: Option<Roof>,
    pub windows: Option<WindowGrid>,
    pub ornaments: Vec<Ornament>,
}

pub fn style_geometry(style: ArchitecturalStyle, size: Vec3) -> StyleGeometry {
    let (width, height, depth) = (size.x, size.y, size.z);
    match style {
        ArchitecturalStyle::Classical => StyleGeometry {
            body: BodyShape::Rotunda { segments: 24 },
            surface: SurfaceParams { roughness: 0.8, metalness: 0.0 },
            roof: None,
            windows: None,
            ornaments: vec![
                Ornament::Dome { radius: width / 2.0, color: "#d4af37", metalness: 0.6, roughness: 0.4 },
                Ornament::Colonnade {
                    count: 12,
                    ring_radius: width / 2.0 - 1.0,
                    column_radius: 0.4,
                    height,
                },
            ],
        },
        ArchitecturalStyle::Gothic => StyleGeometry {
            body: BodyShape::Box,
            surface: SurfaceParams { roughness: 0.85, metalness: 0.0 },
            roof: Some(Roof { overhang: 1.0, thickness: 2.0, color: "#5d4e37" }),
            windows: Some(WindowGrid {
                rows: 1,
                columns: (width / 4.0).floor() as u32,
                spacing: 4.0,
                first_row_height: height / 2.0,
                row_step: 0.0,
                pane: Vec2::new(1.5, 3.0),
                color: "#5d7a8a",
                opacity: 0.7,
            }),
            ornaments: vec![Ornament::Entrance { width: 3.0, height: 6.0, color: "#4a3520" }],
        },
        ArchitecturalStyle::Colonial => StyleGeometry {
            body: BodyShape::Box,
            surface: SurfaceParams { roughness: 0.8, metalness: 0.0 },
            roof: Some(Roof { overhang: 1.0, thickness: 1.5, color: "#6b4423" }),
            windows: Some(WindowGrid {
                rows: 3,
                columns: (width / 3.5).floor() as u32,
                spacing: 3.5,
                first_row_height: 3.0,
                row_step: 3.0,
                pane: Vec2::new(1.2, 2.5),
                color: "#6b94a8",
                opacity: 0.7,
            }),
            ornaments: vec![Ornament::Portico {
                offsets: [-width / 4.0, width / 4.0],
                column_radius: 0.3,
                height,
                color: "#f5f5dc",
            }],
        },
        ArchitecturalStyle::Tudor => StyleGeometry {
            body: BodyShape::Box,
            surface: SurfaceParams { roughness: 0.9, metalness: 0.0 },
            roof: Some(Roof { overhang: 1.2, thickness: 2.5, color: "#3b2a1a" }),
            windows: Some(WindowGrid {
                rows: 2,
                columns: (width / 3.0).floor() as u32,
                spacing: 3.0,
                first_row_height: 2.5,
                row_step: 3.5,
                pane: Vec2::new(1.0, 1.8),
                color: "#5d7a8a",
                opacity: 0.7,
            }),
            ornaments: vec![Ornament::HalfTimbering { beams: (width / 1.5).floor() as u32, color: "#3b2a1a" }],
        },
        ArchitecturalStyle::Modern => StyleGeometry {
            body: BodyShape::Box,
            surface: SurfaceParams { roughness: 0.4, metalness: 0.3 },
            roof: Some(Roof { overhang: 0.5, thickness: 0.5, color: "#686868" }),
            windows: None,
            ornaments: vec![Ornament::GlassFacade {
                width: (width - 4.0).max(0.5),
                height: (height - 2.0).max(0.5),
                depth: 0.5,
                opacity: 0.5,
                metalness: 0.8,
                color: "#d0e8f0",
            }],
        },
        ArchitecturalStyle::Victorian => StyleGeometry {
            body: BodyShape::Box,
            surface: SurfaceParams { roughness: 0.85, metalness: 0.0 },
            roof: Some(Roof { overhang: 1.0, thickness: 1.5, color: "#8b4513" }),
            windows: None,
            ornaments: vec![Ornament::Turret {
                offset: Vec3::new(-width / 3.0, height * 0.7, -depth / 3.0),
                radius: 2.0,
                height: height * 0.6,
                cap_radius: 2.5,
                cap_height: 3.0,
                cap_color: "#8b4513",
            }],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gothic_windows_follow_width() {
        let geometry = style_geometry(ArchitecturalStyle::Gothic, Vec3::new(25.0, 15.0, 20.0));
        let windows = geometry.windows.expect("gothic has windows");
        assert_eq!(windows.columns, 6);
        assert_eq!(windows.rows, 1);
        let centres = windows.centres(Vec3::new(25.0, 15.0, 20.0));
        assert_eq!(centres[0], Vec3::new(-10.5, 7.5, 10.1));
    }

    #[test]
    fn classical_is_a_domed_rotunda() {
        let geometry = style_geometry(ArchitecturalStyle::Classical, Vec3::new(16.0, 14.0, 16.0));
        assert_eq!(geometry.body, BodyShape::Rotunda { segments: 24 });
        assert!(geometry.roof.is_none());
        assert!(geometry.ornaments.iter().any(|o| matches!(o, Ornament::Dome { radius, .. } if *radius == 8.0)));
    }

    #[test]
    fn colonial_grid_has_three_rows() {
        let geometry = style_geometry(ArchitecturalStyle::Colonial, Vec3::new(28.0, 14.0, 10.0));
        assert_eq!(geometry.windows.map(|w| w.count()), Some(24));
    }

    #[test]
    fn small_modern_facade_never_collapses() {
        let geometry = style_geometry(ArchitecturalStyle::Modern, Vec3::new(3.0, 2.0, 3.0));
        match geometry.ornaments[0] {
            Ornament::GlassFacade { width, height, .. } => {
                assert!(width > 0.0 && height > 0.0);
            }
            other => panic!("unexpected ornament {other:?}"),
        }
    }
}
