//! Presentation boundary
//!
//! The simulation never renders. It creates visuals once, then only moves,
//! fades, recolours and toggles them through the [`Presentation`] trait.
//! [`HeadlessPresentation`] records every call so the driver binary and the
//! tests can run without a renderer.

use serde::{Deserialize, Serialize};

use crate::util::vec3::Vec3;

/// Opaque handle to a visual owned by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphicsHandle(pub u32);

/// What kind of visual to create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VisualKind {
    Particle,
    Debris,
    Light,
    Shockwave,
    Trail,
    Projectile,
    VehicleBody,
    Wheel,
    TurretBase,
    TurretBarrel,
    Wall,
    Pillar,
    Spectator,
    Pickup,
}

/// Linear RGB colour
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const ORANGE: Color = Color::rgb(1.0, 0.5, 0.0);
    pub const YELLOW: Color = Color::rgb(1.0, 1.0, 0.0);
    pub const CYAN: Color = Color::rgb(0.0, 1.0, 1.0);
    pub const MAGENTA: Color = Color::rgb(1.0, 0.0, 1.0);
    pub const GREEN: Color = Color::rgb(0.0, 1.0, 0.0);
    pub const SMOKE: Color = Color::rgb(0.3, 0.3, 0.3);
    pub const DARK_GREY: Color = Color::rgb(0.2, 0.2, 0.2);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Build from a 0xRRGGBB literal
    pub fn hex(value: u32) -> Self {
        Self {
            r: ((value >> 16) & 0xff) as f32 / 255.0,
            g: ((value >> 8) & 0xff) as f32 / 255.0,
            b: (value & 0xff) as f32 / 255.0,
        }
    }

    pub fn lerp(&self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
        }
    }
}

/// Surface description passed when a visual is created
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub color: Color,
    /// Emissive strength; 0 for lit surfaces
    pub emissive: f32,
    pub opacity: f32,
}

impl Material {
    pub const fn solid(color: Color) -> Self {
        Self {
            color,
            emissive: 0.0,
            opacity: 1.0,
        }
    }

    pub const fn glowing(color: Color, emissive: f32) -> Self {
        Self {
            color,
            emissive,
            opacity: 1.0,
        }
    }
}

/// Position, Euler rotation (pitch, yaw, roll) and scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn with_yaw(mut self, yaw: f32) -> Self {
        self.rotation.y = yaw;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }
}

/// Narrow rendering interface consumed by the simulation
pub trait Presentation {
    fn create_visual(&mut self, kind: VisualKind, transform: &Transform, material: &Material)
        -> GraphicsHandle;
    fn set_transform(&mut self, handle: GraphicsHandle, position: Vec3, rotation: Vec3, scale: Vec3);
    fn set_opacity(&mut self, handle: GraphicsHandle, opacity: f32);
    fn set_intensity(&mut self, handle: GraphicsHandle, intensity: f32);
    fn set_color(&mut self, handle: GraphicsHandle, color: Color);
    fn set_visible(&mut self, handle: GraphicsHandle, visible: bool);
    fn destroy_visual(&mut self, handle: GraphicsHandle);
    fn set_camera(&mut self, position: Vec3, look_at: Vec3);
}

/// Last known state of one headless visual
#[derive(Debug, Clone, PartialEq)]
pub struct VisualRecord {
    pub kind: VisualKind,
    pub transform: Transform,
    pub color: Color,
    pub opacity: f32,
    pub intensity: f32,
    pub visible: bool,
    pub destroyed: bool,
}

/// Presentation that keeps every visual's state in memory
#[derive(Debug, Default)]
pub struct HeadlessPresentation {
    visuals: Vec<VisualRecord>,
    camera: Option<(Vec3, Vec3)>,
    /// Calls that targeted a destroyed or unknown handle
    stale_calls: u64,
}

impl HeadlessPresentation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visual(&self, handle: GraphicsHandle) -> Option<&VisualRecord> {
        self.visuals.get(handle.0 as usize).filter(|v| !v.destroyed)
    }

    /// Number of visuals created and not destroyed
    pub fn live_count(&self) -> usize {
        self.visuals.iter().filter(|v| !v.destroyed).count()
    }

    pub fn visible_count(&self, kind: VisualKind) -> usize {
        self.visuals
            .iter()
            .filter(|v| v.kind == kind && v.visible && !v.destroyed)
            .count()
    }

    pub fn created_count(&self, kind: VisualKind) -> usize {
        self.visuals.iter().filter(|v| v.kind == kind).count()
    }

    pub fn camera(&self) -> Option<(Vec3, Vec3)> {
        self.camera
    }

    pub fn stale_calls(&self) -> u64 {
        self.stale_calls
    }

    fn record_mut(&mut self, handle: GraphicsHandle) -> Option<&mut VisualRecord> {
        match self.visuals.get_mut(handle.0 as usize) {
            Some(record) if !record.destroyed => Some(record),
            _ => {
                self.stale_calls += 1;
                None
            }
        }
    }
}

impl Presentation for HeadlessPresentation {
    fn create_visual(
        &mut self,
        kind: VisualKind,
        transform: &Transform,
        material: &Material,
    ) -> GraphicsHandle {
        let handle = GraphicsHandle(self.visuals.len() as u32);
        self.visuals.push(VisualRecord {
            kind,
            transform: *transform,
            color: material.color,
            opacity: material.opacity,
            intensity: material.emissive,
            visible: true,
            destroyed: false,
        });
        handle
    }

    fn set_transform(&mut self, handle: GraphicsHandle, position: Vec3, rotation: Vec3, scale: Vec3) {
        if let Some(record) = self.record_mut(handle) {
            record.transform = Transform {
                position,
                rotation,
                scale,
            };
        }
    }

    fn set_opacity(&mut self, handle: GraphicsHandle, opacity: f32) {
        if let Some(record) = self.record_mut(handle) {
            record.opacity = opacity;
        }
    }

    fn set_intensity(&mut self, handle: GraphicsHandle, intensity: f32) {
        if let Some(record) = self.record_mut(handle) {
            record.intensity = intensity;
        }
    }

    fn set_color(&mut self, handle: GraphicsHandle, color: Color) {
        if let Some(record) = self.record_mut(handle) {
            record.color = color;
        }
    }

    fn set_visible(&mut self, handle: GraphicsHandle, visible: bool) {
        if let Some(record) = self.record_mut(handle) {
            record.visible = visible;
        }
    }

    fn destroy_visual(&mut self, handle: GraphicsHandle) {
        if let Some(record) = self.record_mut(handle) {
            record.destroyed = true;
            record.visible = false;
        }
    }

    fn set_camera(&mut self, position: Vec3, look_at: Vec3) {
        self.camera = Some((position, look_at));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headless_records_state() {
        let mut gfx = HeadlessPresentation::new();
        let handle = gfx.create_visual(
            VisualKind::Light,
            &Transform::at(Vec3::new(1.0, 2.0, 3.0)),
            &Material::glowing(Color::ORANGE, 2.0),
        );

        gfx.set_intensity(handle, 0.5);
        gfx.set_opacity(handle, 0.25);
        gfx.set_visible(handle, false);

        let record = gfx.visual(handle).unwrap();
        assert_eq!(record.intensity, 0.5);
        assert_eq!(record.opacity, 0.25);
        assert!(!record.visible);
        assert_eq!(record.transform.position, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_destroyed_handle_is_stale() {
        let mut gfx = HeadlessPresentation::new();
        let handle = gfx.create_visual(
            VisualKind::Projectile,
            &Transform::default(),
            &Material::solid(Color::WHITE),
        );
        gfx.destroy_visual(handle);

        assert!(gfx.visual(handle).is_none());
        gfx.set_opacity(handle, 1.0);
        gfx.set_opacity(GraphicsHandle(99), 1.0);
        assert_eq!(gfx.stale_calls(), 2);
        assert_eq!(gfx.live_count(), 0);
    }

    #[test]
    fn test_color_hex_and_lerp() {
        let c = Color::hex(0xff8000);
        assert_eq!(c.r, 1.0);
        assert!((c.g - 128.0 / 255.0).abs() < 1e-6);
        assert_eq!(c.b, 0.0);

        let mid = Color::RED.lerp(Color::WHITE, 0.5);
        assert_eq!(mid, Color::rgb(1.0, 0.5, 0.5));
        assert_eq!(Color::RED.lerp(Color::WHITE, 2.0), Color::WHITE);
    }
}
