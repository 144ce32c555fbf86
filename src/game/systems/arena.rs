//! Arena layout
//!
//! Square floor with four walls, twelve cylindrical pillars, four turret
//! sites and a ring of spectators outside the walls. Geometry is fixed for the
//! whole session; only spectators animate.

use std::f32::consts::TAU;

use crate::config::ArenaConfig;
use crate::game::constants::arena::*;
use crate::game::presentation::{Color, GraphicsHandle, Material, Presentation, Transform, VisualKind};
use crate::util::vec3::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pillar {
    pub position: Vec3,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy)]
pub struct Spectator {
    pub visual: GraphicsHandle,
    pub base: Vec3,
    /// Bob phase offset so the crowd does not move in lockstep
    pub phase: f32,
}

#[derive(Debug, Clone)]
pub struct Arena {
    pub half_size: f32,
    pub wall_thickness: f32,
    pub world_extent_limit: f32,
    pub pillars: Vec<Pillar>,
    pub turret_sites: [Vec3; 4],
    pub spectators: Vec<Spectator>,
}

impl Arena {
    /// Geometry only; no visuals are created
    pub fn new(config: &ArenaConfig) -> Self {
        let half = config.half_size;
        let pillars = PILLAR_LAYOUT
            .iter()
            .map(|(fx, fz)| Pillar {
                position: Vec3::new(fx * half, GROUND_HEIGHT, fz * half),
                radius: PILLAR_RADIUS,
            })
            .collect();

        let site = TURRET_SITE_FRACTION * half;
        let turret_sites = [
            Vec3::new(site, GROUND_HEIGHT, site),
            Vec3::new(-site, GROUND_HEIGHT, site),
            Vec3::new(site, GROUND_HEIGHT, -site),
            Vec3::new(-site, GROUND_HEIGHT, -site),
        ];

        Self {
            half_size: half,
            wall_thickness: config.wall_thickness,
            world_extent_limit: config.world_extent_limit,
            pillars,
            turret_sites,
            spectators: Vec::new(),
        }
    }

    /// Create the static visuals: walls, pillars and the spectator ring
    pub fn build_visuals(&mut self, gfx: &mut dyn Presentation, wall_height: f32) {
        let half = self.half_size;
        let t = self.wall_thickness;
        let wall = Material::glowing(Color::CYAN, 0.5);
        let center_y = wall_height / 2.0;

        // North, south, east, west
        let walls = [
            (Vec3::new(0.0, center_y, half - t / 2.0), Vec3::new(half * 2.0, wall_height, t)),
            (Vec3::new(0.0, center_y, -half + t / 2.0), Vec3::new(half * 2.0, wall_height, t)),
            (Vec3::new(half - t / 2.0, center_y, 0.0), Vec3::new(t, wall_height, half * 2.0)),
            (Vec3::new(-half + t / 2.0, center_y, 0.0), Vec3::new(t, wall_height, half * 2.0)),
        ];
        for (position, scale) in walls {
            let transform = Transform {
                position,
                rotation: Vec3::ZERO,
                scale,
            };
            gfx.create_visual(VisualKind::Wall, &transform, &wall);
        }

        let pillar = Material::glowing(Color::MAGENTA, 0.3);
        for p in &self.pillars {
            let transform = Transform {
                position: p.position + Vec3::UP * (PILLAR_HEIGHT / 2.0),
                rotation: Vec3::ZERO,
                scale: Vec3::new(p.radius, PILLAR_HEIGHT, p.radius),
            };
            gfx.create_visual(VisualKind::Pillar, &transform, &pillar);
        }

        let crowd = Material::solid(Color::DARK_GREY);
        let ring = half + SPECTATOR_RING_OFFSET;
        self.spectators = (0..SPECTATOR_COUNT)
            .map(|i| {
                let angle = i as f32 / SPECTATOR_COUNT as f32 * TAU;
                let base = Vec3::new(angle.cos() * ring, 1.0, angle.sin() * ring);
                let visual = gfx.create_visual(VisualKind::Spectator, &Transform::at(base), &crowd);
                Spectator {
                    visual,
                    base,
                    phase: angle * 3.0,
                }
            })
            .collect();
    }

    /// Inner face of the walls
    pub fn inner_bound(&self) -> f32 {
        self.half_size - self.wall_thickness
    }

    /// True if a projectile at `position` has reached a wall or the floor
    pub fn hits_wall(&self, position: Vec3) -> bool {
        let bound = self.inner_bound();
        position.x.abs() > bound || position.z.abs() > bound || position.y < GROUND_HEIGHT
    }

    /// Point on the inner wall face nearest to `position`
    pub fn clamp_inside(&self, position: Vec3) -> Vec3 {
        let bound = self.inner_bound();
        Vec3::new(
            position.x.clamp(-bound, bound),
            position.y.max(GROUND_HEIGHT),
            position.z.clamp(-bound, bound),
        )
    }

    /// Beyond this anything in flight is discarded
    pub fn beyond_world(&self, position: Vec3) -> bool {
        position.length() > self.world_extent_limit
    }

    /// First pillar overlapping a circle of `radius` at `position`
    pub fn pillar_overlap(&self, position: Vec3, radius: f32) -> Option<&Pillar> {
        self.pillars
            .iter()
            .find(|p| position.horizontal_distance_to(p.position) < p.radius + radius)
    }
}
