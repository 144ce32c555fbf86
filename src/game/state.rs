//! Game state definitions and structures
//!
//! One mutable snapshot shared by every subsystem during a tick: the local
//! vehicle, turrets, arena, pickups, mirrored remote players and the transform
//! hierarchy for articulated visuals.

use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::game::constants::{camera, turret, vehicle, wheels};
use crate::game::network::{PlayerId, RemoteRoster};
use crate::game::presentation::{Color, GraphicsHandle, Material, Presentation, Transform, VisualKind};
use crate::game::systems::arena::Arena;
use crate::game::systems::pickups::PickupField;
use crate::game::transform::{NodeId, TransformArena};
use crate::util::vec3::Vec3;

/// Transform nodes for the truck body and its wheels
#[derive(Debug, Clone, Copy)]
pub struct VehicleRig {
    pub body: NodeId,
    /// Front left, front right, rear left, rear right
    pub wheels: [NodeId; 4],
}

impl VehicleRig {
    pub fn build(transforms: &mut TransformArena, gfx: &mut dyn Presentation, position: Vec3) -> Self {
        let (hx, hy, hz) = vehicle::HALF_EXTENTS;
        let body_transform = Transform {
            position,
            rotation: Vec3::ZERO,
            scale: Vec3::new(hx * 2.0, hy * 2.0, hz * 2.0),
        };
        let body_visual = gfx.create_visual(
            VisualKind::VehicleBody,
            &body_transform,
            &Material::glowing(Color::CYAN, 0.4),
        );
        let body = transforms.insert_root(body_transform, Some(body_visual));

        // Wheel offsets are given in world units; undo the body scale
        let wheel_material = Material::solid(Color::DARK_GREY);
        let inverse = Vec3::new(0.5 / hx, 0.5 / hy, 0.5 / hz);
        let wheels = wheels::OFFSETS.map(|(x, z)| {
            let local = Transform {
                position: Vec3::new(x, -hy, z).scale_by(inverse),
                rotation: Vec3::ZERO,
                scale: Vec3::splat(wheels::RADIUS).scale_by(inverse),
            };
            let visual = gfx.create_visual(VisualKind::Wheel, &local, &wheel_material);
            transforms.insert_child(body, local, Some(visual))
        });

        Self { body, wheels }
    }
}

/// The locally controlled truck
#[derive(Debug, Clone)]
pub struct Vehicle {
    pub player_id: PlayerId,
    pub position: Vec3,
    pub yaw: f32,
    /// Signed speed along the facing direction
    pub velocity: f32,
    pub health: u32,
    pub max_health: u32,
    pub ammo: u32,
    pub fire_cooldown: f32,

    // Timed buffs, in ticks remaining
    pub shield_ticks: f32,
    pub damage_boost_ticks: f32,
    pub speed_boost_ticks: f32,

    /// Low-health warning already played
    pub warned_low_health: bool,
    /// Set once on game over; control is disabled afterwards
    pub destroyed: bool,

    pub steer: f32,
    pub wheel_roll: f32,
    pub rig: Option<VehicleRig>,
}

impl Vehicle {
    pub fn new(player_id: PlayerId, config: &SimConfig) -> Self {
        Self {
            player_id,
            position: Vec3::new(0.0, vehicle::RIDE_HEIGHT, 0.0),
            yaw: 0.0,
            velocity: 0.0,
            health: config.vehicle.max_health,
            max_health: config.vehicle.max_health,
            ammo: config.projectile.start_ammo,
            fire_cooldown: 0.0,
            shield_ticks: 0.0,
            damage_boost_ticks: 0.0,
            speed_boost_ticks: 0.0,
            warned_low_health: false,
            destroyed: false,
            steer: 0.0,
            wheel_roll: 0.0,
            rig: None,
        }
    }

    /// Unit vector the truck faces
    pub fn forward(&self) -> Vec3 {
        Vec3::from_yaw(self.yaw)
    }

    pub fn is_alive(&self) -> bool {
        !self.destroyed && self.health > 0
    }

    pub fn shield_active(&self) -> bool {
        self.shield_ticks > 0.0
    }

    pub fn damage_boost_active(&self) -> bool {
        self.damage_boost_ticks > 0.0
    }

    pub fn speed_boost_active(&self) -> bool {
        self.speed_boost_ticks > 0.0
    }

    /// Axis-aligned hit test, widened by `margin`. The horizontal half extent
    /// is the longer body axis so the box covers every heading.
    pub fn hit_test(&self, point: Vec3, margin: f32) -> bool {
        let (hx, hy, hz) = vehicle::HALF_EXTENTS;
        let horizontal = hx.max(hz) + margin;
        let d = (point - self.position).abs();
        d.x <= horizontal && d.z <= horizontal && d.y <= hy + margin
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurretState {
    /// No target in range
    Idle,
    /// Rotating toward the target
    Tracking,
    /// Facing the target with the weapon ready
    Aligned,
    /// Shot this tick
    Firing,
    /// Waiting for the randomized reload
    Cooldown,
    /// Waiting for respawn
    Destroyed,
}

/// Fixed arena turret
#[derive(Debug, Clone)]
pub struct Turret {
    pub id: usize,
    pub position: Vec3,
    pub yaw: f32,
    pub health: u32,
    pub max_health: u32,
    pub shoot_cooldown: f32,
    pub state: TurretState,
    pub last_shot_frame: Option<u64>,
    /// Ticks until respawn while destroyed
    pub respawn_in: f32,
    pub destroyed_frame: Option<u64>,
    /// Ticks of recoil animation left
    pub recoil: f32,
    pub base: NodeId,
    pub barrel: NodeId,
    pub visuals: [GraphicsHandle; 2],
}

impl Turret {
    pub fn spawn(
        id: usize,
        position: Vec3,
        config: &SimConfig,
        transforms: &mut TransformArena,
        gfx: &mut dyn Presentation,
    ) -> Self {
        let base_transform = Transform {
            position,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        };
        let base_visual = gfx.create_visual(
            VisualKind::TurretBase,
            &base_transform,
            &Material::glowing(Color::ORANGE, 0.3),
        );
        let base = transforms.insert_root(base_transform, Some(base_visual));

        let barrel_transform = Transform::at(Vec3::new(0.0, turret::BARREL_HEIGHT, turret::BARREL_LENGTH / 2.0));
        let barrel_visual = gfx.create_visual(
            VisualKind::TurretBarrel,
            &barrel_transform,
            &Material::solid(Color::DARK_GREY),
        );
        let barrel = transforms.insert_child(base, barrel_transform, Some(barrel_visual));

        Self {
            id,
            position,
            yaw: 0.0,
            health: config.turret.max_health,
            max_health: config.turret.max_health,
            shoot_cooldown: config.turret.cooldown_min,
            state: TurretState::Idle,
            last_shot_frame: None,
            respawn_in: 0.0,
            destroyed_frame: None,
            recoil: 0.0,
            base,
            barrel,
            visuals: [base_visual, barrel_visual],
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.state == TurretState::Destroyed
    }

    /// Widened box around the turret body, from the ground up
    pub fn hit_test(&self, point: Vec3, margin: f32) -> bool {
        let reach = turret::HALF_EXTENT + margin;
        let d = point - self.position;
        d.x.abs() <= reach && d.z.abs() <= reach && d.y >= -margin && d.y <= turret::BODY_HEIGHT + margin
    }
}

/// Smoothed chase camera
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChaseCamera {
    pub position: Vec3,
}

/// Complete simulation snapshot
pub struct GameState {
    pub vehicle: Vehicle,
    pub turrets: Vec<Turret>,
    pub arena: Arena,
    pub pickups: PickupField,
    pub roster: RemoteRoster,
    pub transforms: TransformArena,
    pub camera: ChaseCamera,
    pub score: u64,
    /// Ambient animation clock, in ticks
    pub ambient_clock: f32,
}

impl GameState {
    /// Lay out the arena and create every long-lived visual
    pub fn new(config: &SimConfig, gfx: &mut dyn Presentation, local_player: PlayerId) -> Self {
        let mut arena = Arena::new(&config.arena);
        arena.build_visuals(gfx, config.arena.wall_height);

        let mut transforms = TransformArena::new();
        let turrets = arena
            .turret_sites
            .iter()
            .enumerate()
            .map(|(id, site)| Turret::spawn(id, *site, config, &mut transforms, gfx))
            .collect();

        let mut vehicle = Vehicle::new(local_player, config);
        vehicle.rig = Some(VehicleRig::build(&mut transforms, gfx, vehicle.position));

        let camera = ChaseCamera {
            position: vehicle.position - vehicle.forward() * camera::DISTANCE + Vec3::UP * camera::HEIGHT,
        };

        Self {
            pickups: PickupField::new(&config.pickups, gfx),
            vehicle,
            turrets,
            arena,
            roster: RemoteRoster::new(),
            transforms,
            camera,
            score: 0,
            ambient_clock: 0.0,
        }
    }

    pub fn turrets_alive(&self) -> usize {
        self.turrets.iter().filter(|t| !t.is_destroyed()).count()
    }
}
