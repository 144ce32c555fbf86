//! Top-level frame driver
//!
//! [`Game`] owns every collaborator and subsystem and advances them once per
//! rendered frame. Per tick:
//!
//! 1. apply inbound network and asset events queued since the last tick
//! 2. critical path: vehicle control, weapon, wall and pillar response
//! 3. frame group 0 (every frame): projectiles, then turrets
//! 4. the scheduled group for this frame (collision, pickups or cosmetic)
//! 5. transform hierarchy, camera, game-over check and HUD
//! 6. frame budget bookkeeping

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::{ConfigError, SimConfig};
use crate::game::audio::Audio;
use crate::game::constants::timing::{MAX_DT, TICK_RATE};
use crate::game::context::SimulationContext;
use crate::game::effects::{EffectClass, EffectId, EffectRegistry, ImpactKind};
use crate::game::events::CombatEvent;
use crate::game::hud::{HudObserver, HudPublisher, HudSnapshot};
use crate::game::network::{
    InboundEvent, Inbox, InboxSender, NetworkSink, NoRemoteHits, NullNetwork, PlayerId, RemoteEntity,
    RemoteHitHook,
};
use crate::game::performance::{PerformanceMonitor, PerformanceStatus};
use crate::game::presentation::{HeadlessPresentation, Presentation};
use crate::game::scheduler::{FrameGroup, FramePlan, FrameScheduler};
use crate::game::state::GameState;
use crate::game::systems::projectile::{
    CollisionTargets, ProjectileEngine, ProjectileError, ProjectileId, ProjectileSource, ShotSpec,
};
use crate::game::systems::vehicle::{self, DriveInput};
use crate::game::systems::{ambient, damage, turret};
use crate::metrics::SimMetrics;
use crate::util::vec3::Vec3;

/// Collaborators a [`SimulationContext`] borrows from
struct Runtime<G: Presentation> {
    config: SimConfig,
    gfx: G,
    audio: Audio,
    net: Box<dyn NetworkSink>,
    rng: ChaCha8Rng,
    metrics: SimMetrics,
    events: Vec<CombatEvent>,
    local_player: PlayerId,
    frame: u64,
}

impl<G: Presentation> Runtime<G> {
    fn ctx(&mut self) -> SimulationContext<'_> {
        SimulationContext {
            config: &self.config,
            gfx: &mut self.gfx,
            audio: &mut self.audio,
            net: self.net.as_mut(),
            rng: &mut self.rng,
            metrics: &mut self.metrics,
            events: &mut self.events,
            local_player: self.local_player,
            frame: self.frame,
        }
    }
}

/// The arena simulation
pub struct Game<G: Presentation = HeadlessPresentation> {
    rt: Runtime<G>,
    remote_hits: Box<dyn RemoteHitHook>,
    inbox: Inbox,
    hud: HudPublisher,
    perf: PerformanceMonitor,
    scheduler: FrameScheduler,
    state: GameState,
    effects: EffectRegistry,
    projectiles: ProjectileEngine,
}

impl<G: Presentation> Game<G> {
    /// Validate the config, preallocate every pool and lay out the arena
    pub fn new(config: SimConfig, mut gfx: G) -> Result<Self, ConfigError> {
        config.validate()?;

        let local_player = uuid::Uuid::new_v4();
        let state = GameState::new(&config, &mut gfx, local_player);
        let effects = EffectRegistry::new(&config, &mut gfx);
        let projectiles = ProjectileEngine::new(
            config.projectile.max_active,
            config.projectile.trail_cap_per_frame,
        );

        tracing::info!(
            seed = config.seed,
            half_size = config.arena.half_size,
            turrets = state.turrets.len(),
            effect_slots = effects.capacity(),
            "arena ready"
        );

        Ok(Self {
            rt: Runtime {
                rng: ChaCha8Rng::seed_from_u64(config.seed),
                config,
                gfx,
                audio: Audio::Null,
                net: Box::new(NullNetwork),
                metrics: SimMetrics::new(),
                events: Vec::new(),
                local_player,
                frame: 0,
            },
            remote_hits: Box::new(NoRemoteHits),
            inbox: Inbox::default(),
            hud: HudPublisher::new(),
            perf: PerformanceMonitor::new(TICK_RATE),
            scheduler: FrameScheduler::new(),
            state,
            effects,
            projectiles,
        })
    }

    pub fn with_audio(mut self, audio: Audio) -> Self {
        self.rt.audio = audio;
        self
    }

    pub fn with_network(mut self, net: Box<dyn NetworkSink>) -> Self {
        self.rt.net = net;
        self
    }

    pub fn with_remote_hits(mut self, hook: Box<dyn RemoteHitHook>) -> Self {
        self.remote_hits = hook;
        self
    }

    /// Use a fixed local player id (the transport usually assigns one)
    pub fn with_local_player(mut self, id: PlayerId) -> Self {
        self.rt.local_player = id;
        self.state.vehicle.player_id = id;
        self
    }

    pub fn on_hud(mut self, observer: HudObserver) -> Self {
        self.hud.set_observer(observer);
        self
    }

    /// Handle for transport and asset callbacks
    pub fn inbox_sender(&self) -> InboxSender {
        self.inbox.sender()
    }

    /// Advance the simulation by `dt` ticks
    pub fn tick(&mut self, input: &DriveInput, dt: f32) -> FramePlan {
        self.perf.tick_start();
        let dt = if dt.is_finite() { dt.clamp(0.0, MAX_DT) } else { 0.0 };
        let plan = self.scheduler.begin_frame(dt);
        self.rt.frame = plan.frame;

        self.apply_inbound();

        let Self {
            rt,
            remote_hits,
            scheduler,
            state,
            effects,
            projectiles,
            ..
        } = self;
        let mut ctx = rt.ctx();

        vehicle::update(&mut state.vehicle, input, &state.arena, &mut ctx, effects, projectiles, dt);

        let core_dt = scheduler.take_dt(FrameGroup::WeaponCore);
        let mut targets = CollisionTargets {
            arena: &state.arena,
            vehicle: &mut state.vehicle,
            turrets: &mut state.turrets,
            roster: &state.roster,
            remote_hits: &mut **remote_hits,
            score: &mut state.score,
        };
        projectiles.tick(&mut ctx, &mut targets, effects, core_dt);
        let target = state.vehicle.is_alive().then_some(state.vehicle.position);
        turret::update(&mut state.turrets, target, &mut ctx, projectiles, &mut state.transforms, core_dt);

        // Effects spawned from here on are first charged next frame
        effects.accrue(dt);
        match plan.active {
            FrameGroup::WeaponCore => {}
            FrameGroup::Collision => {
                let group_dt = scheduler.take_dt(FrameGroup::Collision);
                vehicle::resolve_turret_collisions(&mut state.vehicle, &state.turrets, &mut ctx);
                effects.tick_class(EffectClass::Major, group_dt, &mut *ctx.gfx);
            }
            FrameGroup::Pickups => {
                let group_dt = scheduler.take_dt(FrameGroup::Pickups);
                state.pickups.update(&mut state.vehicle, &state.arena, &mut ctx, group_dt);
            }
            FrameGroup::Cosmetic => {
                let group_dt = scheduler.take_dt(FrameGroup::Cosmetic);
                effects.tick_class(EffectClass::Minor, group_dt, &mut *ctx.gfx);
                ambient::update(&state.arena, &mut state.ambient_clock, &mut *ctx.gfx, group_dt);
                state.pickups.animate(&mut *ctx.gfx, group_dt);
            }
        }

        vehicle::animate_rig(&mut state.vehicle, &mut state.transforms, dt);
        state.transforms.propagate();
        state.transforms.push_to(&mut *ctx.gfx);
        vehicle::follow_camera(&mut state.camera, &state.vehicle, &mut *ctx.gfx, dt);

        damage::check_game_over(&mut state.vehicle, state.score, &mut ctx, effects);

        self.publish_hud();
        self.record_frame();
        plan
    }

    /// Apply everything queued by callbacks since the last tick
    fn apply_inbound(&mut self) {
        let Self {
            rt,
            inbox,
            state,
            effects,
            projectiles,
            ..
        } = self;
        let mut ctx = rt.ctx();

        for event in inbox.drain() {
            ctx.metrics.inbound_events += 1;
            match event {
                InboundEvent::RemoteProjectileHit { source, damage } => {
                    let outcome = damage::apply_to_vehicle(&mut state.vehicle, damage, Some(source), &mut ctx);
                    if outcome.applied > 0 || outcome.absorbed {
                        effects.spawn_impact(&mut ctx, state.vehicle.position + Vec3::UP, ImpactKind::Vehicle);
                    }
                }
                InboundEvent::RemoteEntityState {
                    id,
                    position,
                    yaw,
                    health,
                } => {
                    if id == ctx.local_player || !position.is_finite() || !yaw.is_finite() {
                        tracing::warn!(%id, "rejected remote entity state");
                        ctx.metrics.inbound_rejected += 1;
                        continue;
                    }
                    state.roster.insert(
                        id,
                        RemoteEntity {
                            id,
                            position,
                            yaw,
                            health,
                            last_update_frame: ctx.frame,
                        },
                    );
                }
                InboundEvent::RemoteEntityLeft { id } => {
                    if state.roster.remove(&id).is_none() {
                        tracing::debug!(%id, "unknown remote entity left");
                    }
                }
                InboundEvent::RemoteProjectileFired {
                    owner,
                    origin,
                    direction,
                    speed,
                    damage,
                } => {
                    let spec = ShotSpec {
                        origin,
                        direction,
                        speed,
                        damage,
                        source: ProjectileSource::Remote,
                        owner: Some(owner),
                        lifetime: ctx.config.projectile.remote_lifetime,
                    };
                    if projectiles.fire(&mut ctx, spec).is_err() {
                        ctx.metrics.inbound_rejected += 1;
                    }
                }
                InboundEvent::AssetReady { sound } => ctx.audio.asset_ready(sound),
            }
        }
    }

    fn publish_hud(&mut self) {
        let vehicle = &self.state.vehicle;
        let snapshot = HudSnapshot {
            health: vehicle.health,
            max_health: vehicle.max_health,
            health_percent: HudSnapshot::health_percent(vehicle.health, vehicle.max_health),
            ammo: vehicle.ammo,
            score: self.state.score,
            turrets_alive: self.state.turrets_alive(),
            shield_active: vehicle.shield_active(),
            game_over: vehicle.destroyed,
        };
        if self.hud.publish(snapshot) {
            self.rt.metrics.hud_publishes += 1;
        }
    }

    /// Metrics snapshot and frame budget adaptation
    fn record_frame(&mut self) {
        self.effects.record_metrics(&mut self.rt.metrics);
        self.rt.metrics.projectiles_active = self.projectiles.active_count() as u64;

        if let Some(duration) = self.perf.tick_end(self.effects.active_count()) {
            self.rt.metrics.record_tick_time(duration);
        }
        let status = self.perf.status();
        self.rt.metrics.performance_status = status.as_u8();
        self.rt.metrics.budget_usage_percent = self.perf.budget_usage_percent() as u64;
        self.apply_budget(status);
    }

    fn apply_budget(&mut self, status: PerformanceStatus) {
        let trail_cap = status.trail_cap(self.rt.config.projectile.trail_cap_per_frame);
        if trail_cap != self.projectiles.trail_cap() {
            tracing::debug!(?status, trail_cap, "trail budget changed");
            self.projectiles.set_trail_cap(trail_cap);
        }
        self.effects.set_debris_enabled(status.debris_enabled());
    }

    /// Launch a projectile outside the normal weapon path
    pub fn fire_projectile(&mut self, spec: ShotSpec) -> Result<ProjectileId, ProjectileError> {
        let mut ctx = self.rt.ctx();
        self.projectiles.fire(&mut ctx, spec)
    }

    pub fn spawn_explosion(&mut self, position: Vec3, size: f32) -> EffectId {
        let mut ctx = self.rt.ctx();
        self.effects.spawn_explosion(&mut ctx, position, size)
    }

    pub fn spawn_impact(&mut self, position: Vec3, kind: ImpactKind) -> EffectId {
        let mut ctx = self.rt.ctx();
        self.effects.spawn_impact(&mut ctx, position, kind)
    }

    /// Take the combat events produced since the last call
    pub fn drain_events(&mut self) -> Vec<CombatEvent> {
        std::mem::take(&mut self.rt.events)
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn effects(&self) -> &EffectRegistry {
        &self.effects
    }

    pub fn projectiles(&self) -> &ProjectileEngine {
        &self.projectiles
    }

    pub fn metrics(&self) -> &SimMetrics {
        &self.rt.metrics
    }

    pub fn performance(&self) -> &PerformanceMonitor {
        &self.perf
    }

    pub fn hud(&self) -> Option<&HudSnapshot> {
        self.hud.last()
    }

    pub fn presentation(&self) -> &G {
        &self.rt.gfx
    }

    pub fn config(&self) -> &SimConfig {
        &self.rt.config
    }

    pub fn local_player(&self) -> PlayerId {
        self.rt.local_player
    }

    /// Frames started so far
    pub fn frame(&self) -> u64 {
        self.scheduler.frame()
    }

    pub fn is_game_over(&self) -> bool {
        self.state.vehicle.destroyed
    }
}
