//! Fire-and-forget sound playback
//!
//! Audio is selected once at construction: either [`Audio::Null`], which
//! accepts every call and does nothing, or [`Audio::Backend`] wrapping a real
//! device. Playback failures never reach the simulation.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::util::vec3::Vec3;

/// Sound effects the simulation can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sound {
    EngineIdle,
    EngineRev,
    TireScreech,
    Shoot,
    Explosion,
    Hit,
    TurretShoot,
    WallHit,
    VehicleHit,
    MetalImpact,
    DamageWarning,
    ShieldHit,
    PowerupPickup,
    PowerupSpeed,
    PowerupShield,
    PowerupHealth,
    PowerupDamage,
    PowerupAmmo,
}

impl Sound {
    pub const ALL: [Sound; 18] = [
        Sound::EngineIdle,
        Sound::EngineRev,
        Sound::TireScreech,
        Sound::Shoot,
        Sound::Explosion,
        Sound::Hit,
        Sound::TurretShoot,
        Sound::WallHit,
        Sound::VehicleHit,
        Sound::MetalImpact,
        Sound::DamageWarning,
        Sound::ShieldHit,
        Sound::PowerupPickup,
        Sound::PowerupSpeed,
        Sound::PowerupShield,
        Sound::PowerupHealth,
        Sound::PowerupDamage,
        Sound::PowerupAmmo,
    ];

    /// Asset file backing this sound
    pub fn asset_path(&self) -> &'static str {
        match self {
            Sound::EngineIdle => "sounds/engine_idle.mp3",
            Sound::EngineRev => "sounds/engine_rev.mp3",
            Sound::TireScreech => "sounds/tire_screech.mp3",
            Sound::Shoot => "sounds/weapon_fire.mp3",
            Sound::Explosion => "sounds/vehicle_explosion.mp3",
            Sound::Hit => "sounds/projectile_hit.mp3",
            Sound::TurretShoot => "sounds/turret_rotate.mp3",
            Sound::WallHit | Sound::MetalImpact => "sounds/metal_impact.mp3",
            Sound::VehicleHit => "sounds/vehicle_hit.mp3",
            Sound::DamageWarning => "sounds/damage_warning.mp3",
            Sound::ShieldHit => "sounds/shield_hit.mp3",
            Sound::PowerupPickup => "sounds/powerup_pickup.mp3",
            Sound::PowerupSpeed => "sounds/powerup_speed.mp3",
            Sound::PowerupShield => "sounds/powerup_shield.mp3",
            Sound::PowerupHealth => "sounds/powerup_health.mp3",
            Sound::PowerupDamage => "sounds/powerup_damage.mp3",
            Sound::PowerupAmmo => "sounds/powerup_ammo.mp3",
        }
    }

    /// How many instances may play at once
    pub fn voices(&self) -> usize {
        match self {
            Sound::Shoot | Sound::Hit | Sound::TurretShoot => 5,
            Sound::Explosion | Sound::WallHit | Sound::MetalImpact | Sound::VehicleHit => 3,
            Sound::EngineIdle | Sound::EngineRev | Sound::DamageWarning => 1,
            _ => 2,
        }
    }
}

/// Errors a backend may report; swallowed by [`Audio::play`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AudioError {
    #[error("audio device is still locked")]
    DeviceLocked,
    #[error("sound {0:?} has not finished loading")]
    NotLoaded(Sound),
    #[error("all {voices} voices of {sound:?} are playing")]
    NoFreeVoice { sound: Sound, voices: usize },
    #[error("audio backend failure: {0}")]
    Backend(String),
}

/// Master, effects and music gain, each clamped to 0..=1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeSettings {
    pub master: f32,
    pub sfx: f32,
    pub music: f32,
}

impl Default for VolumeSettings {
    fn default() -> Self {
        Self {
            master: 1.0,
            sfx: 0.7,
            music: 0.3,
        }
    }
}

impl VolumeSettings {
    pub fn set_master(&mut self, volume: f32) {
        self.master = volume.clamp(0.0, 1.0);
    }

    pub fn set_sfx(&mut self, volume: f32) {
        self.sfx = volume.clamp(0.0, 1.0);
    }

    pub fn set_music(&mut self, volume: f32) {
        self.music = volume.clamp(0.0, 1.0);
    }

    pub fn effective_sfx(&self) -> f32 {
        self.master * self.sfx
    }
}

/// A device capable of playing sounds
pub trait AudioBackend {
    fn play(&mut self, sound: Sound, position: Option<Vec3>, volume: f32) -> Result<(), AudioError>;

    /// Called when the host reports that a sound asset finished loading
    fn asset_ready(&mut self, _sound: Sound) {}
}

/// Sound output selected at construction
pub enum Audio {
    Null,
    Backend {
        backend: Box<dyn AudioBackend>,
        volume: VolumeSettings,
    },
}

impl std::fmt::Debug for Audio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Audio::Null => f.write_str("Audio::Null"),
            Audio::Backend { volume, .. } => f
                .debug_struct("Audio::Backend")
                .field("volume", volume)
                .finish_non_exhaustive(),
        }
    }
}

impl Default for Audio {
    fn default() -> Self {
        Audio::Null
    }
}

impl Audio {
    pub fn with_backend(backend: Box<dyn AudioBackend>) -> Self {
        Audio::Backend {
            backend,
            volume: VolumeSettings::default(),
        }
    }

    /// Play a sound; failures are logged at debug level and dropped
    pub fn play(&mut self, sound: Sound, position: Option<Vec3>) {
        if let Audio::Backend { backend, volume } = self {
            let gain = volume.effective_sfx();
            if gain <= 0.0 {
                return;
            }
            if let Err(e) = backend.play(sound, position, gain) {
                tracing::debug!(?sound, "sound dropped: {}", e);
            }
        }
    }

    pub fn asset_ready(&mut self, sound: Sound) {
        if let Audio::Backend { backend, .. } = self {
            backend.asset_ready(sound);
        }
    }

    pub fn volume_mut(&mut self) -> Option<&mut VolumeSettings> {
        match self {
            Audio::Null => None,
            Audio::Backend { volume, .. } => Some(volume),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Audio::Null)
    }
}

/// Shared list of sounds played through a [`RecordingAudio`]
pub type SoundLog = Rc<RefCell<Vec<Sound>>>;

/// Backend that records plays instead of making noise.
///
/// Sounds only play once their asset has been reported ready, unless the
/// recorder was created with everything preloaded.
#[derive(Debug, Default)]
pub struct RecordingAudio {
    log: SoundLog,
    loaded: Vec<Sound>,
    preload_all: bool,
}

impl RecordingAudio {
    pub fn new() -> (Self, SoundLog) {
        let log = SoundLog::default();
        (
            Self {
                log: log.clone(),
                loaded: Vec::new(),
                preload_all: true,
            },
            log,
        )
    }

    /// Recorder that rejects sounds until `asset_ready` is called for them
    pub fn lazy() -> (Self, SoundLog) {
        let (mut recorder, log) = Self::new();
        recorder.preload_all = false;
        (recorder, log)
    }
}

impl AudioBackend for RecordingAudio {
    fn play(&mut self, sound: Sound, _position: Option<Vec3>, _volume: f32) -> Result<(), AudioError> {
        if !self.preload_all && !self.loaded.contains(&sound) {
            return Err(AudioError::NotLoaded(sound));
        }
        self.log.borrow_mut().push(sound);
        Ok(())
    }

    fn asset_ready(&mut self, sound: Sound) {
        if !self.loaded.contains(&sound) {
            self.loaded.push(sound);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_audio_accepts_everything() {
        let mut audio = Audio::Null;
        audio.play(Sound::Explosion, None);
        audio.asset_ready(Sound::Explosion);
        assert!(audio.volume_mut().is_none());
        assert!(audio.is_null());
    }

    #[test]
    fn test_backend_records_plays() {
        let (recorder, log) = RecordingAudio::new();
        let mut audio = Audio::with_backend(Box::new(recorder));
        audio.play(Sound::Shoot, Some(Vec3::ZERO));
        audio.play(Sound::WallHit, None);
        assert_eq!(*log.borrow(), vec![Sound::Shoot, Sound::WallHit]);
    }

    #[test]
    fn test_backend_errors_are_swallowed() {
        let (recorder, log) = RecordingAudio::lazy();
        let mut audio = Audio::with_backend(Box::new(recorder));

        audio.play(Sound::Hit, None);
        assert!(log.borrow().is_empty());

        audio.asset_ready(Sound::Hit);
        audio.play(Sound::Hit, None);
        assert_eq!(*log.borrow(), vec![Sound::Hit]);
    }

    #[test]
    fn test_muted_sfx_skips_backend() {
        let (recorder, log) = RecordingAudio::new();
        let mut audio = Audio::with_backend(Box::new(recorder));
        if let Some(volume) = audio.volume_mut() {
            volume.set_master(-3.0);
        }
        audio.play(Sound::Explosion, None);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_volume_clamping() {
        let mut volume = VolumeSettings::default();
        volume.set_sfx(2.0);
        volume.set_music(-1.0);
        assert_eq!(volume.sfx, 1.0);
        assert_eq!(volume.music, 0.0);
        assert_eq!(volume.effective_sfx(), 1.0);
    }

    #[test]
    fn test_every_sound_has_asset() {
        for sound in Sound::ALL {
            assert!(sound.asset_path().ends_with(".mp3"));
            assert!(sound.voices() >= 1);
        }
    }
}
