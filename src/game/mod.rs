pub mod audio;
pub mod constants;
pub mod context;
pub mod effects;
pub mod events;
pub mod game_loop;
pub mod hud;
pub mod network;
pub mod performance;
pub mod pool;
pub mod presentation;
pub mod scheduler;
pub mod state;
pub mod systems;
pub mod transform;
