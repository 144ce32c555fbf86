pub mod ambient;
pub mod arena;
pub mod damage;
pub mod pickups;
pub mod projectile;
pub mod turret;
pub mod vehicle;
