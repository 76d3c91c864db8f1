//! Level records.
//!
//! A [`LevelData`] is the serializable description of one level: its
//! obstacles, where the body spawns, how big the body is and how far it may
//! fall. It is plain data; [`LevelData::build_field`] and
//! [`LevelData::spawn_body`] turn it into validated core types.
//!
//! ```
//! use uphill_engine::level::LevelData;
//!
//! let level = LevelData::from_json(r#"{
//!     "name": "flat",
//!     "spawn": { "x": 64.0, "y": 100.0 },
//!     "obstacles": [ { "x": 0.0, "y": 600.0, "width": 1280.0, "height": 120.0 } ]
//! }"#).unwrap();
//!
//! let field = level.build_field().unwrap();
//! assert_eq!(field.len(), 1);
//! assert_eq!(level.body_size.x, 32.0);
//! ```

use serde::{Deserialize, Serialize};

use uphill_core::body::Body;
use uphill_core::config::WorldBounds;
use uphill_core::field::{Obstacle, ObstacleField};
use uphill_core::math::Vec2;

use crate::EngineError;

fn default_body_size() -> Vec2 {
    Vec2::new(32.0, 64.0)
}

/// Serializable description of one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelData {
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Top-left corner of the body at spawn.
    pub spawn: Vec2,
    /// Body extents. Defaults to 32x64.
    #[serde(default = "default_body_size")]
    pub body_size: Vec2,
    /// Playable height and fall margin.
    #[serde(default)]
    pub bounds: WorldBounds,
    /// Solid rectangles, in resolution order.
    pub obstacles: Vec<Obstacle>,
}

impl LevelData {
    /// Parse a level from JSON.
    ///
    /// Only the format is checked here; geometry is validated by
    /// [`build_field`](Self::build_field) and
    /// [`spawn_body`](Self::spawn_body).
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the level to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The prototype's single level: a floor, three rising platforms, walls
    /// on both sides just outside the screen and a block overhead.
    pub fn uphill_proto() -> Self {
        Self {
            name: "uphill-proto".to_owned(),
            spawn: Vec2::new(100.0, 500.0),
            body_size: default_body_size(),
            bounds: WorldBounds::default(),
            obstacles: vec![
                // Floor
                Obstacle::solid(0.0, 600.0, 1280.0, 120.0),
                // Steps
                Obstacle::solid(300.0, 500.0, 200.0, 20.0),
                Obstacle::solid(600.0, 400.0, 200.0, 20.0),
                Obstacle::solid(900.0, 250.0, 300.0, 20.0),
                // Walls
                Obstacle::solid(-50.0, 0.0, 50.0, 720.0),
                Obstacle::solid(1280.0, 0.0, 50.0, 720.0),
                // Ceiling block
                Obstacle::solid(400.0, 200.0, 100.0, 20.0),
            ],
        }
    }

    /// Validate the obstacles and build the immutable field.
    pub fn build_field(&self) -> Result<ObstacleField, EngineError> {
        Ok(ObstacleField::new(self.obstacles.clone())?)
    }

    /// Validate the spawn point and body size and create the body at rest.
    pub fn spawn_body(&self) -> Result<Body, EngineError> {
        Ok(Body::new(self.spawn, self.body_size)?)
    }
}
