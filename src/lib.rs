//! Electromagnetic shower transport core.
//!
//! Electrons, positrons and photons live in per-species track pools and are
//! advanced one step at a time by the [`model::Model`] scheduler. Each step
//! asks a [`physics::PhysicsEngine`] how far the track may go, moves it along
//! a helix in a constant Bz field with [`propagator::FieldPropagator`], and
//! resolves the outcome as an explicit [`transport::Transition`]. Every track
//! draws from its own [`ranluxpp::Ranluxpp`] stream, so results do not depend
//! on how the work is spread over threads.

pub mod bank;
pub mod cell;
pub mod config;
pub mod error;
pub mod geometry;
pub mod helix;
pub mod interactions;
pub mod model;
pub mod mulmod;
pub mod navigation;
pub mod physics;
pub mod propagator;
pub mod queue;
pub mod ranluxpp;
pub mod region;
pub mod scoring;
pub mod source;
pub mod stats;
pub mod surface;
pub mod track;
pub mod transport;
pub mod units;
pub mod utilities;

pub use config::{PropagatorSettings, TransportConfig};
pub use error::{CapacityError, ConfigError, GeometryError, TransportError};
pub use geometry::Geometry;
pub use model::Model;
pub use navigation::{NavState, Navigator};
pub use physics::{PhysicsEngine, PhysicsSettings, StandardPhysics};
pub use ranluxpp::Ranluxpp;
pub use scoring::ScoringSummary;
pub use track::{ParticleKind, Track, TrackStatus};
pub use transport::Transition;
pub use utilities::interpolate_log_log;
