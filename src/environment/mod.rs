//! Execution environments.
//!
//! Tracks which execution environment profiles the platform knows about
//! and turns them into the platform properties the resolver consumes.
//!
//! - [`profile`] - Environment ids, families, levels and strict compatibility
//! - [`registry`] - The change-tracking registry and platform properties

pub mod profile;
pub mod registry;

pub use profile::{ExecutionEnvironment, ProjectRuntime};
pub use registry::{
    keys, platform_properties, ExecutionEnvironmentRegistry, PlatformInfo, PlatformProperties,
    ProfileCapabilities, ProfileSource, PropertyMap, StaticProfiles, NO_PROFILE,
};
