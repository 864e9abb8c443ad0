//! fleetver Core - Entity Types and Image Grammar
//!
//! Pure data structures plus the image-reference grammar. All other crates
//! depend on this one; nothing here performs I/O.

use chrono::{DateTime, Utc};

pub mod clock;
pub mod config;
pub mod entities;
pub mod error;
pub mod image;

pub use clock::{format_display_time, Clock, ManualClock, SystemClock};
pub use config::{EnvironmentConfig, FleetConfig, LabelSelector};
pub use entities::{
    ClusterSnapshot, ContainerDescriptor, ContainerSpec, DeploymentObject, DeploymentRecord,
    EnvironmentType, MicroserviceDeployment, MicroserviceVersionRow, VERSION_PLACEHOLDER,
};
pub use error::{ClusterError, ConfigError, ErrorKind, FleetError, FleetResult, LookupError};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Logical environment name (lower-case).
pub type EnvironmentId = String;

/// Cluster identifier as registered in configuration.
pub type ClusterId = String;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;
