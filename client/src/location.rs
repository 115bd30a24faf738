use serde::{Deserialize, Serialize};
use shared::{Location, DEFAULT_LOCATION};

/// Outcome of the platform location permission prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPermission {
    pub granted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LocationPermission {
    pub fn granted(location: Location) -> Self {
        Self {
            granted: true,
            location: Some(location),
            error: None,
        }
    }

    pub fn denied(error: impl Into<String>) -> Self {
        Self {
            granted: false,
            location: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartLocation {
    Device(Location),
    /// Default position; `notify` is set when the user should be told why.
    Default { location: Location, notify: bool },
}

impl StartLocation {
    pub fn location(self) -> Location {
        match self {
            StartLocation::Device(location) => location,
            StartLocation::Default { location, .. } => location,
        }
    }
}

/// Picks the position the map opens on.
pub fn resolve_start_location(permission: &LocationPermission) -> StartLocation {
    match (permission.granted, permission.location) {
        (true, Some(location)) => StartLocation::Device(location),
        _ => StartLocation::Default {
            location: DEFAULT_LOCATION,
            notify: permission.error.is_some(),
        },
    }
}
