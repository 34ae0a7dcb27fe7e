use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! define_name {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an already-resolved unique name.
            #[must_use]
            pub fn new(name: impl Into<String>) -> Self {
                Self(name.into())
            }

            /// Returns the raw unique name.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

define_name!(
    EndpointName,
    "Unique internal name of an endpoint, as produced by the upstream \
     name-resolution step: tab-separated components identifying the owning \
     service version followed by the endpoint-local parts."
);
define_name!(
    ServiceName,
    "Unique internal name of a service version (the first three \
     tab-separated components of its endpoints' names)."
);

impl EndpointName {
    /// Number of leading tab-separated components that identify the owning
    /// service version.
    pub const SERVICE_COMPONENTS: usize = 3;

    /// Derives the unique name of the service version owning this endpoint.
    #[must_use]
    pub fn service_name(&self) -> ServiceName {
        let prefix: Vec<&str> = self
            .0
            .splitn(Self::SERVICE_COMPONENTS + 1, '\t')
            .take(Self::SERVICE_COMPONENTS)
            .collect();
        ServiceName(prefix.join("\t"))
    }
}

/// Unique identifier for one simulation run, used for log correlation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimulationId(Uuid);

impl SimulationId {
    /// Generates a new random identifier.
    #[must_use]
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the inner UUID value.
    #[must_use]
    pub const fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for SimulationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_name_extraction() {
        let endpoint = EndpointName::new("orders\tprod\tv1\tGET\t/orders/{id}");
        assert_eq!(endpoint.service_name().as_str(), "orders\tprod\tv1");
    }

    #[test]
    fn test_service_name_short_endpoint() {
        // Fewer components than a full name; the whole name is the service.
        let endpoint = EndpointName::new("orders\tprod");
        assert_eq!(endpoint.service_name().as_str(), "orders\tprod");
    }

    #[test]
    fn test_endpoint_name_display() {
        let endpoint = EndpointName::from("a\tb\tc");
        assert_eq!(endpoint.to_string(), "a\tb\tc");
    }

    #[test]
    fn test_simulation_ids_are_unique() {
        assert_ne!(SimulationId::new(), SimulationId::new());
    }
}
