use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::ids::EndpointName;

/// One candidate downstream call within a oneof group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallTarget {
    /// Endpoint invoked when this candidate is selected.
    pub target: EndpointName,
    /// Selection probability in percent, `(0, 100]`.
    pub probability_percent: f64,
}

impl CallTarget {
    /// Creates a candidate call with the given selection probability.
    #[must_use]
    pub fn new(target: impl Into<EndpointName>, probability_percent: f64) -> Self {
        Self {
            target: target.into(),
            probability_percent,
        }
    }
}

/// A set of mutually exclusive candidate calls: at most one candidate is
/// invoked per request. Probabilities within a group sum to at most 100;
/// the residual mass models "no call".
pub type CallGroup = Vec<CallTarget>;

/// The static endpoint dependency graph: endpoint to ordered oneof groups.
///
/// Built once per simulation from validated configuration and immutable
/// during propagation. Upstream validation guarantees the graph is acyclic;
/// the propagator carries its own revisit guard as a second line of defense.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    depend_on: BTreeMap<EndpointName, Vec<CallGroup>>,
}

impl DependencyGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the oneof groups of one calling endpoint, replacing any
    /// previous registration.
    pub fn insert(&mut self, endpoint: impl Into<EndpointName>, groups: Vec<CallGroup>) {
        self.depend_on.insert(endpoint.into(), groups);
    }

    /// The oneof groups of `endpoint`; empty when it calls nothing.
    #[must_use]
    pub fn groups(&self, endpoint: &EndpointName) -> &[CallGroup] {
        self.depend_on
            .get(endpoint)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every endpoint the graph mentions, callers and targets alike.
    #[must_use]
    pub fn endpoints(&self) -> BTreeSet<EndpointName> {
        let mut all = BTreeSet::new();
        for (caller, groups) in &self.depend_on {
            all.insert(caller.clone());
            for group in groups {
                for candidate in group {
                    all.insert(candidate.target.clone());
                }
            }
        }
        all
    }

    /// Number of calling endpoints registered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.depend_on.len()
    }

    /// Whether no endpoint is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.depend_on.is_empty()
    }
}
