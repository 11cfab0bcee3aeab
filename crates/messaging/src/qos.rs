use serde::{Deserialize, Serialize};

/// Ordering guarantee requested from a port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ordering {
    /// Events may arrive in any order.
    #[default]
    Unordered,
    /// Events from one informer arrive in publishing order.
    Ordered,
}

/// Delivery guarantee requested from a port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reliability {
    /// Events may be lost.
    Unreliable,
    /// Events are not lost while both ends are active.
    #[default]
    Reliable,
}

/// Quality of service a participant requests from its port.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityOfServiceSpec {
    /// Requested ordering.
    pub ordering: Ordering,
    /// Requested reliability.
    pub reliability: Reliability,
}

impl QualityOfServiceSpec {
    /// Creates a spec.
    #[must_use]
    pub const fn new(ordering: Ordering, reliability: Reliability) -> Self {
        Self {
            ordering,
            reliability,
        }
    }
}
