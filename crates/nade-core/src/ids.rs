//! Strongly typed, zero-cost identifier wrappers.
//!
//! `AgentId` is `Copy + Ord + Hash` so it can be used as a map key and as a
//! sorted-collection element without ceremony.  Its `Ord` impl is load-bearing:
//! the environment iterates agents in ascending id order every step, and the
//! importance sampler's RNG draws depend on that order being stable.

use std::fmt;

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID" — equivalent to `u32::MAX`.
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl Default for $name {
            /// Returns the `INVALID` sentinel so uninitialized IDs are visibly invalid.
            #[inline(always)]
            fn default() -> Self {
                Self::INVALID
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl From<$name> for usize {
            #[inline(always)]
            fn from(id: $name) -> usize {
                id.0 as usize
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Identity of one agent (vehicle or traffic light) managed by the
    /// external engine.  Stable for as long as the agent is present; ids may
    /// be reused by the engine after an agent exits.
    pub struct AgentId(u32);
}

/// What kind of agent an id refers to.  Reported by the engine on entry and
/// fixed for the agent's lifetime.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AgentKind {
    Vehicle,
    TrafficLight,
}

impl AgentKind {
    /// Human-readable label for logs and CSV columns.
    pub fn as_str(self) -> &'static str {
        match self {
            AgentKind::Vehicle => "vehicle",
            AgentKind::TrafficLight => "traffic_light",
        }
    }
}
