//! Connection pool counters
//!
//! Idle, open and ceiling counts get distinct types so they cannot be mixed
//! up at call sites.

use std::fmt;

macro_rules! pool_counter {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(usize);

        impl $name {
            #[inline]
            #[must_use]
            pub const fn new(count: usize) -> Self {
                Self(count)
            }

            #[inline]
            #[must_use]
            pub const fn get(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<usize> for $name {
            fn from(value: usize) -> Self {
                Self(value)
            }
        }
    };
}

pool_counter! {
    /// Idle connections ready to be handed out, never more than
    /// [`OpenConnections`]
    AvailableConnections
}

pool_counter! {
    /// Connections the pool owns: idle, checked out, or reserved by a dial
    /// still in flight
    OpenConnections
}

pool_counter! {
    /// Configured ceiling on [`OpenConnections`]
    MaxPoolSize
}

pool_counter! {
    /// Connections currently held by callers
    InUseConnections
}

impl InUseConnections {
    /// `open - available`, saturating at zero
    #[inline]
    #[must_use]
    pub fn from_pool_stats(open: OpenConnections, available: AvailableConnections) -> Self {
        Self(open.get().saturating_sub(available.get()))
    }
}
