//! Integer identifiers handed out by the host.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

macro_rules! host_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            /// Wraps a raw host identifier.
            pub const fn new(raw: i64) -> Self {
                Self(raw)
            }

            /// Returns the raw host identifier.
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map(Self)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }
    };
}

host_id!(
    /// Identifies one page inside a lesson.
    PageId
);
host_id!(
    /// Identifies a lesson instance.
    LessonId
);
host_id!(
    /// Identifies a host user. `0` means "nobody" (scheduled runs).
    UserId
);
host_id!(
    /// Identifies a host group.
    GroupId
);
host_id!(
    /// Identifies a host permission/file context.
    ContextId
);
host_id!(
    /// Identifies a course-module (the lesson as placed in a course).
    ModuleId
);

impl UserId {
    /// The identity used by scheduled sweeps.
    pub const SYSTEM: UserId = UserId(0);
}
