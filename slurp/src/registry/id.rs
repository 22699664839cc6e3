use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! registry_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(usize);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                Self(index)
            }

            pub(crate) fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), self.0)
            }
        }
    };
}

registry_id!(
    /// Identifier of a registered analyst.
    AnalystId,
    "analyst"
);

registry_id!(
    /// Identifier of a registered producer.
    ProducerId,
    "producer"
);

registry_id!(
    /// Identifier of a registered data loader.
    DataLoaderId,
    "data-loader"
);
