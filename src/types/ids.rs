use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                $name(value.into())
            }

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
                $name(value.to_string())
            }
        }
    };
}

define_id_type!(EntryId);
define_id_type!(AccountId);
define_id_type!(FileId);
define_id_type!(FolderId);

impl EntryId {
    /// Builds `<scope>_<hash>_<sequence>`, the sequence zero-padded so that
    /// ids of one scope also sort lexically in append order.
    pub fn compose(scope: &str, content_hash: &str, sequence: u64) -> Self {
        let short_hash: String = content_hash.chars().take(12).collect();
        EntryId(format!("{}_{}_{:06}", scope, short_hash, sequence))
    }

    /// Intra-day sequence number embedded in the id suffix.
    pub fn sequence(&self) -> Option<u64> {
        self.0.rsplit('_').next().and_then(|s| s.parse::<u64>().ok())
    }
}
