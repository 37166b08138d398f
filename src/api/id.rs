use serde::{Serialize, Deserialize};

macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.0.as_ref()
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                $name(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                $name(id.to_owned())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id! {
    /// Server assigned experiment identifier.
    ExperimentId
}

opaque_id! {
    /// Server assigned run identifier, unique across experiments.
    RunId
}

impl RunId {
    /// The first `len` characters of the id, used where the full id is too long to show.
    pub fn short(&self, len: usize) -> &str {
        match self.0.char_indices().nth(len) {
            Some((end, _)) => &self.0[..end],
            None => &self.0,
        }
    }
}
