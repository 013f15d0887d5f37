//! String IDs for things read from input files.
use anyhow::{Context, Result};
use indexmap::IndexSet;
use std::borrow::Borrow;
use std::hash::Hash;

/// Define a cheaply clonable ID type wrapping an `Rc<str>`.
///
/// IDs can be looked up in collections by `&str`, displayed and (de)serialised as plain strings.
macro_rules! define_id_type {
    ($name:ident) => {
        #[derive(
            Clone,
            std::hash::Hash,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Debug,
            serde::Deserialize,
            serde::Serialize,
        )]
        /// An ID type (e.g. `AreaID`)
        pub struct $name(pub std::rc::Rc<str>);

        impl $name {
            /// Create a new ID from a string slice
            pub fn new(id: &str) -> Self {
                Self(id.into())
            }
        }

        impl std::borrow::Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}
pub(crate) use define_id_type;

/// A set of known IDs which raw strings from input files can be checked against
pub trait IDCollection<ID> {
    /// Get the ID from the collection by its string representation.
    ///
    /// # Returns
    ///
    /// A copy of the ID in `self`, or an error if not found.
    fn get_id_by_str(&self, id: &str) -> Result<ID>;
}

impl<ID> IDCollection<ID> for IndexSet<ID>
where
    ID: Borrow<str> + Hash + Eq + Clone,
{
    fn get_id_by_str(&self, id: &str) -> Result<ID> {
        self.get(id)
            .cloned()
            .with_context(|| format!("Unknown ID {id} found"))
    }
}
