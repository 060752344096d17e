// SPDX-License-Identifier: Apache-2.0

//! On-disk shape of template definitions
//!
//! ```json
//! {
//!   "Categories": {
//!     "params": { "action": "query", "prop": "categories", "titles": {} },
//!     "output": { "items": "//cl", "vars": { "category": "@title" } }
//!   }
//! }
//! ```

use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};

/// Object members in document order, repeated keys included.
///
/// Collecting into a map would silently keep only the last of two repeated
/// keys; the compiler needs to see both to reject them.
#[derive(Debug, Clone, PartialEq)]
pub struct Entries<T>(pub Vec<(String, T)>);

impl<T> Entries<T> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T> Default for Entries<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Entries<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
            type Value = Entries<T>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, T>()? {
                    entries.push((key, value));
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

/// One template as written in the configuration document
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateDefinition {
    /// Parameter name → scalar (fixed) or object (input, optional `default`)
    #[serde(default)]
    pub params: Entries<serde_json::Value>,
    pub output: OutputDefinition,
}

/// Output section of a template definition
#[derive(Debug, Clone, Deserialize)]
pub struct OutputDefinition {
    /// Path locating result items in a response
    pub items: String,
    /// Output parameter name → path evaluated against one item
    #[serde(default)]
    pub vars: Entries<String>,
}
