use std::borrow::Borrow;
use std::hash::{Hash, Hasher};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::request::Request;

/// A host name plus the ordered sequence of requests observed for it.
///
/// Composition, not inheritance (`Domain` does not extend a list type):
/// requests live in an explicit `IndexSet`, merging is an explicit method,
/// and two domains are "the same domain" for graph purposes iff their
/// names match (see [`Domain::eq`]). Use [`Domain::deep_eq`] when a test
/// needs to additionally compare the carried requests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Domain {
    pub name: String,
    pub requests: IndexSet<Request>,
}

impl Domain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requests: IndexSet::new(),
        }
    }

    pub fn with_requests(name: impl Into<String>, requests: IndexSet<Request>) -> Self {
        Self {
            name: name.into(),
            requests,
        }
    }

    /// Unions `other`'s requests into `self`, receiver order first: entries
    /// already present in `self` keep their position, entries unique to
    /// `other` are appended in `other`'s order.
    pub fn merge(&mut self, other: &Domain) {
        for request in &other.requests {
            self.requests.insert(request.clone());
        }
    }

    /// Structural equality: same name AND the same request set (order
    /// insensitive). Distinct from the graph-identity `PartialEq` impl,
    /// which compares only the name.
    pub fn deep_eq(&self, other: &Domain) -> bool {
        self.name == other.name && self.requests == other.requests
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Domain {}

impl Hash for Domain {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl Borrow<str> for Domain {
    fn borrow(&self) -> &str {
        &self.name
    }
}
