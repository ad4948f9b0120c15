use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for element IDs — fast comparisons, cheap copies.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Identifier shared by nodes and edges of a knowledge map.
///
/// Nodes and edges live in one id space: a given id resolves to at most one
/// element of either kind. Internally a `Spur` index — 4 bytes, Copy, Eq,
/// Hash in O(1). Ordering follows interning order, not string order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(Spur);

impl ElementId {
    /// Intern a string as an ElementId, or return the existing handle.
    pub fn intern(s: &str) -> Self {
        ElementId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Generate a fresh random (UUID v4) id.
    pub fn generate() -> Self {
        Self::intern(&uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ElementId {
    fn from(s: &str) -> Self {
        Self::intern(s)
    }
}

impl Serialize for ElementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ElementId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = ElementId::intern("concept_a");
        let b = ElementId::intern("concept_a");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "concept_a");
    }

    #[test]
    fn generated_ids_are_unique_uuids() {
        let a = ElementId::generate();
        let b = ElementId::generate();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(a.as_str()).is_ok());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = ElementId::intern("ab");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ab\"");
        let back: ElementId = serde_json::from_str("\"ab\"").unwrap();
        assert_eq!(back, id);
    }
}
