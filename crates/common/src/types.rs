use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a diamond parcel (e.g. `"RB-0042"` or `"RB-0042-A"`).
///
/// Parcel ids are chosen by the user and unique across parents and children.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParcelId(String);

impl ParcelId {
    /// Creates a parcel ID from a string, trimming surrounding whitespace.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self(id.trim().to_string())
    }

    /// Returns the parcel ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the ID is empty.
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for ParcelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ParcelId {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ParcelId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for ParcelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Opaque identifier of the acting user, as supplied by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Unique identifier for a customer order.
///
/// Wraps a UUID to keep order ids from being mixed up with other
/// UUID-based identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random order ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an order ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Parses an order ID from its textual form.
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Uuid::parse_str(s.trim()).map(Self)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for OrderId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<OrderId> for Uuid {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parcel_id_trims_whitespace() {
        let id = ParcelId::new("  RB-001 ");
        assert_eq!(id.as_str(), "RB-001");
        assert!(!id.is_blank());
        assert!(ParcelId::new("   ").is_blank());
    }

    #[test]
    fn parcel_ids_order_lexically() {
        let mut ids = vec![ParcelId::new("B"), ParcelId::new("A-2"), ParcelId::new("A-1")];
        ids.sort();
        assert_eq!(ids[0].as_str(), "A-1");
        assert_eq!(ids[2].as_str(), "B");
    }

    #[test]
    fn order_id_parse_accepts_uuid() {
        let uuid = Uuid::new_v4();
        let id = OrderId::parse(&uuid.to_string()).unwrap();
        assert_eq!(id.as_uuid(), uuid);
    }

    #[test]
    fn order_id_parse_rejects_garbage() {
        assert!(OrderId::parse("order-42").is_err());
        assert!(OrderId::parse("").is_err());
    }

    #[test]
    fn parcel_id_serializes_transparently() {
        let id = ParcelId::new("RB-7");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"RB-7\"");
    }
}
