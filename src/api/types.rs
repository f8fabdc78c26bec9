use serde::{Deserialize, Serialize};

/// An inventory item as the remote service reports it. Read-only locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
  pub id: i64,
  pub name: String,
}

/// A storage location and the items currently assigned to it, in the order
/// the service returns them. Read-only locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
  #[serde(rename = "location")]
  pub name: String,
  pub items: Vec<i64>,
}

/// One inventory adjustment: a quantity delta for an item at a location,
/// stamped with the device that recorded it. Immutable once created; it is
/// removed from the durable queue only after the server acknowledges it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
  pub device_id: String,
  pub location: String,
  pub delta: i64,
  pub item_id: i64,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_location_uses_wire_field_name() {
    let loc: Location = serde_json::from_str(r#"{"location": "A1", "items": [3, 1, 2]}"#).unwrap();
    assert_eq!(loc.name, "A1");
    assert_eq!(loc.items, vec![3, 1, 2]);

    let json = serde_json::to_value(&loc).unwrap();
    assert_eq!(json["location"], "A1");
  }

  #[test]
  fn test_commit_round_trip() {
    let commit = Commit {
      device_id: "TOUGHPAD01".into(),
      location: "A1".into(),
      delta: -3,
      item_id: 42,
    };
    let json = serde_json::to_string(&commit).unwrap();
    let back: Commit = serde_json::from_str(&json).unwrap();
    assert_eq!(back, commit);
  }
}
