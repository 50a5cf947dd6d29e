//! Property-based tests for the wire types.
//!
//! Uses proptest to verify:
//! 1. `DocumentId::parse` never panics and accepts exactly 24 hex digits.
//! 2. A parsed id renders back to the lowercase form of its input.
//! 3. Arbitrary text never makes `event::decode` panic.
//! 4. Reorder entries keep their id string untouched, valid or not.

#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use taskboard_proto::event;
use taskboard_proto::id::DocumentId;
use taskboard_proto::reorder::ReorderRequest;

proptest! {
    #[test]
    fn parse_never_panics(input in ".*") {
        let _ = DocumentId::parse(&input);
    }

    #[test]
    fn hex_ids_round_trip(input in "[0-9a-fA-F]{24}") {
        let id = DocumentId::parse(&input).unwrap();
        prop_assert_eq!(id.to_hex(), input.to_ascii_lowercase());
        prop_assert_eq!(DocumentId::parse(&id.to_string()).unwrap(), id);
    }

    #[test]
    fn wrong_length_is_rejected(input in "[0-9a-f]{0,23}|[0-9a-f]{25,40}") {
        prop_assert!(DocumentId::parse(&input).is_err());
    }

    #[test]
    fn event_decode_never_panics(input in ".*") {
        let _ = event::decode(&input);
    }

    #[test]
    fn reorder_ids_are_kept_verbatim(id in "\\PC{0,40}", order in any::<i64>()) {
        let body = serde_json::json!({"tasks": [{"_id": id, "order": order}]});
        let request: ReorderRequest = serde_json::from_value(body).unwrap();
        prop_assert_eq!(&request.tasks[0].id, &id);
        prop_assert_eq!(request.tasks[0].order.as_i64(), Some(order));
        prop_assert!(request.category.is_none());
    }
}
