/// Entity identifiers are opaque strings (UUIDv7 for generated ids).
pub type EntityId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Generate a new time-ordered entity id.
pub fn new_id() -> EntityId {
    uuid::Uuid::now_v7().to_string()
}

/// Format a timestamp the way it appears inside sort keys.
///
/// Fixed-width RFC 3339 with millisecond precision, so lexical order
/// matches chronological order.
pub fn sort_timestamp(ts: &Timestamp) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn sort_timestamp_is_fixed_width() {
        let a = chrono::Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(sort_timestamp(&a), "2026-01-02T03:04:05.000Z");
    }

    #[test]
    fn sort_timestamp_orders_lexically() {
        let a = chrono::Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let b = a + chrono::Duration::milliseconds(7);
        assert!(sort_timestamp(&a) < sort_timestamp(&b));
    }

    #[test]
    fn new_ids_are_unique() {
        assert_ne!(new_id(), new_id());
    }
}
