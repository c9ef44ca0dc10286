//! Canonical room naming for two-party conversations.
//!
//! Both participants derive the room name independently, so it has to come out
//! identical regardless of argument order: sort the two ids, join with `-`.

pub const ROOM_SEPARATOR: char = '-';

pub fn canonical_room_id(a: &str, b: &str) -> String {
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    format!("{lo}{ROOM_SEPARATOR}{hi}")
}
