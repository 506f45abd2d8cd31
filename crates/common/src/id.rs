// Line-id minting and timestamp decoding.
//
// A line id is 24 hex chars: the first 8 encode the unix second of minting,
// the next 6 are the minting user's id tail, then a `0000` spacer and 6
// chars of entropy. Commit ids share the time-prefixed layout, so
// `time_of` decodes both.

use chrono::Utc;
use rand::Rng;

const USER_TAIL_LEN: usize = 6;
const ENTROPY_SPAN: u32 = 0xFF_FFFE;

/// Current wall clock in unix seconds.
pub fn now_unix() -> i64 {
    Utc::now().timestamp()
}

/// Mints a fresh line id for `user_id`.
///
/// Collisions are negligible within a single user's commit rate: the id
/// embeds the wall clock plus 6 hex chars of entropy.
pub fn new_line_id(user_id: &str) -> String {
    new_line_id_at(user_id, now_unix())
}

/// Mints a line id with an explicit creation second.
pub fn new_line_id_at(user_id: &str, created: i64) -> String {
    let entropy = rand::thread_rng().gen_range(0..ENTROPY_SPAN);
    format!("{created:08x}{}0000{entropy:06x}", user_tail(user_id))
}

/// Decodes the unix second embedded in a line or commit id.
///
/// Returns `None` when the id is shorter than 8 chars or the prefix is
/// not hex.
pub fn time_of(id: &str) -> Option<i64> {
    let prefix = id.get(..8)?;
    i64::from_str_radix(prefix, 16).ok()
}

fn user_tail(user_id: &str) -> String {
    let count = user_id.chars().count();
    let tail: String = user_id.chars().skip(count.saturating_sub(USER_TAIL_LEN)).collect();
    // Left-pad so the id stays 24 chars even for short user ids.
    format!("{tail:0>6}")
}
