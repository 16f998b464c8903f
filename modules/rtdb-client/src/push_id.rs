//! Client-side push ids: 8 chars of millisecond timestamp followed by 12
//! random chars, over an alphabet whose ASCII order matches its value order,
//! so ids sort chronologically as plain strings.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_LEN: usize = 8;
const RANDOM_LEN: usize = 12;

#[derive(Default)]
struct LastId {
    millis: u64,
    random: [u8; RANDOM_LEN],
}

/// Generates unique, chronologically sortable ids without a server round trip.
///
/// Two ids minted in the same millisecond share the random tail, incremented
/// by one, so they still sort in creation order.
#[derive(Default)]
pub struct PushIdGenerator {
    last: Mutex<LastId>,
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default();
        self.next_id_at(millis)
    }

    pub fn next_id_at(&self, millis: u64) -> String {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if millis == last.millis {
            increment(&mut last.random);
        } else {
            let mut rng = rand::rng();
            for slot in last.random.iter_mut() {
                *slot = rng.random_range(0..64u8);
            }
            last.millis = millis;
        }

        let mut id = String::with_capacity(TIME_LEN + RANDOM_LEN);
        let mut time_chars = [0u8; TIME_LEN];
        let mut t = millis;
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(t % 64) as usize];
            t /= 64;
        }
        id.extend(time_chars.iter().map(|&c| c as char));
        id.extend(last.random.iter().map(|&i| PUSH_CHARS[i as usize] as char));
        id
    }
}

// Base-64 increment with carry; wraps to all zeros on overflow.
fn increment(random: &mut [u8; RANDOM_LEN]) {
    for digit in random.iter_mut().rev() {
        if *digit == 63 {
            *digit = 0;
        } else {
            *digit += 1;
            return;
        }
    }
}
