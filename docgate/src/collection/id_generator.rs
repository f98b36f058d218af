use log::info;
use rand::rngs::OsRng;
use rand::RngCore;
use std::sync::atomic::{AtomicU32, Ordering};

const COUNTER_MASK: u32 = 0x00FF_FFFF;

/// Generates 12-byte object ids: 4-byte big-endian seconds timestamp,
/// 5 random bytes fixed per process and a 3-byte wrapping counter.
pub struct ObjectIdGenerator {
    process_unique: [u8; 5],
    counter: AtomicU32,
}

impl ObjectIdGenerator {
    pub fn new() -> Self {
        let mut process_unique = [0u8; 5];
        OsRng.fill_bytes(&mut process_unique);
        let counter = OsRng.next_u32() & COUNTER_MASK;

        info!("Initialized object id generator with counter seed {}", counter);
        ObjectIdGenerator {
            process_unique,
            counter: AtomicU32::new(counter),
        }
    }

    pub fn get_id(&self) -> [u8; 12] {
        let timestamp = chrono::Utc::now().timestamp().max(0) as u32;
        let counter = self.counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&timestamp.to_be_bytes());
        bytes[4..9].copy_from_slice(&self.process_unique);
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);
        bytes
    }
}

impl Default for ObjectIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
