use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
};

/// Double-submit guard for login/signup: at most one outstanding request per
/// key (normalized email). The token is released when the holding request
/// settles — success or failure — not on a wall-clock timer.
///
/// In-memory, single-instance; same deployment assumption as the rest of the
/// service. Uses a std Mutex because release happens in Drop.
#[derive(Clone, Default)]
pub struct InFlightState {
    keys: Arc<Mutex<HashSet<String>>>,
}

impl InFlightState {
    pub fn new() -> Self {
        Self {
            keys: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Try to claim the key. Returns None while another request holds it.
    pub fn try_acquire(&self, key: &str) -> Option<InFlightToken> {
        let mut keys = self.keys.lock().expect("in-flight lock poisoned");
        if !keys.insert(key.to_string()) {
            return None;
        }
        Some(InFlightToken {
            key: key.to_string(),
            keys: Arc::clone(&self.keys),
        })
    }
}

/// RAII claim on an in-flight key; dropping it releases the key.
pub struct InFlightToken {
    key: String,
    keys: Arc<Mutex<HashSet<String>>>,
}

impl Drop for InFlightToken {
    fn drop(&mut self) {
        if let Ok(mut keys) = self.keys.lock() {
            keys.remove(&self.key);
        }
    }
}
