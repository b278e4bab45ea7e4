use std::collections::HashMap;
use system::{display_name_candidate, ConnectionId};

/// Display names currently in use, one per named connection.
///
/// `names` and `connection_names` are kept as inverses of each other.
pub struct SessionRegistry {
    names: HashMap<String, ConnectionId>,
    connection_names: HashMap<ConnectionId, String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            names: HashMap::new(),
            connection_names: HashMap::new(),
        }
    }

    /// Assigns a unique display name derived from `raw_name`.
    ///
    /// A connection that already holds a name gives it up first, so resubmitting never leaves a
    /// stale entry behind.
    pub fn submit_name(&mut self, connection_id: ConnectionId, raw_name: &str) -> String {
        if let Some(previous) = self.remove(&connection_id) {
            log::info!(
                "Connection {} released {:?} to pick a new name",
                connection_id,
                previous
            );
        }

        let assigned = self.resolve_collision(display_name_candidate(raw_name));
        self.names.insert(assigned.clone(), connection_id);
        self.connection_names
            .insert(connection_id, assigned.clone());
        log::info!("Connection {} is now {:?}", connection_id, assigned);
        assigned
    }

    pub fn remove(&mut self, connection_id: &ConnectionId) -> Option<String> {
        let name = self.connection_names.remove(connection_id)?;
        self.names.remove(&name);
        Some(name)
    }

    pub fn name_of(&self, connection_id: &ConnectionId) -> Option<&str> {
        self.connection_names.get(connection_id).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// `base`, or the first free `base_1`, `base_2`, ...
    fn resolve_collision(&self, base: String) -> String {
        let mut candidate = base.clone();
        let mut counter = 1u32;
        while self.names.contains_key(&candidate) {
            candidate = format!("{}_{}", base, counter);
            counter += 1;
        }
        candidate
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
