//! Per-client attributes that survive restarts.
//!
//! Keyed by what is stable about a client across runs — its class hint —
//! rather than the window handle, which is not. The store itself is dumb:
//! the reactor records attributes as frames change and consults the store
//! when adopting a window.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::collections::HashMap;
use crate::model::frame::{Decorations, Frame};
use crate::sys::geometry::Rect;
use crate::sys::window_server::{Layer, WorkspaceId};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed store: {0}")]
    Parse(#[from] ron::error::SpannedError),
    #[error("serialize: {0}")]
    Serialize(#[from] ron::Error),
}

/// Identity of a client across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientKey {
    pub instance_name: String,
    pub class_name: String,
}

impl ClientKey {
    pub fn new(instance_name: &str, class_name: &str) -> ClientKey {
        ClientKey {
            instance_name: instance_name.to_string(),
            class_name: class_name.to_string(),
        }
    }

    fn is_empty(&self) -> bool { self.instance_name.is_empty() && self.class_name.is_empty() }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAttributes {
    pub geometry: Rect,
    pub workspace: WorkspaceId,
    pub layer: Layer,
    pub decorations: Decorations,
    pub stuck: bool,
    pub shaded: bool,
    pub max_horz: bool,
    pub max_vert: bool,
}

impl SavedAttributes {
    pub fn of(frame: &Frame) -> SavedAttributes {
        SavedAttributes {
            geometry: frame.geometry,
            workspace: frame.workspace,
            layer: frame.layer,
            decorations: frame.decorations,
            stuck: frame.stuck,
            shaded: frame.shaded,
            max_horz: frame.max_horz,
            max_vert: frame.max_vert,
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionStore {
    entries: HashMap<ClientKey, SavedAttributes>,
}

impl SessionStore {
    pub fn load(path: &Path) -> Result<SessionStore, SessionError> {
        if !path.exists() {
            return Ok(SessionStore::default());
        }
        let buf = std::fs::read_to_string(path)?;
        let store = ron::from_str(&buf)?;
        Ok(store)
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let buf = ron::ser::to_string_pretty(self, Default::default())?;
        std::fs::write(path, buf)?;
        Ok(())
    }

    /// Records the frame's current attributes under `key`. Anonymous clients
    /// (no class hint at all) are not worth remembering.
    pub fn record(&mut self, key: ClientKey, attrs: SavedAttributes) {
        if key.is_empty() {
            return;
        }
        debug!(?key, "saving client attributes");
        self.entries.insert(key, attrs);
    }

    pub fn lookup(&self, key: &ClientKey) -> Option<&SavedAttributes> { self.entries.get(key) }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn attrs() -> SavedAttributes {
        SavedAttributes {
            geometry: Rect::new(12, 34, 640, 480),
            workspace: WorkspaceId(2),
            layer: Layer::ABOVE,
            decorations: Decorations::TITLEBAR | Decorations::CLOSE,
            stuck: false,
            shaded: true,
            max_horz: false,
            max_vert: false,
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clients.ron");

        let mut store = SessionStore::default();
        store.record(ClientKey::new("xterm", "XTerm"), attrs());
        store.save(&path).unwrap();

        let loaded = SessionStore::load(&path).unwrap();
        assert_eq!(
            loaded.lookup(&ClientKey::new("xterm", "XTerm")),
            Some(&attrs())
        );
    }

    #[test]
    fn missing_store_is_empty_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::load(&dir.path().join("nope.ron")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn anonymous_clients_are_not_recorded() {
        let mut store = SessionStore::default();
        store.record(ClientKey::new("", ""), attrs());
        assert!(store.is_empty());
    }
}
