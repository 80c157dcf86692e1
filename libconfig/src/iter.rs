//! Iteration over the children of an aggregate setting.
//!
//! [`Children`] borrows the store, so the tree cannot change underneath it.
//! [`ChildCursor`] holds only ids and can live across mutations; it captures
//! the parent's structural revision and fails with `ConcurrentModification`
//! as soon as a child is added to or removed from that parent.

use std::slice;

use crate::{
    arena::SettingId,
    config::Config,
    error::{ConfigError, Result},
    setting::Setting,
};

/// Borrowed iterator over a setting's children, in insertion order.
pub struct Children<'c> {
    config: &'c Config,
    ids: slice::Iter<'c, SettingId>,
}

impl<'c> Children<'c> {
    pub(crate) fn new(config: &'c Config, ids: &'c [SettingId]) -> Self {
        Self {
            config,
            ids: ids.iter(),
        }
    }
}

impl<'c> Iterator for Children<'c> {
    type Item = Setting<'c>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = *self.ids.next()?;
        self.config.node(id).map(|node| Setting::new(self.config, id, node))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl ExactSizeIterator for Children<'_> {}

/// Detached, single-pass cursor over a setting's children.
///
/// ```rust
/// use libconfig::{Config, ConfigError, SettingType};
///
/// let mut cfg = Config::load_str("list = (1, 2);").unwrap();
/// let list = cfg.lookup("list").unwrap().id();
/// let mut cursor = cfg.cursor(list).unwrap();
/// assert!(cursor.next(&cfg).unwrap().is_ok());
///
/// cfg.add_child(list, None, SettingType::Bool).unwrap();
/// assert!(matches!(
///     cursor.next(&cfg),
///     Some(Err(ConfigError::ConcurrentModification { .. }))
/// ));
/// assert!(cursor.next(&cfg).is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ChildCursor {
    parent: SettingId,
    revision: u64,
    position: usize,
    done: bool,
}

impl ChildCursor {
    pub(crate) fn new(parent: SettingId, revision: u64) -> Self {
        Self {
            parent,
            revision,
            position: 0,
            done: false,
        }
    }

    pub fn parent(&self) -> SettingId {
        self.parent
    }

    /// Yields the next child, or the error that ended the walk.
    ///
    /// After `None` or an error the cursor is exhausted; ask the store for a
    /// fresh cursor to iterate again.
    #[allow(clippy::should_implement_trait)]
    pub fn next<'c>(&mut self, config: &'c Config) -> Option<Result<Setting<'c>>> {
        if self.done {
            return None;
        }
        let parent = match config.setting(self.parent) {
            Ok(parent) => parent,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };
        if config.revision(self.parent) != Some(self.revision) {
            self.done = true;
            debug!("cursor over '{}' invalidated", parent.path());
            return Some(Err(ConfigError::ConcurrentModification {
                path: parent.path(),
            }));
        }
        let child = parent.child(self.position);
        if child.is_none() {
            self.done = true;
        }
        self.position += 1;
        child.map(Ok)
    }
}
