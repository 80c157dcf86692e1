//! The settings store: owns the tree and exposes lookup and mutation.

use std::{
    fs,
    io::{Read, Write},
    path::Path,
};

use crate::{
    arena::{Arena, Node, Payload, SettingId},
    error::{ConfigError, Result},
    fault::{Fault, Translator},
    format::emit,
    iter::ChildCursor,
    loader::Loader,
    path::is_valid_name,
    setting::Setting,
    value::{FromSetting, IntoSetting, SettingType},
};

/// A settings tree rooted at a single group.
///
/// Read access goes through borrowed [`Setting`] views; mutation takes
/// `&mut self` and addresses settings by [`SettingId`]. Every mutation either
/// succeeds completely or leaves the tree untouched.
#[derive(Debug, Clone)]
pub struct Config {
    arena: Arena,
    root: SettingId,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Creates a store holding only an empty root group.
    pub fn new() -> Self {
        let mut arena = Arena::default();
        let root = arena.insert(Node::new(None, None, Payload::Group(Vec::new())));
        Self { arena, root }
    }

    /// Parses settings text. Errors name the source `<string>`.
    pub fn load_str(text: &str) -> Result<Self> {
        Loader::default().load_str(text)
    }

    /// Reads and parses a settings file.
    pub fn load_file(path: impl AsRef<Path>) -> Result<Self> {
        Loader::default().load_file(path)
    }

    /// Reads settings text from `reader`; `name` is used in parse errors.
    pub fn load_reader(reader: impl Read, name: &str) -> Result<Self> {
        Loader::default().load_reader(reader, name)
    }

    /// Renders the tree as settings text.
    pub fn to_cfg_string(&self) -> Result<String> {
        Translator::new("render").run(|| emit::render(self))
    }

    /// Writes the tree to `writer`.
    pub fn save_writer(&self, mut writer: impl Write) -> Result<()> {
        Translator::new("save").run(|| {
            let text = emit::render(self)?;
            writer.write_all(text.as_bytes())?;
            writer.flush()?;
            Ok(())
        })
    }

    /// Writes the tree to the file at `path`, replacing it.
    pub fn save_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!("saving settings to {}", path.display());
        Translator::new("save").run(|| {
            let text = emit::render(self)?;
            fs::write(path, text).map_err(|e| {
                Fault::Io(std::io::Error::new(
                    e.kind(),
                    format!("failed to write {}: {e}", path.display()),
                ))
            })
        })
    }

    pub fn root(&self) -> Setting<'_> {
        self.setting_unchecked(self.root)
    }

    pub fn root_id(&self) -> SettingId {
        self.root
    }

    /// Turns a handle back into a view.
    ///
    /// Handles issued by another store are reported as stale.
    pub fn setting(&self, id: SettingId) -> Result<Setting<'_>> {
        self.arena
            .get(id)
            .map(|node| Setting::new(self, id, node))
            .ok_or(ConfigError::StaleHandle)
    }

    /// Number of settings in the tree, the root included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    /// Whether the root group has no members.
    pub fn is_empty(&self) -> bool {
        self.root().is_empty()
    }

    /// Resolves an absolute path.
    pub fn lookup(&self, path: &str) -> Result<Setting<'_>> {
        self.root().lookup(path)
    }

    /// Resolves an absolute path and reads it as `T`.
    pub fn lookup_value<T: FromSetting>(&self, path: &str) -> Result<T> {
        self.root().lookup_value(path)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.root().exists(path)
    }

    /// Type of the setting at `path`, [`SettingType::None`] if it does not resolve.
    pub fn type_of(&self, path: &str) -> SettingType {
        self.lookup(path)
            .map_or(SettingType::None, |s| s.setting_type())
    }

    /// Opens a detached cursor over the children of `id`.
    pub fn cursor(&self, id: SettingId) -> Result<ChildCursor> {
        let node = self.arena.get(id).ok_or(ConfigError::StaleHandle)?;
        Ok(ChildCursor::new(id, node.revision))
    }

    /// Stores `value` into the scalar setting `id`.
    ///
    /// The setting's type must be exactly `T`'s type; it is never changed.
    pub fn set<T: IntoSetting>(&mut self, id: SettingId, value: T) -> Result<()> {
        let setting = self.setting(id)?;
        if setting.setting_type() != T::TYPE {
            return Err(ConfigError::type_mismatch(
                setting.path(),
                T::TYPE.as_str(),
                setting.setting_type(),
            ));
        }
        let node = self.arena.get_mut(id).ok_or(ConfigError::StaleHandle)?;
        node.payload = Payload::Scalar(value.into_value());
        Ok(())
    }

    /// Resolves `path` and stores `value` there.
    pub fn set_at<T: IntoSetting>(&mut self, path: &str, value: T) -> Result<()> {
        let id = self.lookup(path)?.id();
        self.set(id, value)
    }

    /// Appends a child of type `ty` to the aggregate `parent`.
    ///
    /// Group members need a unique, well-formed `name`; array and list
    /// elements take `None`. Array elements must be scalars of the same
    /// type as their siblings. New scalars hold their type's zero value.
    pub fn add_child(
        &mut self,
        parent: SettingId,
        name: Option<&str>,
        ty: SettingType,
    ) -> Result<SettingId> {
        let view = self.setting(parent)?;
        let payload = Payload::empty(ty).ok_or_else(|| {
            ConfigError::type_mismatch(view.path(), "a concrete setting type", ty)
        })?;

        match (view.setting_type(), name) {
            (SettingType::Group, Some(name)) if is_valid_name(name) => {
                if view.member(name).is_some() {
                    return Err(ConfigError::DuplicateName {
                        path: view.path(),
                        name: name.to_string(),
                    });
                }
            }
            (SettingType::Group, name) => {
                return Err(ConfigError::InvalidName {
                    path: view.path(),
                    name: name.unwrap_or_default().to_string(),
                });
            }
            (SettingType::Array | SettingType::List, Some(name)) => {
                return Err(ConfigError::InvalidName {
                    path: view.path(),
                    name: name.to_string(),
                });
            }
            (SettingType::Array, None) => {
                if !ty.is_scalar() {
                    return Err(ConfigError::type_mismatch(view.path(), "a scalar type", ty));
                }
                if view.child(0).is_some_and(|first| first.setting_type() != ty) {
                    return Err(ConfigError::HeterogeneousArray { path: view.path() });
                }
            }
            (SettingType::List, None) => {}
            (actual, _) => {
                return Err(ConfigError::type_mismatch(
                    view.path(),
                    "Group, Array or List",
                    actual,
                ));
            }
        }

        let node = Node::new(name.map(str::to_string), Some(parent), payload);
        let id = self.attach(parent, node)?;
        trace!("added {ty} child {id:?} under {parent:?}");
        Ok(id)
    }

    /// Removes `id` and its whole subtree.
    pub fn remove(&mut self, id: SettingId) -> Result<()> {
        let node = self.arena.get(id).ok_or(ConfigError::StaleHandle)?;
        let Some(parent) = node.parent else {
            return Err(ConfigError::type_mismatch(
                "",
                "a non-root setting",
                SettingType::Group,
            ));
        };
        let parent_node = self.arena.get_mut(parent).ok_or(ConfigError::StaleHandle)?;
        if let Some(children) = parent_node.payload.children_mut() {
            children.retain(|c| *c != id);
        }
        parent_node.revision += 1;
        let freed = self.arena.remove_subtree(id);
        trace!("removed {id:?} ({freed} settings)");
        Ok(())
    }

    /// Removes the group member `name` of `parent`.
    pub fn remove_child(&mut self, parent: SettingId, name: &str) -> Result<()> {
        let view = self.setting(parent)?;
        if !view.is_group() {
            return Err(ConfigError::type_mismatch(
                view.path(),
                SettingType::Group.as_str(),
                view.setting_type(),
            ));
        }
        let id = view
            .member(name)
            .ok_or_else(|| {
                let mut path = view.path_expr();
                path.push(crate::path::Segment::Name(name.to_string()));
                ConfigError::not_found(path.to_string())
            })?
            .id();
        self.remove(id)
    }

    /// Removes the child at `index` of any aggregate `parent`.
    pub fn remove_at(&mut self, parent: SettingId, index: usize) -> Result<()> {
        let view = self.setting(parent)?;
        if !view.is_aggregate() {
            return Err(ConfigError::type_mismatch(
                view.path(),
                "Group, Array or List",
                view.setting_type(),
            ));
        }
        let id = view
            .child(index)
            .ok_or_else(|| {
                let mut path = view.path_expr();
                path.push(crate::path::Segment::Index(index));
                ConfigError::not_found(path.to_string())
            })?
            .id();
        self.remove(id)
    }

    /// Links a new node as the last child of `parent`, bumping its revision.
    pub(crate) fn attach(&mut self, parent: SettingId, node: Node) -> Result<SettingId> {
        let view = self.setting(parent)?;
        if view.is_scalar() {
            return Err(ConfigError::type_mismatch(
                view.path(),
                "Group, Array or List",
                view.setting_type(),
            ));
        }
        let id = self.arena.insert(node);
        if let Some(parent_node) = self.arena.get_mut(parent) {
            if let Some(children) = parent_node.payload.children_mut() {
                children.push(id);
            }
            parent_node.revision += 1;
        }
        Ok(id)
    }

    pub(crate) fn node(&self, id: SettingId) -> Option<&Node> {
        self.arena.get(id)
    }

    pub(crate) fn revision(&self, id: SettingId) -> Option<u64> {
        self.arena.get(id).map(|n| n.revision)
    }

    fn setting_unchecked(&self, id: SettingId) -> Setting<'_> {
        match self.arena.get(id) {
            Some(node) => Setting::new(self, id, node),
            None => unreachable!("root setting is never removed"),
        }
    }
}
