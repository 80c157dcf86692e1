//! Borrowed, read-only view of one setting.

use serde_json::{Map, Number};

use crate::{
    arena::{Node, Payload, SettingId},
    config::Config,
    error::{ConfigError, Result},
    iter::Children,
    path::{self, Path, Segment},
    value::{Decode, FromSetting, SettingType, Value},
};

/// A setting borrowed from its [`Config`].
///
/// The view cannot outlive the store, and the store cannot be mutated while
/// any view exists. Use [`Setting::id`] to keep a handle across mutations.
#[derive(Clone, Copy)]
pub struct Setting<'c> {
    config: &'c Config,
    id: SettingId,
    node: &'c Node,
}

impl std::fmt::Debug for Setting<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Setting")
            .field("path", &self.path())
            .field("type", &self.setting_type())
            .finish()
    }
}

impl<'c> Setting<'c> {
    pub(crate) fn new(config: &'c Config, id: SettingId, node: &'c Node) -> Self {
        Self { config, id, node }
    }

    pub fn id(&self) -> SettingId {
        self.id
    }

    /// Member name, `None` for the root and for array/list elements.
    pub fn name(&self) -> Option<&'c str> {
        self.node.name.as_deref()
    }

    pub fn setting_type(&self) -> SettingType {
        self.node.setting_type()
    }

    pub fn is_root(&self) -> bool {
        self.node.parent.is_none()
    }

    pub fn parent(&self) -> Option<Setting<'c>> {
        self.node
            .parent
            .and_then(|parent| self.config.node(parent).map(|n| Setting::new(self.config, parent, n)))
    }

    /// Position within the parent, `None` for the root.
    pub fn index(&self) -> Option<usize> {
        let parent = self.config.node(self.node.parent?)?;
        parent.payload.children().iter().position(|c| *c == self.id)
    }

    /// Number of children; zero for scalars.
    pub fn len(&self) -> usize {
        self.node.payload.children().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_group(&self) -> bool {
        self.setting_type() == SettingType::Group
    }

    pub fn is_array(&self) -> bool {
        self.setting_type() == SettingType::Array
    }

    pub fn is_list(&self) -> bool {
        self.setting_type() == SettingType::List
    }

    pub fn is_aggregate(&self) -> bool {
        self.setting_type().is_aggregate()
    }

    pub fn is_scalar(&self) -> bool {
        self.setting_type().is_scalar()
    }

    pub fn is_number(&self) -> bool {
        self.setting_type().is_number()
    }

    pub fn is_string(&self) -> bool {
        self.setting_type() == SettingType::String
    }

    /// Stored value of a scalar setting.
    pub fn value(&self) -> Option<&'c Value> {
        match &self.node.payload {
            Payload::Scalar(v) => Some(v),
            _ => None,
        }
    }

    /// Line the setting was parsed from, if it came from a source.
    pub fn source_line(&self) -> Option<usize> {
        self.node.source.as_ref().map(|s| s.line)
    }

    pub fn source_file(&self) -> Option<&'c str> {
        self.node.source.as_ref().map(|s| s.file.as_ref())
    }

    /// Absolute path from the root, e.g. `server.tags.[1]`.
    pub fn path(&self) -> String {
        self.path_expr().to_string()
    }

    /// Absolute path as a parsed expression.
    pub fn path_expr(&self) -> Path {
        let mut segments = Vec::new();
        let mut current = *self;
        while let Some(parent) = current.parent() {
            let segment = match (parent.setting_type(), current.name()) {
                (SettingType::Group, Some(name)) => Segment::Name(name.to_string()),
                _ => Segment::Index(current.index().unwrap_or_default()),
            };
            segments.push(segment);
            current = parent;
        }
        segments.into_iter().rev().collect()
    }

    /// Group member by name.
    pub fn member(&self, name: &str) -> Option<Setting<'c>> {
        match &self.node.payload {
            Payload::Group(children) => children.iter().find_map(|id| {
                let node = self.config.node(*id)?;
                (node.name.as_deref() == Some(name)).then(|| Setting::new(self.config, *id, node))
            }),
            _ => None,
        }
    }

    /// Child by position, for any aggregate.
    pub fn child(&self, index: usize) -> Option<Setting<'c>> {
        let id = *self.node.payload.children().get(index)?;
        self.config.node(id).map(|n| Setting::new(self.config, id, n))
    }

    /// Children in insertion order.
    pub fn children(&self) -> Children<'c> {
        Children::new(self.config, self.node.payload.children())
    }

    /// Resolves `path` relative to this setting.
    pub fn lookup(&self, path: &str) -> Result<Setting<'c>> {
        path::resolve(*self, &Path::parse(path)?)
    }

    pub fn exists(&self, path: &str) -> bool {
        self.lookup(path).is_ok()
    }

    /// Reads the value as `T`.
    ///
    /// Fails with `TypeMismatch` across type families and with
    /// `NarrowingError` when the stored width cannot represent the value
    /// as `T`.
    pub fn get<T: FromSetting>(&self) -> Result<T> {
        let Some(value) = self.value() else {
            return Err(ConfigError::type_mismatch(
                self.path(),
                T::TYPE.as_str(),
                self.setting_type(),
            ));
        };
        T::from_value(value).map_err(|reason| match reason {
            Decode::Mismatch => {
                ConfigError::type_mismatch(self.path(), T::TYPE.as_str(), self.setting_type())
            }
            Decode::Narrowing => ConfigError::NarrowingError { path: self.path() },
        })
    }

    /// `lookup` followed by `get`, stopping at the first failure.
    pub fn lookup_value<T: FromSetting>(&self, path: &str) -> Result<T> {
        self.lookup(path)?.get()
    }

    /// Converts the subtree into JSON. Groups keep member order.
    pub fn as_json(&self) -> serde_json::Value {
        match &self.node.payload {
            Payload::Scalar(value) => match value {
                Value::Bool(b) => serde_json::Value::Bool(*b),
                Value::Int32(v) => serde_json::Value::Number(Number::from(*v)),
                Value::Int64(v) => serde_json::Value::Number(Number::from(*v)),
                Value::Float32(v) => Number::from_f64(f64::from(*v))
                    .map_or(serde_json::Value::Null, serde_json::Value::Number),
                Value::Float64(v) => {
                    Number::from_f64(*v).map_or(serde_json::Value::Null, serde_json::Value::Number)
                }
                Value::String(s) => serde_json::Value::String(s.clone()),
            },
            Payload::Group(_) => {
                let mut map = Map::new();
                for child in self.children() {
                    map.insert(child.name().unwrap_or_default().to_string(), child.as_json());
                }
                serde_json::Value::Object(map)
            }
            Payload::Array(_) | Payload::List(_) => {
                serde_json::Value::Array(self.children().map(|c| c.as_json()).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, ConfigError, SettingType};

    const SAMPLE: &str = r#"
        server = {
            port = 8080;
            host = "localhost";
            tags = [1, 2, 3];
            limits = ( 5000000000, 2.5, { burst = true; } );
        };
    "#;

    #[test]
    fn test_paths_are_computed_from_root() {
        let cfg = Config::load_str(SAMPLE).unwrap();
        assert_eq!(cfg.root().path(), "");
        assert_eq!(cfg.lookup("server.tags.[1]").unwrap().path(), "server.tags.[1]");
        assert_eq!(
            cfg.lookup("server.limits.[2].burst").unwrap().path(),
            "server.limits.[2].burst"
        );
    }

    #[test]
    fn test_navigation() {
        let cfg = Config::load_str(SAMPLE).unwrap();
        let tags = cfg.lookup("server.tags").unwrap();
        assert!(tags.is_array());
        assert_eq!(tags.len(), 3);
        assert_eq!(tags.name(), Some("tags"));
        assert_eq!(tags.index(), Some(2));

        let second = tags.child(1).unwrap();
        assert_eq!(second.name(), None);
        assert_eq!(second.index(), Some(1));
        assert_eq!(second.parent().unwrap().id(), tags.id());
        assert!(cfg.root().is_root());
        assert!(cfg.root().parent().is_none());
    }

    #[test]
    fn test_relative_lookup() {
        let cfg = Config::load_str(SAMPLE).unwrap();
        let server = cfg.lookup("server").unwrap();
        assert_eq!(server.lookup_value::<i32>("port").unwrap(), 8080);
        assert_eq!(server.lookup("").unwrap().id(), server.id());
        assert_eq!(
            server.lookup_value::<i32>("nope").unwrap_err(),
            ConfigError::NotFound {
                path: "server.nope".to_string()
            }
        );
    }

    #[test]
    fn test_get_on_aggregate_is_mismatch() {
        let cfg = Config::load_str(SAMPLE).unwrap();
        let err = cfg.lookup("server").unwrap().get::<i32>().unwrap_err();
        assert_eq!(
            err,
            ConfigError::TypeMismatch {
                path: "server".to_string(),
                expected: "Int32".to_string(),
                actual: SettingType::Group,
            }
        );
    }

    #[test]
    fn test_narrowing_reports_path() {
        let cfg = Config::load_str(SAMPLE).unwrap();
        assert_eq!(
            cfg.lookup_value::<i32>("server.limits.[0]").unwrap_err(),
            ConfigError::NarrowingError {
                path: "server.limits.[0]".to_string()
            }
        );
        assert_eq!(
            cfg.lookup_value::<i64>("server.limits.[0]").unwrap(),
            5_000_000_000
        );
    }

    #[test]
    fn test_as_json_keeps_order() {
        let cfg = Config::load_str(SAMPLE).unwrap();
        let json = cfg.lookup("server").unwrap().as_json();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["port", "host", "tags", "limits"]);
        assert_eq!(json["tags"], serde_json::json!([1, 2, 3]));
        assert_eq!(json["limits"][2]["burst"], serde_json::json!(true));
    }
}
