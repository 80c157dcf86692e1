use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use clap::ValueEnum;
use colored::Colorize;
use libconfig::{
    Config, FromSetting, IntoSetting, Setting, SettingType, Value, format::parse_scalar,
    value::Decode,
};

/// Host type a `get` reads the stored value as.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadAs {
    Bool,
    Int,
    Int64,
    Uint,
    Uint64,
    Float,
    Double,
    String,
}

impl ReadAs {
    fn for_type(ty: SettingType) -> Option<Self> {
        Some(match ty {
            SettingType::Bool => ReadAs::Bool,
            SettingType::Int32 => ReadAs::Int,
            SettingType::Int64 => ReadAs::Int64,
            SettingType::Float32 => ReadAs::Float,
            SettingType::Float64 => ReadAs::Double,
            SettingType::String => ReadAs::String,
            _ => return None,
        })
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum DumpFormat {
    Cfg,
    Json,
    Toml,
}

impl fmt::Display for DumpFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DumpFormat::Cfg => "cfg",
            DumpFormat::Json => "json",
            DumpFormat::Toml => "toml",
        })
    }
}

pub fn get(cfg: &Config, path: &str, read_as: Option<ReadAs>) -> Result<String> {
    let setting = cfg.lookup(path)?;
    let read_as = match read_as {
        Some(read_as) => read_as,
        None => ReadAs::for_type(setting.setting_type()).ok_or_else(|| {
            anyhow!(
                "'{}' is a {}, use `list` to show its children",
                setting.path(),
                setting.setting_type()
            )
        })?,
    };
    debug!("reading '{}' as {read_as:?}", setting.path());

    Ok(match read_as {
        ReadAs::Bool => setting.get::<bool>()?.to_string(),
        ReadAs::Int => setting.get::<i32>()?.to_string(),
        ReadAs::Int64 => setting.get::<i64>()?.to_string(),
        ReadAs::Uint => setting.get::<u32>()?.to_string(),
        ReadAs::Uint64 => setting.get::<u64>()?.to_string(),
        ReadAs::Float => setting.get::<f32>()?.to_string(),
        ReadAs::Double => setting.get::<f64>()?.to_string(),
        ReadAs::String => setting.get::<String>()?,
    })
}

/// Parses `literal` and stores it at `path`, converting to the stored type
/// when the literal fits (an `Int32` literal into an `Int64` setting).
pub fn set(cfg: &mut Config, path: &str, literal: &str) -> Result<()> {
    let value =
        parse_scalar(literal).ok_or_else(|| anyhow!("'{literal}' is not a scalar literal"))?;
    let setting = cfg.lookup(path)?;
    let (id, ty) = (setting.id(), setting.setting_type());

    match ty {
        SettingType::Bool => cfg.set(id, convert::<bool>(&value, path)?)?,
        SettingType::Int32 => cfg.set(id, convert::<i32>(&value, path)?)?,
        SettingType::Int64 => cfg.set(id, convert::<i64>(&value, path)?)?,
        SettingType::Float32 => cfg.set(id, convert::<f32>(&value, path)?)?,
        SettingType::Float64 => cfg.set(id, convert::<f64>(&value, path)?)?,
        SettingType::String => cfg.set(id, convert::<String>(&value, path)?)?,
        other => bail!("'{path}' is a {other}; only scalar settings can be set"),
    }
    info!("set '{path}' to {value:?}");
    Ok(())
}

fn convert<T: FromSetting + IntoSetting>(value: &Value, path: &str) -> Result<T> {
    <T as FromSetting>::from_value(value).map_err(|reason| {
        let why = match reason {
            Decode::Mismatch => "wrong type",
            Decode::Narrowing => "out of range",
        };
        anyhow!(
            "cannot store {} literal at '{path}' ({} expected): {why}",
            value.setting_type(),
            <T as FromSetting>::TYPE
        )
    })
}

/// One line per child: index or name, type, then the value or child count.
pub fn list(cfg: &Config, path: &str) -> Result<String> {
    let setting = cfg.lookup(path)?;
    if !setting.is_aggregate() {
        bail!(
            "'{}' is a {}, use `get` to print it",
            setting.path(),
            setting.setting_type()
        );
    }

    let lines: Vec<String> = setting
        .children()
        .enumerate()
        .map(|(i, child)| {
            let label = child.name().map_or_else(|| format!("[{i}]"), str::to_string);
            format!(
                "{label:<24} {:<8} {}",
                child.setting_type().as_str().cyan(),
                summary(child)
            )
        })
        .collect();
    Ok(lines.join("\n"))
}

fn summary(setting: Setting<'_>) -> String {
    match setting.value() {
        Some(Value::String(s)) => format!("{s:?}"),
        Some(Value::Bool(b)) => b.to_string(),
        Some(Value::Int32(v)) => v.to_string(),
        Some(Value::Int64(v)) => format!("{v}L"),
        Some(Value::Float32(v)) => v.to_string(),
        Some(Value::Float64(v)) => v.to_string(),
        None => match setting.len() {
            1 => "1 child".to_string(),
            n => format!("{n} children"),
        },
    }
}

pub fn dump(cfg: &Config, format: DumpFormat) -> Result<String> {
    Ok(match format {
        DumpFormat::Cfg => cfg.to_cfg_string()?,
        DumpFormat::Json => serde_json::to_string_pretty(&cfg.root().as_json())?,
        DumpFormat::Toml => toml::to_string_pretty(&cfg.root().as_json())
            .context("settings cannot be expressed as TOML")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        name = "demo";
        debug = false;
        big = 5000000000L;
        ratio = 0.25;
        server = { port = 8080; host = "localhost"; };
        ports = [80, 443];
    "#;

    fn sample() -> Config {
        Config::load_str(SAMPLE).unwrap()
    }

    #[test]
    fn test_get_uses_stored_type() {
        let cfg = sample();
        assert_eq!(get(&cfg, "server.port", None).unwrap(), "8080");
        assert_eq!(get(&cfg, "name", None).unwrap(), "demo");
        assert_eq!(get(&cfg, "big", None).unwrap(), "5000000000");
        assert_eq!(get(&cfg, "ports.[1]", None).unwrap(), "443");
    }

    #[test]
    fn test_get_with_override() {
        let cfg = sample();
        assert_eq!(get(&cfg, "server.port", Some(ReadAs::Int64)).unwrap(), "8080");
        let err = get(&cfg, "big", Some(ReadAs::Int)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<libconfig::ConfigError>(),
            Some(libconfig::ConfigError::NarrowingError { .. })
        ));
        let err = get(&cfg, "name", Some(ReadAs::Bool)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<libconfig::ConfigError>(),
            Some(libconfig::ConfigError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_get_aggregate_is_refused() {
        let err = get(&sample(), "server", None).unwrap_err();
        assert!(err.to_string().contains("use `list`"));
    }

    #[test]
    fn test_set_converts_literal() {
        let mut cfg = sample();
        set(&mut cfg, "server.port", "9090").unwrap();
        set(&mut cfg, "big", "7").unwrap();
        set(&mut cfg, "server.host", "\"example.org\"").unwrap();
        assert_eq!(cfg.lookup_value::<i32>("server.port").unwrap(), 9090);
        assert_eq!(cfg.type_of("big"), SettingType::Int64);
        assert_eq!(cfg.lookup_value::<i64>("big").unwrap(), 7);
        assert_eq!(cfg.lookup_value::<String>("server.host").unwrap(), "example.org");
    }

    #[test]
    fn test_set_rejects_bad_input() {
        let mut cfg = sample();
        assert!(set(&mut cfg, "server.port", "eighty").is_err());
        assert!(set(&mut cfg, "server.port", "\"80\"").is_err());
        assert!(set(&mut cfg, "server.port", "5000000000L").is_err());
        assert!(set(&mut cfg, "server", "1").is_err());
        assert!(set(&mut cfg, "missing", "1").is_err());
        assert_eq!(cfg.lookup_value::<i32>("server.port").unwrap(), 8080);
    }

    #[test]
    fn test_list_children() {
        colored::control::set_override(false);
        let cfg = sample();
        let root = list(&cfg, "").unwrap();
        let lines: Vec<&str> = root.lines().collect();
        assert_eq!(lines.len(), 6);
        assert!(lines[0].starts_with("name"));
        assert!(lines[0].ends_with("\"demo\""));
        assert!(lines[4].ends_with("2 children"));

        let ports = list(&cfg, "ports").unwrap();
        assert!(ports.lines().next().unwrap().starts_with("[0]"));
        assert!(list(&cfg, "name").is_err());
    }

    #[test]
    fn test_dump_formats() {
        let cfg = Config::load_str("a = 1; g = { b = \"x\"; };").unwrap();
        assert_eq!(dump(&cfg, DumpFormat::Cfg).unwrap(), cfg.to_cfg_string().unwrap());

        let json: serde_json::Value =
            serde_json::from_str(&dump(&cfg, DumpFormat::Json).unwrap()).unwrap();
        assert_eq!(json["g"]["b"], "x");

        let toml: toml::Value = toml::from_str(&dump(&cfg, DumpFormat::Toml).unwrap()).unwrap();
        assert_eq!(toml["a"].as_integer(), Some(1));
        assert_eq!(toml["g"]["b"].as_str(), Some("x"));
    }

    #[test]
    fn test_dump_format_names() {
        assert_eq!(DumpFormat::Json.to_string(), "json");
        assert_eq!(DumpFormat::from_str("toml", true).unwrap(), DumpFormat::Toml);
    }
}
