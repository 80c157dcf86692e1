//! Renders a settings tree back into libconfig text.

use std::fmt::Write;

use crate::{
    config::Config,
    fault::Fault,
    setting::Setting,
    value::Value,
};

const INDENT: &str = "  ";

/// Renders the whole tree, one top-level setting per line.
pub(crate) fn render(config: &Config) -> Result<String, Fault> {
    let mut out = String::new();
    write_members(&mut out, config.root(), 0)?;
    Ok(out)
}

fn write_members(out: &mut String, group: Setting<'_>, depth: usize) -> Result<(), Fault> {
    for member in group.children() {
        indent(out, depth);
        out.push_str(member.name().unwrap_or_default());
        out.push_str(" = ");
        write_value(out, member, depth)?;
        out.push_str(";\n");
    }
    Ok(())
}

fn write_value(out: &mut String, setting: Setting<'_>, depth: usize) -> Result<(), Fault> {
    if let Some(value) = setting.value() {
        return write_scalar(out, value, &setting);
    }
    if setting.is_group() {
        if setting.is_empty() {
            out.push_str("{ }");
            return Ok(());
        }
        out.push_str("{\n");
        write_members(out, setting, depth + 1)?;
        indent(out, depth);
        out.push('}');
        return Ok(());
    }

    let (open, close) = if setting.is_array() { ('[', ']') } else { ('(', ')') };
    out.push(open);
    for (i, element) in setting.children().enumerate() {
        out.push_str(if i == 0 { " " } else { ", " });
        write_value(out, element, depth)?;
    }
    if !setting.is_empty() {
        out.push(' ');
    }
    out.push(close);
    Ok(())
}

fn write_scalar(out: &mut String, value: &Value, setting: &Setting<'_>) -> Result<(), Fault> {
    match value {
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int32(v) => write!(out, "{v}")?,
        Value::Int64(v) => write!(out, "{v}L")?,
        Value::Float32(v) => write_float(out, f64::from(*v), setting)?,
        Value::Float64(v) => write_float(out, *v, setting)?,
        Value::String(s) => write_string(out, s)?,
    }
    Ok(())
}

/// Debug formatting of a finite `f64` is the shortest text that reads back
/// to the same value and always carries a `.` or an exponent.
fn write_float(out: &mut String, v: f64, setting: &Setting<'_>) -> Result<(), Fault> {
    if !v.is_finite() {
        return Err(Fault::Engine(format!(
            "cannot represent non-finite float {v} at '{}'",
            setting.path()
        )));
    }
    write!(out, "{v:?}")?;
    Ok(())
}

fn write_string(out: &mut String, s: &str) -> Result<(), Fault> {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\x0C' => out.push_str("\\f"),
            c if c.is_ascii_control() => write!(out, "\\x{:02X}", u32::from(c))?,
            c => out.push(c),
        }
    }
    out.push('"');
    Ok(())
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }
}

#[cfg(test)]
mod tests {
    use crate::{Config, ConfigError, SettingType};

    /// Structural equality: names, types, order and values.
    fn same_tree(a: crate::Setting<'_>, b: crate::Setting<'_>) -> bool {
        a.name() == b.name()
            && a.setting_type() == b.setting_type()
            && a.value() == b.value()
            && a.len() == b.len()
            && a.children().zip(b.children()).all(|(x, y)| same_tree(x, y))
    }

    #[test]
    fn test_render_layout() {
        let cfg = Config::load_str(
            "server = { port = 8080; host = \"localhost\"; tags = [1, 2, 3]; };\nempty = ();",
        )
        .unwrap();
        assert_eq!(
            cfg.to_cfg_string().unwrap(),
            "server = {\n  port = 8080;\n  host = \"localhost\";\n  tags = [ 1, 2, 3 ];\n};\nempty = ();\n"
        );
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let source = r#"
            # comments are not kept, values are
            name = "quote \" backslash \\ tab \t bell \x07";
            big = 123456789012L;
            small = -5;
            ratio = 0.1;
            tiny = 1e-300;
            flags = [true, false];
            nested = ( { a = 1; b = [ 1.5, 2.0 ]; }, "x", ( ), [ ] );
            deep = { deeper = { deepest = "yes"; }; empty = { }; };
        "#;
        let first = Config::load_str(source).unwrap();
        let text = first.to_cfg_string().unwrap();
        let second = Config::load_str(&text).unwrap();
        assert!(same_tree(first.root(), second.root()), "{text}");
        assert_eq!(second.to_cfg_string().unwrap(), text);
    }

    #[test]
    fn test_float32_reloads_within_width() {
        let mut cfg = Config::new();
        let root = cfg.root_id();
        let id = cfg.add_child(root, Some("f"), SettingType::Float32).unwrap();
        cfg.set(id, 0.1f32).unwrap();

        let reloaded = Config::load_str(&cfg.to_cfg_string().unwrap()).unwrap();
        assert_eq!(reloaded.type_of("f"), SettingType::Float64);
        assert_eq!(reloaded.lookup_value::<f32>("f").unwrap(), 0.1f32);
    }

    #[test]
    fn test_non_finite_float_is_rejected() {
        let mut cfg = Config::new();
        let root = cfg.root_id();
        let id = cfg.add_child(root, Some("f"), SettingType::Float64).unwrap();
        cfg.set(id, f64::INFINITY).unwrap();
        assert!(matches!(
            cfg.to_cfg_string(),
            Err(ConfigError::NativeError { message }) if message.contains("'f'")
        ));
    }

    #[test]
    fn test_save_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.cfg");
        let cfg = Config::load_str("a = { b = [1, 2]; c = \"d\"; };").unwrap();
        cfg.save_file(&path).unwrap();
        let reloaded = Config::load_file(&path).unwrap();
        assert!(same_tree(cfg.root(), reloaded.root()));
    }

    #[test]
    fn test_save_into_missing_dir_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_str("a = 1;").unwrap();
        let err = cfg.save_file(dir.path().join("no/such/dir/out.cfg")).unwrap_err();
        assert!(matches!(err, ConfigError::IoError { .. }), "{err:?}");
    }
}
