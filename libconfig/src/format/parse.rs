//! Builds a settings tree from libconfig text.
//!
//! Syntax is checked by the pest grammar in `libconfig.pest`; the builder
//! then enforces the tree invariants the grammar cannot express (unique
//! member names, homogeneous arrays, integer ranges) and expands
//! `@include` directives.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use pest::{
    Parser,
    error::{Error as PestError, LineColLocation},
    iterators::Pair,
};
use pest_derive::Parser;

use crate::{
    arena::{Node, Payload, SettingId, SourceLocation},
    config::Config,
    fault::Fault,
    loader::LoadOptions,
    value::{SettingType, Value},
};

#[derive(Parser)]
#[grammar = "format/libconfig.pest"]
struct LibconfigParser;

/// Parses `text` into a fresh store.
pub(crate) fn parse_document(
    text: &str,
    file: &str,
    base_dir: Option<&Path>,
    options: &LoadOptions,
) -> Result<Config, Fault> {
    let mut config = Config::new();
    let root = config.root_id();
    let source = Source {
        file: Arc::from(file),
        base_dir: base_dir.map(Path::to_path_buf),
    };
    let mut builder = TreeBuilder {
        config: &mut config,
        options,
        depth: 0,
    };
    builder.parse_into(root, text, &source)?;
    debug!("parsed {file}: {} settings", config.len() - 1);
    Ok(config)
}

/// Parses a single scalar literal, e.g. a value given on a command line.
pub fn parse_scalar(text: &str) -> Option<Value> {
    let pair = LibconfigParser::parse(Rule::scalar_only, text).ok()?.next()?;
    let source = Source {
        file: Arc::from(crate::loader::STRING_SOURCE),
        base_dir: None,
    };
    scalar(pair.into_inner().next()?, &source).ok()
}

struct Source {
    file: Arc<str>,
    base_dir: Option<PathBuf>,
}

impl Source {
    fn fault(&self, pair: &Pair<'_, Rule>, message: impl Into<String>) -> Fault {
        Fault::Parse {
            file: self.file.to_string(),
            line: line_of(pair),
            message: message.into(),
        }
    }

    fn location(&self, pair: &Pair<'_, Rule>) -> SourceLocation {
        SourceLocation {
            file: Arc::clone(&self.file),
            line: line_of(pair),
        }
    }
}

struct TreeBuilder<'a> {
    config: &'a mut Config,
    options: &'a LoadOptions,
    depth: usize,
}

impl TreeBuilder<'_> {
    fn parse_into(&mut self, group: SettingId, text: &str, source: &Source) -> Result<(), Fault> {
        let document = LibconfigParser::parse(Rule::config, text)
            .map_err(|e| syntax_fault(&e, &source.file))?
            .next()
            .ok_or_else(|| Fault::Engine("parser produced no document".to_string()))?;
        self.members(group, document, source)
    }

    fn members(&mut self, group: SettingId, pair: Pair<'_, Rule>, source: &Source) -> Result<(), Fault> {
        for member in pair.into_inner() {
            match member.as_rule() {
                Rule::setting => self.setting(group, member, source)?,
                Rule::include => self.include(group, member, source)?,
                Rule::EOI => {}
                rule => return Err(Fault::Engine(format!("unexpected {rule:?} in group"))),
            }
        }
        Ok(())
    }

    fn setting(&mut self, group: SettingId, pair: Pair<'_, Rule>, source: &Source) -> Result<(), Fault> {
        let mut inner = pair.clone().into_inner();
        let (Some(name), Some(value)) = (inner.next(), inner.next()) else {
            return Err(source.fault(&pair, "incomplete setting"));
        };
        let name_str = name.as_str();
        let duplicate = self
            .config
            .setting(group)
            .is_ok_and(|g| g.member(name_str).is_some());
        if duplicate {
            return Err(source.fault(&name, format!("duplicate setting name '{name_str}'")));
        }
        self.value(group, Some(name_str.to_string()), value, source)?;
        Ok(())
    }

    fn include(&mut self, group: SettingId, pair: Pair<'_, Rule>, source: &Source) -> Result<(), Fault> {
        if self.depth >= self.options.max_include_depth {
            return Err(source.fault(&pair, "include nesting too deep"));
        }
        let quoted = pair
            .clone()
            .into_inner()
            .next()
            .ok_or_else(|| source.fault(&pair, "missing include file name"))?;
        let name = quoted_text(quoted, source)?;
        let path = self.include_path(&name, source);
        trace!("including {}", path.display());
        let text = fs::read_to_string(&path).map_err(|e| {
            source.fault(&pair, format!("cannot open include file '{}': {e}", path.display()))
        })?;
        let included = Source {
            file: Arc::from(path.display().to_string()),
            base_dir: path.parent().map(Path::to_path_buf),
        };
        self.depth += 1;
        let result = self.parse_into(group, &text, &included);
        self.depth -= 1;
        result
    }

    fn include_path(&self, name: &str, source: &Source) -> PathBuf {
        let path = Path::new(name);
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match (&self.options.include_dir, &source.base_dir) {
            (Some(dir), _) | (None, Some(dir)) => dir.join(path),
            (None, None) => path.to_path_buf(),
        }
    }

    fn value(
        &mut self,
        parent: SettingId,
        name: Option<String>,
        pair: Pair<'_, Rule>,
        source: &Source,
    ) -> Result<SettingId, Fault> {
        let payload = match pair.as_rule() {
            Rule::group => Payload::Group(Vec::new()),
            Rule::array => Payload::Array(Vec::new()),
            Rule::list => Payload::List(Vec::new()),
            _ => Payload::Scalar(scalar(pair.clone(), source)?),
        };
        let mut node = Node::new(name, Some(parent), payload);
        node.source = Some(source.location(&pair));
        let id = self
            .config
            .attach(parent, node)
            .map_err(|e| Fault::Engine(e.to_string()))?;

        match pair.as_rule() {
            Rule::group => self.members(id, pair, source)?,
            Rule::list => {
                for element in pair.into_inner() {
                    self.value(id, None, element, source)?;
                }
            }
            Rule::array => self.array_elements(id, pair, source)?,
            _ => {}
        }
        Ok(id)
    }

    fn array_elements(&mut self, array: SettingId, pair: Pair<'_, Rule>, source: &Source) -> Result<(), Fault> {
        let mut elements = Vec::new();
        for element in pair.into_inner() {
            let value = scalar(element.clone(), source)?;
            elements.push((value, element));
        }

        // Int32 and Int64 literals may mix; the array takes the wider type.
        let mut element_type = None;
        for (value, element) in &elements {
            let ty = value.setting_type();
            element_type = match (element_type, ty) {
                (None, ty) => Some(ty),
                (Some(a), b) if a == b => Some(a),
                (Some(SettingType::Int32 | SettingType::Int64), SettingType::Int32 | SettingType::Int64) => {
                    Some(SettingType::Int64)
                }
                _ => {
                    return Err(source.fault(element, "mismatched element type in array"));
                }
            };
        }

        for (value, element) in elements {
            let value = match (element_type, value) {
                (Some(SettingType::Int64), Value::Int32(v)) => Value::Int64(i64::from(v)),
                (_, value) => value,
            };
            let mut node = Node::new(None, Some(array), Payload::Scalar(value));
            node.source = Some(source.location(&element));
            self.config
                .attach(array, node)
                .map_err(|e| Fault::Engine(e.to_string()))?;
        }
        Ok(())
    }
}

fn scalar(pair: Pair<'_, Rule>, source: &Source) -> Result<Value, Fault> {
    let text = pair.as_str();
    match pair.as_rule() {
        Rule::boolean => Ok(Value::Bool(text.eq_ignore_ascii_case("true"))),
        Rule::integer => {
            let (digits, wide) = strip_int_suffix(text);
            let v = digits
                .parse::<i64>()
                .map_err(|_| source.fault(&pair, format!("integer value out of range: {text}")))?;
            Ok(integer_value(v, wide))
        }
        Rule::hex => {
            let (digits, wide) = strip_int_suffix(text);
            let digits = &digits[2..];
            let bits = u64::from_str_radix(digits, 16)
                .map_err(|_| source.fault(&pair, format!("integer value out of range: {text}")))?;
            Ok(hex_value(bits, wide))
        }
        Rule::float => {
            let v = text
                .parse::<f64>()
                .map_err(|e| source.fault(&pair, format!("invalid float '{text}': {e}")))?;
            if !v.is_finite() {
                return Err(source.fault(&pair, format!("float value out of range: {text}")));
            }
            Ok(Value::Float64(v))
        }
        Rule::string => {
            let mut out = String::new();
            for quoted in pair.into_inner() {
                out.push_str(&quoted_text(quoted, source)?);
            }
            Ok(Value::String(out))
        }
        rule => Err(source.fault(&pair, format!("expected a scalar value, found {rule:?}"))),
    }
}

fn strip_int_suffix(text: &str) -> (&str, bool) {
    if let Some(digits) = text.strip_suffix("LL") {
        (digits, true)
    } else if let Some(digits) = text.strip_suffix('L') {
        (digits, true)
    } else {
        (text, false)
    }
}

fn integer_value(v: i64, wide: bool) -> Value {
    match i32::try_from(v) {
        Ok(narrow) if !wide => Value::Int32(narrow),
        _ => Value::Int64(v),
    }
}

/// Hex literals denote bit patterns: up to 32 bits fill an Int32, wider
/// ones an Int64.
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
fn hex_value(bits: u64, wide: bool) -> Value {
    if !wide && bits <= u64::from(u32::MAX) {
        Value::Int32(bits as u32 as i32)
    } else {
        Value::Int64(bits as i64)
    }
}

fn quoted_text(quoted: Pair<'_, Rule>, source: &Source) -> Result<String, Fault> {
    let raw = quoted.clone().into_inner().next().map_or("", |t| t.as_str());
    unescape(raw).map_err(|message| source.fault(&quoted, message))
}

/// `\xNN` escapes insert raw bytes; the decoded bytes must form UTF-8.
fn unescape(raw: &str) -> Result<String, String> {
    let mut out = Vec::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => out.push(b'\n'),
            Some('r') => out.push(b'\r'),
            Some('t') => out.push(b'\t'),
            Some('f') => out.push(b'\x0C'),
            Some('\\') => out.push(b'\\'),
            Some('"') => out.push(b'"'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                let byte = (hex.len() == 2)
                    .then(|| u8::from_str_radix(&hex, 16).ok())
                    .flatten()
                    .ok_or_else(|| format!("invalid hex escape '\\x{hex}'"))?;
                out.push(byte);
            }
            Some(other) => return Err(format!("invalid escape sequence '\\{other}'")),
            None => return Err("dangling escape at end of string".to_string()),
        }
    }
    String::from_utf8(out).map_err(|_| "string is not valid UTF-8".to_string())
}

fn line_of(pair: &Pair<'_, Rule>) -> usize {
    pair.as_span().start_pos().line_col().0
}

fn syntax_fault(err: &PestError<Rule>, file: &str) -> Fault {
    let line = match err.line_col {
        LineColLocation::Pos((line, _)) | LineColLocation::Span((line, _), _) => line,
    };
    Fault::Parse {
        file: file.to_string(),
        line,
        message: err.variant.message().into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ConfigError, SettingType};

    fn load(text: &str) -> Config {
        Config::load_str(text).unwrap()
    }

    fn parse_err(text: &str) -> (usize, String) {
        match Config::load_str(text).unwrap_err() {
            ConfigError::ParseError { line, message, .. } => (line, message),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_scalar_literals() {
        let cfg = load(
            r#"
            yes = TRUE; no = false;
            small = -42; big = 3000000000; forced = 7L;
            mask = 0xFF; wide_mask = 0xFFFFFFFF; long_mask = 0x10L;
            pi = 3.25; half = .5; trailing = 1.; sci = -2.5e-3; exp = 1e3;
            "#,
        );
        assert!(cfg.lookup_value::<bool>("yes").unwrap());
        assert!(!cfg.lookup_value::<bool>("no").unwrap());
        assert_eq!(cfg.type_of("small"), SettingType::Int32);
        assert_eq!(cfg.lookup_value::<i32>("small").unwrap(), -42);
        assert_eq!(cfg.type_of("big"), SettingType::Int64);
        assert_eq!(cfg.lookup_value::<i64>("big").unwrap(), 3_000_000_000);
        assert_eq!(cfg.type_of("forced"), SettingType::Int64);
        assert_eq!(cfg.lookup_value::<i32>("mask").unwrap(), 255);
        assert_eq!(cfg.lookup_value::<i32>("wide_mask").unwrap(), -1);
        assert_eq!(cfg.type_of("long_mask"), SettingType::Int64);
        assert_eq!(cfg.lookup_value::<f64>("pi").unwrap(), 3.25);
        assert_eq!(cfg.lookup_value::<f64>("half").unwrap(), 0.5);
        assert_eq!(cfg.lookup_value::<f64>("trailing").unwrap(), 1.0);
        assert_eq!(cfg.lookup_value::<f64>("sci").unwrap(), -2.5e-3);
        assert_eq!(cfg.lookup_value::<f64>("exp").unwrap(), 1000.0);
    }

    #[test]
    fn test_strings_and_escapes() {
        let cfg = load(r#"s = "tab\there" " and \"more\"" ; hex = "\x41\x42"; empty = "";"#);
        assert_eq!(
            cfg.lookup_value::<String>("s").unwrap(),
            "tab\there and \"more\""
        );
        assert_eq!(cfg.lookup_value::<String>("hex").unwrap(), "AB");
        assert_eq!(cfg.lookup_value::<String>("empty").unwrap(), "");
    }

    #[test]
    fn test_comments_and_separators() {
        let cfg = load(
            "# hash comment\n\
             a : 1, // line comment\n\
             /* block\n comment */ b = 2\n\
             c = \"# not a comment\";\n",
        );
        assert_eq!(cfg.lookup_value::<i32>("a").unwrap(), 1);
        assert_eq!(cfg.lookup_value::<i32>("b").unwrap(), 2);
        assert_eq!(cfg.lookup_value::<String>("c").unwrap(), "# not a comment");
    }

    #[test]
    fn test_aggregates() {
        let cfg = load(
            r#"
            app = {
                ids = [1, 2, 3000000000];
                mixed = ("a", 1, [true, false], { inner = 1.5; }, ());
                empty = {};
            };
            "#,
        );
        let ids = cfg.lookup("app.ids").unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids.children().all(|c| c.setting_type() == SettingType::Int64));

        let mixed = cfg.lookup("app.mixed").unwrap();
        let types: Vec<_> = mixed.children().map(|c| c.setting_type()).collect();
        assert_eq!(
            types,
            [
                SettingType::String,
                SettingType::Int32,
                SettingType::Array,
                SettingType::Group,
                SettingType::List,
            ]
        );
        assert_eq!(cfg.lookup_value::<f64>("app.mixed.[3].inner").unwrap(), 1.5);
        assert!(cfg.lookup("app.empty").unwrap().is_empty());
    }

    #[test]
    fn test_source_lines_recorded() {
        let cfg = load("a = 1;\n\ng = {\n  b = 2;\n};\n");
        assert_eq!(cfg.lookup("a").unwrap().source_line(), Some(1));
        assert_eq!(cfg.lookup("g.b").unwrap().source_line(), Some(4));
        assert_eq!(cfg.lookup("g.b").unwrap().source_file(), Some("<string>"));
        assert_eq!(cfg.root().source_line(), None);
    }

    #[test]
    fn test_syntax_error_location() {
        let (line, message) = parse_err("server = { port = ;");
        assert_eq!(line, 1);
        assert!(!message.is_empty());

        let (line, _) = parse_err("a = 1;\nb = [1, 2\n");
        assert!(line >= 2);
    }

    #[test]
    fn test_semantic_errors() {
        let (line, message) = parse_err("a = 1;\na = 2;");
        assert_eq!(line, 2);
        assert!(message.contains("duplicate"));

        let (line, message) = parse_err("a = [1,\n \"two\"];");
        assert_eq!(line, 2);
        assert!(message.contains("mismatched"));

        let (_, message) = parse_err("a = 99999999999999999999;");
        assert!(message.contains("out of range"));

        let (_, message) = parse_err(r#"a = "bad \q escape";"#);
        assert!(message.contains("escape"));

        let (_, message) = parse_err("a = 1e400;");
        assert!(message.contains("float value out of range"));

        let (_, message) = parse_err(r#"a = "\xFF";"#);
        assert!(message.contains("not valid UTF-8"));
    }

    #[test]
    fn test_hex_escapes_are_bytes() {
        let cfg = load(r#"s = "caf\xC3\xA9"; euro = "\xE2\x82\xAC";"#);
        assert_eq!(cfg.lookup_value::<String>("s").unwrap(), "café");
        assert_eq!(cfg.lookup_value::<String>("euro").unwrap(), "€");
        // Concatenated literals are decoded one by one.
        assert!(Config::load_str(r#"t = "\xE2\x82" "\xAC";"#).is_err());
    }

    #[test]
    fn test_arrays_reject_aggregates() {
        parse_err("a = [ { b = 1; } ];");
        parse_err("a = [ (1) ];");
    }

    #[test]
    fn test_include_relative_to_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("db.cfg"), "host = \"db\";\nport = 5432;\n").unwrap();
        fs::write(
            dir.path().join("main.cfg"),
            "name = \"app\";\ndatabase = {\n  @include \"db.cfg\"\n};\n",
        )
        .unwrap();

        let cfg = Config::load_file(dir.path().join("main.cfg")).unwrap();
        assert_eq!(cfg.lookup_value::<i32>("database.port").unwrap(), 5432);
        let host = cfg.lookup("database.host").unwrap();
        assert!(host.source_file().unwrap().ends_with("db.cfg"));
    }

    #[test]
    fn test_include_dir_option() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("extra.cfg"), "extra = true;").unwrap();
        let cfg = crate::Loader::default()
            .with_include_dir(dir.path())
            .load_str("@include \"extra.cfg\"\nbase = 1;")
            .unwrap();
        assert!(cfg.lookup_value::<bool>("extra").unwrap());
        let names: Vec<_> = cfg.root().children().filter_map(|c| c.name()).collect();
        assert_eq!(names, ["extra", "base"]);
    }

    #[test]
    fn test_include_errors() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("loop.cfg"), "@include \"loop.cfg\"\n").unwrap();
        let err = Config::load_file(dir.path().join("loop.cfg")).unwrap_err();
        assert!(
            matches!(&err, ConfigError::ParseError { message, .. } if message.contains("too deep")),
            "{err:?}"
        );

        let err = crate::Loader::default()
            .with_include_dir(dir.path())
            .load_str("a = 1;\n@include \"absent.cfg\"")
            .unwrap_err();
        assert!(
            matches!(&err, ConfigError::ParseError { line: 2, message, .. } if message.contains("absent.cfg")),
            "{err:?}"
        );

        fs::write(dir.path().join("dup.cfg"), "a = 2;").unwrap();
        let err = crate::Loader::default()
            .with_include_dir(dir.path())
            .load_str("a = 1;\n@include \"dup.cfg\"")
            .unwrap_err();
        assert!(
            matches!(&err, ConfigError::ParseError { file, .. } if file.ends_with("dup.cfg")),
            "{err:?}"
        );
    }

    #[test]
    fn test_parse_scalar() {
        assert_eq!(parse_scalar("42"), Some(Value::Int32(42)));
        assert_eq!(parse_scalar(" \"hi\" "), Some(Value::String("hi".to_string())));
        assert_eq!(parse_scalar("9L"), Some(Value::Int64(9)));
        assert_eq!(parse_scalar("[1]"), None);
        assert_eq!(parse_scalar("hello"), None);
    }
}
