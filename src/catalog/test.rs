use std::fs;
use std::path::{Path, PathBuf};

use super::source::slice_lines;
use super::{build_catalog, to_json, DefaultValue, FunctionRecord, Registry};
use crate::config::Config;
use crate::error::Error;

const ADD_SOURCE: &str = "function add(int $a, int $b): int\n{\n    return $a + $b;\n}";
const MULTIPLY_SOURCE: &str = "function multiply(int $a, int $b): int\n{\n    return $a * $b;\n}";

fn reflect(source: &str) -> Registry {
    match Registry::from_source(source, Path::new("test.php")) {
        Ok(registry) => registry,
        Err(e) => panic!("\nFailed to reflect \"{}\": {}\n", source, e),
    }
}

fn defined_names(source: &str) -> Vec<String> {
    reflect(source)
        .defined()
        .iter()
        .map(|f| f.name.clone())
        .collect()
}

fn write_php(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn default_of(source: &str, param: &str) -> Option<DefaultValue> {
    let registry = reflect(source);
    let function = &registry.defined()[0];
    function
        .params
        .iter()
        .find(|p| p.name == param)
        .unwrap_or_else(|| panic!("no parameter {} in {:?}", param, function))
        .default
        .clone()
}

#[test]
fn test_default_catalog() {
    let records = build_catalog(&Config::default()).unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "add");
    assert_eq!(records[1].name, "multiply");
    for record in &records {
        assert_eq!(record.return_type, "int");
        assert_eq!(record.params.len(), 2);
        assert_eq!(record.params[0].name, "$a");
        assert_eq!(record.params[1].name, "$b");
        for param in &record.params {
            assert_eq!(param.typ, "int");
            assert_eq!(param.default, None);
        }
    }
    assert_eq!(records[0].source, ADD_SOURCE);
    assert_eq!(records[1].source, MULTIPLY_SOURCE);
}

#[test]
fn test_json_shape() {
    let records = build_catalog(&Config::default()).unwrap();
    let json = to_json(&records).unwrap();
    assert!(json.starts_with("[\n    {\n        \"name\": \"add\""), "{}", json);

    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    let array = value.as_array().unwrap();
    assert_eq!(array.len(), 2);
    assert_eq!(array[0]["type"], "int");
    assert_eq!(array[0]["params"][0]["name"], "$a");
    assert_eq!(array[0]["params"][0]["type"], "int");
    assert!(array[0]["params"][0]["default"].is_null());
    assert_eq!(array[1]["source"], MULTIPLY_SOURCE);
}

#[test]
fn test_allow_list_is_an_intersection() {
    let config = Config {
        allow_list: vec!["greet".to_string(), "not_defined".to_string()],
        ..Config::default()
    };
    let records = build_catalog(&config).unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "greet");
    assert_eq!(records[0].return_type, "string");
    assert_eq!(records[0].params[1].name, "$greeting");
    assert_eq!(
        records[0].params[1].default,
        Some(DefaultValue::Str("Hello".to_string()))
    );

    let json: serde_json::Value = serde_json::from_str(&to_json(&records).unwrap()).unwrap();
    assert_eq!(json[0]["params"][1]["default"], "Hello");

    let config = Config {
        allow_list: vec![],
        ..Config::default()
    };
    assert!(build_catalog(&config).unwrap().is_empty());
    assert_eq!(to_json(&[]).unwrap(), "[]");
}

#[test]
fn test_allow_list_is_case_sensitive() {
    let config = Config {
        allow_list: vec!["ADD".to_string()],
        ..Config::default()
    };
    assert!(build_catalog(&config).unwrap().is_empty());
}

#[test]
fn test_source_reparses_to_the_same_signature() {
    let config = Config {
        allow_list: vec!["add".into(), "multiply".into(), "greet".into()],
        ..Config::default()
    };
    let original = Registry::load(&config.sources).unwrap();
    for record in build_catalog(&config).unwrap() {
        let reparsed = reflect(&format!("<?php\n{}", record.source));
        let again = &reparsed.defined()[0];
        let before = original.get(&record.name).unwrap();
        assert_eq!(again.name, before.name);
        assert_eq!(again.params.len(), before.params.len());
        for (a, b) in again.params.iter().zip(&before.params) {
            assert_eq!(a.typ, b.typ);
        }
    }
}

#[test]
fn test_line_numbers() {
    let registry = Registry::load(&Config::default().sources).unwrap();
    let add = registry.get("add").unwrap();
    assert_eq!((add.body_line, add.end_line), (6, 8));
    let multiply = registry.get("multiply").unwrap();
    assert_eq!((multiply.body_line, multiply.end_line), (11, 13));
}

#[test]
fn test_literal_defaults() {
    let source = r#"<?php
function d($a, int $b = 5, float $c = -1.5, ?string $d = null, bool $e = TRUE,
    array $f = [], string $g = "x\ty", int $h = 0x10, array $i = array(), $j = 'it\'s',
    int $k = -7, float $l = 1e3, bool $m = false) {}
"#;
    assert_eq!(default_of(source, "$a"), None);
    assert_eq!(default_of(source, "$b"), Some(DefaultValue::Int(5)));
    assert_eq!(default_of(source, "$c"), Some(DefaultValue::Float(-1.5)));
    assert_eq!(default_of(source, "$d"), Some(DefaultValue::Null));
    assert_eq!(default_of(source, "$e"), Some(DefaultValue::Bool(true)));
    assert_eq!(default_of(source, "$f"), Some(DefaultValue::EmptyArray));
    assert_eq!(default_of(source, "$g"), Some(DefaultValue::Str("x\ty".into())));
    assert_eq!(default_of(source, "$h"), Some(DefaultValue::Int(16)));
    assert_eq!(default_of(source, "$i"), Some(DefaultValue::EmptyArray));
    assert_eq!(default_of(source, "$j"), Some(DefaultValue::Str("it's".into())));
    assert_eq!(default_of(source, "$k"), Some(DefaultValue::Int(-7)));
    assert_eq!(default_of(source, "$l"), Some(DefaultValue::Float(1000.0)));
    assert_eq!(default_of(source, "$m"), Some(DefaultValue::Bool(false)));
}

#[test]
fn test_constant_expressions_fold() {
    let source = r"<?php
function d($a = 1 + 2, $b = 2 * 3, $c = 'a' . 'b' . 1, $d = -2 ** 2, $e = 7 / 2, $f = 6 / 3,
    $g = PHP_INT_MAX + 1, $h = (1 + 2) * 3, $i = 1 << 3 | 1, $j = PHP_EOL, $k = 'x' . 1.5,
    $l = 2 ** -1, $m = \true, $n = 10 % 4 - 1) {}
";
    assert_eq!(default_of(source, "$a"), Some(DefaultValue::Int(3)));
    assert_eq!(default_of(source, "$b"), Some(DefaultValue::Int(6)));
    assert_eq!(default_of(source, "$c"), Some(DefaultValue::Str("ab1".into())));
    assert_eq!(default_of(source, "$d"), Some(DefaultValue::Int(-4)));
    assert_eq!(default_of(source, "$e"), Some(DefaultValue::Float(3.5)));
    assert_eq!(default_of(source, "$f"), Some(DefaultValue::Int(2)));
    assert_eq!(
        default_of(source, "$g"),
        Some(DefaultValue::Float(i64::MAX as f64 + 1.0))
    );
    assert_eq!(default_of(source, "$h"), Some(DefaultValue::Int(9)));
    assert_eq!(default_of(source, "$i"), Some(DefaultValue::Int(9)));
    assert_eq!(default_of(source, "$j"), Some(DefaultValue::Str("\n".into())));
    assert_eq!(default_of(source, "$k"), Some(DefaultValue::Str("x1.5".into())));
    assert_eq!(default_of(source, "$l"), Some(DefaultValue::Float(0.5)));
    assert_eq!(default_of(source, "$m"), Some(DefaultValue::Bool(true)));
    assert_eq!(default_of(source, "$n"), Some(DefaultValue::Int(1)));
}

#[test]
fn test_unresolved_defaults_keep_their_text() {
    let source = "<?php function d($a = APP_NAME, $b = 1 / 0, $c = max(1, 2), $d = [1, 2],
        $e = Foo::BAR, $f = 'a' . APP_NAME) {}";
    let unresolved = [
        ("$a", "APP_NAME"),
        ("$b", "1 / 0"),
        ("$c", "max(1, 2)"),
        ("$d", "[1, 2]"),
        ("$e", "Foo::BAR"),
        ("$f", "'a' . APP_NAME"),
    ];
    for (param, text) in unresolved {
        assert_eq!(
            default_of(source, param),
            Some(DefaultValue::Expression(text.into()))
        );
    }
}

#[test]
fn test_unresolved_defaults_differ_from_strings_in_json() {
    let source = "<?php function d($a = APP_NAME, $b = 'APP_NAME') {}";
    let constant = serde_json::to_value(default_of(source, "$a")).unwrap();
    let literal = serde_json::to_value(default_of(source, "$b")).unwrap();
    assert_eq!(constant, serde_json::json!({ "expression": "APP_NAME" }));
    assert_eq!(literal, serde_json::json!("APP_NAME"));
}

#[test]
fn test_heredoc_bodies_do_not_end_functions() {
    const MSG: &str = "function msg(): string\n{\n    return <<<EOT\n    Don't panic\n    EOT;\n}";
    const CSS: &str =
        "function css(): string\n{\n    return <<<'CSS'\n    a { color: red; }\n    }\n    CSS;\n}";
    let dir = tempfile::tempdir().unwrap();
    let path = write_php(
        dir.path(),
        "heredoc.php",
        &format!("<?php\n{}\n\n{}\n\n{}\n", MSG, CSS, ADD_SOURCE),
    );
    let config = Config {
        allow_list: vec!["msg".into(), "css".into(), "add".into()],
        sources: vec![path.clone()],
    };
    let records = build_catalog(&config).unwrap();
    let sources: Vec<&str> = records.iter().map(|r| r.source.as_str()).collect();
    assert_eq!(sources, vec![MSG, CSS, ADD_SOURCE]);

    let registry = Registry::load(&[&path]).unwrap();
    let css = registry.get("css").unwrap();
    assert_eq!((css.body_line, css.end_line), (10, 15));
}

#[test]
fn test_crlf_sources_lose_their_line_terminators() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_php(
        dir.path(),
        "crlf.php",
        "<?php\r\nfunction add(int $a): int\r\n{\r\n    return $a;\r\n}\r\n",
    );
    let registry = Registry::load(&[&path]).unwrap();
    let record = FunctionRecord::describe(registry.get("add").unwrap()).unwrap();
    assert_eq!(record.source, "function add(int $a): int\n{\n    return $a;\n}");
}

#[test]
fn test_parameter_and_return_types() {
    let registry = reflect(
        r"<?php
function t(?int $a, int | string $b, \Foo\Bar $c, &$d, string ...$rest): ?array {}
function u(#[SensitiveParameter] string $p, A&B $q) { }
function v() {}
",
    );
    let t = registry.get("t").unwrap();
    let types: Vec<&str> = t.params.iter().map(|p| p.typ.as_str()).collect();
    assert_eq!(types, vec!["?int", "int|string", r"\Foo\Bar", "", "string"]);
    let names: Vec<&str> = t.params.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["$a", "$b", "$c", "$d", "$rest"]);
    assert_eq!(t.return_type, "?array");

    let u = registry.get("u").unwrap();
    assert_eq!(u.params[0].typ, "string");
    assert_eq!(u.params[1].typ, "A&B");
    assert_eq!(u.return_type, "");

    assert!(registry.get("v").unwrap().params.is_empty());
}

#[test]
fn test_only_top_level_functions_are_registered() {
    let names = defined_names(
        r"<?php
use function Foo\helper;
$f = function ($x) { return $x; };
$g = fn($x) => $x * 2;
class C { public function method() { return function () {}; } }
if (true) { function conditional() {} }
function top() { $inner = function () {}; }
function &by_ref() { static $x; return $x; }
",
    );
    assert_eq!(names, vec!["top", "by_ref"]);
}

#[test]
fn test_namespaces_qualify_names() {
    assert_eq!(
        defined_names("<?php\nnamespace App\\Util;\nfunction add() {}\n"),
        vec!["App\\Util\\add"]
    );
    assert_eq!(
        defined_names("<?php namespace A { function f() {} } namespace { function g() {} }"),
        vec!["A\\f", "g"]
    );
    assert_eq!(
        defined_names("<?php namespace\\helper(); function h() {}"),
        vec!["h"]
    );
}

#[test]
fn test_redeclaration_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let first = write_php(dir.path(), "a.php", "<?php\nfunction add() {}\n");
    let second = write_php(dir.path(), "b.php", "<?php\n\nfunction ADD() {}\n");
    match Registry::load(&[first, second.clone()]) {
        Err(Error::Redeclared { name, file, line }) => {
            assert_eq!(name, "ADD");
            assert_eq!(file, second);
            assert_eq!(line, 3);
        }
        other => panic!("expected a redeclaration error, got {:?}", other),
    }
}

#[test]
fn test_unreadable_sources_abort_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        allow_list: vec!["add".into()],
        sources: vec![dir.path().join("missing.php")],
    };
    assert!(matches!(build_catalog(&config), Err(Error::Io { .. })));

    let path = write_php(dir.path(), "gone.php", "<?php\nfunction add() {}\n");
    let registry = Registry::load(&[&path]).unwrap();
    fs::remove_file(&path).unwrap();
    let described = FunctionRecord::describe(registry.get("add").unwrap());
    assert!(matches!(described, Err(Error::Io { .. })));
}

#[test]
fn test_malformed_sources() {
    let path = Path::new("bad.php");
    assert!(matches!(
        Registry::from_source("<?php function broken(", path),
        Err(Error::Syntax { .. })
    ));
    assert!(matches!(
        Registry::from_source("<?php function broken() { return 1;", path),
        Err(Error::Syntax { .. })
    ));
    assert!(matches!(
        Registry::from_source("<?php function f() { return 'x; }", path),
        Err(Error::Lex(_))
    ));
}

#[test]
fn test_source_spans() {
    let text = "<?php\nfunction long(\n    int $a,\n    int $b = 2\n): int {\n    return $a;\n}\n";
    let registry = reflect(text);
    let long = registry.get("long").unwrap();
    assert_eq!((long.body_line, long.end_line), (3, 7));
    assert_eq!(
        slice_lines(text, long.body_line, long.end_line),
        "function long(\n    int $a,\n    int $b = 2\n): int {\n    return $a;\n}"
    );

    let text = "<?php\nfunction one() { return 1; }\n";
    let registry = reflect(text);
    let one = &registry.defined()[0];
    assert_eq!(slice_lines(text, one.body_line, one.end_line), "function one() { return 1; }");

    assert_eq!(slice_lines("a\r\nb\r\nc", 2, 2), "a\nb");
    assert_eq!(slice_lines("a\nb", 2, 10), "a\nb");
}
