//! Process-wide defaults are shared by every test in this binary, so they are
//! exercised from a single test.

use chrono::{TimeZone, Utc};
use jsonutil::reflect::{TypeRegistry, Visibility};
use jsonutil::{Config, ConfigDefaults, DateEncoding, Facet, JsonValue, parse, to_string};
use jsonutil_testhelpers::{capture_logs, setup};

#[derive(Facet)]
struct EnvRecord {
    x: i32,
    #[facet(jsonutil::private)]
    y: i32,
    z: i32,
}

#[test]
fn defaults_registry() {
    setup();
    TypeRegistry::register::<EnvRecord>();
    let record = EnvRecord { x: 1, y: 2, z: 3 };
    assert_eq!(to_string(&record).unwrap(), r#"{"x":1,"z":3}"#);

    ConfigDefaults::load_from([
        ("JSONUTIL_ESCAPE_NON_ASCII", "yes"),
        ("JSONUTIL_REFLECTION_PRIVACY", "private"),
        ("JSONUTIL_DATE_ENCODING", "objects"),
        ("JSONUTIL_USE_ECMA6", "maybe"),
        ("JSONUTIL_REFLECT_CLASS_0", "EnvRecord,y,x=ex"),
        ("JSONUTIL_REFLECT_CLASS_2", "EnvRecord,z"),
        ("PATH", "/usr/bin"),
    ]);
    let cfg = Config::new();
    assert!(cfg.escape_non_ascii);
    assert!(!cfg.use_ecma6);
    assert_eq!(cfg.reflection_privacy, Visibility::Private);
    assert_eq!(cfg.date_encoding, DateEncoding::Objects);
    assert_eq!(cfg.reflect_specs.len(), 1);
    assert_eq!(to_string(&record).unwrap(), r#"{"y":2}"#);
    assert_eq!(to_string("\u{e9}").unwrap(), "\"\\u00E9\"");

    // with a maximum index, gaps are skipped
    ConfigDefaults::load_from([
        ("JSONUTIL_MAX_REFLECT_INDEX", "2"),
        ("JSONUTIL_REFLECT_CLASS_0", "EnvRecord,y,x=ex"),
        ("JSONUTIL_REFLECT_CLASS_2", "EnvRecord,z"),
    ]);
    assert_eq!(to_string(&record).unwrap(), r#"{"z":3}"#);

    ConfigDefaults::update(|cfg| cfg.quote_identifier = false);
    assert_eq!(to_string(&record).unwrap(), "{z:3}");

    // a snapshot is not affected by later changes
    let snapshot = Config::new();
    ConfigDefaults::reset();
    assert!(!snapshot.quote_identifier);
    assert!(Config::new().quote_identifier);
    assert_eq!(to_string(&record).unwrap(), r#"{"x":1,"z":3}"#);

    // date patterns and nesting depth; bad values are logged and skipped
    let ((), events) = capture_logs(|| {
        ConfigDefaults::load_from([
            ("JSONUTIL_DATE_GEN_FORMAT", "%Q"),
            ("JSONUTIL_DATE_PARSE_FORMATS", "%d.%m.%Y %H:%M|%Q"),
            ("JSONUTIL_MAX_DEPTH", "3"),
        ]);
    });
    assert!(
        events
            .iter()
            .any(|e| e.message == "ignoring date generation format" && e.has_field("value", "%Q")),
        "{events:?}"
    );
    assert!(
        events
            .iter()
            .any(|e| e.message == "ignoring date parse format" && e.has_field("format", "%Q")),
        "{events:?}"
    );
    let cfg = Config::new();
    assert_eq!(cfg.date_formats.gen_format(), jsonutil::DEFAULT_GEN_FORMAT);
    assert_eq!(cfg.max_depth, 3);

    let parsed = parse(r#"[new Date("16.09.2015 14:08")]"#).unwrap();
    let expected = Utc.with_ymd_and_hms(2015, 9, 16, 14, 8, 0).unwrap();
    assert_eq!(
        parsed.as_array().and_then(|a| a.first()).and_then(JsonValue::as_date),
        Some(&expected)
    );
    assert!(parse("[[[[1]]]]").is_err());

    ConfigDefaults::reset();
    assert!(parse("[[[[1]]]]").is_ok());
}
