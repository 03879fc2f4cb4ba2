use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Once, Weak};

use chrono::{TimeZone, Utc};
use indexmap::IndexMap;
use jsonutil::reflect::{Getter, JsonEmit, ProjectionSpec, TypeRegistry};
use jsonutil::{
    Config, DateEncoding, DecimalFormat, Facet, IndentPadding, JsonErrorKind, JsonValue,
    JsonWrite, NumberKind, parse_with_config, to_string_with_config, to_writer_std,
};
use jsonutil_testhelpers::setup;

fn encode<'f, T: Facet<'f> + ?Sized>(value: &T) -> String {
    to_string_with_config(value, &Config::builtin()).unwrap()
}

#[test]
fn scalars_and_containers() {
    setup();
    assert_eq!(encode(&()), "null");
    assert_eq!(encode(&Some(3u8)), "3");
    assert_eq!(encode(&None::<u8>), "null");
    assert_eq!(encode(&'x'), r#""x""#);
    assert_eq!(encode(&1.0e7), "1.0E7");
    assert_eq!(encode(&0.001f32), "0.001");
    assert_eq!(encode(&[f64::NAN, f64::NEG_INFINITY]), r#"["NaN","-Infinity"]"#);
    assert_eq!(encode(&u128::MAX), "340282366920938463463374607431768211455");

    let nested: Vec<Vec<&str>> = vec![vec![], vec!["a", "b"]];
    assert_eq!(encode(&nested), r#"[[],["a","b"]]"#);
    let set: BTreeSet<i32> = [9, 1, 4].into();
    assert_eq!(encode(&set), "[1,4,9]");

    let mut map = BTreeMap::new();
    map.insert(2, "two");
    map.insert(10, "ten");
    let err = to_string_with_config(&map, &Config::builtin()).unwrap_err();
    assert!(matches!(
        err.kind,
        JsonErrorKind::BadPropertyName {
            reserved_word: false,
            ..
        }
    ));
    let full = Config::builtin().with_full_json_identifier_code_points(true);
    assert_eq!(
        to_string_with_config(&map, &full).unwrap(),
        r#"{"2":"two","10":"ten"}"#
    );
}

#[test]
fn numeric_strings() {
    setup();
    let values = ["12", "-0.5e3", "1.", "0x10"];
    let cfg = Config::builtin().with_encode_numeric_strings_as_numbers(true);
    assert_eq!(
        to_string_with_config(&values, &cfg).unwrap(),
        r#"[12,-0.5e3,"1.","0x10"]"#
    );
    assert_eq!(encode(&values), r#"["12","-0.5e3","1.","0x10"]"#);
}

#[test]
fn decimal_format() {
    setup();
    let mut map = IndexMap::new();
    map.insert("x", 1.23456);
    map.insert("y", 2.0);
    let cfg = Config::builtin()
        .with_number_format(NumberKind::F64, DecimalFormat::with_max_fraction_digits(3));
    assert_eq!(
        to_string_with_config(&map, &cfg).unwrap(),
        r#"{"x":1.235,"y":2}"#
    );

    let hex = Config::builtin().with_number_format(NumberKind::I32, |n: &jsonutil::Number| {
        format!("\"{:#x}\"", n.as_i64().unwrap_or_default())
    });
    assert_eq!(to_string_with_config(&[255i32], &hex).unwrap(), r#"["0xff"]"#);
}

#[derive(Facet)]
struct Reading {
    count: i32,
    ratio: f32,
    samples: Vec<f32>,
}

#[test]
fn narrow_numbers_read_back_equal() {
    setup();
    let reading = Reading {
        count: -12,
        ratio: 0.1,
        samples: vec![1.1, 2.5e-5, 3.0e9],
    };
    let cfg = Config::builtin();
    let text = to_string_with_config(&reading, &cfg).unwrap();
    assert_eq!(
        text,
        r#"{"count":-12,"ratio":0.1,"samples":[1.1,2.5E-5,3.0E9]}"#
    );

    let mut expected = IndexMap::new();
    expected.insert("count".to_string(), JsonValue::from(-12i32));
    expected.insert("ratio".to_string(), JsonValue::from(0.1f32));
    expected.insert(
        "samples".to_string(),
        JsonValue::from(
            reading
                .samples
                .iter()
                .map(|&f| JsonValue::from(f))
                .collect::<Vec<_>>(),
        ),
    );
    assert_eq!(
        parse_with_config(&text, &cfg).unwrap(),
        JsonValue::from(expected)
    );
}

#[test]
fn duplicate_property_names() {
    setup();
    let mut map = BTreeMap::new();
    map.insert(None, 1);
    map.insert(Some("null"), 2);
    let cfg = Config::builtin().with_allow_reserved_words_in_identifiers(true);
    let err = to_string_with_config(&map, &cfg).unwrap_err();
    assert!(matches!(
        err.kind,
        JsonErrorKind::DuplicatePropertyName { ref name } if name == "null"
    ));
    assert_eq!(err.to_string(), "Property null occurs twice in the same object.");
}

#[test]
fn reserved_word_keys() {
    setup();
    let mut map = HashMap::new();
    map.insert("class", 1);
    let err = to_string_with_config(&map, &Config::builtin()).unwrap_err();
    match err.kind {
        JsonErrorKind::BadPropertyName {
            ref name,
            reserved_word,
            ..
        } => {
            assert_eq!(name, "class");
            assert!(reserved_word);
        }
        ref other => panic!("unexpected {other:?}"),
    }
    assert_eq!(err.to_string(), "class is a reserved word.");

    let cfg = Config::builtin().with_allow_reserved_words_in_identifiers(true);
    assert_eq!(to_string_with_config(&map, &cfg).unwrap(), r#"{"class":1}"#);
}

#[derive(Facet)]
struct Folder {
    name: String,
    #[facet(recursive_type)]
    child: Option<Arc<Folder>>,
    #[facet(recursive_type)]
    #[facet(jsonutil::transient)]
    parent: Weak<Folder>,
}

static FOLDER_GETTERS: Once = Once::new();

fn folder_getters() {
    FOLDER_GETTERS.call_once(|| {
        TypeRegistry::add_getter(Getter::new("getUp", |f: &Folder| f.parent.upgrade()));
    });
}

#[test]
fn a_child_pointing_back_at_its_parent_is_a_loop() {
    setup();
    folder_getters();
    let root = Arc::new_cyclic(|me: &Weak<Folder>| Folder {
        name: "root".to_string(),
        child: Some(Arc::new(Folder {
            name: "leaf".to_string(),
            child: None,
            parent: me.clone(),
        })),
        parent: Weak::new(),
    });
    assert_eq!(
        encode(&root),
        r#"{"name":"root","child":{"name":"leaf","child":null}}"#
    );

    let up = Config::builtin()
        .with_reflect_spec(ProjectionSpec::of::<Folder>().with_field_names(["name", "child", "up"]));
    let err = to_string_with_config(&root, &up).unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::DataStructureLoop { .. }));
    let message = err.to_string();
    assert!(message.contains("Folder"), "{message}");
    assert!(message.ends_with("includes itself which would cause infinite recursion."));

    // starting from the leaf, the loop closes on the leaf
    let leaf = root.child.as_ref().map(Arc::clone);
    let err = to_string_with_config(&leaf, &up).unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::DataStructureLoop { .. }));
}

#[test]
fn shared_values_are_not_loops() {
    setup();
    let shared = Arc::new(vec![1, 2]);
    let pair = vec![Arc::clone(&shared), Arc::clone(&shared)];
    assert_eq!(encode(&pair), "[[1,2],[1,2]]");

    let mut by_name = IndexMap::new();
    by_name.insert("first", Arc::clone(&shared));
    by_name.insert("second", shared);
    assert_eq!(encode(&by_name), r#"{"first":[1,2],"second":[1,2]}"#);
}

#[derive(Facet)]
struct Call(String);

impl JsonEmit for Call {
    fn to_json(&self, _cfg: &Config, out: &mut dyn JsonWrite) -> jsonutil::Result<()> {
        out.write_str(&self.0);
        out.write(b"()");
        Ok(())
    }
}

#[derive(Facet)]
struct Broken;

impl JsonEmit for Broken {
    fn to_json(&self, _cfg: &Config, _out: &mut dyn JsonWrite) -> jsonutil::Result<()> {
        Err(jsonutil::JsonError::custom("cannot write Broken"))
    }
}

#[derive(Facet)]
struct Page {
    onload: Call,
    n: i32,
}

#[test]
fn self_emitting_values() {
    setup();
    TypeRegistry::register_emitter::<Call>();
    TypeRegistry::register_emitter::<Broken>();
    let page = Page {
        onload: Call("init".to_string()),
        n: 1,
    };
    assert_eq!(encode(&page), r#"{"onload":init(),"n":1}"#);

    let err = to_string_with_config(&[Broken], &Config::builtin()).unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::Custom { .. }));
    assert_eq!(err.to_string(), "cannot write Broken");
}

#[test]
fn unquoted_property_names() {
    setup();
    let mut map = IndexMap::new();
    map.insert("plain", 1);
    map.insert("_under$", 2);
    map.insert("try", 3);
    let cfg = Config::builtin()
        .with_quote_identifier(false)
        .with_allow_reserved_words_in_identifiers(true);
    assert_eq!(
        to_string_with_config(&map, &cfg).unwrap(),
        r#"{plain:1,_under$:2,"try":3}"#
    );
}

#[test]
fn pretty_printing() {
    setup();
    let mut inner = IndexMap::new();
    inner.insert("list", vec![1, 2]);
    inner.insert("empty", vec![]);
    let mut outer = IndexMap::new();
    outer.insert("name", None);
    outer.insert("inner", Some(inner));

    let cfg = Config::builtin().with_indent_padding(Some(IndentPadding::new("  ", "\n")));
    insta::assert_snapshot!(to_string_with_config(&outer, &cfg).unwrap(), @r#"
    {
      "name": null,
      "inner": {
        "list": [
          1,
          2
        ],
        "empty": []
      }
    }
    "#);
}

#[test]
fn dates_follow_the_encoding() {
    setup();
    let date = Utc.with_ymd_and_hms(2015, 9, 16, 14, 8, 34).unwrap()
        + chrono::Duration::milliseconds(34);
    let mut map = BTreeMap::new();
    map.insert("t", date);

    assert_eq!(encode(&map), r#"{"t":"2015-09-16T14:08:34.034Z"}"#);
    let objects = Config::builtin().with_date_encoding(DateEncoding::Objects);
    assert_eq!(
        to_string_with_config(&map, &objects).unwrap(),
        r#"{"t":new Date("2015-09-16T14:08:34.034Z")}"#
    );

    let utc = chrono::FixedOffset::east_opt(0).unwrap();
    let mut formats = jsonutil::DateFormats::default();
    formats.set_gen_format("%d/%m/%Y", utc).unwrap();
    let custom = Config::builtin().with_date_formats(formats.clone());
    assert_eq!(
        to_string_with_config(&map, &custom).unwrap(),
        r#"{"t":"16/09/2015"}"#
    );

    // an unknown specifier is refused and the previous pattern stays
    let err = formats.set_gen_format("%Q", utc).unwrap_err();
    assert!(matches!(err.kind, JsonErrorKind::BadDateFormat { ref format } if format == "%Q"));
    assert_eq!(formats.gen_format(), "%d/%m/%Y");
}

#[test]
fn std_writer() {
    setup();
    let out = to_writer_std(Vec::new(), &vec!["a", "b"], &Config::builtin()).unwrap();
    assert_eq!(out, br#"["a","b"]"#);
}
