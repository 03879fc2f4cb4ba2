use jsonutil::{
    Config, EscapeRole, IdentifierGrammar, JsonErrorKind, escape, escape_property_name, unescape,
};
use jsonutil_testhelpers::setup;

fn literal(text: &str, cfg: &Config) -> String {
    escape(text, EscapeRole::StringLiteral, cfg).unwrap()
}

#[test]
fn mandatory_escapes_always_apply() {
    setup();
    let cfg = Config::builtin();
    assert_eq!(literal("a\"b\\c\nd", &cfg), "a\\\"b\\\\c\\nd");
    assert_eq!(literal("\u{1}\u{1F}", &cfg), "\\u0001\\u001F");
    assert_eq!(
        literal("line\u{2028}para\u{2029}", &cfg),
        "line\\u2028para\\u2029"
    );
    assert_eq!(literal("a/b", &cfg), "a/b");
    assert_eq!(literal("\u{e9}\u{1F4A9}", &cfg), "\u{e9}\u{1F4A9}");
}

#[test]
fn non_ascii_and_surrogates() {
    setup();
    let all = Config::builtin().with_escape_non_ascii(true);
    assert_eq!(literal("\u{e9}\u{1F4A9}", &all), "\\u00E9\\uD83D\\uDCA9");

    let ecma6 = all.clone().with_use_ecma6(true);
    assert_eq!(literal("\u{e9}\u{1F4A9}", &ecma6), "\\u00E9\\u{1F4A9}");

    let astral = Config::builtin().with_escape_surrogates(true);
    assert_eq!(literal("\u{e9}\u{1F4A9}", &astral), "\u{e9}\\uD83D\\uDCA9");
}

#[test]
fn existing_escapes() {
    setup();
    let text = "a\\u0041\\n\\x41\\q";

    let plain = Config::builtin();
    assert_eq!(literal(text, &plain), "a\\\\u0041\\\\n\\\\x41\\\\q");

    let pass = Config::builtin().with_pass_through_escapes(true);
    assert_eq!(literal(text, &pass), "a\\u0041\\nA\\\\q");

    let decode = Config::builtin().with_unescape_where_possible(true);
    assert_eq!(literal(text, &decode), "aA\\nA\\\\q");
}

#[test]
fn escaping_is_idempotent_after_unescape() {
    setup();
    let cfg = Config::builtin().with_unescape_where_possible(true);
    for text in ["tab\\there", "quote\" and \\ slash", "\u{e9}t\u{e9}", "plain"] {
        let once = literal(text, &cfg);
        assert_eq!(literal(&unescape(&once), &cfg), once, "{text}");
    }
}

#[test]
fn unescape_decodes_everything_it_recognizes() {
    setup();
    assert_eq!(
        unescape("A\\x42\\103\\v\\'\\u{1F4A9}"),
        "ABC\u{0B}'\u{1F4A9}"
    );
    assert_eq!(unescape("\\uD83D\\uDCA9"), "\u{1F4A9}");
    assert_eq!(unescape("\\uD83D!"), "\u{FFFD}!");
    assert_eq!(unescape("bad \\u12 tail\\"), "bad \\u12 tail\\");
}

#[test]
fn reserved_words() {
    setup();
    let cfg = Config::builtin();
    let err = escape_property_name("class", &cfg).unwrap_err();
    assert!(matches!(
        err.kind,
        JsonErrorKind::BadPropertyName {
            reserved_word: true,
            ref code_points,
            ..
        } if code_points.is_empty()
    ));
    assert_eq!(err.to_string(), "class is a reserved word.");
    assert_eq!(err.kind.code(), "jsonutil::bad_property_name");

    let relaxed = Config::builtin().with_allow_reserved_words_in_identifiers(true);
    assert_eq!(escape_property_name("class", &relaxed).unwrap(), "class");
}

#[test]
fn bad_code_points_in_names() {
    setup();
    let cfg = Config::builtin();
    let err = escape_property_name("a b", &cfg).unwrap_err();
    match &err.kind {
        JsonErrorKind::BadPropertyName {
            code_points,
            grammar,
            ..
        } => {
            assert_eq!(code_points, &[0x20]);
            assert_eq!(*grammar, IdentifierGrammar::EcmaScript);
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(
        err.to_string(),
        "Property name \"a b\" is not valid for ECMAScript. Code point U+0020 is not allowed."
    );

    let fixed = Config::builtin().with_escape_bad_identifier_code_points(true);
    assert_eq!(escape_property_name("a b", &fixed).unwrap(), "a\\u0020b");
    assert_eq!(escape_property_name("1st", &fixed).unwrap(), "\\u0031st");

    let full = Config::builtin().with_full_json_identifier_code_points(true);
    assert_eq!(escape_property_name("a b", &full).unwrap(), "a b");
    assert_eq!(escape_property_name("1st", &full).unwrap(), "1st");
    assert_eq!(escape_property_name("", &full).unwrap(), "");
}

#[test]
fn identifier_escapes_in_names() {
    setup();
    let cfg = Config::builtin();
    assert_eq!(escape_property_name("\\u0041bc", &cfg).unwrap(), "\\u0041bc");
    assert_eq!(escape_property_name("\\x41bc", &cfg).unwrap(), "Abc");
    assert!(escape_property_name("", &cfg).is_err());

    let unchecked = Config::builtin().with_validate_property_names(false);
    assert_eq!(
        escape_property_name("class name", &unchecked).unwrap(),
        "class name"
    );
}
