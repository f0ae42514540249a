use qs_tree::{ArrayFormat, Charset, ParseOptions, StringifyOptions, Value};
use serde_json::json;

/// Stringifies `$data`, snapshots the querystring, and checks that parsing
/// it back yields the same tree.
///
/// This is a macro so that `insta` records the snapshot inline at the call
/// site.
macro_rules! roundtrip_test {
    ($data:expr, $stringify:expr, $parse:expr, @$snapshot:literal) => {
        let data: Value = serde_json::from_value($data).expect("tree");
        let serialized = $stringify.stringify(&data).expect("stringify");
        insta::assert_snapshot!(serialized, @$snapshot);

        let parsed = $parse.parse(&serialized).expect("parse");
        pretty_assertions::assert_eq!(data, Value::Object(parsed));
    };
    ($data:expr, @$snapshot:literal) => {
        roundtrip_test!($data, StringifyOptions::new(), ParseOptions::new(), @$snapshot)
    };
}

#[test]
fn flat_object() {
    roundtrip_test!(json!({ "a": "1", "b": "2" }), @"a=1&b=2");
}

#[test]
fn nested_object() {
    roundtrip_test!(
        json!({ "user": { "name": "Acme", "address": { "city": "Carrot City" } } }),
        @"user%5Bname%5D=Acme&user%5Baddress%5D%5Bcity%5D=Carrot%20City"
    );
}

#[test]
fn arrays_with_indices() {
    roundtrip_test!(
        json!({ "ids": ["1", "2", "3"], "nested": [{ "a": "b" }, ["c", "d"]] }),
        @"ids%5B0%5D=1&ids%5B1%5D=2&ids%5B2%5D=3&nested%5B0%5D%5Ba%5D=b&nested%5B1%5D%5B0%5D=c&nested%5B1%5D%5B1%5D=d"
    );
}

#[test]
fn arrays_with_brackets() {
    roundtrip_test!(
        json!({ "a": ["x", "y"] }),
        StringifyOptions::new().array_format(ArrayFormat::Brackets),
        ParseOptions::new(),
        @"a%5B%5D=x&a%5B%5D=y"
    );
}

#[test]
fn arrays_with_repeat() {
    roundtrip_test!(
        json!({ "a": ["x", "y"] }),
        StringifyOptions::new().array_format(ArrayFormat::Repeat),
        ParseOptions::new(),
        @"a=x&a=y"
    );
}

#[test]
fn arrays_with_comma() {
    roundtrip_test!(
        json!({ "a": ["x", "y"], "b": ["z"] }),
        StringifyOptions::new()
            .array_format(ArrayFormat::Comma)
            .comma_round_trip(true),
        ParseOptions::new().comma(true),
        @"a=x,y&b%5B%5D=z"
    );
}

#[test]
fn special_characters() {
    roundtrip_test!(
        json!({ "a b": "c&d=e", "f[g]": "h+i", "ключ": "✓" }),
        StringifyOptions::new(),
        ParseOptions::new().depth(0),
        @"a%20b=c%26d%3De&f%5Bg%5D=h%2Bi&%D0%BA%D0%BB%D1%8E%D1%87=%E2%9C%93"
    );
}

#[test]
fn dots() {
    roundtrip_test!(
        json!({ "a": { "b": { "c": "d" } } }),
        StringifyOptions::new().allow_dots(true),
        ParseOptions::new().allow_dots(true),
        @"a.b.c=d"
    );
}

#[test]
fn dots_in_keys() {
    roundtrip_test!(
        json!({ "name.obj": { "first": "John" } }),
        StringifyOptions::new().allow_dots(true).encode_dot_in_keys(true),
        ParseOptions::new().decode_dot_in_keys(true),
        @"name%252Eobj.first=John"
    );
}

#[test]
fn strict_nulls() {
    roundtrip_test!(
        json!({ "a": null, "b": "", "c": "d" }),
        StringifyOptions::new().strict_null_handling(true),
        ParseOptions::new().strict_null_handling(true),
        @"a&b=&c=d"
    );
}

#[test]
fn empty_arrays() {
    roundtrip_test!(
        json!({ "a": [], "b": "c" }),
        StringifyOptions::new().allow_empty_arrays(true),
        ParseOptions::new().allow_empty_arrays(true),
        @"a[]&b=c"
    );
}

#[test]
fn latin1_with_sentinel() {
    roundtrip_test!(
        json!({ "a": "æ", "b": "☺" }),
        StringifyOptions::new()
            .charset(Charset::Iso88591)
            .charset_sentinel(true),
        ParseOptions::new()
            .charset_sentinel(true)
            .interpret_numeric_entities(true),
        @"utf8=%26%2310003%3B&a=%E6&b=%26%239786%3B"
    );
}

#[test]
fn query_prefix() {
    roundtrip_test!(
        json!({ "q": "rust" }),
        StringifyOptions::new().add_query_prefix(true),
        ParseOptions::new().ignore_query_prefix(true),
        @"?q=rust"
    );
}
