use criterion::{black_box, criterion_group, criterion_main, Criterion};
use qs_tree::{ArrayFormat, ParseOptions, StringifyOptions, Value};

fn simple_tree() -> Value {
    Value::from_iter([
        ("id", Value::from("42")),
        ("name", Value::from("test_user")),
        ("active", Value::from("true")),
    ])
}

fn nested_tree() -> Value {
    Value::from_iter([
        ("id", Value::from("42")),
        ("name", Value::from("Acme")),
        (
            "address",
            Value::from_iter([
                ("city", "Carrot City"),
                ("street", "Special-Street* No. 11"),
                ("postcode", "12345"),
            ]),
        ),
        (
            "user_ids",
            Value::from(vec!["1".into(), "2".into(), "3".into(), "4".into()]),
        ),
    ])
}

fn large_tree() -> Value {
    let items = (0..100).map(|i| Value::from(i as i64)).collect::<Vec<_>>();
    Value::from_iter([("items", Value::from(items))])
}

// Parse benchmarks
fn parse_flat(c: &mut Criterion) {
    let query = "id=42&name=test_user&active=true";
    let options = ParseOptions::new();

    c.bench_function("parse_flat", |b| {
        b.iter(|| options.parse(black_box(query)).unwrap())
    });
}

fn parse_encoded(c: &mut Criterion) {
    let query = "name=caf%C3%A9+au+lait&email=user%40example.com&note=%E2%9C%93";
    let options = ParseOptions::new();

    c.bench_function("parse_encoded", |b| {
        b.iter(|| options.parse(black_box(query)).unwrap())
    });
}

fn parse_nested(c: &mut Criterion) {
    let query = "id=42&name=Acme&address[city]=Carrot+City&address[street]=Special-Street*+No.+11&address[postcode]=12345&user_ids[0]=1&user_ids[1]=2&user_ids[2]=3&user_ids[3]=4";
    let options = ParseOptions::new();

    c.bench_function("parse_nested", |b| {
        b.iter(|| options.parse(black_box(query)).unwrap())
    });
}

fn parse_deep_nested(c: &mut Criterion) {
    let query = "level1[level2][level3][value]=deep_value&level1[level2][level3][flags][0]=true&level1[level2][level3][flags][1]=false&level1[level2][config][max_retry]=3&level1[tags][]=tag1&level1[tags][]=tag2&metadata[version]=1.0";
    let options = ParseOptions::new();

    c.bench_function("parse_deep_nested", |b| {
        b.iter(|| options.parse(black_box(query)).unwrap())
    });
}

fn parse_dots_and_comma(c: &mut Criterion) {
    let query = "filter.status=open,closed&filter.owner.name=alice&sort=created,desc";
    let options = ParseOptions::new().allow_dots(true).comma(true);

    c.bench_function("parse_dots_and_comma", |b| {
        b.iter(|| options.parse(black_box(query)).unwrap())
    });
}

fn parse_large_array(c: &mut Criterion) {
    let query = (0..100)
        .map(|i| format!("items[{i}]={i}"))
        .collect::<Vec<_>>()
        .join("&");
    let options = ParseOptions::new();

    c.bench_function("parse_large_array", |b| {
        b.iter(|| options.parse(black_box(&query)).unwrap())
    });
}

// Stringify benchmarks
fn stringify_flat(c: &mut Criterion) {
    let data = simple_tree();
    let options = StringifyOptions::new();

    c.bench_function("stringify_flat", |b| {
        b.iter(|| options.stringify(black_box(&data)).unwrap())
    });
}

fn stringify_nested(c: &mut Criterion) {
    let data = nested_tree();
    let options = StringifyOptions::new();

    c.bench_function("stringify_nested", |b| {
        b.iter(|| options.stringify(black_box(&data)).unwrap())
    });
}

fn stringify_nested_values_only(c: &mut Criterion) {
    let data = nested_tree();
    let options = StringifyOptions::new()
        .encode_values_only(true)
        .array_format(ArrayFormat::Brackets);

    c.bench_function("stringify_nested_values_only", |b| {
        b.iter(|| options.stringify(black_box(&data)).unwrap())
    });
}

fn stringify_large_array(c: &mut Criterion) {
    let data = large_tree();
    let options = StringifyOptions::new();

    c.bench_function("stringify_large_array", |b| {
        b.iter(|| options.stringify(black_box(&data)).unwrap())
    });
}

fn stringify_comma(c: &mut Criterion) {
    let data = large_tree();
    let options = StringifyOptions::new().array_format(ArrayFormat::Comma);

    c.bench_function("stringify_comma", |b| {
        b.iter(|| options.stringify(black_box(&data)).unwrap())
    });
}

// Full cycle
fn roundtrip_nested(c: &mut Criterion) {
    let data = nested_tree();
    let stringify = StringifyOptions::new();
    let parse = ParseOptions::new();

    c.bench_function("roundtrip_nested", |b| {
        b.iter(|| {
            let query = stringify.stringify(black_box(&data)).unwrap();
            parse.parse(&query).unwrap()
        })
    });
}

criterion_group!(parse_simple, parse_flat, parse_encoded);

criterion_group!(
    parse_complex,
    parse_nested,
    parse_deep_nested,
    parse_dots_and_comma,
    parse_large_array
);

criterion_group!(stringify_simple, stringify_flat, stringify_comma);

criterion_group!(
    stringify_complex,
    stringify_nested,
    stringify_nested_values_only,
    stringify_large_array
);

criterion_group!(roundtrip, roundtrip_nested);

criterion_main!(
    parse_simple,
    parse_complex,
    stringify_simple,
    stringify_complex,
    roundtrip
);
