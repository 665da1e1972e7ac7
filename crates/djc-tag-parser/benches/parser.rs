use criterion::black_box;
use criterion::criterion_group;
use criterion::criterion_main;
use criterion::Criterion;
use djc_tag_parser::parse_tag;
use djc_tag_parser::parse_tag_with;
use djc_tag_parser::ParseOptions;

const SIMPLE: &str = "my_tag";

const TYPICAL: &str = r#"component "card" user=user.profile title="Hello" show_footer=True|default:1"#;

const HEAVY: &str = r#"component "table" rows=[1, 2, 3, [4, 5]] config={"sort": "asc", "cols": ["a", "b"], **defaults} caption=`Rows: ${count|default:0}` ...extra **attrs only /"#;

fn bench_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_tag");

    group.bench_function("simple", |b| b.iter(|| parse_tag(black_box(SIMPLE))));
    group.bench_function("typical", |b| b.iter(|| parse_tag(black_box(TYPICAL))));

    let options = ParseOptions::new().flag("only");
    group.bench_function("heavy", |b| {
        b.iter(|| parse_tag_with(black_box(HEAVY), &options));
    });

    group.finish();
}

criterion_group!(benches, bench_parsing);
criterion_main!(benches);
