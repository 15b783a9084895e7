use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chrono::{Duration, Utc};
use snippetbox::{
    param::HttpEncoding, Response, Snippet, TemplateCache, TemplateData,
};
use std::path::Path;

fn snippets(count: i64) -> Vec<Snippet> {
    let now = Utc::now();
    (1..=count)
        .map(|id| Snippet {
            id,
            title: format!("Snippet <{}>", id),
            content: "An old silent pond\nA frog jumps into the pond,\nsplash! Silence again.".to_string(),
            created: now - Duration::minutes(id),
            expires: now + Duration::days(7),
        })
        .collect()
}

fn home_render_benchmark(c: &mut Criterion) {
    let templates = TemplateCache::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("ui/html")).unwrap();
    let mut group = c.benchmark_group("home_render");

    for count in [0i64, 5, 10] {
        let data = TemplateData {
            snippets: snippets(count),
            ..TemplateData::new()
        };
        group.bench_with_input(BenchmarkId::from_parameter(count), &data, |b, data| {
            b.iter(|| templates.render("home.tmpl", black_box(data)).unwrap());
        });
    }

    group.finish();
}

fn view_response_benchmark(c: &mut Criterion) {
    let templates = TemplateCache::new(Path::new(env!("CARGO_MANIFEST_DIR")).join("ui/html")).unwrap();
    let data = TemplateData {
        snippet: snippets(1).pop(),
        ..TemplateData::new()
    };
    let mut group = c.benchmark_group("view_response");

    for (name, encoding) in [
        ("identity", vec![]),
        ("gzip", vec![HttpEncoding::Gzip]),
        ("deflate", vec![HttpEncoding::Deflate]),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &encoding, |b, encoding| {
            b.iter(|| {
                let html = templates.render("view.tmpl", &data).unwrap();
                Response::from_html(200, &html, encoding, 0).as_bytes()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, home_render_benchmark, view_response_benchmark);
criterion_main!(benches);
