use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use snippetbox::{form::FormData, request::Request, SnippetCreateForm};

fn page_request_parse_benchmark(c: &mut Criterion) {
    let request = b"GET /snippet/view/42 HTTP/1.1\r\n\
                    Host: localhost:4000\r\n\
                    User-Agent: Mozilla/5.0 (X11; Linux x86_64)\r\n\
                    Accept: text/html,application/xhtml+xml\r\n\
                    Accept-Encoding: gzip, deflate\r\n\
                    \r\n";

    c.bench_function("page_request_parse", |b| {
        b.iter(|| {
            let _ = Request::try_from(black_box(request), 0).unwrap();
        });
    });
}

fn form_request_parse_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("form_request_parse");

    for content_len in [16usize, 1024, 16384] {
        let body = format!(
            "title=O+snail&content={}&expires=7",
            "Climb+Mount+Fuji%2C+".repeat(content_len / 20 + 1)
        );
        let request = format!(
            "POST /snippet/create HTTP/1.1\r\nHost: localhost\r\n\
             Content-Type: application/x-www-form-urlencoded\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        );
        group.bench_with_input(
            BenchmarkId::from_parameter(content_len),
            &request,
            |b, request| {
                b.iter(|| {
                    let request = Request::try_from(black_box(request.as_bytes()), 0).unwrap();
                    let data = FormData::parse(request.body()).unwrap();
                    let mut form = SnippetCreateForm::from_form(&data).unwrap();
                    form.validate()
                });
            },
        );
    }

    group.finish();
}

fn read_from_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let body = "content=".to_string() + &"a".repeat(8000);
    let raw = format!(
        "POST /snippet/create HTTP/1.1\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    )
    .into_bytes();

    c.bench_function("read_from_8k_body", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let mut reader = &raw[..];
                Request::read_from(&mut reader, 1 << 20, 0).await.unwrap()
            })
        });
    });
}

criterion_group!(
    benches,
    page_request_parse_benchmark,
    form_request_parse_benchmark,
    read_from_benchmark
);
criterion_main!(benches);
