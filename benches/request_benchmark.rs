// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tokio::runtime::{Builder, Runtime};

use memserve::{
    request::{read_head, RequestHead},
    PathResolver, Request, ResolveMode,
};

use std::fs;

const SIMPLE: &[u8] = b"GET / HTTP/1.1\r\nHost: localhost:12430\r\nUser-Agent: Test\r\n\r\n";

const COMPLEX: &[u8] = b"GET /path/to/resource.html?id=123&name=test HTTP/1.1\r\n\
                         Host: localhost:12430\r\n\
                         User-Agent: Mozilla/5.0 (Windows NT 10.0; Win64; x64)\r\n\
                         Accept: text/html,application/xhtml+xml\r\n\
                         Accept-Language: en-US,en;q=0.9\r\n\
                         Connection: keep-alive\r\n\
                         Upgrade-Insecure-Requests: 1\r\n\
                         \r\n";

fn runtime() -> Runtime {
    Builder::new_current_thread().build().unwrap()
}

fn head_of(rt: &Runtime, raw: &[u8]) -> RequestHead {
    rt.block_on(async {
        let mut reader = raw;
        read_head(&mut reader).await.unwrap().unwrap()
    })
}

fn read_head_benchmark(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("read_head");

    for (name, raw) in [("simple", SIMPLE), ("complex", COMPLEX)] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &raw, |b, raw| {
            b.iter(|| {
                rt.block_on(async {
                    let mut reader = black_box(*raw);
                    read_head(&mut reader).await.unwrap()
                })
            });
        });
    }

    group.finish();
}

fn request_parse_benchmark(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("request_parse");

    for (name, raw) in [("simple", SIMPLE), ("complex", COMPLEX)] {
        let head = head_of(&rt, raw);
        group.bench_with_input(BenchmarkId::from_parameter(name), &head, |b, head| {
            b.iter(|| Request::try_from(black_box(head), 0).unwrap());
        });
    }

    group.finish();
}

fn path_resolution_benchmark(c: &mut Criterion) {
    let tmp = tempfile::tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("docs/deep")).unwrap();
    fs::write(tmp.path().join("index.html"), b"index").unwrap();
    fs::write(tmp.path().join("docs/deep/page.html"), b"page").unwrap();

    let mut group = c.benchmark_group("path_resolution");
    let targets = [
        ("root", "/"),
        ("nested", "/docs/deep/page.html"),
        ("second_pass", "/index.html.bak"),
        ("traversal", "/../../../etc/passwd"),
        ("missing", "/missing.png"),
    ];

    for mode in [ResolveMode::Heuristic, ResolveMode::Strict] {
        let resolver = PathResolver::new(tmp.path(), mode);
        for (name, target) in targets {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", mode), name),
                &target,
                |b, target| b.iter(|| resolver.resolve(black_box(target))),
            );
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    read_head_benchmark,
    request_parse_benchmark,
    path_resolution_benchmark
);
criterion_main!(benches);
