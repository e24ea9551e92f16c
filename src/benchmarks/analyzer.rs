use criterion::{BenchmarkId, Criterion, black_box, criterion_group};
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::config::{ConfigResolver, EffectiveConfig, MemoryConfigSource};
use crate::events::MemoryEventSink;
use crate::guard::{ClientIdentity, PatternAnalyzer, QueryGuard, RateLimiter};
use crate::store::MemoryCounterStore;

const SMALL_QUERY: &str = "query { posts(first: 10) { nodes { id title date } } }";

fn nested_query(depth: usize) -> String {
    let mut query = String::from("query ");
    for level in 0..depth {
        query.push_str(&format!("{{ level{level} "));
    }
    query.push_str("id ");
    query.push_str(&"} ".repeat(depth));
    query
}

fn aliased_query(aliases: usize) -> String {
    let fields: Vec<String> = (0..aliases)
        .map(|i| format!("post{i}: post(id: {i}) {{ title }}"))
        .collect();
    format!("query {{ {} }}", fields.join(" "))
}

fn bench_analyze(c: &mut Criterion) {
    let analyzer = PatternAnalyzer::new();
    let mut group = c.benchmark_group("analyze");

    group.bench_function("small", |b| b.iter(|| black_box(analyzer.analyze(SMALL_QUERY))));

    for depth in [5, 20, 100] {
        let query = nested_query(depth);
        group.bench_with_input(BenchmarkId::new("nested", depth), &query, |b, query| {
            b.iter(|| black_box(analyzer.analyze(query)))
        });
    }

    for aliases in [10, 100, 1000] {
        let query = aliased_query(aliases);
        group.bench_with_input(BenchmarkId::new("aliases", aliases), &query, |b, query| {
            b.iter(|| black_box(analyzer.analyze(query)))
        });
    }

    group.finish();
}

fn bench_rate_limit(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let limiter = RateLimiter::new(Arc::new(MemoryCounterStore::default()));
    let config = EffectiveConfig::headless();

    c.bench_function("rate_limit_check_1000_clients", |b| {
        let mut counter = 0u32;
        b.to_async(&rt).iter(|| {
            counter += 1;
            let client = ClientIdentity::new(format!("10.0.{}.{}", counter % 4, counter % 250), None);
            let limiter = &limiter;
            let config = &config;
            async move { black_box(limiter.check(&client, config).await) }
        })
    });
}

fn bench_inspect(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let guard = QueryGuard::new(
        Arc::new(ConfigResolver::new(Arc::new(MemoryConfigSource::new()))),
        Arc::new(MemoryCounterStore::default()),
        Arc::new(MemoryEventSink::default()),
    );
    let client = ClientIdentity::new("192.0.2.1", Some("Gatsby/5".to_string()));

    c.bench_function("inspect_small_query", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(guard.inspect(SMALL_QUERY, &client, true).await) })
    });
}

criterion_group!(benches, bench_analyze, bench_rate_limit, bench_inspect);
