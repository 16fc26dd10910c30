//! Build-agent classifier and exclusion filter benchmarks

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use agentwatch_core::types::ContainerDetails;
use agentwatch_monitor::{ExclusionFilter, classify};

fn plain_container(env_count: usize) -> ContainerDetails {
    let mut details = ContainerDetails::new(
        "abc123def456abc123def456abc123def456abc123def456abc123def456abcd",
        "web",
        "registry.example.com/team/web-frontend:2024.10.1",
    )
    .with_label("org.opencontainers.image.source", "https://example.com/web")
    .with_label("maintainer", "platform");
    for i in 0..env_count {
        details = details.with_env(format!("APP_SETTING_{i}=value-{i}"));
    }
    details
}

fn bench_classify(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify");

    let image_match = ContainerDetails::new("abc", "agent", "myregistry/azure-agent:latest");
    group.bench_function("image_match", |b| {
        b.iter(|| classify(black_box(&image_match)))
    });

    for env_count in [0, 20, 100] {
        let details = plain_container(env_count);
        group.bench_with_input(
            BenchmarkId::new("no_match", env_count),
            &details,
            |b, details| b.iter(|| classify(black_box(details))),
        );
    }

    let env_match = plain_container(50).with_env("AZP_TOKEN=secret");
    group.bench_function("env_match_last", |b| {
        b.iter(|| classify(black_box(&env_match)))
    });

    group.finish();
}

fn bench_exclusion(c: &mut Criterion) {
    let filter = ExclusionFilter::new(
        (0..20).map(|i| format!("sidecar-{i}")).collect(),
        (0..20).map(|i| format!("vendor/image-{i}")).collect(),
    );

    c.bench_function("exclusion_miss_40_patterns", |b| {
        b.iter(|| {
            filter.matching_rule(
                black_box("abc123def456"),
                black_box("azp-builder"),
                black_box("myregistry/build:2024"),
            )
        })
    });
}

criterion_group!(benches, bench_classify, bench_exclusion);
criterion_main!(benches);
