//! Permission tree benchmarks.
//!
//! Run with: `cargo bench -p warden-tree`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use warden_core::{Decision, SubjectKind};
use warden_tree::{ActionVocabulary, PermissionCategory, PermissionTree, ResourcePath};

fn build_tree(num_resources: usize, read: PermissionCategory) -> PermissionTree {
    let mut tree = PermissionTree::new();

    // Broad grants near the root
    for i in 0..num_resources / 10 {
        tree.set_decision(
            &format!("role{i}"),
            SubjectKind::Role,
            &ResourcePath::parse(&format!("/apps/app{i}")),
            read,
            Decision::Allow,
        );
    }

    // Deep overrides
    for i in 0..num_resources {
        tree.set_decision(
            &format!("role{}", i % 10),
            SubjectKind::Role,
            &ResourcePath::parse(&format!("/apps/app{}/module{i}/audit", i % 10)),
            read,
            Decision::Deny,
        );
    }

    // User rules
    for i in 0..num_resources / 2 {
        tree.set_decision(
            &format!("user{i}"),
            SubjectKind::User,
            &ResourcePath::parse(&format!("/apps/app{}/module{i}", i % 10)),
            read,
            Decision::Allow,
        );
    }

    tree
}

fn read_category() -> PermissionCategory {
    ActionVocabulary::default()
        .category_of("read")
        .expect("default vocabulary has read")
}

fn bench_point_query(c: &mut Criterion) {
    let read = read_category();
    let tree = build_tree(1000, read);
    let path = ResourcePath::parse("/apps/app3/module503/audit/detail");

    c.bench_function("point_query_deep", |b| {
        b.iter(|| {
            black_box(tree.point_query("role3", SubjectKind::Role, read, black_box(&path)));
        });
    });
}

fn bench_point_query_miss(c: &mut Criterion) {
    let read = read_category();
    let tree = build_tree(1000, read);
    let path = ResourcePath::parse("/nowhere/at/all");

    c.bench_function("point_query_miss", |b| {
        b.iter(|| {
            black_box(tree.point_query("role3", SubjectKind::Role, read, black_box(&path)));
        });
    });
}

fn bench_reverse_query(c: &mut Criterion) {
    let read = read_category();
    let mut group = c.benchmark_group("reverse_query");

    for size in [100, 1000, 5000] {
        let tree = build_tree(size, read);
        let path = ResourcePath::parse("/apps/app1");
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                black_box(tree.reverse_query(
                    black_box(&path),
                    read,
                    Decision::Allow,
                    SubjectKind::Role,
                ));
            });
        });
    }

    group.finish();
}

fn bench_split(c: &mut Criterion) {
    c.bench_function("split_path", |b| {
        b.iter(|| {
            black_box(ResourcePath::parse(black_box(
                "/permission/admin/manage/identity/usermgt/view",
            )));
        });
    });
}

criterion_group!(
    benches,
    bench_point_query,
    bench_point_query_miss,
    bench_reverse_query,
    bench_split,
);
criterion_main!(benches);
