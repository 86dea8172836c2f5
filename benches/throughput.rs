use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use craftmacro::{
    core::{missions::MissionLinkTable, store::MacroStore},
    key,
    query::{arrange, RowFilter, SortField, SortState},
    record::MacroRecord,
};

fn record(i: u32) -> MacroRecord {
    MacroRecord {
        text: format!("/ac Reflect <wait.3>\n/ac Step {i} <wait.3>"),
        food: if i % 2 == 0 { "Tea".to_string() } else { "Stew".to_string() },
        memo: String::new(),
        master_potion: i % 3 == 0,
    }
}

fn populated(n: u32) -> (MacroStore, MissionLinkTable) {
    let mut store = MacroStore::new();
    let mut links = MissionLinkTable::new();
    for i in 0..n {
        let k = if i % 4 == 0 {
            format!("{i}-5000-80-B급")
        } else {
            key::encode(i, 5000, 0, 80)
        };
        store.set(k.clone(), record(i));
        if i % 10 == 0 {
            links.link(format!("mission-{i}"), k);
        }
    }
    (store, links)
}

fn bench_upserts(c: &mut Criterion) {
    c.bench_function("store_set_50k", |b| {
        b.iter(|| {
            let mut store = MacroStore::new();
            for i in 0..50_000u32 {
                store.set(key::encode(i, 5000, 0, 80), record(i));
            }
        });
    });
}

fn bench_fuzzy_lookup(c: &mut Criterion) {
    let (store, _) = populated(20_000);
    c.bench_function("store_get_fuzzy_20k", |b| {
        b.iter(|| {
            for i in (0..20_000u32).step_by(4) {
                let _ = store.get(&key::encode(i, 5000, 0, 80));
            }
        });
    });
}

fn bench_listing(c: &mut Criterion) {
    let mut group = c.benchmark_group("list_and_sort");
    for n in [1_000u32, 10_000u32] {
        let (store, links) = populated(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| {
                let rows = store.list(&links).rows;
                let _ = arrange(rows, &RowFilter::default(), &SortState::new(SortField::Food));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_upserts, bench_fuzzy_lookup, bench_listing);
criterion_main!(benches);
