use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

use swagstock_core::{Actor, UnitCost, UserId};
use swagstock_inventory::{ItemTemplate, MovementFilter, NewItem};
use swagstock_store::{Database, DatabaseConfig};
use tempfile::TempDir;
use tokio::runtime::Runtime;

struct Bench {
    _dir: TempDir,
    db: Database,
    actor: Actor,
    template: ItemTemplate,
}

fn setup(rt: &Runtime) -> Bench {
    rt.block_on(async {
        let dir = TempDir::new().unwrap();
        let db = Database::open(&DatabaseConfig::new(dir.path().join("bench.db")))
            .await
            .unwrap();
        let reference = db.reference();
        let category = reference.categories(false).await.unwrap().remove(0).id;
        let unit = reference.units(false).await.unwrap().remove(0).id;
        let template = ItemTemplate {
            description: "Pen".to_string(),
            unit_cost: "2.00".parse::<UnitCost>().unwrap(),
            category_id: category,
            unit_id: unit,
            supplier_id: None,
            internal_code: None,
            notes: None,
            min_stock: None,
        };
        Bench {
            _dir: dir,
            db,
            actor: Actor::new(UserId::new(1), "bench").unwrap(),
            template,
        }
    })
}

/// Entry + exit round trips: each is one committed unit of work.
fn bench_movement_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let bench = setup(&rt);
    let hq = rt
        .block_on(bench.db.reference().headquarters())
        .unwrap()
        .unwrap()
        .id;
    let item = rt
        .block_on(
            bench
                .db
                .catalog()
                .create_item(NewItem::new(bench.template.clone(), hq, 1_000_000)),
        )
        .unwrap();

    let mut group = c.benchmark_group("movement_latency");
    group.sample_size(50);
    group.bench_function("record_entry", |b| {
        b.iter(|| {
            rt.block_on(bench.db.ledger().record_entry(item.id, black_box(1), None, &bench.actor, None))
                .unwrap()
        })
    });
    group.bench_function("record_exit", |b| {
        b.iter(|| {
            rt.block_on(bench.db.ledger().record_exit(item.id, black_box(1), &bench.actor, "bench"))
                .unwrap()
        })
    });
    group.finish();
}

/// History reads as the movement table grows.
fn bench_history_queries(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("movement_history");

    for movements in [100usize, 1_000] {
        let bench = setup(&rt);
        let item = rt.block_on(async {
            let hq = bench.db.reference().headquarters().await.unwrap().unwrap().id;
            let item = bench
                .db
                .catalog()
                .create_item(NewItem::new(bench.template.clone(), hq, 0))
                .await
                .unwrap();
            for _ in 0..movements {
                bench
                    .db
                    .ledger()
                    .record_entry(item.id, 1, None, &bench.actor, None)
                    .await
                    .unwrap();
            }
            item
        });

        group.throughput(Throughput::Elements(movements as u64));
        group.bench_with_input(BenchmarkId::from_parameter(movements), &movements, |b, _| {
            b.iter(|| {
                rt.block_on(bench.db.ledger().movements(&MovementFilter::for_item(item.id)))
                    .unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_movement_latency, bench_history_queries);
criterion_main!(benches);
