use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use diffable::config::DiffableConfig;
use diffable::engine::DeltaCodec;
use diffable::hash::config::HashParams;
use diffable::hash::rolling::{Hasher, RollingHash};
use diffable::hash::table::BlockIndex;
use diffable::store::{VersionMap, VersionedResourceStore};
use filetime::FileTime;
use std::fs;
use std::path::Path;
use std::sync::Arc;

fn gen_text(size: usize, seed: u64) -> String {
    const WORDS: [&str; 12] = [
        "var ", "function ", "return ", "this.", "value", " = ", "; ", "{ ", "} ", "\n", "if (",
        ") ",
    ];
    let mut s = seed;
    let mut out = String::with_capacity(size + 16);
    while out.len() < size {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        out.push_str(WORDS[(s >> 33) as usize % WORDS.len()]);
    }
    out
}

fn mutate(base: &str, stride: usize) -> String {
    let mut out = String::with_capacity(base.len());
    for (i, c) in base.chars().enumerate() {
        if i % stride.max(1) == 0 {
            out.push('#');
        }
        out.push(c);
    }
    out
}

fn write_ratio_snapshot() {
    let base = gen_text(256 * 1024, 123);
    let target = mutate(&base, 4096);
    let mut csv = String::from("block_size,payload_bytes,target_bytes,ratio\n");
    for block_size in [4usize, 8, 16, 20, 32, 64] {
        let payload = DeltaCodec::rolling(block_size, HashParams::default())
            .diff_payload(&base, &target)
            .unwrap();
        let ratio = payload.len() as f64 / target.len() as f64;
        csv.push_str(&format!(
            "{block_size},{},{},{}\n",
            payload.len(),
            target.len(),
            ratio
        ));
    }
    let out_dir = Path::new("target/criterion/custom_reports");
    let _ = fs::create_dir_all(out_dir);
    let _ = fs::write(out_dir.join("ratio_snapshot.csv"), csv);
}

fn bench_diff_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("diff_speed");
    for size in [16 * 1024usize, 128 * 1024, 1024 * 1024] {
        let base = gen_text(size, 1);
        let target = mutate(&base, 1024);
        let codec: DeltaCodec = DeltaCodec::default();
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let script = codec.diff(black_box(&base), black_box(&target));
                black_box(script);
            });
        });
    }
    g.finish();
}

fn bench_apply_speed(c: &mut Criterion) {
    let mut g = c.benchmark_group("apply_speed");
    for size in [16 * 1024usize, 128 * 1024, 1024 * 1024] {
        let base = gen_text(size, 2);
        let target = mutate(&base, 2048);
        let codec: DeltaCodec = DeltaCodec::default();
        let script = codec.diff(&base, &target).unwrap();
        g.throughput(Throughput::Bytes(size as u64));
        g.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let out = script.apply(black_box(&base)).unwrap();
                black_box(out);
            });
        });
    }
    g.finish();
}

fn bench_ratio_vs_block_size(c: &mut Criterion) {
    write_ratio_snapshot();
    let mut g = c.benchmark_group("payload_ratio_vs_block_size");
    let base = gen_text(256 * 1024, 3);
    let target = mutate(&base, 4096);
    for block_size in [4usize, 8, 20, 64] {
        let codec = DeltaCodec::rolling(block_size, HashParams::default());
        g.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &block_size,
            |b, _| {
                b.iter(|| {
                    let payload = codec.diff_payload(&base, &target).unwrap();
                    let ratio = payload.len() as f64 / target.len() as f64;
                    black_box(ratio);
                });
            },
        );
    }
    g.finish();
}

fn bench_hashing(c: &mut Criterion) {
    let mut g = c.benchmark_group("hashing");
    let text: Vec<char> = gen_text(256 * 1024, 4).chars().collect();
    let w = 20;
    g.throughput(Throughput::Elements(text.len() as u64));

    g.bench_function("rolling", |b| {
        b.iter(|| {
            let mut h = RollingHash::default();
            let mut acc = h.hash(&text[..w]);
            for &c in &text[w..] {
                acc ^= h.next_hash(c).unwrap_or(0);
            }
            black_box(acc);
        });
    });

    g.bench_function("block_index_build", |b| {
        b.iter(|| {
            let mut h = RollingHash::default();
            let index = BlockIndex::build(black_box(&text), w, &mut h);
            black_box(index.len());
        });
    });
    g.finish();
}

fn bench_store_put(c: &mut Criterion) {
    let mut g = c.benchmark_group("store_put_with_history");
    for history in [1usize, 4, 16] {
        g.bench_with_input(BenchmarkId::from_parameter(history), &history, |b, &history| {
            let dir = tempfile::tempdir().unwrap();
            let file = dir.path().join("app.js");
            let store = VersionedResourceStore::initialize(
                dir.path(),
                DiffableConfig::default(),
                Arc::new(VersionMap::new()),
            )
            .unwrap();
            let base = gen_text(64 * 1024, 5);
            for i in 0..history {
                fs::write(&file, mutate(&base, 512 + i)).unwrap();
                filetime::set_file_mtime(&file, FileTime::from_unix_time(i as i64 + 1, 0))
                    .unwrap();
                store.put(&file).unwrap();
            }
            let mut tick = history as i64 + 1;
            b.iter(|| {
                tick += 1;
                fs::write(&file, mutate(&base, 300 + (tick as usize % 97))).unwrap();
                filetime::set_file_mtime(&file, FileTime::from_unix_time(tick, 0)).unwrap();
                store.put(&file).unwrap();
            });
        });
    }
    g.finish();
}

criterion_group!(
    benches,
    bench_diff_speed,
    bench_apply_speed,
    bench_ratio_vs_block_size,
    bench_hashing,
    bench_store_put
);
criterion_main!(benches);
