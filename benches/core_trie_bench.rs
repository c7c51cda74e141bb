use criterion::{black_box, criterion_group, criterion_main, Criterion};
use settrie_core::SetTrie;

fn element(prefix: &str, i: usize) -> Vec<u8> {
    format!("{prefix}{i}").into_bytes()
}

fn populated_trie(count: usize) -> SetTrie {
    let mut trie = SetTrie::new();
    for i in 0..count {
        let set = vec![b"shared".to_vec(), element("tag", i), element("leaf", i * i)];
        trie.insert(&set, format!("set-{i}"));
    }
    trie
}

fn bench_insert(c: &mut Criterion) {
    c.bench_function("insert_8192_three_element_sets", |b| {
        b.iter(|| {
            let mut trie = SetTrie::new();
            for i in 0..8192 {
                let set = vec![b"shared".to_vec(), element("tag", i), element("leaf", i * i)];
                trie.insert(black_box(&set), format!("set-{i}"));
            }
            black_box(trie.num_sets())
        });
    });
}

fn bench_find(c: &mut Criterion) {
    let trie = populated_trie(8192);
    let probe = vec![b"shared".to_vec(), element("tag", 4096), element("leaf", 4096 * 4096)];

    c.bench_function("find_in_8192_sets", |b| {
        b.iter(|| black_box(trie.find(black_box(&probe))));
    });
}

fn bench_supersets(c: &mut Criterion) {
    let trie = populated_trie(8192);
    let query = vec![b"shared".to_vec()];

    c.bench_function("supersets_common_prefix_8192_sets", |b| {
        b.iter(|| black_box(trie.supersets(black_box(&query)).len()));
    });
}

fn bench_subsets(c: &mut Criterion) {
    let trie = populated_trie(512);
    let query: Vec<Vec<u8>> = (0..512)
        .flat_map(|i| vec![b"shared".to_vec(), element("tag", i), element("leaf", i * i)])
        .collect();

    c.bench_function("subsets_against_wide_query_512_sets", |b| {
        b.iter(|| black_box(trie.subsets(black_box(&query)).len()));
    });
}

fn bench_remove_and_purge(c: &mut Criterion) {
    c.bench_function("remove_half_then_purge_4096_sets", |b| {
        b.iter(|| {
            let mut trie = populated_trie(4096);
            let victims: Vec<u32> = trie
                .iter_set_ids()
                .filter(|(_, name)| name.ends_with('0'))
                .map(|(idx, _)| idx)
                .collect();
            for idx in victims {
                trie.remove(idx).ok();
            }
            black_box(trie.purge().ok());
        });
    });
}

fn bench_snapshot_round_trip(c: &mut Criterion) {
    let trie = populated_trie(2048);

    c.bench_function("snapshot_save_then_load_2048_sets", |b| {
        b.iter(|| {
            let blocks = trie.save_snapshot();
            let restored = SetTrie::load_snapshot(black_box(&blocks)).expect("snapshot loads");
            black_box(restored.num_sets())
        });
    });
}

criterion_group!(
    core_trie,
    bench_insert,
    bench_find,
    bench_supersets,
    bench_subsets,
    bench_remove_and_purge,
    bench_snapshot_round_trip
);
criterion_main!(core_trie);
