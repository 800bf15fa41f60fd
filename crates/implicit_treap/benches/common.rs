use std::hint::black_box;
use std::time::{Duration, Instant};

use bench::{apply_runtime_config_for_size, random_span, random_values, seed_for};
use criterion::measurement::Measurement;
use criterion::{BenchmarkGroup, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use implicit_treap::{Combinator, ImplicitTreap, UpdateMode};

const SIZES: [usize; 4] = [1_000, 16_000, 64_000, 256_000];
const OPS_PER_ITER: usize = 100;
const VALUE_RANGE: std::ops::RangeInclusive<i64> = -1_000_000..=1_000_000;
const DELTA_RANGE: std::ops::RangeInclusive<i64> = -1_000..=1_000;
const WORKLOAD_WEIGHTS: &[(OpKind, u32)] = &[
    (OpKind::Get, 15),
    (OpKind::Set, 5),
    (OpKind::Fold, 20),
    (OpKind::Update, 20),
    (OpKind::Insert, 15),
    (OpKind::Erase, 15),
    (OpKind::Reverse, 10),
];

#[derive(Clone, Copy)]
enum OpKind {
    Get,
    Set,
    Fold,
    Update,
    Insert,
    Erase,
    Reverse,
}

#[derive(Clone)]
enum Op {
    Get { index: usize },
    Set { index: usize, value: i64 },
    Fold { start: usize, end: usize },
    Update { start: usize, end: usize, value: i64 },
    Insert { index: usize, value: i64 },
    Erase { index: usize },
    Reverse { start: usize, end: usize },
}

fn choose_kind<R: Rng + ?Sized>(rng: &mut R) -> OpKind {
    let total: u32 = WORKLOAD_WEIGHTS.iter().map(|(_, weight)| weight).sum();
    let mut roll = rng.random_range(0..total);
    for (kind, weight) in WORKLOAD_WEIGHTS {
        if roll < *weight {
            return *kind;
        }
        roll -= *weight;
    }
    OpKind::Insert
}

/// Ops valid for a sequence of `len` elements that steer its length back to
/// `size`, so iterations on a persistent tree stay comparable.
fn generate_ops(len: usize, size: usize, rng: &mut impl Rng) -> Vec<Op> {
    let mut len = len;
    let mut ops = Vec::with_capacity(OPS_PER_ITER);

    for step in 0..OPS_PER_ITER {
        let remaining = (OPS_PER_ITER - step) as isize;
        let mut kind = choose_kind(rng);
        let drift = len as isize - size as isize;
        if drift > remaining {
            kind = OpKind::Erase;
        } else if drift < -remaining {
            kind = OpKind::Insert;
        }
        if len == 0 {
            kind = OpKind::Insert;
        }

        let op = match kind {
            OpKind::Get => Op::Get {
                index: rng.random_range(0..len),
            },
            OpKind::Set => Op::Set {
                index: rng.random_range(0..len),
                value: rng.random_range(VALUE_RANGE),
            },
            OpKind::Fold => {
                let (start, end) = random_span(rng, len);
                Op::Fold { start, end }
            }
            OpKind::Update => {
                let (start, end) = random_span(rng, len);
                Op::Update {
                    start,
                    end,
                    value: rng.random_range(DELTA_RANGE),
                }
            }
            OpKind::Insert => {
                len += 1;
                Op::Insert {
                    index: rng.random_range(0..len),
                    value: rng.random_range(VALUE_RANGE),
                }
            }
            OpKind::Erase => {
                len -= 1;
                Op::Erase {
                    index: rng.random_range(0..=len),
                }
            }
            OpKind::Reverse => {
                let (start, end) = random_span(rng, len);
                Op::Reverse { start, end }
            }
        };
        ops.push(op);
    }

    ops
}

fn run_ops<C: Combinator<Value = i64>>(treap: &mut ImplicitTreap<C>, ops: &[Op]) {
    for op in ops {
        let outcome = match *op {
            Op::Get { index } => treap.get(index).map(|value| {
                black_box(value);
            }),
            Op::Set { index, value } => treap.set(index, value),
            Op::Fold { start, end } => treap.fold(start..end).map(|agg| {
                black_box(agg);
            }),
            Op::Update { start, end, value } => treap.update(start..end, value),
            Op::Insert { index, value } => treap.insert(index, value),
            Op::Erase { index } => treap.erase(index).map(|value| {
                black_box(value);
            }),
            Op::Reverse { start, end } => treap.reverse(start..end),
        };
        if let Err(err) = outcome {
            panic!("generated op failed: {err}");
        }
    }
}

pub fn bench_workload<C: Combinator<Value = i64>>(c: &mut Criterion, label: &str, mode: UpdateMode) {
    let mut group = c.benchmark_group(format!("implicit_treap/{label}"));

    for (salt, &size) in SIZES.iter().enumerate() {
        apply_runtime_config_for_size(size, &mut group);
        let base_seed = seed_for(size as u64, salt as u64);
        let mut init_rng = StdRng::seed_from_u64(base_seed);
        let initial = random_values(&mut init_rng, size, VALUE_RANGE);
        bench_size::<C, _>(&mut group, size, mode, base_seed, initial);
    }

    group.finish();
}

fn bench_size<C, M>(
    group: &mut BenchmarkGroup<'_, M>,
    size: usize,
    mode: UpdateMode,
    base_seed: u64,
    initial: Vec<i64>,
) where
    C: Combinator<Value = i64>,
    M: Measurement<Value = Duration>,
{
    let mut treap = ImplicitTreap::<C>::from_values_with_seed(initial, base_seed ^ 0x00C0_FFEE);
    treap.set_mode(mode);

    group.bench_function(BenchmarkId::from_parameter(size), |bencher| {
        bencher.iter_custom(|iters| {
            let mut total = Duration::ZERO;
            // Reuse the same treap; regenerate ops per iteration from a fixed seed.
            for iter in 0..iters {
                let mut op_rng = StdRng::seed_from_u64(seed_for(base_seed, iter));
                let ops = generate_ops(treap.len(), size, &mut op_rng);
                let start = Instant::now();
                run_ops(&mut treap, &ops);
                black_box(treap.len());
                total += start.elapsed();
            }
            total
        })
    });
}
