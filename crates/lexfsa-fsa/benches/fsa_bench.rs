// Criterion benchmarks for lexfsa-fsa.
//
// Uses a synthetic word list (no external data needed): stems combined with a
// small set of inflection suffixes, which gives the suffix sharing a real
// dictionary shows.
//
// Run:
//   cargo bench -p lexfsa-fsa

use criterion::{Criterion, criterion_group, criterion_main};
use lexfsa_fsa::{AnyFsa, Codec, Fsa, FsaFormat, FsaSerializer, FsaTraversal, build_fsa};

// ---------------------------------------------------------------------------
// Word list
// ---------------------------------------------------------------------------

const SUFFIXES: [&str; 8] = ["", "a", "an", "ssa", "sta", "lla", "lta", "ksi"];

fn word_list() -> Vec<Vec<u8>> {
    let mut words = Vec::new();
    for i in 0u32..4000 {
        let stem = format!("{:x}k{}", i.wrapping_mul(2_654_435_761) >> 12, i % 13);
        for suffix in SUFFIXES {
            words.push(format!("{stem}{suffix}").into_bytes());
        }
    }
    words.sort_unstable();
    words.dedup();
    words
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

fn bench_build(c: &mut Criterion) {
    let words = word_list();
    c.bench_function("build_32k_words", |b| {
        b.iter(|| std::hint::black_box(build_fsa(&words).unwrap()));
    });
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

fn bench_serialize(c: &mut Criterion) {
    let fsa = build_fsa(word_list()).unwrap();
    for format in FsaFormat::ALL {
        let codec = Codec::new(format).with_numbers().unwrap();
        c.bench_function(&format!("serialize_{format}"), |b| {
            b.iter(|| std::hint::black_box(codec.serialize(&fsa, Vec::new()).unwrap()));
        });
    }
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

fn bench_lookup(c: &mut Criterion) {
    let words = word_list();
    let fsa = build_fsa(&words).unwrap();
    for format in FsaFormat::ALL {
        let codec = Codec::new(format).with_numbers().unwrap();
        let bytes = codec.serialize(&fsa, Vec::new()).unwrap();
        let read = AnyFsa::from_bytes(&bytes).unwrap();

        c.bench_function(&format!("contains_{format}"), |b| {
            b.iter(|| {
                for word in words.iter().step_by(16) {
                    std::hint::black_box(read.contains(word));
                }
            });
        });

        let traversal = FsaTraversal::new(&read);
        c.bench_function(&format!("perfect_hash_{format}"), |b| {
            b.iter(|| {
                for word in words.iter().step_by(16) {
                    std::hint::black_box(traversal.perfect_hash(word));
                }
            });
        });
    }
}

fn bench_read(c: &mut Criterion) {
    let fsa = build_fsa(word_list()).unwrap();
    let bytes = Codec::new(FsaFormat::Cfsa2)
        .serialize(&fsa, Vec::new())
        .unwrap();
    c.bench_function("read_cfsa2", |b| {
        b.iter(|| std::hint::black_box(AnyFsa::from_bytes(&bytes).unwrap()));
    });
}

criterion_group!(benches, bench_build, bench_serialize, bench_lookup, bench_read);
criterion_main!(benches);
