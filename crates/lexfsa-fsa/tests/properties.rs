// Property tests: builder output and every codec configuration accept exactly
// the input language.

use std::collections::BTreeSet;

use lexfsa_fsa::{
    AnyFsa, Codec, Fsa, FsaFormat, FsaSerializer, FsaTraversal, build_fsa, check_correct,
    check_minimal,
};
use proptest::prelude::*;

// Sorted, distinct, non-empty sequences over a small alphabet (to force
// sharing) or over all bytes.
fn sequence_set() -> impl Strategy<Value = BTreeSet<Vec<u8>>> {
    let narrow = prop::collection::vec(prop::sample::select(b"abcd".to_vec()), 1..8);
    let wide = prop::collection::vec(any::<u8>(), 1..6);
    prop_oneof![
        prop::collection::btree_set(narrow, 0..80),
        prop::collection::btree_set(wide, 0..40),
    ]
}

fn codecs() -> Vec<Codec> {
    let mut codecs = Vec::new();
    for format in FsaFormat::ALL {
        for numbers in [false, true] {
            for mapping in [false, true] {
                let mut codec = Codec::new(format);
                if mapping {
                    match codec.with_label_mapping(true) {
                        Ok(c) => codec = c,
                        Err(_) => continue,
                    }
                }
                if numbers {
                    codec = codec.with_numbers().unwrap();
                }
                codecs.push(codec);
            }
        }
    }
    codecs
}

proptest! {
    #[test]
    fn prop_build_accepts_exactly_input(input in sequence_set()) {
        let fsa = build_fsa(&input).unwrap();
        prop_assert_eq!(check_correct(&input, &fsa), Ok(()));
        prop_assert!(check_minimal(&fsa).is_ok());
        let enumerated: Vec<Vec<u8>> = fsa.sequences().collect();
        let expected: Vec<Vec<u8>> = input.iter().cloned().collect();
        prop_assert_eq!(enumerated, expected);
    }

    #[test]
    fn prop_codecs_round_trip(input in sequence_set()) {
        let fsa = build_fsa(&input).unwrap();
        for codec in codecs() {
            let bytes = codec.serialize(&fsa, Vec::new()).unwrap();
            let read = AnyFsa::from_bytes(&bytes).unwrap();
            prop_assert_eq!(read.format(), Some(codec.format()));
            prop_assert_eq!(read.flags(), codec.flags());
            prop_assert_eq!(check_correct(&input, &read), Ok(()));
            prop_assert!(check_minimal(&read).is_ok());
        }
    }

    #[test]
    fn prop_ranks_are_dense(input in sequence_set()) {
        let fsa = build_fsa(&input).unwrap();
        let bytes = Codec::new(FsaFormat::Cfsa2)
            .with_numbers()
            .unwrap()
            .serialize(&fsa, Vec::new())
            .unwrap();
        let read = AnyFsa::from_bytes(&bytes).unwrap();
        let traversal = FsaTraversal::new(&read);
        prop_assert_eq!(traversal.size(), input.len() as u64);
        for (rank, sequence) in input.iter().enumerate() {
            prop_assert_eq!(traversal.perfect_hash(sequence), Some(rank as u64));
            let at = traversal.sequence_at(rank as u64);
            prop_assert_eq!(at.as_ref(), Some(sequence));
        }
    }

    #[test]
    fn prop_builds_are_deterministic(input in sequence_set()) {
        let first = build_fsa(&input).unwrap();
        let second = build_fsa(&input).unwrap();
        prop_assert_eq!(first.arc_records(), second.arc_records());
        for format in FsaFormat::ALL {
            let codec = Codec::new(format);
            prop_assert_eq!(
                codec.serialize(&first, Vec::new()).unwrap(),
                codec.serialize(&second, Vec::new()).unwrap()
            );
        }
    }

    #[test]
    fn prop_reserialization_is_stable(input in sequence_set()) {
        let fsa = build_fsa(&input).unwrap();
        for codec in codecs() {
            let bytes = codec.serialize(&fsa, Vec::new()).unwrap();
            let read = AnyFsa::from_bytes(&bytes).unwrap();
            let again = codec.serialize(&read, Vec::new()).unwrap();
            let reread = AnyFsa::from_bytes(&again).unwrap();
            prop_assert_eq!(check_correct(&input, &reread), Ok(()));
        }
    }
}
