// End-to-end scenarios for building, serializing and reading automata.

use std::io::{self, Write};
use std::sync::Arc;

use lexfsa_fsa::codec::address::encode_address;
use lexfsa_fsa::{
    AnyFsa, Codec, Fsa, FsaError, FsaFlags, FsaFormat, FsaInfo, FsaSerializer, FsaTraversal,
    MatchResult, build_fsa, check_correct, check_minimal,
};

fn serialize(fsa: &impl Fsa, codec: &Codec) -> Vec<u8> {
    codec.serialize(fsa, Vec::new()).unwrap()
}

#[test]
fn shared_suffix_states_collapse() {
    let fsa = build_fsa(["aba", "b", "ba"]).unwrap();
    assert!(check_minimal(&fsa).is_ok());
    assert_eq!(FsaInfo::of(&fsa).nodes, 3);

    let fsa = build_fsa(["acf", "adg", "aeh", "bdg", "beh"]).unwrap();
    assert!(check_minimal(&fsa).is_ok());
    // root(2) + a-branch(3) + b-branch(2) + three single-arc tails.
    assert_eq!(FsaInfo::of(&fsa).arcs, 10);
}

#[test]
fn ranks_survive_serialization() {
    let words = ["a", "aba", "ac", "b", "ba", "c"];
    let fsa = build_fsa(words).unwrap();
    for format in FsaFormat::ALL {
        let codec = Codec::new(format).with_numbers().unwrap();
        let read = codec.deserialize(&serialize(&fsa, &codec)[..]).unwrap();
        assert!(read.flags().contains(FsaFlags::NUMBERS));

        let traversal = FsaTraversal::new(&read);
        let ranked: Vec<(u64, Vec<u8>)> = read
            .sequences()
            .map(|s| (traversal.perfect_hash(&s).unwrap(), s))
            .collect();
        let expected: Vec<(u64, Vec<u8>)> = words
            .iter()
            .enumerate()
            .map(|(i, w)| (i as u64, w.as_bytes().to_vec()))
            .collect();
        assert_eq!(ranked, expected, "{format}");
    }
}

#[test]
fn empty_input_round_trips() {
    let fsa = build_fsa(Vec::<Vec<u8>>::new()).unwrap();
    for format in FsaFormat::ALL {
        for codec in [Codec::new(format), Codec::new(format).with_numbers().unwrap()] {
            let read = AnyFsa::from_bytes(&serialize(&fsa, &codec)).unwrap();
            assert_eq!(read.sequences().count(), 0);
            assert_eq!(check_correct(Vec::<&str>::new(), &read), Ok(()));
            assert_eq!(FsaTraversal::new(&read).size(), 0);
        }
    }
}

#[test]
fn unsorted_input_is_rejected() {
    assert!(matches!(
        build_fsa(["b", "a"]),
        Err(FsaError::InputOrder { .. })
    ));
}

#[test]
fn unsupported_capability_is_rejected() {
    let err = Codec::new(FsaFormat::Fsa5)
        .with_label_mapping(true)
        .unwrap_err();
    assert!(matches!(err, FsaError::UnsupportedCapability { .. }));
    assert_eq!(err.to_string(), "fsa5 does not support LABEL_MAPPING");
}

#[test]
fn address_overflow_is_reported() {
    let mut out = Vec::new();
    assert!(matches!(
        encode_address(2, 1 << 16, &mut out),
        Err(FsaError::AddressOverflow { max_bytes: 2, .. })
    ));
}

#[test]
fn corrupt_streams_are_rejected() {
    let fsa = build_fsa(["alpha", "beta", "gamma"]).unwrap();
    for format in FsaFormat::ALL {
        let bytes = serialize(&fsa, &Codec::new(format));

        let mut bad_magic = bytes.clone();
        bad_magic[1] = b'F';
        assert!(matches!(
            AnyFsa::from_bytes(&bad_magic),
            Err(FsaError::CorruptStream { offset: 0, .. })
        ));

        let mut bad_version = bytes.clone();
        bad_version[4] = 0x42;
        assert!(matches!(
            AnyFsa::from_bytes(&bad_version),
            Err(FsaError::CorruptStream { offset: 4, .. })
        ));

        for cut in 0..bytes.len() {
            assert!(
                AnyFsa::from_bytes(&bytes[..cut]).is_err(),
                "{format} accepted a stream cut at {cut}"
            );
        }
    }
}

// Output sink that refuses every write.
#[derive(Debug)]
struct BrokenSink;

impl Write for BrokenSink {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn sink_errors_are_propagated() {
    let fsa = build_fsa(["alpha", "beta"]).unwrap();
    for format in FsaFormat::ALL {
        for codec in [Codec::new(format), Codec::new(format).with_numbers().unwrap()] {
            match codec.serialize(&fsa, BrokenSink) {
                Err(FsaError::Io(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
                other => panic!("{format}: expected an I/O error, got {other:?}"),
            }
        }
    }
}

#[test]
fn format_is_detected_from_header() {
    let fsa = build_fsa(["one", "three", "two"]).unwrap();
    for format in FsaFormat::ALL {
        let bytes = serialize(&fsa, &Codec::new(format));
        let read = AnyFsa::read(&bytes[..]).unwrap();
        assert_eq!(read.format(), Some(format));
        assert_eq!(read.separators(), Some((b'_', b'+')));
        assert!(read.contains(b"three"));
        assert!(!read.contains(b"thre"));
    }
}

#[test]
fn match_results_on_read_automaton() {
    let fsa = build_fsa(["car", "card", "cart"]).unwrap();
    let read = AnyFsa::from_bytes(&serialize(&fsa, &Codec::new(FsaFormat::Cfsa2))).unwrap();
    let traversal = FsaTraversal::new(&read);
    assert!(matches!(
        traversal.match_sequence(b"car"),
        MatchResult::ExactMatch { .. }
    ));
    assert!(matches!(
        traversal.match_sequence(b"ca"),
        MatchResult::SequenceIsPrefix { .. }
    ));
    assert!(matches!(
        traversal.match_sequence(b"cars"),
        MatchResult::AutomatonHasPrefix { index: 3, .. }
    ));
    assert_eq!(traversal.match_sequence(b"dog"), MatchResult::NoMatch);
}

#[test]
fn concurrent_readers_share_one_automaton() {
    let words: Vec<String> = (0..500).map(|i| format!("word{i:04}")).collect();
    let fsa = build_fsa(&words).unwrap();
    let read = Arc::new(AnyFsa::from_bytes(&serialize(&fsa, &Codec::new(FsaFormat::Cfsa2))).unwrap());

    std::thread::scope(|scope| {
        for chunk in words.chunks(125) {
            let read = Arc::clone(&read);
            scope.spawn(move || {
                for word in chunk {
                    assert!(read.contains(word.as_bytes()));
                }
            });
        }
    });
}
