// Lexicographic order over byte sequences.
//
// Bytes compare as unsigned values (0-255); a sequence that is a strict prefix
// of another sorts first. This is exactly the order of `<[u8]>::cmp`, which the
// helpers below rely on.

use std::cmp::Ordering;

/// Compares two byte sequences in automaton order.
#[inline]
pub fn compare(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// Returns the length of the longest common prefix of `a` and `b`.
#[inline]
pub fn shared_prefix_length(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Returns the length of the common prefix of `a[a_start..]` and `b`.
///
/// Returns 0 when `a_start` is past the end of `a`.
#[inline]
pub fn shared_prefix_length_at(a: &[u8], a_start: usize, b: &[u8]) -> usize {
    a.get(a_start..)
        .map_or(0, |tail| shared_prefix_length(tail, b))
}

/// Returns the index of the first sequence that is not strictly greater than
/// its predecessor, or `None` if the whole list is strictly increasing.
pub fn first_unsorted<S: AsRef<[u8]>>(sequences: &[S]) -> Option<usize> {
    sequences
        .windows(2)
        .position(|w| compare(w[0].as_ref(), w[1].as_ref()) != Ordering::Less)
        .map(|i| i + 1)
}

/// Whether the sequences are strictly increasing (sorted and duplicate-free).
pub fn is_sorted<S: AsRef<[u8]>>(sequences: &[S]) -> bool {
    first_unsorted(sequences).is_none()
}

/// Sorts the sequences in automaton order and removes duplicates.
pub fn sort_and_dedup(mut sequences: Vec<Vec<u8>>) -> Vec<Vec<u8>> {
    sequences.sort_unstable_by(|a, b| compare(a, b));
    sequences.dedup();
    sequences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(compare(b"ab", b"abc"), Ordering::Less);
        assert_eq!(compare(b"abc", b"ab"), Ordering::Greater);
        assert_eq!(compare(b"", b"a"), Ordering::Less);
        assert_eq!(compare(b"abc", b"abc"), Ordering::Equal);
    }

    #[test]
    fn bytes_compare_unsigned() {
        // 0xE4 (a-umlaut in Latin-1) must sort after ASCII letters.
        assert_eq!(compare(&[0xE4], b"z"), Ordering::Greater);
        assert_eq!(compare(&[0x7F], &[0x80]), Ordering::Less);
        assert_eq!(compare(&[0xFF, 0x00], &[0xFF]), Ordering::Greater);
    }

    #[test]
    fn shared_prefix() {
        assert_eq!(shared_prefix_length(b"abc", b"abd"), 2);
        assert_eq!(shared_prefix_length(b"abc", b"ab"), 2);
        assert_eq!(shared_prefix_length(b"", b"ab"), 0);
        assert_eq!(shared_prefix_length(b"xyz", b"abc"), 0);
    }

    #[test]
    fn shared_prefix_at_offset() {
        assert_eq!(shared_prefix_length_at(b"xabc", 1, b"abd"), 2);
        assert_eq!(shared_prefix_length_at(b"xabc", 4, b"abd"), 0);
        assert_eq!(shared_prefix_length_at(b"xabc", 9, b"abd"), 0);
    }

    #[test]
    fn detects_unsorted_position() {
        let sorted: [&[u8]; 4] = [b"a", b"ab", b"b", b"ba"];
        assert!(is_sorted(&sorted));

        let unsorted: [&[u8]; 3] = [b"a", b"c", b"b"];
        assert_eq!(first_unsorted(&unsorted), Some(2));

        let duplicated: [&[u8]; 3] = [b"a", b"b", b"b"];
        assert_eq!(first_unsorted(&duplicated), Some(2));
    }

    #[test]
    fn empty_and_single_lists_are_sorted() {
        let empty: [&[u8]; 0] = [];
        assert!(is_sorted(&empty));
        assert!(is_sorted(&[b"only"]));
    }

    #[test]
    fn sort_and_dedup_orders_unsigned() {
        let input = vec![
            b"b".to_vec(),
            vec![0xC3, 0xA4],
            b"a".to_vec(),
            b"b".to_vec(),
            b"ab".to_vec(),
        ];
        let out = sort_and_dedup(input);
        assert_eq!(
            out,
            vec![b"a".to_vec(), b"ab".to_vec(), b"b".to_vec(), vec![0xC3, 0xA4]]
        );
        assert!(is_sorted(&out));
    }
}
