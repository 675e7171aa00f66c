//! Comparison sort that tolerates inconsistent comparators.
//!
//! `slice::sort_by` requires a total order and may panic when it detects a
//! violation. A noisy rater gives no such guarantee, so ranking goes through
//! this sort instead: binary insertion for short runs, top-down merging above
//! that. Every call returns a permutation of `0..len`, whatever the
//! comparator answers.

use std::cmp::Ordering;

/// Runs at or below this length are sorted by binary insertion.
const INSERTION_RUN: usize = 32;

/// Sort indices `0..len` ascending under `compare`.
///
/// Stable for comparators that are consistent; for inconsistent ones the
/// result depends on which pairs get asked, which is deterministic given the
/// comparator's answers.
pub fn comparison_sort<F>(len: usize, mut compare: F) -> Vec<usize>
where
    F: FnMut(usize, usize) -> Ordering,
{
    let mut order: Vec<usize> = (0..len).collect();
    if len < 2 {
        return order;
    }
    let mut scratch = Vec::with_capacity(len);
    merge_sort(&mut order, &mut scratch, &mut compare);
    order
}

fn merge_sort<F>(v: &mut [usize], scratch: &mut Vec<usize>, compare: &mut F)
where
    F: FnMut(usize, usize) -> Ordering,
{
    if v.len() <= INSERTION_RUN {
        binary_insertion_sort(v, compare);
        return;
    }
    let mid = v.len() / 2;
    {
        let (left, right) = v.split_at_mut(mid);
        merge_sort(left, scratch, compare);
        merge_sort(right, scratch, compare);
    }
    merge(v, mid, scratch, compare);
}

fn binary_insertion_sort<F>(v: &mut [usize], compare: &mut F)
where
    F: FnMut(usize, usize) -> Ordering,
{
    for start in 1..v.len() {
        let pivot = v[start];
        let mut lo = 0usize;
        let mut hi = start;
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if compare(pivot, v[mid]) == Ordering::Less {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }
        v[lo..=start].rotate_right(1);
    }
}

fn merge<F>(v: &mut [usize], mid: usize, scratch: &mut Vec<usize>, compare: &mut F)
where
    F: FnMut(usize, usize) -> Ordering,
{
    scratch.clear();
    scratch.extend_from_slice(&v[..mid]);

    let mut left = 0usize;
    let mut right = mid;
    let mut out = 0usize;

    while left < scratch.len() && right < v.len() {
        // Take from the right run only when it is strictly smaller.
        if compare(v[right], scratch[left]) == Ordering::Less {
            v[out] = v[right];
            right += 1;
        } else {
            v[out] = scratch[left];
            left += 1;
        }
        out += 1;
    }
    while left < scratch.len() {
        v[out] = scratch[left];
        left += 1;
        out += 1;
    }
}
