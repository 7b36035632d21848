//! No-data sentinel selection

use std::collections::HashSet;

/// Sentinel candidates tried before falling back to `min - 1`
pub const DEFAULT_NODATA_CANDIDATES: [f64; 2] = [-1.0, -9999.0];

fn key(v: f64) -> u64 {
    // 0.0 and -0.0 are the same data value
    if v == 0.0 {
        0.0f64.to_bits()
    } else {
        v.to_bits()
    }
}

/// Pick the value used for missing elements of an array.
///
/// Order: the declared no-data value; the first of `candidates` that is not
/// a data value (integral candidates only when `integral`); `min - 1`
/// (`floor(min) - 1` for integral arrays), decremented until unused.
/// Non-finite values are not data.
pub fn select_sentinel<I>(values: I, declared: Option<f64>, candidates: &[f64], integral: bool) -> f64
where
    I: IntoIterator<Item = f64>,
{
    if let Some(declared) = declared {
        return declared;
    }

    let used: HashSet<u64> = values
        .into_iter()
        .filter(|v| v.is_finite())
        .map(key)
        .collect();
    let is_free = |v: f64| !used.contains(&key(v));

    if let Some(candidate) = candidates
        .iter()
        .copied()
        .filter(|c| c.is_finite() && (!integral || c.fract() == 0.0))
        .find(|c| is_free(*c))
    {
        return candidate;
    }

    let min = used
        .iter()
        .map(|bits| f64::from_bits(*bits))
        .fold(f64::INFINITY, f64::min);
    if !min.is_finite() {
        return candidates.first().copied().unwrap_or(-1.0);
    }

    let mut sentinel = if integral {
        (min - 1.0).floor()
    } else {
        min - 1.0
    };
    while !is_free(sentinel) || sentinel >= min {
        let next = sentinel - 1.0;
        if next == sentinel {
            // below f64 integer resolution; only -inf is left
            return f64::NEG_INFINITY;
        }
        sentinel = next;
    }
    sentinel
}
