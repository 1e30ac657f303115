// Filter kernels shared by the columns.
//
// The interesting one is `compact_offsets`, the row pass of a nested
// column's compaction: for every kept row it marks the row's element span in
// a per-element filter (which the children then compact themselves with) and
// rewrites the offset sequence in place so survivors are contiguous.
//
// It runs either as a plain per-row loop, or over lanes of
// FILTER_LANE_WIDTH filter bytes at a time, with the lane's hit mask computed
// by AVX2 where the CPU has it or by a portable loop otherwise. Lanes that
// are all-miss are skipped, all-hit lanes move their offsets as one block,
// and mixed lanes visit only their set bits. Every kernel produces exactly
// the offsets, element filter and row count of the scalar loop; the rows
// after the last whole lane always go through the scalar loop.

use tracing::trace;

/// Filter bytes examined per lane.
pub const FILTER_LANE_WIDTH: usize = 32;

const FULL_LANE: u32 = u32::MAX;

/// The one definition of a kept filter byte.
#[inline]
pub fn filter_keep(b: u8) -> bool {
    b != 0
}

/// Converts a byte filter into the indexes of the rows it keeps.
pub fn build_selective(filter: &[u8]) -> Vec<u32> {
    filter
        .iter()
        .enumerate()
        .filter(|(_, b)| filter_keep(**b))
        .map(|(i, _)| i as u32)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKernel {
    Scalar,
    Lanes,
    #[cfg(target_arch = "x86_64")]
    Avx2,
}

impl FilterKernel {
    /// The fastest kernel this build and CPU support.
    pub fn detect() -> Self {
        if cfg!(not(feature = "simd")) {
            return FilterKernel::Scalar;
        }
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") {
                return FilterKernel::Avx2;
            }
        }
        FilterKernel::Lanes
    }

    pub fn name(&self) -> &'static str {
        match self {
            FilterKernel::Scalar => "scalar",
            FilterKernel::Lanes => "lanes",
            #[cfg(target_arch = "x86_64")]
            FilterKernel::Avx2 => "avx2",
        }
    }
}

/// Compacts the rows `[from, to)` of `offsets` (which has at least `to + 1`
/// entries) down to the rows `filter` keeps, and sets
/// `element_filter[e] = 1` for every element `e` of every kept row.
/// Returns the index one past the last kept row: `from + kept`.
pub fn compact_offsets(
    kernel: FilterKernel,
    filter: &[u8],
    offsets: &mut [u32],
    from: usize,
    to: usize,
    element_filter: &mut [u8],
) -> usize {
    assert!(filter.len() >= to, "filter shorter than row range");
    assert!(offsets.len() > to, "offsets shorter than row range");
    trace!(kernel = kernel.name(), from, to, "compacting offsets");
    let (check, result) = match kernel {
        FilterKernel::Scalar => (from, from),
        FilterKernel::Lanes => compact_lanes(
            lane_hit_mask,
            filter,
            offsets,
            from,
            to,
            element_filter,
        ),
        #[cfg(target_arch = "x86_64")]
        FilterKernel::Avx2 => {
            if is_x86_feature_detected!("avx2") {
                // SAFETY: AVX2 support was just checked.
                compact_lanes(
                    |lane| unsafe { lane_hit_mask_avx2(lane) },
                    filter,
                    offsets,
                    from,
                    to,
                    element_filter,
                )
            } else {
                compact_lanes(lane_hit_mask, filter, offsets, from, to, element_filter)
            }
        }
    };
    compact_scalar(filter, offsets, check, result, to, element_filter)
}

fn compact_scalar(
    filter: &[u8],
    offsets: &mut [u32],
    check: usize,
    mut result: usize,
    to: usize,
    element_filter: &mut [u8],
) -> usize {
    for i in check..to {
        if filter_keep(filter[i]) {
            debug_assert!(offsets[i + 1] >= offsets[i]);
            let start = offsets[i];
            let len = offsets[i + 1] - start;
            element_filter[start as usize..(start + len) as usize].fill(1);
            offsets[result + 1] = offsets[result] + len;
            result += 1;
        }
    }
    result
}

// Processes whole lanes while a full lane still fits strictly before `to`,
// returning the (check, result) row positions the scalar loop resumes from.
fn compact_lanes(
    hit_mask: impl Fn(&[u8]) -> u32,
    filter: &[u8],
    offsets: &mut [u32],
    mut check: usize,
    to: usize,
    element_filter: &mut [u8],
) -> (usize, usize) {
    const W: usize = FILTER_LANE_WIDTH;
    let mut result = check;
    while check + W < to {
        let mask = hit_mask(&filter[check..check + W]);
        if mask == 0 {
            // Nothing kept.
        } else if mask == FULL_LANE {
            let start = offsets[check] as usize;
            let end = offsets[check + W] as usize;
            element_filter[start..end].fill(1);
            if result != check {
                debug_assert!(offsets[result] <= offsets[check]);
                let delta = offsets[check] - offsets[result];
                offsets.copy_within(check + 1..check + 1 + W, result + 1);
                for o in &mut offsets[result + 1..result + 1 + W] {
                    *o -= delta;
                }
            }
            result += W;
        } else {
            // Jump from hit to hit over the runs of trailing zeros.
            let mut rest = mask;
            while rest != 0 {
                let i = rest.trailing_zeros() as usize;
                rest &= rest - 1;
                let row = check + i;
                let start = offsets[row];
                let len = offsets[row + 1] - start;
                element_filter[start as usize..(start + len) as usize].fill(1);
                offsets[result + 1] = offsets[result] + len;
                result += 1;
            }
        }
        check += W;
    }
    (check, result)
}

// Bit `i` is set when `lane[i]` is kept.
fn lane_hit_mask(lane: &[u8]) -> u32 {
    lane.iter()
        .take(FILTER_LANE_WIDTH)
        .enumerate()
        .fold(0_u32, |mask, (i, b)| {
            if filter_keep(*b) {
                mask | (1 << i)
            } else {
                mask
            }
        })
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn lane_hit_mask_avx2(lane: &[u8]) -> u32 {
    use std::arch::x86_64::*;
    assert!(lane.len() >= FILTER_LANE_WIDTH);
    let f = _mm256_loadu_si256(lane.as_ptr() as *const __m256i);
    // Compare for equality with zero and invert, so every nonzero byte
    // (including those >= 0x80) counts as a hit, same as filter_keep.
    let zero = _mm256_cmpeq_epi8(f, _mm256_setzero_si256());
    !(_mm256_movemask_epi8(zero) as u32)
}

/// Keeps the entries of `data[from..to]` whose filter byte is nonzero,
/// followed by any entries past `to`. Returns the new length.
pub(crate) fn filter_vec_range<T: Copy>(
    data: &mut Vec<T>,
    filter: &[u8],
    from: usize,
    to: usize,
) -> usize {
    assert!(filter.len() >= to, "filter shorter than row range");
    let mut result = from;
    for i in from..to {
        if filter_keep(filter[i]) {
            data[result] = data[i];
            result += 1;
        }
    }
    let len = data.len();
    data.copy_within(to..len, result);
    data.truncate(result + (len - to));
    data.len()
}
