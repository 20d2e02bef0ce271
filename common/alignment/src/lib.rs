/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Power-of-two alignment checks on raw addresses, plus the huge page
//! boundaries we care about.

/// Size of the buffers requested by the probes. Kept as a `u64` because it
/// does not fit in a 32-bit `usize`.
pub const FOUR_GIB: u64 = 4 << 30;

/// Linux PMD-level (x86_64 "large") huge page.
pub const HUGE_2MIB: usize = 2 << 20;

/// Linux PUD-level ("gigantic") huge page.
pub const HUGE_1GIB: usize = 1 << 30;

/// Returns true if `addr` is a multiple of `align`.
///
/// `align` must be a power of two; other values give meaningless results.
/// The address is a `usize` so the mask is applied at pointer width, without
/// sign extension or truncation.
#[inline]
pub const fn is_aligned(addr: usize, align: usize) -> bool {
    debug_assert!(align.is_power_of_two());
    addr & (align - 1) == 0
}

/// Same as [`is_aligned`], for a pointer.
#[inline]
pub fn is_ptr_aligned<T>(ptr: *const T, align: usize) -> bool {
    is_aligned(ptr as usize, align)
}

/// Number of low zero bits that `align` requires of an address.
#[inline]
pub const fn alignment_bits(align: usize) -> u32 {
    debug_assert!(align.is_power_of_two());
    align.trailing_zeros()
}
