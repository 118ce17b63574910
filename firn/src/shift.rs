//! Compressed reference shift.
//!
//! A compressed reference is a heap address shifted right
//! so that it fits in 32 bits.
//! The shift is the smallest one that can address the top of the heap,
//! unless platform policy prefers a larger one.

use crate::{CompressedReferences, Infeasible};

/// Width of a compressed reference in bits.
pub const ADDRESS_CEILING_SHIFT: u32 = 32;

/// Shift to start searching from when shifting is allowed.
pub const LOW_MEMORY_HEAP_CEILING_SHIFT: u32 = 4;

/// Smallest non-zero shift on platforms without cheap fine shifts.
pub const DEFAULT_LOW_MEMORY_HEAP_CEILING_SHIFT: u32 = 3;

/// Whether every address up to the heap top
/// can be addressed with the given shift.
pub fn fits(heap_top: usize, shift: u32) -> bool
{
    let ceiling_shift = ADDRESS_CEILING_SHIFT.saturating_add(shift);
    // Beyond this, the ceiling exceeds every address.
    if ceiling_shift >= u128::BITS - 1 {
        return true;
    }
    heap_top as u128 <= 1u128 << ceiling_shift
}

/// Resolve the shift for a heap ending at the given address.
pub fn resolve_shift(heap_top: usize, policy: &CompressedReferences)
    -> Result<u32, Infeasible>
{
    let (mut shift, adjustable) = match policy.forced_shift {
        Some(forced) => (forced, false),
        None if policy.allow_shifting => (LOW_MEMORY_HEAP_CEILING_SHIFT, true),
        None => (0, true),
    };

    if !fits(heap_top, shift) {
        return Err(Infeasible::HeapAboveShiftCeiling{heap_top, shift});
    }

    if adjustable {
        while shift > 0 && fits(heap_top, shift - 1) {
            shift -= 1;
        }

        let raise = if policy.force_default_shift_if_possible {
            true
        } else {
            shift != 0 && !policy.fine_shifts_beneficial
        };
        if raise {
            shift = shift.max(DEFAULT_LOW_MEMORY_HEAP_CEILING_SHIFT);
        }
    }

    Ok(shift)
}
