//! Bounds of the generational spaces.
//!
//! The requested bounds are reconciled with each other
//! and with the size of the heap that was actually reserved.
//! Inconsistent requests are clamped, never rejected.

use crate::util::{round_to_ceiling, round_to_floor};

/// Requested bounds of the generational spaces, in bytes.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SizingInputs
{
    pub minimum_space_size: usize,
    pub minimum_new_space_size: usize,
    pub initial_new_space_size: usize,
    pub maximum_new_space_size: usize,
    pub minimum_old_space_size: usize,
    pub initial_old_space_size: usize,
    pub maximum_old_space_size: usize,
    pub memory_max: usize,

    /// Accepted for compatibility; the bounds do not depend on it.
    pub tenure_flags: usize,
}

/// Bounds of the generational spaces, in bytes.
///
/// New space bounds are multiples of twice the alignment,
/// all other bounds are multiples of the alignment.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct InitializationParameters
{
    pub minimum_space_size: usize,
    pub minimum_new_space_size: usize,
    pub initial_new_space_size: usize,
    pub maximum_new_space_size: usize,
    pub minimum_old_space_size: usize,
    pub initial_old_space_size: usize,
    pub maximum_old_space_size: usize,
    pub maximum_space_size: usize,
}

/// Derive the bounds of the generational spaces.
///
/// The alignment must be a power of two.
pub fn prepare_parameters(
    alignment: usize,
    heap_maximum_size: usize,
    inputs: &SizingInputs,
) -> InitializationParameters
{
    let new_alignment = alignment.saturating_mul(2);
    let ceil_new = |size| round_to_ceiling(new_alignment, size);
    let ceil_old = |size| round_to_ceiling(alignment, size);

    let minimum_new = ceil_new(inputs.minimum_new_space_size);
    let maximum_new = ceil_new(inputs.maximum_new_space_size);
    let initial_new = ceil_new(inputs.initial_new_space_size);
    let minimum_old = ceil_old(inputs.minimum_old_space_size);
    let maximum_old = ceil_old(inputs.maximum_old_space_size);
    let initial_old = ceil_old(inputs.initial_old_space_size);

    let minimum_space = ceil_old(inputs.minimum_space_size)
        .max(minimum_new.saturating_add(minimum_old));
    let memory_max = ceil_old(inputs.memory_max)
        .max(maximum_new.saturating_add(maximum_old));

    let maximum_heap_size =
        round_to_floor(alignment, heap_maximum_size).min(memory_max);

    // New space stays a multiple of twice the alignment.
    let new_limit = round_to_floor(new_alignment, maximum_heap_size);
    let minimum_new_space_size = minimum_new.min(new_limit);
    let initial_new_space_size = initial_new.min(new_limit);
    let maximum_new_space_size = maximum_new.min(new_limit);

    InitializationParameters{
        minimum_space_size: minimum_space.min(maximum_heap_size),
        minimum_new_space_size,
        initial_new_space_size,
        maximum_new_space_size,
        minimum_old_space_size:
            minimum_old.min(maximum_heap_size - minimum_new_space_size),
        initial_old_space_size:
            initial_old.min(maximum_heap_size - initial_new_space_size),
        maximum_old_space_size:
            maximum_old.min(maximum_heap_size - maximum_new_space_size),
        maximum_space_size: maximum_heap_size,
    }
}

#[cfg(test)]
mod tests
{
    use {super::*, proptest::proptest};

    const MIB: usize = 1 << 20;

    fn inputs(
        [minimum_space_size, memory_max]: [usize; 2],
        [minimum_new_space_size, initial_new_space_size, maximum_new_space_size]: [usize; 3],
        [minimum_old_space_size, initial_old_space_size, maximum_old_space_size]: [usize; 3],
    ) -> SizingInputs
    {
        SizingInputs{
            minimum_space_size,
            minimum_new_space_size,
            initial_new_space_size,
            maximum_new_space_size,
            minimum_old_space_size,
            initial_old_space_size,
            maximum_old_space_size,
            memory_max,
            tenure_flags: 0,
        }
    }

    #[test]
    fn minimum_total_covers_both_spaces()
    {
        let inputs = inputs(
            [MIB, 64 * MIB],
            [2 * MIB, 2 * MIB, 16 * MIB],
            [2 * MIB, 2 * MIB, 48 * MIB],
        );
        let parameters = prepare_parameters(MIB, 64 * MIB, &inputs);
        assert_eq!(parameters.minimum_space_size, 4 * MIB);
        assert_eq!(parameters.maximum_space_size, 64 * MIB);
    }

    #[test]
    fn new_space_is_rounded_to_twice_the_alignment()
    {
        let inputs = inputs(
            [0, 64 * MIB],
            [MIB, 3 * MIB, 5 * MIB],
            [MIB, MIB, MIB],
        );
        let parameters = prepare_parameters(MIB, 64 * MIB, &inputs);
        assert_eq!(parameters.minimum_new_space_size, 2 * MIB);
        assert_eq!(parameters.initial_new_space_size, 4 * MIB);
        assert_eq!(parameters.maximum_new_space_size, 6 * MIB);
    }

    #[test]
    fn old_space_yields_to_a_small_heap()
    {
        let inputs = inputs(
            [0, 0],
            [4 * MIB, 4 * MIB, 8 * MIB],
            [16 * MIB, 16 * MIB, 64 * MIB],
        );
        let parameters = prepare_parameters(MIB, 11 * MIB, &inputs);
        assert_eq!(parameters.maximum_space_size, 11 * MIB);
        assert_eq!(parameters.maximum_new_space_size, 8 * MIB);
        assert_eq!(parameters.maximum_old_space_size, 3 * MIB);
        assert_eq!(parameters.minimum_old_space_size, 7 * MIB);
    }

    proptest!
    {
        #[test]
        fn bounds_are_consistent(
            shift in 10u32 .. 24,
            heap_maximum_size in 0usize .. 1 << 40,
            totals: [u32; 2],
            new: [u32; 3],
            old: [u32; 3],
        )
        {
            let alignment = 1usize << shift;
            let inputs = inputs(
                totals.map(|n| n as usize),
                new.map(|n| n as usize),
                old.map(|n| n as usize),
            );
            let p = prepare_parameters(alignment, heap_maximum_size, &inputs);
            let maximum = p.maximum_space_size;

            assert!(maximum <= heap_maximum_size);
            assert!(p.minimum_new_space_size + p.minimum_old_space_size <= p.minimum_space_size);
            assert!(p.minimum_space_size <= maximum);
            assert!(p.maximum_new_space_size + p.maximum_old_space_size <= maximum);
            assert!(p.initial_new_space_size + p.initial_old_space_size <= maximum);

            for size in [p.minimum_new_space_size, p.initial_new_space_size, p.maximum_new_space_size] {
                assert_eq!(size % (2 * alignment), 0);
            }
            for size in [
                p.minimum_space_size, maximum,
                p.minimum_old_space_size, p.initial_old_space_size, p.maximum_old_space_size,
            ] {
                assert_eq!(size % alignment, 0);
            }
        }

        #[test]
        fn prepare_parameters_is_idempotent(
            shift in 10u32 .. 24,
            heap_maximum_size in 0usize .. 1 << 40,
            totals: [u32; 2],
            new: [u32; 3],
            old: [u32; 3],
        )
        {
            let alignment = 1usize << shift;
            let inputs = inputs(
                totals.map(|n| n as usize),
                new.map(|n| n as usize),
                old.map(|n| n as usize),
            );
            let first = prepare_parameters(alignment, heap_maximum_size, &inputs);
            let second = prepare_parameters(alignment, heap_maximum_size, &inputs);
            assert_eq!(first, second);
        }
    }
}
