//! Region and arraylet leaf geometry.

use crate::{ArrayletLeaf, ArrayletLeafGeometry, Infeasible};

/// Smallest region size.
pub const MINIMUM_REGION_SIZE: usize = 4 * 1024;

/// Largest region size.
pub const MAXIMUM_REGION_SIZE: usize = 1 << 30;

/// The base-2 logarithm of a power of two larger than one.
///
/// Returns [`None`] for any other value, including zero and one.
pub fn power_of_two_shift(value: usize) -> Option<u32>
{
    (value > 1 && value.is_power_of_two()).then(|| value.trailing_zeros())
}

/// Resolve the requested region size.
///
/// A request of zero selects the default.
/// The result is validated with [`verify_region_size`].
pub fn resolve_region_size(
    requested: usize,
    default: usize,
    heap_alignment: usize,
) -> Result<usize, Infeasible>
{
    let region_size = if requested == 0 { default } else { requested };
    let shift = power_of_two_shift(region_size)
        .ok_or(Infeasible::RegionSize(region_size))?;
    let region_size = 1 << shift;
    verify_region_size(region_size, heap_alignment)?;
    Ok(region_size)
}

/// Check that regions of this size can tile a heap with this alignment.
pub fn verify_region_size(region_size: usize, heap_alignment: usize)
    -> Result<(), Infeasible>
{
    if !heap_alignment.is_power_of_two() {
        return Err(Infeasible::HeapAlignment(heap_alignment));
    }
    let in_range = (MINIMUM_REGION_SIZE ..= MAXIMUM_REGION_SIZE)
        .contains(&region_size);
    if !in_range || region_size < heap_alignment {
        return Err(Infeasible::RegionSizeOutOfRange{
            size: region_size,
            minimum: MINIMUM_REGION_SIZE,
            maximum: MAXIMUM_REGION_SIZE,
            heap_alignment,
        });
    }
    Ok(())
}

/// Resolve the arraylet leaf size for the given region size.
pub fn resolve_arraylet_leaf(leaf: ArrayletLeaf, region_size: usize)
    -> Result<ArrayletLeafGeometry, Infeasible>
{
    let size = match leaf {
        ArrayletLeaf::Disabled => return Ok(ArrayletLeafGeometry::DISABLED),
        ArrayletLeaf::RegionSized | ArrayletLeaf::Explicit(0) => region_size,
        ArrayletLeaf::Explicit(size) => size,
    };
    let log_size = power_of_two_shift(size)
        .ok_or(Infeasible::ArrayletLeafSize(size))?;
    Ok(ArrayletLeafGeometry{size, log_size})
}
