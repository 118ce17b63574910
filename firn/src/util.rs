use std::fmt;

/// Round up to a multiple of the granularity.
///
/// Saturates at the largest multiple that fits.
/// The granularity must be a power of two.
pub fn round_to_ceiling(granularity: usize, value: usize) -> usize
{
    debug_assert!(granularity.is_power_of_two());
    match value.checked_add(granularity - 1) {
        Some(value) => round_to_floor(granularity, value),
        None => round_to_floor(granularity, usize::MAX),
    }
}

/// Round down to a multiple of the granularity.
///
/// The granularity must be a power of two.
pub fn round_to_floor(granularity: usize, value: usize) -> usize
{
    debug_assert!(granularity.is_power_of_two());
    value & !(granularity - 1)
}

/// Display a byte count with the largest unit that keeps it readable.
#[derive(Clone, Copy, Debug)]
pub struct FormattedSize(pub usize);

impl fmt::Display for FormattedSize
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        const UNITS: [(&str, usize); 3] =
            [("GiB", 1 << 30), ("MiB", 1 << 20), ("KiB", 1 << 10)];

        let size = self.0;
        for (name, unit) in UNITS {
            if size >= unit {
                return if size % unit == 0 {
                    write!(f, "{}{name}", size / unit)
                } else {
                    write!(f, "{:.2}{name}", size as f64 / unit as f64)
                };
            }
        }
        write!(f, "{size}B")
    }
}
