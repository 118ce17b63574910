//! Extra methods for non-zero integers.

#![warn(missing_docs)]

use std::num::{NonZeroU64, NonZeroUsize};

/// Extra methods for non-zero integers.
pub trait NonZeroExt: Sized
{
    /// The number 1.
    const ONE: Self;

    /// Divide, rounding towards positive infinity.
    ///
    /// Because the dividend is non-zero, so is the quotient.
    fn div_ceil_nonzero(self, rhs: Self) -> Self;
}

macro_rules! impl_non_zero_ext
{
    ($($t:ty),*) => {
        $(
            impl NonZeroExt for $t
            {
                const ONE: Self = unsafe { Self::new_unchecked(1) };

                fn div_ceil_nonzero(self, rhs: Self) -> Self
                {
                    // Written so that it cannot overflow.
                    let quotient = (self.get() - 1) / rhs.get() + 1;
                    // SAFETY: quotient is at least one.
                    unsafe { Self::new_unchecked(quotient) }
                }
            }
        )*
    };
}

impl_non_zero_ext!(NonZeroU64, NonZeroUsize);
