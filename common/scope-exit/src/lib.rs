//! Scope guards that can be defused.
//!
//! A scope guard owns a value and an action.
//! When the guard is dropped, the action is performed on the value.
//! This happens when the scope ends, on early return through `?`,
//! and when a panic passes through.
//! Calling [`ScopeGuard::defuse`] gives the value back
//! without performing the action.
//!
//! This makes it easy to write construction sequences
//! that undo their partial work on failure
//! but keep it once every step has succeeded.

#![warn(missing_docs)]

use std::{mem::ManuallyDrop, ops::{Deref, DerefMut}};

/// Value paired with an action to perform on it at the end of the scope.
///
/// The guard dereferences to the value.
/// To create a guard, use [`guard`].
pub struct ScopeGuard<T, F>
    where F: FnOnce(T)
{
    value: ManuallyDrop<T>,
    on_exit: ManuallyDrop<F>,
}

/// Guard a value with an action.
///
/// # Examples
///
/// ```
/// # use scope_exit::{ScopeGuard, guard};
/// use std::cell::Cell;
/// let undone = Cell::new(0);
/// {
///     let _g = guard(1, |n| undone.set(n));
/// }
/// assert_eq!(undone.get(), 1);
/// {
///     let g = guard(2, |n| undone.set(n));
///     assert_eq!(ScopeGuard::defuse(g), 2);
/// }
/// assert_eq!(undone.get(), 1);
/// ```
pub fn guard<T, F>(value: T, on_exit: F) -> ScopeGuard<T, F>
    where F: FnOnce(T)
{
    ScopeGuard{
        value: ManuallyDrop::new(value),
        on_exit: ManuallyDrop::new(on_exit),
    }
}

impl<T, F> ScopeGuard<T, F>
    where F: FnOnce(T)
{
    /// Take the value out of the guard without performing the action.
    ///
    /// This is an associated function rather than a method,
    /// so that it does not shadow methods of the guarded value.
    pub fn defuse(this: Self) -> T
    {
        let mut this = ManuallyDrop::new(this);
        // SAFETY: this is never dropped, so neither field is used again.
        unsafe {
            ManuallyDrop::drop(&mut this.on_exit);
            ManuallyDrop::take(&mut this.value)
        }
    }
}

impl<T, F> Deref for ScopeGuard<T, F>
    where F: FnOnce(T)
{
    type Target = T;

    fn deref(&self) -> &T
    {
        &self.value
    }
}

impl<T, F> DerefMut for ScopeGuard<T, F>
    where F: FnOnce(T)
{
    fn deref_mut(&mut self) -> &mut T
    {
        &mut self.value
    }
}

impl<T, F> Drop for ScopeGuard<T, F>
    where F: FnOnce(T)
{
    fn drop(&mut self)
    {
        // SAFETY: self.value and self.on_exit will not be used anymore.
        let (value, on_exit) = unsafe {
            (ManuallyDrop::take(&mut self.value),
             ManuallyDrop::take(&mut self.on_exit))
        };
        on_exit(value);
    }
}
