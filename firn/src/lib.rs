//! Configuration of the memory subsystem of a garbage-collected runtime.
//!
//! A [`Configuration`] resolves the region geometry,
//! the compressed reference shift, the bounds of the generational spaces,
//! and the number of GC threads.
//! It creates the heap and its managers, and destroys them again
//! in an order the subsystems can rely on.
//! Everything it creates lives in a [`RuntimeState`].
//!
//! The subsystems themselves are provided by the runtime
//! through the [`Subsystems`] factory and the [`Delegate`] hooks.
//!
//! Records are logged with the `gc` target.

#![warn(missing_docs)]

pub use self::{
    configuration::*,
    environment::*,
    error::*,
    options::*,
    policy::*,
    sizing::{InitializationParameters, SizingInputs},
    state::*,
    subsystems::*,
};

pub mod geometry;
pub mod shift;
pub mod sizing;
pub mod tuning;

mod configuration;
mod environment;
mod error;
mod options;
mod policy;
mod state;
mod subsystems;
mod util;

#[cfg(feature = "checkpoint-restore")]
mod restore;

#[cfg(test)]
mod fake;
