//! GC thread count and the split factors derived from it.

use {
    crate::{Configuration, RuntimeState, ScanOrdering},
    non_zero_ext::NonZeroExt,
    std::num::NonZeroUsize,
};

/// Number of threads that share one shard of a split pool.
pub const THREADS_PER_SPLIT: NonZeroUsize =
    // SAFETY: Eight is not zero.
    unsafe { NonZeroUsize::new_unchecked(8) };

/// Number of GC threads when the options do not pin it.
pub fn default_gc_thread_count(cpu_count: NonZeroUsize, delegate_maximum: NonZeroUsize)
    -> NonZeroUsize
{
    cpu_count.min(delegate_maximum)
}

/// Number of shards for the given number of threads.
pub fn split_amount(thread_count: NonZeroUsize) -> NonZeroUsize
{
    thread_count.div_ceil_nonzero(THREADS_PER_SPLIT)
}

/// Derive the split factors and scan ordering from the thread count.
///
/// Split factors only grow, so deriving again never shrinks a pool.
pub fn derive_gc_parameters(state: &mut RuntimeState, cpu_count: NonZeroUsize)
{
    let amount = split_amount(state.gc_thread_count);
    state.packet_list_split.raise_to(amount);
    state.cache_list_split.raise_to(amount);

    let scavenger_enabled = state.options.scavenger.enabled;
    if scavenger_enabled {
        match state.scan_ordering {
            ScanOrdering::None =>
                state.scan_ordering = ScanOrdering::Hierarchical,
            ScanOrdering::DynamicBreadthFirst =>
                state.adaptive_gc_count_between_hot_field_sort = true,
            ScanOrdering::BreadthFirst | ScanOrdering::Hierarchical => (),
        }
    }

    let free_list_split = if scavenger_enabled {
        amount
    } else {
        split_amount(cpu_count)
    };
    state.split_free_list_amount.raise_to(free_list_split);

    log::info!(
        target: "gc",
        "GC threads {}, packet list split {}, cache list split {}, free list split {}",
        state.gc_thread_count,
        state.packet_list_split.get(),
        state.cache_list_split.get(),
        state.split_free_list_amount.get(),
    );
}

impl Configuration
{
    /// Number of GC threads when the options do not pin it.
    pub fn default_gc_thread_count(&self) -> NonZeroUsize
    {
        default_gc_thread_count(
            self.host.cpu_count(),
            self.delegate.max_gc_thread_count(),
        )
    }

    /// Derive the GC thread count unless the options pin it.
    pub fn initialize_gc_thread_count(&mut self, state: &mut RuntimeState)
    {
        state.gc_thread_count = match state.options.gc_thread_count {
            Some(pinned) => pinned,
            None => self.default_gc_thread_count(),
        };

        #[cfg(feature = "checkpoint-restore")]
        {
            state.gc_thread_count = self.delegate
                .checkpoint_gc_thread_count_verify_and_adjust(state.gc_thread_count);
        }
    }

    /// Derive the split factors and scan ordering.
    pub fn initialize_gc_parameters(&self, state: &mut RuntimeState)
    {
        derive_gc_parameters(state, self.host.cpu_count());
    }
}
