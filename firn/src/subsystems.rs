//! Collaborators that the configuration engine creates, consults, and destroys.
//!
//! The engine does not know how a heap reserves memory
//! or how a collector traces objects.
//! It only decides when these things are created and in which order
//! they are destroyed; destroying a subsystem is dropping its box.

use {
    crate::{AllocationStrategy, Environment, RuntimeState, ThreadId, WriteBarrier},
    non_zero_ext::NonZeroExt,
    std::num::NonZeroUsize,
};

/* -------------------------------------------------------------------------- */
/*                                Runtime hooks                               */
/* -------------------------------------------------------------------------- */

/// Customization points of the language runtime.
///
/// Hooks that return an error stop the orchestration call that ran them;
/// the call then destroys what it created before returning.
pub trait Delegate
{
    /// Called by [`initialize`] after the region geometry is resolved.
    ///
    /// [`initialize`]: `crate::Configuration::initialize`
    fn initialize(
        &mut self,
        state: &RuntimeState,
        write_barrier: WriteBarrier,
        allocation_strategy: AllocationStrategy,
    ) -> anyhow::Result<()>;

    /// Called for every new environment before it is handed out.
    fn environment_initialized(&mut self, environment: &mut Environment)
        -> anyhow::Result<()>;

    /// Called once the heap is published in the runtime state.
    fn heap_initialized(&mut self, state: &RuntimeState) -> anyhow::Result<()>;

    /// Upper bound on the default number of GC threads.
    fn max_gc_thread_count(&self) -> NonZeroUsize;

    /// Adjust the derived GC thread count for a process
    /// that may be checkpointed later.
    fn checkpoint_gc_thread_count_verify_and_adjust(
        &mut self,
        thread_count: NonZeroUsize,
    ) -> NonZeroUsize
    {
        thread_count
    }

    /// Called when a checkpointed process resumes,
    /// after the tuning parameters are derived again.
    fn reinitialize_for_restore(&mut self, _state: &RuntimeState)
        -> anyhow::Result<()>
    {
        Ok(())
    }

    /// Called last during teardown.
    fn tear_down(&mut self)
    {
    }
}

/// Queries about the machine the runtime runs on.
pub trait Host
{
    /// Number of processors the runtime may use.
    fn cpu_count(&self) -> NonZeroUsize;
}

/// Host backed by the operating system.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsHost;

impl Host for OsHost
{
    fn cpu_count(&self) -> NonZeroUsize
    {
        let count = os_ext::sched_getaffinity_count()
            .or_else(|_| os_ext::online_processors());
        match count.map(NonZeroUsize::new) {
            Ok(Some(count)) => count,
            Ok(None) => {
                log::warn!(target: "gc", "Host reports no processors, assuming one");
                NonZeroUsize::ONE
            },
            Err(err) => {
                log::warn!(target: "gc", "Cannot count processors, assuming one: {err}");
                NonZeroUsize::ONE
            },
        }
    }
}

/* -------------------------------------------------------------------------- */
/*                                Object model                                */
/* -------------------------------------------------------------------------- */

/// Alignment of objects in the heap.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ObjectAlignment
{
    /// Alignment of objects in bytes.
    pub alignment: usize,

    /// Base-2 logarithm of the alignment.
    pub shift: u32,
}

/// Layout decisions that depend on the compressed reference shift.
pub trait ObjectModel
{
    /// Derive the object alignment.
    ///
    /// The shift is [`None`] when compressed references are disabled.
    fn set_object_alignment(&mut self, compressed_references_shift: Option<u32>)
        -> ObjectAlignment;
}

/// Smallest alignment of any object.
pub const OBJECT_ALIGN: usize = 8;

/// Objects are aligned to the larger of [`OBJECT_ALIGN`]
/// and the granularity addressable by compressed references.
#[derive(Clone, Copy, Debug, Default)]
pub struct StandardObjectModel
{
    alignment: Option<ObjectAlignment>,
}

impl StandardObjectModel
{
    /// The alignment derived by the last call to
    /// [`set_object_alignment`][`ObjectModel::set_object_alignment`].
    pub fn alignment(&self) -> Option<ObjectAlignment>
    {
        self.alignment
    }
}

impl ObjectModel for StandardObjectModel
{
    fn set_object_alignment(&mut self, compressed_references_shift: Option<u32>)
        -> ObjectAlignment
    {
        let granularity = compressed_references_shift
            .and_then(|shift| 1usize.checked_shl(shift))
            .unwrap_or(1);
        let alignment = granularity.max(OBJECT_ALIGN);
        let alignment = ObjectAlignment{
            alignment,
            shift: alignment.trailing_zeros(),
        };
        self.alignment = Some(alignment);
        alignment
    }
}

/* -------------------------------------------------------------------------- */
/*                                 Subsystems                                 */
/* -------------------------------------------------------------------------- */

/// Creates the subsystems of the memory manager.
///
/// Every method returns [`None`] when the subsystem cannot be created,
/// typically because memory is exhausted.
pub trait Subsystems
{
    /// Create the virtual memory manager.
    fn new_memory_manager(&mut self) -> Option<Box<dyn MemoryManager>>;

    /// Create the region manager for regions of the given size.
    fn new_region_manager(&mut self, region_size: usize)
        -> Option<Box<dyn RegionManager>>;

    /// Reserve a heap of the requested size.
    fn new_heap(
        &mut self,
        bytes_requested: usize,
        region_manager: &mut dyn RegionManager,
    ) -> Option<Box<dyn Heap>>;

    /// Create the pool of lightweight lock records.
    fn new_lock_pool(&mut self) -> Option<Box<dyn LockPool>>;

    /// Create the dispatcher that runs GC threads.
    fn new_dispatcher(&mut self, thread_count: NonZeroUsize, stack_size: usize)
        -> Option<Box<dyn Dispatcher>>;

    /// Create the allocation interface of a thread.
    fn new_allocation_interface(
        &mut self,
        strategy: AllocationStrategy,
        thread: ThreadId,
    ) -> Option<Box<dyn AllocationInterface>>;
}

/// The heap.
pub trait Heap
{
    /// Lowest address of the heap.
    fn heap_base(&self) -> usize;

    /// Address just past the heap.
    fn heap_top(&self) -> usize;

    /// Size the heap can grow to.
    fn maximum_memory_size(&self) -> usize;

    /// Hand the reserved memory to the region manager.
    ///
    /// Returns false if the region manager cannot manage it.
    fn attach_region_manager(&mut self, region_manager: &mut dyn RegionManager)
        -> bool;

    /// The default memory space, once allocated.
    fn default_memory_space(&self) -> Option<&dyn MemorySpace>;

    /// Install the default memory space.
    fn set_default_memory_space(&mut self, memory_space: Box<dyn MemorySpace>);

    /// Remove the default memory space.
    fn take_default_memory_space(&mut self) -> Option<Box<dyn MemorySpace>>;
}

/// Caches the NUMA topology of the machine.
pub trait NumaManager
{
    /// Query the NUMA topology and cache it.
    ///
    /// Returns false if the topology cannot be queried.
    fn recache_numa_support(&mut self) -> bool;

    /// Forget the cached topology.
    fn shutdown_numa_support(&mut self);
}

/// NUMA manager for machines with uniform memory access.
#[derive(Clone, Copy, Debug, Default)]
pub struct UniformMemory;

impl NumaManager for UniformMemory
{
    fn recache_numa_support(&mut self) -> bool
    {
        true
    }

    fn shutdown_numa_support(&mut self)
    {
    }
}

/// Runs GC work on worker threads.
pub trait Dispatcher
{
    /// Largest number of threads the dispatcher has run so far.
    fn thread_count_maximum(&self) -> usize;
}

/// Per-thread allocation state.
pub trait AllocationInterface
{
    /// Reapply settings after a checkpointed process resumes.
    fn reinitialize_for_restore(&mut self) -> anyhow::Result<()>
    {
        Ok(())
    }
}

/// The default memory space of the heap.
pub trait MemorySpace {}

/// Mark map of the reference chain walker.
pub trait MarkMap {}

/// The collector.
pub trait Collector {}

/// Process-wide allocation state shared by all environments.
pub trait AllocationManager {}

/// Reserves and commits virtual memory.
pub trait MemoryManager {}

/// Divides the heap into regions.
pub trait RegionManager {}

/// Pool of lightweight lock records.
pub trait LockPool {}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn os_host_counts_processors()
    {
        assert!(OsHost.cpu_count().get() >= 1);
    }

    #[test]
    fn standard_object_alignment()
    {
        let mut model = StandardObjectModel::default();
        assert_eq!(model.alignment(), None);

        let alignment = model.set_object_alignment(None);
        assert_eq!(alignment, ObjectAlignment{alignment: 8, shift: 3});

        let alignment = model.set_object_alignment(Some(0));
        assert_eq!(alignment, ObjectAlignment{alignment: 8, shift: 3});

        let alignment = model.set_object_alignment(Some(4));
        assert_eq!(alignment, ObjectAlignment{alignment: 16, shift: 4});
        assert_eq!(model.alignment(), Some(alignment));
    }
}
