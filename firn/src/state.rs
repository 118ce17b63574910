use {
    crate::{
        AllocationManager, Collector, Dispatcher, GcOptions, Heap, LockPool,
        MarkMap, MemoryManager, MemorySpace, NumaManager, ObjectAlignment,
        RegionManager, ScanOrdering, UniformMemory,
    },
    bitflags::bitflags,
    non_zero_ext::NonZeroExt,
    std::num::NonZeroUsize,
};

bitflags!
{
    /// Subsystems owned by a runtime state.
    pub struct Resources: u16
    {
        #[allow(missing_docs)] const DEFAULT_MEMORY_SPACE = 1 << 0;
        #[allow(missing_docs)] const MARK_MAP             = 1 << 1;
        #[allow(missing_docs)] const COLLECTOR            = 1 << 2;
        #[allow(missing_docs)] const DISPATCHER           = 1 << 3;
        #[allow(missing_docs)] const ALLOCATION_MANAGER   = 1 << 4;
        #[allow(missing_docs)] const HEAP                 = 1 << 5;
        #[allow(missing_docs)] const MEMORY_MANAGER       = 1 << 6;
        #[allow(missing_docs)] const REGION_MANAGER       = 1 << 7;
        #[allow(missing_docs)] const LOCK_POOL            = 1 << 8;
        #[allow(missing_docs)] const NUMA                 = 1 << 9;

        /// Per-thread; never owned by the runtime state.
        const ALLOCATION_INTERFACE = 1 << 10;
    }
}

/// How far heap creation got.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum LifecyclePhase
{
    Uninitialized,
    MemoryManagerReady,
    RegionManagerReady,
    HeapAllocated,
    HeapBound,
    AlignmentResolved,
    DelegateAccepted,
    Active,
    TornDown,
}

impl LifecyclePhase
{
    /// Move to the given phase.
    pub (crate) fn advance(&mut self, phase: Self)
    {
        log::debug!(target: "gc", "Lifecycle phase {self:?} -> {phase:?}");
        *self = phase;
    }

    /// Go back to an earlier phase after a failed heap creation.
    pub (crate) fn retreat(&mut self, phase: Self)
    {
        if *self > phase {
            self.advance(phase);
        }
    }
}

/// Value of [`ArrayletLeafGeometry::size`] when arraylets are disabled.
pub const ARRAYLETS_DISABLED: usize = usize::MAX;

/// Size of arraylet leaves.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ArrayletLeafGeometry
{
    /// Size of a leaf in bytes.
    pub size: usize,

    /// Base-2 logarithm of the size.
    pub log_size: u32,
}

impl ArrayletLeafGeometry
{
    /// Geometry of a runtime without arraylets.
    pub const DISABLED: Self = Self{size: ARRAYLETS_DISABLED, log_size: 0};

    /// Whether arrays are always contiguous.
    pub fn is_disabled(&self) -> bool
    {
        self.size == ARRAYLETS_DISABLED
    }
}

/// Number of shards of a lock or list pool.
///
/// A forced split factor never changes.
/// Otherwise it only grows.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SplitFactor
{
    value: NonZeroUsize,
    forced: bool,
}

impl SplitFactor
{
    /// Split factor that is forced if a value is given.
    pub fn new(forced: Option<NonZeroUsize>) -> Self
    {
        match forced {
            Some(value) => Self{value, forced: true},
            None => Self{value: NonZeroUsize::ONE, forced: false},
        }
    }

    /// The current number of shards.
    pub fn get(self) -> NonZeroUsize
    {
        self.value
    }

    /// Whether the split factor was forced by the options.
    pub fn is_forced(self) -> bool
    {
        self.forced
    }

    /// Raise the split factor to at least the given amount.
    pub fn raise_to(&mut self, amount: NonZeroUsize)
    {
        if !self.forced {
            self.value = self.value.max(amount);
        }
    }
}

/// Process-wide state of the memory subsystem.
///
/// The state owns every subsystem the configuration creates.
/// Only the orchestration calls of [`Configuration`] mutate it,
/// all on the same thread.
///
/// [`Configuration`]: `crate::Configuration`
pub struct RuntimeState
{
    pub (crate) options: GcOptions,
    pub (crate) phase: LifecyclePhase,

    pub (crate) region_size: usize,
    pub (crate) arraylet_leaf: ArrayletLeafGeometry,
    pub (crate) compressed_references_shift: Option<u32>,
    pub (crate) object_alignment: Option<ObjectAlignment>,

    pub (crate) gc_thread_count: NonZeroUsize,
    pub (crate) packet_list_split: SplitFactor,
    pub (crate) cache_list_split: SplitFactor,
    pub (crate) split_free_list_amount: SplitFactor,
    pub (crate) scan_ordering: ScanOrdering,
    pub (crate) adaptive_gc_count_between_hot_field_sort: bool,
    pub (crate) excessive_gc_enabled: bool,

    pub (crate) memory_manager: Option<Box<dyn MemoryManager>>,
    pub (crate) region_manager: Option<Box<dyn RegionManager>>,
    pub (crate) heap: Option<Box<dyn Heap>>,
    pub (crate) collector: Option<Box<dyn Collector>>,
    pub (crate) dispatcher: Option<Box<dyn Dispatcher>>,
    pub (crate) allocation_manager: Option<Box<dyn AllocationManager>>,
    pub (crate) mark_map: Option<Box<dyn MarkMap>>,
    pub (crate) lock_pool: Option<Box<dyn LockPool>>,
    pub (crate) numa_manager: Box<dyn NumaManager>,
    pub (crate) numa_cached: bool,
}

impl RuntimeState
{
    /// Create the state for a machine with uniform memory access.
    pub fn new(options: GcOptions) -> Self
    {
        Self::with_numa_manager(options, Box::new(UniformMemory))
    }

    /// Create the state with the given NUMA manager.
    pub fn with_numa_manager(
        options: GcOptions,
        numa_manager: Box<dyn NumaManager>,
    ) -> Self
    {
        Self{
            phase: LifecyclePhase::Uninitialized,
            region_size: 0,
            arraylet_leaf: ArrayletLeafGeometry::DISABLED,
            compressed_references_shift: None,
            object_alignment: None,
            gc_thread_count: options.gc_thread_count.unwrap_or(NonZeroUsize::ONE),
            packet_list_split: SplitFactor::new(options.packet_list_split),
            cache_list_split: SplitFactor::new(options.cache_list_split),
            split_free_list_amount: SplitFactor::new(options.split_free_list_amount),
            scan_ordering: options.scavenger.scan_ordering,
            adaptive_gc_count_between_hot_field_sort: false,
            excessive_gc_enabled: options.excessive_gc_enabled.unwrap_or(false),
            memory_manager: None,
            region_manager: None,
            heap: None,
            collector: None,
            dispatcher: None,
            allocation_manager: None,
            mark_map: None,
            lock_pool: None,
            numa_manager,
            numa_cached: false,
            options,
        }
    }

    /// The subsystems that are currently alive.
    pub fn live_resources(&self) -> Resources
    {
        let mut live = Resources::empty();
        let default_memory_space = self.heap.as_ref()
            .map_or(false, |heap| heap.default_memory_space().is_some());
        live.set(Resources::DEFAULT_MEMORY_SPACE, default_memory_space);
        live.set(Resources::MARK_MAP,           self.mark_map.is_some());
        live.set(Resources::COLLECTOR,          self.collector.is_some());
        live.set(Resources::DISPATCHER,         self.dispatcher.is_some());
        live.set(Resources::ALLOCATION_MANAGER, self.allocation_manager.is_some());
        live.set(Resources::HEAP,               self.heap.is_some());
        live.set(Resources::MEMORY_MANAGER,     self.memory_manager.is_some());
        live.set(Resources::REGION_MANAGER,     self.region_manager.is_some());
        live.set(Resources::LOCK_POOL,          self.lock_pool.is_some());
        live.set(Resources::NUMA,               self.numa_cached);
        live
    }

    /// Attach the default memory space to the published heap.
    ///
    /// Gives the memory space back if no heap is published.
    pub fn default_memory_space_allocated(
        &mut self,
        memory_space: Box<dyn MemorySpace>,
    ) -> Result<(), Box<dyn MemorySpace>>
    {
        let Some(heap) = &mut self.heap else { return Err(memory_space) };
        heap.set_default_memory_space(memory_space);
        Ok(())
    }

    /// Install the collector, replacing any previous one.
    pub fn install_collector(&mut self, collector: Box<dyn Collector>)
    {
        self.collector = Some(collector);
    }

    /// Install the global allocation manager.
    pub fn install_allocation_manager(
        &mut self,
        allocation_manager: Box<dyn AllocationManager>,
    )
    {
        self.allocation_manager = Some(allocation_manager);
    }

    /// Install the mark map of the reference chain walker.
    pub fn install_mark_map(&mut self, mark_map: Box<dyn MarkMap>)
    {
        self.mark_map = Some(mark_map);
    }

    /// The options the state was created with.
    pub fn options(&self) -> &GcOptions
    {
        &self.options
    }

    /// How far heap creation got.
    pub fn phase(&self) -> LifecyclePhase
    {
        self.phase
    }

    /// The resolved region size, or zero before initialization.
    pub fn region_size(&self) -> usize
    {
        self.region_size
    }

    /// The resolved arraylet leaf geometry.
    pub fn arraylet_leaf(&self) -> ArrayletLeafGeometry
    {
        self.arraylet_leaf
    }

    /// The compressed reference shift,
    /// if compressed references are enabled and a heap was created.
    pub fn compressed_references_shift(&self) -> Option<u32>
    {
        self.compressed_references_shift
    }

    /// The object alignment derived during heap creation.
    pub fn object_alignment(&self) -> Option<ObjectAlignment>
    {
        self.object_alignment
    }

    /// Number of GC threads.
    pub fn gc_thread_count(&self) -> NonZeroUsize
    {
        self.gc_thread_count
    }

    /// Shards of the work packet lists.
    pub fn packet_list_split(&self) -> SplitFactor
    {
        self.packet_list_split
    }

    /// Shards of the scan cache lists.
    pub fn cache_list_split(&self) -> SplitFactor
    {
        self.cache_list_split
    }

    /// Shards of the free lists.
    pub fn split_free_list_amount(&self) -> SplitFactor
    {
        self.split_free_list_amount
    }

    /// Scan ordering of the scavenger.
    pub fn scan_ordering(&self) -> ScanOrdering
    {
        self.scan_ordering
    }

    /// Whether hot fields are resorted after an adaptive number of collections.
    pub fn adaptive_gc_count_between_hot_field_sort(&self) -> bool
    {
        self.adaptive_gc_count_between_hot_field_sort
    }

    /// Whether excessive GC is detected.
    pub fn excessive_gc_enabled(&self) -> bool
    {
        self.excessive_gc_enabled
    }

    /// The published heap.
    pub fn heap(&self) -> Option<&dyn Heap>
    {
        self.heap.as_deref()
    }

    /// The dispatcher, once created.
    pub fn dispatcher(&self) -> Option<&dyn Dispatcher>
    {
        self.dispatcher.as_deref()
    }
}

#[cfg(test)]
mod tests
{
    use {super::*, proptest::proptest};

    #[test]
    fn fresh_state_owns_nothing()
    {
        let state = RuntimeState::new(GcOptions::default());
        assert_eq!(state.live_resources(), Resources::empty());
        assert_eq!(state.phase(), LifecyclePhase::Uninitialized);
        assert!(state.arraylet_leaf().is_disabled());
        assert_eq!(state.gc_thread_count(), NonZeroUsize::ONE);
    }

    #[test]
    fn options_seed_the_state()
    {
        let options = GcOptions{
            gc_thread_count: NonZeroUsize::new(6),
            cache_list_split: NonZeroUsize::new(3),
            excessive_gc_enabled: Some(false),
            ..GcOptions::default()
        };
        let state = RuntimeState::new(options);
        assert_eq!(state.gc_thread_count().get(), 6);
        assert!(state.cache_list_split().is_forced());
        assert_eq!(state.cache_list_split().get().get(), 3);
        assert!(!state.packet_list_split().is_forced());
    }

    #[test]
    fn memory_space_needs_a_heap()
    {
        struct Space;
        impl MemorySpace for Space {}

        let mut state = RuntimeState::new(GcOptions::default());
        assert!(state.default_memory_space_allocated(Box::new(Space)).is_err());
    }

    #[test]
    fn retreat_never_advances()
    {
        let mut phase = LifecyclePhase::Uninitialized;
        phase.advance(LifecyclePhase::MemoryManagerReady);
        phase.retreat(LifecyclePhase::RegionManagerReady);
        assert_eq!(phase, LifecyclePhase::MemoryManagerReady);
        phase.advance(LifecyclePhase::DelegateAccepted);
        phase.retreat(LifecyclePhase::RegionManagerReady);
        assert_eq!(phase, LifecyclePhase::RegionManagerReady);
    }

    proptest!
    {
        #[test]
        fn split_factor_never_shrinks(amounts: Vec<usize>)
        {
            let mut split = SplitFactor::new(None);
            for amount in amounts.into_iter().filter_map(NonZeroUsize::new) {
                let before = split.get();
                split.raise_to(amount);
                assert!(split.get() >= before);
                assert!(split.get() >= amount);
            }
        }

        #[test]
        fn forced_split_factor_is_fixed(forced in 1usize .. 64, amounts: Vec<usize>)
        {
            let forced = NonZeroUsize::new(forced).unwrap();
            let mut split = SplitFactor::new(Some(forced));
            for amount in amounts.into_iter().filter_map(NonZeroUsize::new) {
                split.raise_to(amount);
            }
            assert_eq!(split.get(), forced);
        }
    }
}
