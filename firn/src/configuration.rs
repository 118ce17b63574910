use {
    crate::{
        Delegate, DelegateHook, Error, Heap, Host, Infeasible,
        InitializationParameters, LifecyclePhase, ObjectModel, OsHost, Policy,
        Resources, RuntimeState, SizingInputs, StandardObjectModel, Subsystems,
        AlignmentBasis, geometry, shift, sizing, util::FormattedSize,
    },
    scope_exit::{ScopeGuard, guard},
    std::mem,
};

/// Decides how the memory subsystem of a runtime is laid out,
/// and creates and destroys its subsystems in the right order.
///
/// The configuration itself holds only the policy and collaborators.
/// Everything it creates is stored in a [`RuntimeState`],
/// which is passed to every orchestration call.
pub struct Configuration
{
    pub (crate) policy: Policy,
    pub (crate) delegate: Box<dyn Delegate>,
    pub (crate) subsystems: Box<dyn Subsystems>,
    pub (crate) host: Box<dyn Host>,
    pub (crate) object_model: Box<dyn ObjectModel>,
}

impl Configuration
{
    /// Create a configuration for the host operating system.
    pub fn new(
        policy: Policy,
        delegate: Box<dyn Delegate>,
        subsystems: Box<dyn Subsystems>,
    ) -> Self
    {
        Self{
            policy,
            delegate,
            subsystems,
            host: Box::new(OsHost),
            object_model: Box::new(StandardObjectModel::default()),
        }
    }

    /// Replace the host queried for the processor count.
    pub fn with_host(mut self, host: Box<dyn Host>) -> Self
    {
        self.host = host;
        self
    }

    /// Replace the object model that derives object alignment.
    pub fn with_object_model(mut self, object_model: Box<dyn ObjectModel>) -> Self
    {
        self.object_model = object_model;
        self
    }

    /// The policy of this configuration.
    pub fn policy(&self) -> &Policy
    {
        &self.policy
    }

    /// The unit that heap and old space sizes are multiples of.
    pub fn alignment(&self, state: &RuntimeState) -> usize
    {
        match self.policy.alignment_basis {
            AlignmentBasis::Heap   => state.options.heap_alignment,
            AlignmentBasis::Region => state.region_size,
        }
    }

    /* ---------------------------------------------------------------------- */
    /*                             Initialization                             */
    /* ---------------------------------------------------------------------- */

    /// Resolve the geometry and tuning of the memory subsystem.
    ///
    /// This must be called once, before [`create_heap`][`Self::create_heap`].
    /// On failure, call [`tear_down`][`Self::tear_down`]
    /// to release what was created so far.
    pub fn initialize(&mut self, state: &mut RuntimeState) -> Result<(), Error>
    {
        let region_size = geometry::resolve_region_size(
            state.options.region_size,
            self.policy.default_region_size,
            state.options.heap_alignment,
        ).map_err(infeasible)?;
        state.region_size = region_size;

        let arraylet_leaf = geometry::resolve_arraylet_leaf(
            self.policy.default_arraylet_leaf,
            region_size,
        ).map_err(infeasible)?;
        state.arraylet_leaf = arraylet_leaf;

        if arraylet_leaf.is_disabled() {
            log::info!(target: "gc", "Region size {}, arraylets disabled",
                       FormattedSize(region_size));
        } else {
            log::info!(target: "gc", "Region size {}, arraylet leaf size {}",
                       FormattedSize(region_size), FormattedSize(arraylet_leaf.size));
        }

        self.delegate.initialize(
            state,
            self.policy.write_barrier,
            self.policy.allocation_strategy,
        ).map_err(|source| delegate_rejected(DelegateHook::Initialize, source))?;

        state.excessive_gc_enabled =
            state.options.excessive_gc_enabled.unwrap_or(true);

        // Teardown shuts NUMA support down even if recaching failed.
        state.numa_cached = true;
        if !state.numa_manager.recache_numa_support() {
            return Err(allocation_failure(Resources::NUMA));
        }

        self.initialize_gc_thread_count(state);
        self.initialize_gc_parameters(state);

        let lock_pool = self.subsystems.new_lock_pool()
            .ok_or_else(|| allocation_failure(Resources::LOCK_POOL))?;
        state.lock_pool = Some(lock_pool);

        Ok(())
    }

    /* ---------------------------------------------------------------------- */
    /*                              Heap creation                             */
    /* ---------------------------------------------------------------------- */

    /// Create the heap and publish it in the runtime state.
    ///
    /// The memory and region managers are created if they do not exist yet.
    /// They are kept when a later step fails;
    /// everything else this call created is destroyed before it returns.
    /// Must not be called while a heap is published.
    pub fn create_heap<'s>(
        &mut self,
        state: &'s mut RuntimeState,
        bytes_requested: usize,
    ) -> Result<&'s dyn Heap, Error>
    {
        debug_assert!(state.heap.is_none(), "Heap is already published");

        let subsystems = &mut self.subsystems;

        ensure(&mut state.memory_manager, Resources::MEMORY_MANAGER,
               || subsystems.new_memory_manager())?;
        state.phase.advance(LifecyclePhase::MemoryManagerReady);

        let region_size = state.region_size;
        let region_manager = ensure(
            &mut state.region_manager, Resources::REGION_MANAGER,
            || subsystems.new_region_manager(region_size),
        )?;
        state.phase.advance(LifecyclePhase::RegionManagerReady);

        let mut heap = subsystems.new_heap(bytes_requested, region_manager)
            .ok_or_else(|| allocation_failure(Resources::HEAP))?;
        state.phase.advance(LifecyclePhase::HeapAllocated);

        // From here on, failures return to the phase before the heap.
        let mut state = guard(state, |state| {
            log::debug!(target: "gc", "Unwinding heap creation");
            state.phase.retreat(LifecyclePhase::RegionManagerReady);
        });

        let region_manager = state.region_manager.as_deref_mut()
            .expect("Region manager was created above");
        if !heap.attach_region_manager(region_manager) {
            log::warn!(target: "gc", "Heap cannot be attached to the region manager");
            return Err(allocation_failure(Resources::HEAP));
        }
        state.phase.advance(LifecyclePhase::HeapBound);

        self.resolve_object_alignment(&mut state, &*heap)?;
        state.phase.advance(LifecyclePhase::AlignmentResolved);

        let base = heap.heap_base();
        let top = heap.heap_top();
        let maximum = heap.maximum_memory_size();

        // Once published, failures also withdraw the heap.
        state.heap = Some(heap);
        let mut published = guard(&mut **state, |state| state.heap = None);

        self.delegate.heap_initialized(&published)
            .map_err(|source| delegate_rejected(DelegateHook::HeapInitialized, source))?;
        published.phase.advance(LifecyclePhase::DelegateAccepted);

        let options = &published.options;
        let below = options.verify_heap_below.map_or(true, |below| top <= below);
        if base < options.verify_heap_above || !below {
            log::warn!(target: "gc", "Heap {base:#x}..{top:#x} is outside the verified range");
            return Err(Error::HeapOutOfRange{base, top});
        }
        published.phase.advance(LifecyclePhase::Active);

        log::info!(target: "gc", "Heap {base:#x}..{top:#x}, maximum size {}",
                   FormattedSize(maximum));

        ScopeGuard::defuse(published);
        let state: &'s mut RuntimeState = ScopeGuard::defuse(state);
        let state: &'s RuntimeState = state;
        Ok(state.heap().expect("Heap was published above"))
    }

    /// Derive the compressed reference shift and the object alignment.
    fn resolve_object_alignment(&mut self, state: &mut RuntimeState, heap: &dyn Heap)
        -> Result<(), Error>
    {
        let compressed_references = state.options.compressed_references;
        let shift = if compressed_references.enabled {
            let shift = shift::resolve_shift(heap.heap_top(), &compressed_references)
                .map_err(infeasible)?;
            log::info!(target: "gc", "Compressed reference shift {shift}");
            Some(shift)
        } else {
            None
        };
        state.compressed_references_shift = shift;
        state.object_alignment = Some(self.object_model.set_object_alignment(shift));
        Ok(())
    }

    /// Derive the bounds of the generational spaces from the published heap.
    ///
    /// # Panics
    ///
    /// If no heap is published.
    pub fn prepare_parameters(&self, state: &RuntimeState, inputs: &SizingInputs)
        -> InitializationParameters
    {
        let heap = state.heap()
            .expect("Generational spaces are sized after the heap is created");
        sizing::prepare_parameters(
            self.alignment(state),
            heap.maximum_memory_size(),
            inputs,
        )
    }

    /* ---------------------------------------------------------------------- */
    /*                              Other subsystems                          */
    /* ---------------------------------------------------------------------- */

    /// Create the dispatcher for the derived number of GC threads.
    pub fn create_dispatcher(&mut self, state: &mut RuntimeState, stack_size: usize)
        -> Result<(), Error>
    {
        let dispatcher = self.subsystems
            .new_dispatcher(state.gc_thread_count, stack_size)
            .ok_or_else(|| allocation_failure(Resources::DISPATCHER))?;
        state.dispatcher = Some(dispatcher);
        Ok(())
    }

    /* ---------------------------------------------------------------------- */
    /*                                Teardown                                */
    /* ---------------------------------------------------------------------- */

    /// Destroy the collector.
    ///
    /// If the collector owns the dispatcher, the dispatcher goes with it.
    pub fn destroy_collectors(&mut self, state: &mut RuntimeState) -> Resources
    {
        destroy_collector(state)
    }

    /// Destroy every subsystem in the runtime state.
    ///
    /// Returns what was destroyed.
    /// Tearing down a torn down state does nothing.
    /// Must not be called while a collection is in progress.
    pub fn tear_down(&mut self, state: &mut RuntimeState) -> Resources
    {
        if state.phase == LifecyclePhase::TornDown {
            log::debug!(target: "gc", "Memory subsystem is already torn down");
            return Resources::empty();
        }

        let mut destroyed = Resources::empty();
        for (resource, destroy) in TEAR_DOWN {
            let released = destroy(state);
            log::debug!(target: "gc", "Tear down {resource:?}: released {released:?}");
            destroyed |= released;
        }

        self.delegate.tear_down();
        state.phase.advance(LifecyclePhase::TornDown);

        log::info!(target: "gc", "Memory subsystem torn down, released {destroyed:?}");
        destroyed
    }

    /// Tear down the runtime state and destroy the configuration.
    pub fn kill(mut self, state: &mut RuntimeState) -> Resources
    {
        self.tear_down(state)
    }
}

/// Store a lazily created subsystem in its slot.
fn ensure<T>(
    slot: &mut Option<Box<T>>,
    resource: Resources,
    create: impl FnOnce() -> Option<Box<T>>,
) -> Result<&mut T, Error>
    where T: ?Sized
{
    let value = match slot.take() {
        Some(value) => value,
        None => create().ok_or_else(|| allocation_failure(resource))?,
    };
    Ok(&mut **slot.insert(value))
}

fn allocation_failure(resource: Resources) -> Error
{
    log::warn!(target: "gc", "Could not allocate {resource:?}");
    Error::AllocationFailure(resource)
}

fn delegate_rejected(hook: DelegateHook, source: anyhow::Error) -> Error
{
    log::warn!(target: "gc", "The {hook} hook of the delegate failed: {source}");
    Error::DelegateRejected{hook, source}
}

fn infeasible(infeasible: Infeasible) -> Error
{
    log::warn!(target: "gc", "Infeasible configuration: {infeasible}");
    Error::ConfigurationInfeasible(infeasible)
}

/* -------------------------------------------------------------------------- */
/*                               Teardown steps                               */
/* -------------------------------------------------------------------------- */

type Destructor = fn(&mut RuntimeState) -> Resources;

/// Teardown steps, in the order they must run.
const TEAR_DOWN: [(Resources, Destructor); 10] = [
    (Resources::DEFAULT_MEMORY_SPACE, destroy_default_memory_space),
    (Resources::MARK_MAP,             destroy_mark_map),
    (Resources::COLLECTOR,            destroy_collector),
    (Resources::DISPATCHER,           destroy_dispatcher),
    (Resources::ALLOCATION_MANAGER,   destroy_allocation_manager),
    (Resources::HEAP,                 destroy_heap),
    (Resources::MEMORY_MANAGER,       destroy_memory_manager),
    (Resources::REGION_MANAGER,       destroy_region_manager),
    (Resources::LOCK_POOL,            destroy_lock_pool),
    (Resources::NUMA,                 shutdown_numa),
];

fn released<T: ?Sized>(resource: Resources, slot: &mut Option<Box<T>>) -> Resources
{
    match slot.take() {
        Some(value) => { drop(value); resource },
        None => Resources::empty(),
    }
}

fn destroy_default_memory_space(state: &mut RuntimeState) -> Resources
{
    let mut memory_space = state.heap.as_mut()
        .and_then(|heap| heap.take_default_memory_space());
    released(Resources::DEFAULT_MEMORY_SPACE, &mut memory_space)
}

fn destroy_mark_map(state: &mut RuntimeState) -> Resources
{
    released(Resources::MARK_MAP, &mut state.mark_map)
}

fn destroy_collector(state: &mut RuntimeState) -> Resources
{
    let mut destroyed = released(Resources::COLLECTOR, &mut state.collector);
    if state.options.collector_owns_dispatcher && !destroyed.is_empty() {
        destroyed |= released(Resources::DISPATCHER, &mut state.dispatcher);
    }
    destroyed
}

// A dispatcher owned by the collector is already gone, unless there was no collector.
fn destroy_dispatcher(state: &mut RuntimeState) -> Resources
{
    released(Resources::DISPATCHER, &mut state.dispatcher)
}

fn destroy_allocation_manager(state: &mut RuntimeState) -> Resources
{
    released(Resources::ALLOCATION_MANAGER, &mut state.allocation_manager)
}

fn destroy_heap(state: &mut RuntimeState) -> Resources
{
    released(Resources::HEAP, &mut state.heap)
}

fn destroy_memory_manager(state: &mut RuntimeState) -> Resources
{
    released(Resources::MEMORY_MANAGER, &mut state.memory_manager)
}

fn destroy_region_manager(state: &mut RuntimeState) -> Resources
{
    released(Resources::REGION_MANAGER, &mut state.region_manager)
}

fn destroy_lock_pool(state: &mut RuntimeState) -> Resources
{
    released(Resources::LOCK_POOL, &mut state.lock_pool)
}

fn shutdown_numa(state: &mut RuntimeState) -> Resources
{
    if !mem::take(&mut state.numa_cached) {
        return Resources::empty();
    }
    state.numa_manager.shutdown_numa_support();
    Resources::NUMA
}
