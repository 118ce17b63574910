//! Collaborators that record what happens to them.

use {
    crate::*,
    std::{cell::{Cell, RefCell}, num::NonZeroUsize, rc::Rc},
};

/// Events recorded by fake collaborators, in order.
#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<Vec<String>>>);

impl Log
{
    pub fn push(&self, event: impl Into<String>)
    {
        self.0.borrow_mut().push(event.into());
    }

    pub fn events(&self) -> Vec<String>
    {
        self.0.borrow().clone()
    }

    /// Events recorded since the last call to this method.
    pub fn drain(&self) -> Vec<String>
    {
        self.0.borrow_mut().drain(..).collect()
    }
}

/// Logs its creation and its destruction.
pub struct Tracked
{
    name: &'static str,
    log: Log,
}

impl Tracked
{
    pub fn new(name: &'static str, log: &Log) -> Self
    {
        log.push(format!("new {name}"));
        Self{name, log: log.clone()}
    }
}

impl Drop for Tracked
{
    fn drop(&mut self)
    {
        self.log.push(format!("drop {}", self.name));
    }
}

impl AllocationManager for Tracked {}
impl Collector         for Tracked {}
impl LockPool          for Tracked {}
impl MarkMap           for Tracked {}
impl MemoryManager     for Tracked {}
impl MemorySpace       for Tracked {}
impl RegionManager     for Tracked {}

pub struct FakeHeap
{
    _tracked: Tracked,
    base: usize,
    top: usize,
    maximum: usize,
    attaches: bool,
    memory_space: Option<Box<dyn MemorySpace>>,
}

impl Heap for FakeHeap
{
    fn heap_base(&self) -> usize { self.base }
    fn heap_top(&self) -> usize { self.top }
    fn maximum_memory_size(&self) -> usize { self.maximum }

    fn attach_region_manager(&mut self, _: &mut dyn RegionManager) -> bool
    {
        self.attaches
    }

    fn default_memory_space(&self) -> Option<&dyn MemorySpace>
    {
        self.memory_space.as_deref()
    }

    fn set_default_memory_space(&mut self, memory_space: Box<dyn MemorySpace>)
    {
        self.memory_space = Some(memory_space);
    }

    fn take_default_memory_space(&mut self) -> Option<Box<dyn MemorySpace>>
    {
        self.memory_space.take()
    }
}

pub struct FakeDispatcher
{
    _tracked: Tracked,
    maximum: usize,
}

impl Dispatcher for FakeDispatcher
{
    fn thread_count_maximum(&self) -> usize
    {
        self.maximum
    }
}

pub struct FakeAllocation
{
    _tracked: Tracked,
    thread: ThreadId,
    restore_fails: bool,
    log: Log,
}

impl AllocationInterface for FakeAllocation
{
    fn reinitialize_for_restore(&mut self) -> anyhow::Result<()>
    {
        self.log.push(format!("restore thread {}", self.thread));
        if self.restore_fails {
            anyhow::bail!("Thread {} cannot resume", self.thread);
        }
        Ok(())
    }
}

/// Which subsystems cannot be created.
#[derive(Clone, Copy, Default)]
pub struct Failures
{
    pub memory_manager: bool,
    pub region_manager: bool,
    pub heap: bool,
    pub attach: bool,
    pub lock_pool: bool,
    pub dispatcher: bool,
    pub allocation_interface: bool,
    pub restore_thread: Option<ThreadId>,
}

pub struct FakeSubsystems
{
    pub log: Log,
    pub heap_base: usize,
    pub heap_top: usize,
    pub heap_maximum: usize,
    pub dispatcher_maximum: usize,
    pub failures: Failures,
}

impl Subsystems for FakeSubsystems
{
    fn new_memory_manager(&mut self) -> Option<Box<dyn MemoryManager>>
    {
        if self.failures.memory_manager { return None; }
        Some(Box::new(Tracked::new("memory manager", &self.log)))
    }

    fn new_region_manager(&mut self, _: usize) -> Option<Box<dyn RegionManager>>
    {
        if self.failures.region_manager { return None; }
        Some(Box::new(Tracked::new("region manager", &self.log)))
    }

    fn new_heap(&mut self, bytes_requested: usize, _: &mut dyn RegionManager)
        -> Option<Box<dyn Heap>>
    {
        if self.failures.heap { return None; }
        Some(Box::new(FakeHeap{
            _tracked: Tracked::new("heap", &self.log),
            base: self.heap_base,
            top: self.heap_top,
            maximum: self.heap_maximum.min(bytes_requested),
            attaches: !self.failures.attach,
            memory_space: None,
        }))
    }

    fn new_lock_pool(&mut self) -> Option<Box<dyn LockPool>>
    {
        if self.failures.lock_pool { return None; }
        Some(Box::new(Tracked::new("lock pool", &self.log)))
    }

    fn new_dispatcher(&mut self, thread_count: NonZeroUsize, _: usize)
        -> Option<Box<dyn Dispatcher>>
    {
        if self.failures.dispatcher { return None; }
        Some(Box::new(FakeDispatcher{
            _tracked: Tracked::new("dispatcher", &self.log),
            maximum: self.dispatcher_maximum.max(thread_count.get()),
        }))
    }

    fn new_allocation_interface(&mut self, _: AllocationStrategy, thread: ThreadId)
        -> Option<Box<dyn AllocationInterface>>
    {
        if self.failures.allocation_interface { return None; }
        Some(Box::new(FakeAllocation{
            _tracked: Tracked::new("allocation interface", &self.log),
            thread,
            restore_fails: self.failures.restore_thread == Some(thread),
            log: self.log.clone(),
        }))
    }
}

pub struct FakeDelegate
{
    pub log: Log,
    pub max_gc_threads: NonZeroUsize,
    pub rejects: Option<DelegateHook>,
    pub restore_fails: bool,
}

impl FakeDelegate
{
    fn hook(&self, hook: DelegateHook) -> anyhow::Result<()>
    {
        self.log.push(format!("delegate {hook}"));
        if self.rejects == Some(hook) {
            anyhow::bail!("Rejected {hook}");
        }
        Ok(())
    }
}

impl Delegate for FakeDelegate
{
    fn initialize(&mut self, _: &RuntimeState, _: WriteBarrier, _: AllocationStrategy)
        -> anyhow::Result<()>
    {
        self.hook(DelegateHook::Initialize)
    }

    fn environment_initialized(&mut self, _: &mut Environment) -> anyhow::Result<()>
    {
        self.hook(DelegateHook::EnvironmentInitialized)
    }

    fn heap_initialized(&mut self, state: &RuntimeState) -> anyhow::Result<()>
    {
        assert!(state.heap().is_some());
        self.hook(DelegateHook::HeapInitialized)
    }

    fn max_gc_thread_count(&self) -> NonZeroUsize
    {
        self.max_gc_threads
    }

    fn reinitialize_for_restore(&mut self, _: &RuntimeState) -> anyhow::Result<()>
    {
        self.log.push("delegate restore");
        if self.restore_fails {
            anyhow::bail!("Delegate cannot resume");
        }
        Ok(())
    }

    fn tear_down(&mut self)
    {
        self.log.push("delegate tear down");
    }
}

pub struct FakeHost
{
    pub cpus: Rc<Cell<usize>>,
}

impl Host for FakeHost
{
    fn cpu_count(&self) -> NonZeroUsize
    {
        NonZeroUsize::new(self.cpus.get()).unwrap()
    }
}

pub struct FakeNuma
{
    log: Log,
    recaches: bool,
}

impl NumaManager for FakeNuma
{
    fn recache_numa_support(&mut self) -> bool
    {
        self.log.push("numa recache");
        self.recaches
    }

    fn shutdown_numa_support(&mut self)
    {
        self.log.push("numa shutdown");
    }
}

/// Builds a configuration and runtime state from fakes.
pub struct Harness
{
    pub log: Log,
    pub policy: Policy,
    pub options: GcOptions,
    pub failures: Failures,
    pub heap_base: usize,
    pub heap_top: usize,
    pub heap_maximum: usize,
    pub dispatcher_maximum: usize,
    pub max_gc_threads: usize,
    pub rejects: Option<DelegateHook>,
    pub delegate_restore_fails: bool,
    pub numa_recaches: bool,
    pub cpus: Rc<Cell<usize>>,
}

impl Harness
{
    pub fn new() -> Self
    {
        Self{
            log: Log::default(),
            policy: Policy::default(),
            options: GcOptions::default(),
            failures: Failures::default(),
            heap_base: 1 << 30,
            heap_top: 2 << 30,
            heap_maximum: 1 << 30,
            dispatcher_maximum: 0,
            max_gc_threads: 64,
            rejects: None,
            delegate_restore_fails: false,
            numa_recaches: true,
            cpus: Rc::new(Cell::new(8)),
        }
    }

    pub fn build(self) -> (Configuration, RuntimeState, Log)
    {
        let subsystems = FakeSubsystems{
            log: self.log.clone(),
            heap_base: self.heap_base,
            heap_top: self.heap_top,
            heap_maximum: self.heap_maximum,
            dispatcher_maximum: self.dispatcher_maximum,
            failures: self.failures,
        };
        let delegate = FakeDelegate{
            log: self.log.clone(),
            max_gc_threads: NonZeroUsize::new(self.max_gc_threads).unwrap(),
            rejects: self.rejects,
            restore_fails: self.delegate_restore_fails,
        };
        let numa = FakeNuma{log: self.log.clone(), recaches: self.numa_recaches};

        let configuration =
            Configuration::new(self.policy, Box::new(delegate), Box::new(subsystems))
            .with_host(Box::new(FakeHost{cpus: self.cpus}));
        let state = RuntimeState::with_numa_manager(self.options, Box::new(numa));
        (configuration, state, self.log)
    }
}
