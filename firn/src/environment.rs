use {
    crate::{
        AllocationInterface, AllocationStrategy, Configuration, DelegateHook,
        Error, Resources,
    },
    std::fmt,
};

/// Identifies a mutator thread.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ThreadId(pub u64);

impl fmt::Display for ThreadId
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        write!(f, "{}", self.0)
    }
}

/// Per-thread context of the memory subsystem.
///
/// An environment is created when a thread attaches to the runtime
/// and dropped when it detaches.
pub struct Environment
{
    thread: ThreadId,
    strategy: AllocationStrategy,
    allocation: Box<dyn AllocationInterface>,
}

impl Environment
{
    /// The thread this environment belongs to.
    pub fn thread(&self) -> ThreadId
    {
        self.thread
    }

    /// How the thread allocates objects.
    pub fn allocation_strategy(&self) -> AllocationStrategy
    {
        self.strategy
    }

    /// The allocation interface of the thread.
    pub fn allocation_interface(&mut self) -> &mut dyn AllocationInterface
    {
        &mut *self.allocation
    }

    #[cfg(feature = "checkpoint-restore")]
    pub (crate) fn reinitialize_for_restore(&mut self) -> anyhow::Result<()>
    {
        self.allocation.reinitialize_for_restore()
    }
}

impl Configuration
{
    /// Create the environment of a thread that attaches to the runtime.
    ///
    /// The environment uses the allocation strategy of the policy.
    pub fn create_environment(&mut self, thread: ThreadId)
        -> Result<Environment, Error>
    {
        let strategy = self.policy.allocation_strategy;
        if !self.policy.features.supports(strategy) {
            log::warn!(target: "gc", "Allocation strategy {strategy:?} is unavailable");
            return Err(Error::UnavailableStrategy(strategy));
        }

        let allocation = self.subsystems.new_allocation_interface(strategy, thread)
            .ok_or_else(|| {
                log::warn!(target: "gc", "Cannot allocate environment of thread {thread}");
                Error::AllocationFailure(Resources::ALLOCATION_INTERFACE)
            })?;

        let mut environment = Environment{thread, strategy, allocation};

        self.delegate.environment_initialized(&mut environment)
            .map_err(|source| {
                log::warn!(target: "gc", "Environment of thread {thread} rejected: {source}");
                Error::DelegateRejected{hook: DelegateHook::EnvironmentInitialized, source}
            })?;

        Ok(environment)
    }
}
