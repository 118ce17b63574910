use {
    crate::{AllocationStrategy, Resources},
    std::fmt,
    thiserror::Error,
};

#[cfg(feature = "checkpoint-restore")]
use crate::ThreadId;

/// Error returned by the orchestration calls of a [`Configuration`].
///
/// Every error is returned only after the call that produced it
/// has destroyed whatever it created itself.
/// Whether the process can continue is up to the embedder;
/// [`is_fatal`][`Self::is_fatal`] tells which errors leave no sensible way on.
///
/// [`Configuration`]: `crate::Configuration`
#[derive(Debug, Error)]
pub enum Error
{
    /// The requested geometry cannot be realized.
    #[error("Infeasible configuration: {0}")]
    ConfigurationInfeasible(#[from] Infeasible),

    /// A subsystem could not be created.
    #[error("Could not allocate {0:?}")]
    AllocationFailure(Resources),

    /// A hook of the delegate refused to go on.
    #[error("The {hook} hook of the delegate failed: {source}")]
    DelegateRejected
    {
        /// The hook that failed.
        hook: DelegateHook,
        /// Why the hook failed.
        #[source]
        source: anyhow::Error,
    },

    /// The heap was reserved outside the diagnostic address range.
    #[error("Heap {base:#x}..{top:#x} lies outside the verified address range")]
    HeapOutOfRange
    {
        /// Lowest address of the heap.
        base: usize,
        /// Address just past the heap.
        top: usize,
    },

    /// The policy selects an allocation strategy the runtime lacks.
    #[error("Allocation strategy {0:?} is not available")]
    UnavailableStrategy(AllocationStrategy),

    /// Resuming a checkpointed process cannot continue.
    #[cfg(feature = "checkpoint-restore")]
    #[error("Restore aborted while reinitializing {stage}: {source}")]
    RestoreAborted
    {
        /// The step that failed.
        stage: RestoreStage,
        /// Why the step failed.
        #[source]
        source: anyhow::Error,
    },
}

impl Error
{
    /// Whether the process should not continue after this error.
    ///
    /// Allocation failures, delegate rejections, and heaps outside
    /// the verified range may be retried, for example with a smaller heap.
    /// The others describe a configuration that will never work,
    /// or a resumed process whose threads are in an unknown state.
    pub fn is_fatal(&self) -> bool
    {
        match self {
            Self::ConfigurationInfeasible(..) => true,
            Self::UnavailableStrategy(..)     => true,
            #[cfg(feature = "checkpoint-restore")]
            Self::RestoreAborted{..}          => true,
            Self::AllocationFailure(..)       => false,
            Self::DelegateRejected{..}        => false,
            Self::HeapOutOfRange{..}          => false,
        }
    }
}

/// Geometry that cannot be realized.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum Infeasible
{
    #[error("Region size {0} is not a power of two")]
    RegionSize(usize),

    #[error("Region size {size} is outside {minimum}..={maximum} \
             or smaller than the heap alignment {heap_alignment}")]
    RegionSizeOutOfRange
    {
        size: usize,
        minimum: usize,
        maximum: usize,
        heap_alignment: usize,
    },

    #[error("Heap alignment {0} is not a power of two")]
    HeapAlignment(usize),

    #[error("Arraylet leaf size {0} is not a power of two")]
    ArrayletLeafSize(usize),

    #[error("Heap top {heap_top:#x} cannot be addressed \
             by compressed references with shift {shift}")]
    HeapAboveShiftCeiling{heap_top: usize, shift: u32},
}

/// Hooks of the delegate that can refuse to go on.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DelegateHook
{
    Initialize,
    EnvironmentInitialized,
    HeapInitialized,
}

impl fmt::Display for DelegateHook
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        let name = match self {
            Self::Initialize             => "initialize",
            Self::EnvironmentInitialized => "environment initialized",
            Self::HeapInitialized        => "heap initialized",
        };
        write!(f, "{name}")
    }
}

/// The step of a restore that failed.
#[cfg(feature = "checkpoint-restore")]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RestoreStage
{
    /// The restore hook of the delegate.
    Delegate,

    /// The environment of a thread.
    Thread(ThreadId),
}

#[cfg(feature = "checkpoint-restore")]
impl fmt::Display for RestoreStage
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result
    {
        match self {
            Self::Delegate       => write!(f, "the delegate"),
            Self::Thread(thread) => write!(f, "thread {}", thread.0),
        }
    }
}
