use serde::{Deserialize, Serialize};

/// Region size used when the options leave it unspecified.
pub const DEFAULT_REGION_SIZE: usize = 512 * 1024;

/// Constants that differ between runtimes built on this engine.
///
/// A policy is fixed when the [`Configuration`] is created
/// and never changes afterwards.
///
/// [`Configuration`]: `crate::Configuration`
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Policy
{
    /// Region size used when the options do not request one.
    pub default_region_size: usize,

    /// How large arraylet leaves are.
    pub default_arraylet_leaf: ArrayletLeaf,

    /// Allocation strategy of new environments.
    pub allocation_strategy: AllocationStrategy,

    /// What the heap is aligned to.
    pub alignment_basis: AlignmentBasis,

    /// Write barrier the mutator emits.
    pub write_barrier: WriteBarrier,

    /// Parts of the collector compiled into the runtime.
    pub features: Features,
}

impl Policy
{
    /// Read a policy from JSON.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> serde_json::Result<Self>
    {
        serde_json::from_str(json)
    }
}

impl Default for Policy
{
    fn default() -> Self
    {
        Self{
            default_region_size: DEFAULT_REGION_SIZE,
            default_arraylet_leaf: ArrayletLeaf::default(),
            allocation_strategy: AllocationStrategy::default(),
            alignment_basis: AlignmentBasis::default(),
            write_barrier: WriteBarrier::default(),
            features: Features::default(),
        }
    }
}

/// Size of the chunks that large arrays are split into.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayletLeaf
{
    /// Leaves are as large as regions.
    #[default]
    RegionSized,

    /// Leaves have this size, which must be a power of two.
    /// Zero means region-sized.
    Explicit(usize),

    /// Arrays are always contiguous.
    Disabled,
}

/// How environments allocate objects.
///
/// The two strategies are mutually exclusive;
/// every environment of a runtime uses the same one.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStrategy
{
    /// Bump allocation from thread-local heap buckets.
    #[default]
    ThreadLocalHeap,

    /// Allocation from per-size-class free lists.
    Segregated,
}

/// What heap sizes are rounded to.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentBasis
{
    /// The heap alignment from the options.
    #[default]
    Heap,

    /// The resolved region size.
    Region,
}

#[allow(missing_docs)]
/// Write barrier emitted by the mutator.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteBarrier
{
    #[default]
    None,
    Always,
    OldCheck,
    CardMark,
    CardMarkIncremental,
    CardMarkAndOldCheck,
    Snapshot,
}

/// Parts of the collector compiled into the runtime.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Features
{
    /// Whether thread-local heap allocation is available.
    pub thread_local_heap: bool,

    /// Whether segregated allocation is available.
    pub segregated_heap: bool,
}

impl Features
{
    /// Whether environments can use the given strategy.
    pub fn supports(&self, strategy: AllocationStrategy) -> bool
    {
        match strategy {
            AllocationStrategy::ThreadLocalHeap => self.thread_local_heap,
            AllocationStrategy::Segregated      => self.segregated_heap,
        }
    }
}

impl Default for Features
{
    fn default() -> Self
    {
        Self{thread_local_heap: true, segregated_heap: true}
    }
}
