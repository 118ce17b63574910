use {
    serde::{Deserialize, Serialize},
    std::num::NonZeroUsize,
};

/// Heap alignment used when the options do not request one.
pub const DEFAULT_HEAP_ALIGNMENT: usize = 1024;

/// Tunable inputs of the memory subsystem.
///
/// These are usually parsed from the command line of the runtime.
/// Fields that are [`None`] are derived during initialization.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct GcOptions
{
    /// Requested region size; zero selects the default of the policy.
    pub region_size: usize,

    /// Alignment of heap sizes; must be a power of two.
    pub heap_alignment: usize,

    /// Number of GC threads, if pinned.
    pub gc_thread_count: Option<NonZeroUsize>,

    /// Forced packet list split.
    pub packet_list_split: Option<NonZeroUsize>,

    /// Forced scan cache list split.
    pub cache_list_split: Option<NonZeroUsize>,

    /// Forced free list split.
    pub split_free_list_amount: Option<NonZeroUsize>,

    /// Copying young-generation collector.
    pub scavenger: Scavenger,

    /// Compressed reference addressing.
    pub compressed_references: CompressedReferences,

    /// The heap must start at or above this address.
    pub verify_heap_above: usize,

    /// The heap must end at or below this address.
    pub verify_heap_below: Option<usize>,

    /// Excessive GC detection, if the user asked for it explicitly.
    pub excessive_gc_enabled: Option<bool>,

    /// Whether the collector releases the dispatcher itself.
    pub collector_owns_dispatcher: bool,
}

impl GcOptions
{
    /// Read options from JSON.
    ///
    /// Missing fields take their default values.
    pub fn from_json(json: &str) -> serde_json::Result<Self>
    {
        serde_json::from_str(json)
    }
}

impl Default for GcOptions
{
    fn default() -> Self
    {
        Self{
            region_size: 0,
            heap_alignment: DEFAULT_HEAP_ALIGNMENT,
            gc_thread_count: None,
            packet_list_split: None,
            cache_list_split: None,
            split_free_list_amount: None,
            scavenger: Scavenger::default(),
            compressed_references: CompressedReferences::default(),
            verify_heap_above: 0,
            verify_heap_below: None,
            excessive_gc_enabled: None,
            collector_owns_dispatcher: false,
        }
    }
}

/// Settings of the copying young-generation collector.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Scavenger
{
    /// Whether the scavenger is active.
    pub enabled: bool,

    /// Order in which the scavenger copies objects.
    pub scan_ordering: ScanOrdering,
}

/// Order in which the scavenger copies objects.
#[allow(missing_docs)]
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanOrdering
{
    /// No ordering was chosen.
    #[default]
    None,
    BreadthFirst,
    DynamicBreadthFirst,
    Hierarchical,
}

/// Settings of compressed reference addressing.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct CompressedReferences
{
    /// Whether references are stored in 32 bits.
    pub enabled: bool,

    /// Whether the shift may be chosen to fit the heap.
    pub allow_shifting: bool,

    /// Shift to use regardless of the heap.
    pub forced_shift: Option<u32>,

    /// Raise the shift to the default even when a smaller one fits.
    pub force_default_shift_if_possible: bool,

    /// Whether shifts below the default are worth using.
    pub fine_shifts_beneficial: bool,
}

impl Default for CompressedReferences
{
    fn default() -> Self
    {
        Self{
            enabled: false,
            allow_shifting: true,
            forced_shift: None,
            force_default_shift_if_possible: false,
            fine_shifts_beneficial: cfg!(target_arch = "s390x"),
        }
    }
}
