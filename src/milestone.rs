//! Milestone kinds for the phases of a sequence-clustering pipeline.

use std::fmt;

use serde::{Serialize, Serializer};

/// A named phase of the host computation with a start/end boundary.
///
/// The set covers program lifecycle, FASTA I/O, distance-matrix computation,
/// tree construction, clustering, alignment, parallel regions, memory events,
/// and five user-defined slots. Each kind maps to a stable display name used
/// in every output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum MilestoneKind {
    // Program lifecycle
    ProgramStart = 0,
    ProgramEnd,
    OptionParsing,
    Initialization,
    Cleanup,

    // File I/O
    FastaLoadStart,
    FastaLoadEnd,
    FastaParse,
    TaxonomyLoad,
    OutputWrite,

    // Distance matrix computation
    DistanceMatrixStart,
    DistanceMatrixEnd,
    DistanceCalculation,
    DistanceThreadSection,
    DistanceAverageCalc,

    // Tree construction
    TreeConstructionStart,
    TreeConstructionEnd,
    TreeNodeCreation,
    TreeBranchLengthCalc,

    // Clustering
    ClusteringStart,
    ClusteringEnd,
    ClusteringIteration,
    ClusterAssignment,
    ClusterCentroidUpdate,
    ClusterConvergenceCheck,
    ClusterInitialization,

    // Alignment
    AlignmentStart,
    AlignmentEnd,
    KalignExecution,
    Wfa2Execution,
    NeedlemanWunsch,
    SequenceAlignment,
    MsaConstruction,

    // Parallel regions
    ParallelRegionStart,
    ParallelRegionEnd,
    ThreadSpawn,
    ThreadJoin,
    ThreadBarrier,

    // Memory events
    MemoryAlloc,
    MemoryFree,
    MemoryRealloc,
    LargeAllocation,

    // User-defined slots
    User1,
    User2,
    User3,
    User4,
    User5,
}

impl MilestoneKind {
    /// Number of milestone kinds.
    pub const COUNT: usize = 47;

    /// Every kind, in index order.
    pub const ALL: [MilestoneKind; Self::COUNT] = [
        MilestoneKind::ProgramStart,
        MilestoneKind::ProgramEnd,
        MilestoneKind::OptionParsing,
        MilestoneKind::Initialization,
        MilestoneKind::Cleanup,
        MilestoneKind::FastaLoadStart,
        MilestoneKind::FastaLoadEnd,
        MilestoneKind::FastaParse,
        MilestoneKind::TaxonomyLoad,
        MilestoneKind::OutputWrite,
        MilestoneKind::DistanceMatrixStart,
        MilestoneKind::DistanceMatrixEnd,
        MilestoneKind::DistanceCalculation,
        MilestoneKind::DistanceThreadSection,
        MilestoneKind::DistanceAverageCalc,
        MilestoneKind::TreeConstructionStart,
        MilestoneKind::TreeConstructionEnd,
        MilestoneKind::TreeNodeCreation,
        MilestoneKind::TreeBranchLengthCalc,
        MilestoneKind::ClusteringStart,
        MilestoneKind::ClusteringEnd,
        MilestoneKind::ClusteringIteration,
        MilestoneKind::ClusterAssignment,
        MilestoneKind::ClusterCentroidUpdate,
        MilestoneKind::ClusterConvergenceCheck,
        MilestoneKind::ClusterInitialization,
        MilestoneKind::AlignmentStart,
        MilestoneKind::AlignmentEnd,
        MilestoneKind::KalignExecution,
        MilestoneKind::Wfa2Execution,
        MilestoneKind::NeedlemanWunsch,
        MilestoneKind::SequenceAlignment,
        MilestoneKind::MsaConstruction,
        MilestoneKind::ParallelRegionStart,
        MilestoneKind::ParallelRegionEnd,
        MilestoneKind::ThreadSpawn,
        MilestoneKind::ThreadJoin,
        MilestoneKind::ThreadBarrier,
        MilestoneKind::MemoryAlloc,
        MilestoneKind::MemoryFree,
        MilestoneKind::MemoryRealloc,
        MilestoneKind::LargeAllocation,
        MilestoneKind::User1,
        MilestoneKind::User2,
        MilestoneKind::User3,
        MilestoneKind::User4,
        MilestoneKind::User5,
    ];

    /// Dense index of this kind, always `< MilestoneKind::COUNT`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Look up a kind by its dense index.
    pub fn from_index(index: usize) -> Option<MilestoneKind> {
        Self::ALL.get(index).copied()
    }

    /// Stable display name used in CSV, TSV, JSON and human output.
    pub fn name(self) -> &'static str {
        match self {
            MilestoneKind::ProgramStart => "PROGRAM_START",
            MilestoneKind::ProgramEnd => "PROGRAM_END",
            MilestoneKind::OptionParsing => "OPTION_PARSING",
            MilestoneKind::Initialization => "INITIALIZATION",
            MilestoneKind::Cleanup => "CLEANUP",
            MilestoneKind::FastaLoadStart => "FASTA_LOAD_START",
            MilestoneKind::FastaLoadEnd => "FASTA_LOAD_END",
            MilestoneKind::FastaParse => "FASTA_PARSE",
            MilestoneKind::TaxonomyLoad => "TAXONOMY_LOAD",
            MilestoneKind::OutputWrite => "OUTPUT_WRITE",
            MilestoneKind::DistanceMatrixStart => "DISTANCE_MATRIX_START",
            MilestoneKind::DistanceMatrixEnd => "DISTANCE_MATRIX_END",
            MilestoneKind::DistanceCalculation => "DISTANCE_CALCULATION",
            MilestoneKind::DistanceThreadSection => "DISTANCE_THREAD_SECTION",
            MilestoneKind::DistanceAverageCalc => "DISTANCE_AVERAGE_CALC",
            MilestoneKind::TreeConstructionStart => "TREE_CONSTRUCTION_START",
            MilestoneKind::TreeConstructionEnd => "TREE_CONSTRUCTION_END",
            MilestoneKind::TreeNodeCreation => "TREE_NODE_CREATION",
            MilestoneKind::TreeBranchLengthCalc => "TREE_BRANCH_LENGTH_CALC",
            MilestoneKind::ClusteringStart => "CLUSTERING_START",
            MilestoneKind::ClusteringEnd => "CLUSTERING_END",
            MilestoneKind::ClusteringIteration => "CLUSTERING_ITERATION",
            MilestoneKind::ClusterAssignment => "CLUSTER_ASSIGNMENT",
            MilestoneKind::ClusterCentroidUpdate => "CLUSTER_CENTROID_UPDATE",
            MilestoneKind::ClusterConvergenceCheck => "CLUSTER_CONVERGENCE_CHECK",
            MilestoneKind::ClusterInitialization => "CLUSTER_INITIALIZATION",
            MilestoneKind::AlignmentStart => "ALIGNMENT_START",
            MilestoneKind::AlignmentEnd => "ALIGNMENT_END",
            MilestoneKind::KalignExecution => "KALIGN_EXECUTION",
            MilestoneKind::Wfa2Execution => "WFA2_EXECUTION",
            MilestoneKind::NeedlemanWunsch => "NEEDLEMAN_WUNSCH",
            MilestoneKind::SequenceAlignment => "SEQUENCE_ALIGNMENT",
            MilestoneKind::MsaConstruction => "MSA_CONSTRUCTION",
            MilestoneKind::ParallelRegionStart => "PARALLEL_START",
            MilestoneKind::ParallelRegionEnd => "PARALLEL_END",
            MilestoneKind::ThreadSpawn => "THREAD_SPAWN",
            MilestoneKind::ThreadJoin => "THREAD_JOIN",
            MilestoneKind::ThreadBarrier => "THREAD_BARRIER",
            MilestoneKind::MemoryAlloc => "MEMORY_ALLOC",
            MilestoneKind::MemoryFree => "MEMORY_FREE",
            MilestoneKind::MemoryRealloc => "MEMORY_REALLOC",
            MilestoneKind::LargeAllocation => "LARGE_ALLOCATION",
            MilestoneKind::User1 => "USER_1",
            MilestoneKind::User2 => "USER_2",
            MilestoneKind::User3 => "USER_3",
            MilestoneKind::User4 => "USER_4",
            MilestoneKind::User5 => "USER_5",
        }
    }
}

impl fmt::Display for MilestoneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for MilestoneKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}
