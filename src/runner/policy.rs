//! Fetch policy: the partition filter handler as a value.
//!
//! Every runner fetch is described by one `FetchPolicy` and executed by a
//! single code path, instead of repeating filter injection and sample
//! redirection per operation.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    First,
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// The table, or the custom query when one is set.
    Table,
    /// The bound sample, falling back like `SourceKind::Table` without one.
    Sample,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    pub apply_partition: bool,
    pub cardinality: Cardinality,
    pub source: SourceKind,
}

impl FetchPolicy {
    pub const fn new(source: SourceKind, cardinality: Cardinality) -> Self {
        Self {
            apply_partition: true,
            cardinality,
            source,
        }
    }

    pub const FIRST_FROM_TABLE: FetchPolicy = FetchPolicy::new(SourceKind::Table, Cardinality::First);
    pub const ALL_FROM_TABLE: FetchPolicy = FetchPolicy::new(SourceKind::Table, Cardinality::All);
    pub const FIRST_FROM_SAMPLE: FetchPolicy = FetchPolicy::new(SourceKind::Sample, Cardinality::First);
    pub const ALL_FROM_SAMPLE: FetchPolicy = FetchPolicy::new(SourceKind::Sample, Cardinality::All);

    pub const fn without_partition(mut self) -> Self {
        self.apply_partition = false;
        self
    }
}
