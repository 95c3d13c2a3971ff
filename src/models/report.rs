/// Write counts for one ingested batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub entries: usize,
    /// Rows written by the replace into `news`.
    pub articles_written: usize,
    /// Rows newly created in `my_news`; existing overlays are left alone.
    pub states_created: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestStatus {
    Completed(IngestReport),
    /// The consumer went away; nothing was written.
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub states_removed: usize,
    pub articles_removed: usize,
}
