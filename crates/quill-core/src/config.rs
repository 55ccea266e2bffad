/// Tunables for the read and write paths.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Two actions by the same actor further apart than this are not grouped.
    pub grouping_window_ms: i64,
    /// Last-message previews are cut to this many characters.
    pub last_message_max_len: usize,
    pub preview_cache_capacity: usize,
    /// Receipts kept on a report preview in addition to the newest one.
    pub recent_receipt_limit: usize,
}

impl EngineConfig {
    pub const DEFAULT: EngineConfig = EngineConfig {
        grouping_window_ms: 300_000,
        last_message_max_len: 200,
        preview_cache_capacity: 500,
        recent_receipt_limit: 2,
    };
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
