/// Monitored game instances are addressed by a small integer id taken from
/// configuration (the "emulator index").
pub type TargetId = u32;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
