//! Engine tunables

pub const DEFAULT_DISCLAIMER: &str = "This record documents a schedule change agreed between the parents \
through the shared calendar. It is not legal advice and does not modify any court order or custody \
agreement.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Swaps spanning more days than this carry a routine-disruption warning.
    pub disruption_threshold_days: i64,
    pub disclaimer_text: String,
    pub request_id_prefix: String, // bech32 hrp
    pub event_id_prefix: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            disruption_threshold_days: 7,
            disclaimer_text: DEFAULT_DISCLAIMER.into(),
            request_id_prefix: "req".into(),
            event_id_prefix: "evt".into(),
        }
    }
}
