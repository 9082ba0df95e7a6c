use serde::{Deserialize, Serialize};

/// Dashboard counters for one owner's shares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareStats {
    pub active_count: u32,
    pub created_today_count: u32,
    pub expiring_soon_count: u32,
    pub viewed_count: u32,
}
