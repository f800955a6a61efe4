//! Byte-count reconciliation quirks of emulated clients

/// How a client reports byte counts that are not piece aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundingPolicy {
    /// Counts are reported exactly as computed.
    Exact,
    /// Downloaded only counts completed pieces until the torrent is complete.
    ///
    /// The bytes taken off downloaded move to left, so their sum is kept.
    PieceAligned,
}

impl RoundingPolicy {
    /// Reconciles candidate counts into the values the client would report.
    pub fn round(self, downloaded: u64, uploaded: u64, left: u64, piece_size: u64) -> (u64, u64, u64) {
        match self {
            RoundingPolicy::Exact => (downloaded, uploaded, left),
            RoundingPolicy::PieceAligned => {
                if left == 0 || piece_size == 0 {
                    return (downloaded, uploaded, left);
                }
                let partial = downloaded % piece_size;
                (downloaded - partial, uploaded, left + partial)
            }
        }
    }
}
