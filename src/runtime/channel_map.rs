//! VCI id to owning stream.

use crate::error::ConfigError;
use crate::types::{MutexId, StreamId, VciMask, MAX_VCIS};

/// Read-only map from a VCI to the stream that handles it without locking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMap {
    owners: [Option<StreamId>; MAX_VCIS],
}

impl ChannelMap {
    /// Derives the map from per-stream masks.
    ///
    /// Every VCI in `1..=num_vcis` must be claimed by exactly one stream, and
    /// no VCI may be claimed twice.
    pub fn from_masks(masks: &[VciMask], num_vcis: usize) -> Result<Self, ConfigError> {
        let mut owners = [None; MAX_VCIS];
        for (index, mask) in masks.iter().enumerate() {
            let stream = StreamId::new(index);
            for vci in mask.iter() {
                let owner = &mut owners[vci - 1];
                if let Some(first) = *owner {
                    return Err(ConfigError::SharedVci {
                        vci,
                        first,
                        second: stream,
                    });
                }
                *owner = Some(stream);
            }
        }
        if let Some(vci) = (1..=num_vcis.min(MAX_VCIS)).find(|vci| owners[vci - 1].is_none()) {
            return Err(ConfigError::UnownedVci { vci });
        }
        Ok(Self { owners })
    }

    /// The stream owning `id`'s channel; `None` for GLOBAL ids and unclaimed VCIs.
    #[must_use]
    pub fn stream_for(&self, id: MutexId) -> Option<StreamId> {
        id.vci_index()
            .and_then(|vci| self.owners.get(vci - 1).copied().flatten())
    }
}
