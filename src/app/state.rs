// SPDX-License-Identifier: GPL-3.0-only

//! Per-tab result state

use crate::lookup::{EarthquakeFeed, IngredientsInfo, ProductInfo};
use std::collections::BTreeSet;

/// The latest lookup outcome of a tab, guarded by request sequence numbers
///
/// Each request takes a sequence number from [`ResultSlot::begin`]. Only a
/// completion carrying the newest pending number is applied; anything older
/// was superseded and is dropped whatever order it arrives in.
#[derive(Debug, Clone)]
pub struct ResultSlot<T> {
    last_seq: u64,
    pending: Option<u64>,
    data: Option<T>,
    error: Option<String>,
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self {
            last_seq: 0,
            pending: None,
            data: None,
            error: None,
        }
    }
}

impl<T> ResultSlot<T> {
    /// Start a request; returns its sequence number
    pub fn begin(&mut self) -> u64 {
        self.last_seq += 1;
        self.pending = Some(self.last_seq);
        self.error = None;
        self.last_seq
    }

    /// Apply the outcome of request `seq`; false if it was superseded
    pub fn complete(&mut self, seq: u64, result: Result<T, String>) -> bool {
        if self.pending != Some(seq) {
            return false;
        }
        self.pending = None;
        match result {
            Ok(data) => {
                self.data = Some(data);
                self.error = None;
            }
            // Earlier data stays behind the error
            Err(message) => self.error = Some(message),
        }
        true
    }

    /// Show an error not tied to a request (camera failures)
    pub fn fail(&mut self, message: impl Into<String>) {
        self.pending = None;
        self.data = None;
        self.error = Some(message.into());
    }

    /// Forget everything, including any request in flight
    pub fn reset(&mut self) {
        self.pending = None;
        self.data = None;
        self.error = None;
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Nothing to show: not loading, no error, no data
    pub fn is_idle(&self) -> bool {
        self.pending.is_none() && self.error.is_none() && self.data.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct BarcodeTab {
    pub result: ResultSlot<ProductInfo>,
    /// Code the current result was looked up for
    pub scanned_code: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct IngredientsTab {
    pub result: ResultSlot<IngredientsInfo>,
}

#[derive(Debug, Clone, Default)]
pub struct EarthquakeTab {
    pub result: ResultSlot<EarthquakeFeed>,
    /// Indices (in display order) of entries showing their details
    pub expanded: BTreeSet<usize>,
}

impl EarthquakeTab {
    pub fn toggle(&mut self, index: usize) {
        if !self.expanded.remove(&index) {
            self.expanded.insert(index);
        }
    }
}
