//! Layer-scoped parameter writes and the per-frame write ledger.
//!
//! Layers never hold on to a table or an index between ticks. Each tick the avatar obtains the
//! live table from the runtime and wraps it in a [`ParamWriter`] scoped to one layer; aliases
//! are resolved on every write. Tracked writers record into a [`FrameLedger`], which notices
//! when two layers write the same raw parameter within one frame.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use marionette_api_core::{read_aliases, resolve, Channel, ParameterTable, WriteBatch, WriteOp};

use crate::clock::Layer;

/// Record of a second layer writing a parameter another layer already wrote this frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictLog {
    pub frame: u64,
    pub channel: Channel,
    pub id: String,
    pub previous_layer: Layer,
    pub previous_value: f32,
    pub new_layer: Layer,
    pub new_value: f32,
}

/// Writes applied during one frame, in application order, with their writers.
#[derive(Debug, Default)]
pub struct FrameLedger {
    frame: u64,
    writers: HashMap<String, (Layer, f32)>,
    writes: WriteBatch,
    conflicts: Vec<ConflictLog>,
}

impl FrameLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset for a new frame.
    pub fn begin(&mut self, frame: u64) {
        self.frame = frame;
        self.writers.clear();
        self.writes.clear();
        self.conflicts.clear();
    }

    pub fn record(&mut self, layer: Layer, channel: Channel, id: &str, value: f32) {
        if let Some((previous_layer, previous_value)) = self.writers.get(id).copied() {
            if previous_layer != layer {
                debug!(
                    frame = self.frame,
                    id,
                    %previous_layer,
                    %layer,
                    "parameter written by two layers in one frame"
                );
                self.conflicts.push(ConflictLog {
                    frame: self.frame,
                    channel,
                    id: id.to_string(),
                    previous_layer,
                    previous_value,
                    new_layer: layer,
                    new_value: value,
                });
            }
        }
        self.writers.insert(id.to_string(), (layer, value));
        self.writes.push(WriteOp::new(channel, id, value));
    }

    /// Layer that last wrote `id` this frame.
    pub fn writer_of(&self, id: &str) -> Option<Layer> {
        self.writers.get(id).map(|(l, _)| *l)
    }

    pub fn writes(&self) -> &WriteBatch {
        &self.writes
    }

    pub fn conflicts(&self) -> &[ConflictLog] {
        &self.conflicts
    }

    /// Move the frame's writes and conflicts out, leaving the ledger empty.
    pub fn take(&mut self) -> (WriteBatch, Vec<ConflictLog>) {
        self.writers.clear();
        (
            std::mem::take(&mut self.writes),
            std::mem::take(&mut self.conflicts),
        )
    }
}

/// A layer's view of the live parameter table for the duration of one call.
pub struct ParamWriter<'a> {
    table: &'a mut dyn ParameterTable,
    ledger: Option<&'a mut FrameLedger>,
    layer: Layer,
}

impl<'a> ParamWriter<'a> {
    /// Writer whose writes are recorded in the frame ledger.
    pub fn tracked(table: &'a mut dyn ParameterTable, ledger: &'a mut FrameLedger, layer: Layer) -> Self {
        Self {
            table,
            ledger: Some(ledger),
            layer,
        }
    }

    /// Writer for synchronous, out-of-frame writes (mood expressions, stop resets).
    pub fn untracked(table: &'a mut dyn ParameterTable, layer: Layer) -> Self {
        Self {
            table,
            ledger: None,
            layer,
        }
    }

    /// Write to the first alias of `channel` the model defines.
    /// Returns false (and does nothing) when the model has none of them.
    pub fn write(&mut self, channel: Channel, value: f32) -> bool {
        let Some(index) = resolve(&*self.table, channel.aliases()) else {
            return false;
        };
        self.table.set_value(index, value);
        if let Some(ledger) = self.ledger.as_deref_mut() {
            let applied = self.table.value(index).unwrap_or(value);
            let id = self.table.id(index).unwrap_or(channel.aliases()[0]);
            ledger.record(self.layer, channel, id, applied);
        }
        true
    }

    /// Current value of `channel` on the live model.
    pub fn read(&self, channel: Channel) -> Option<f32> {
        read_aliases(&*self.table, channel.aliases())
    }
}
