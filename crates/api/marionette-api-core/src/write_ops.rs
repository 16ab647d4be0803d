//! Write records produced by animation layers.
//!
//! A WriteOp describes one applied parameter write: the semantic channel, the raw id it
//! resolved to on the live model, and the value. Serializes to JSON as:
//!   { "channel": "angle_x", "id": "ParamAngleX", "value": 12.5 }
//!
//! WriteBatch keeps them in application order.

use crate::Channel;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOp {
    pub channel: Channel,
    pub id: String,
    pub value: f32,
}

impl WriteOp {
    pub fn new(channel: Channel, id: impl Into<String>, value: f32) -> Self {
        Self {
            channel,
            id: id.into(),
            value,
        }
    }
}

impl fmt::Display for WriteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ {} ({}): {} }}", self.channel, self.id, self.value)
    }
}

/// Ordered writes for one frame. Order is application order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteBatch(pub Vec<WriteOp>);

impl WriteBatch {
    pub fn new() -> Self {
        WriteBatch(Vec::new())
    }

    pub fn push(&mut self, op: WriteOp) {
        self.0.push(op);
    }

    pub fn iter(&self) -> impl Iterator<Item = &WriteOp> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Last value written to a semantic channel in this batch.
    pub fn last_for(&self, channel: Channel) -> Option<f32> {
        self.0
            .iter()
            .rev()
            .find(|op| op.channel == channel)
            .map(|op| op.value)
    }
}
