//! Parameter table contract.
//!
//! The table is owned by the puppet runtime and is the single source of truth it renders
//! from. The engine only ever sees it through [`ParameterTable`], discovered anew every tick,
//! so a table that disappears between two ticks (model swap, teardown) is never dereferenced
//! through a stale index.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

/// Live parameter storage exposed by a loaded puppet model.
pub trait ParameterTable {
    /// Index of a raw parameter id, if the model defines it.
    fn index_of(&self, id: &str) -> Option<usize>;
    /// Raw id stored at `index`.
    fn id(&self, index: usize) -> Option<&str>;
    /// Current value at `index`.
    fn value(&self, index: usize) -> Option<f32>;
    /// Overwrite the value at `index`. Out-of-range indices are ignored.
    fn set_value(&mut self, index: usize, value: f32);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve the first alias the table defines.
pub fn resolve(table: &dyn ParameterTable, aliases: &[&str]) -> Option<usize> {
    aliases.iter().find_map(|alias| table.index_of(alias))
}

/// Write `value` to the first alias present. Returns the written index, or `None` when no
/// alias exists on this model (a silent no-op).
pub fn write_aliases(table: &mut dyn ParameterTable, aliases: &[&str], value: f32) -> Option<usize> {
    let index = resolve(table, aliases)?;
    table.set_value(index, value);
    Some(index)
}

/// Read the value behind the first alias present.
pub fn read_aliases(table: &dyn ParameterTable, aliases: &[&str]) -> Option<f32> {
    resolve(table, aliases).and_then(|index| table.value(index))
}

/// Declaration of one model parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub id: String,
    #[serde(default = "default_min")]
    pub min: f32,
    #[serde(default = "default_max")]
    pub max: f32,
    #[serde(default)]
    pub default: f32,
}

fn default_min() -> f32 {
    -1.0
}

fn default_max() -> f32 {
    1.0
}

impl ParamDef {
    pub fn new(id: impl Into<String>, min: f32, max: f32, default: f32) -> Self {
        Self {
            id: id.into(),
            min,
            max,
            default,
        }
    }
}

/// In-memory parameter table. Values are clamped into each parameter's declared range on
/// write, the way puppet runtimes clamp their own parameters.
#[derive(Clone, Debug, Default)]
pub struct ParamTable {
    defs: Vec<ParamDef>,
    values: Vec<f32>,
    index: HashMap<String, usize>,
}

impl ParamTable {
    pub fn new(defs: Vec<ParamDef>) -> Self {
        let mut index = HashMap::with_capacity(defs.len());
        for (i, def) in defs.iter().enumerate() {
            // first declaration wins on duplicate ids
            index.entry(def.id.clone()).or_insert(i);
        }
        let values = defs.iter().map(|d| d.default.clamp(d.min, d.max)).collect();
        Self {
            defs,
            values,
            index,
        }
    }

    /// Build from a JSON array of [`ParamDef`].
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        let defs: Vec<ParamDef> = serde_json::from_str(s)?;
        Ok(Self::new(defs))
    }

    /// Current value by raw id.
    pub fn get(&self, id: &str) -> Option<f32> {
        self.index.get(id).and_then(|&i| self.values.get(i).copied())
    }

    pub fn defs(&self) -> &[ParamDef] {
        &self.defs
    }

    /// Restore every parameter to its declared default.
    pub fn reset(&mut self) {
        for (value, def) in self.values.iter_mut().zip(&self.defs) {
            *value = def.default.clamp(def.min, def.max);
        }
    }

    /// Iterate `(id, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.defs
            .iter()
            .zip(self.values.iter())
            .map(|(d, v)| (d.id.as_str(), *v))
    }
}

impl ParameterTable for ParamTable {
    fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    fn id(&self, index: usize) -> Option<&str> {
        self.defs.get(index).map(|d| d.id.as_str())
    }

    fn value(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    fn set_value(&mut self, index: usize, value: f32) {
        if let (Some(slot), Some(def)) = (self.values.get_mut(index), self.defs.get(index)) {
            *slot = value.clamp(def.min, def.max);
        }
    }

    fn len(&self) -> usize {
        self.defs.len()
    }
}
