//! marionette-api-core: channel vocabulary and the parameter-table contract shared by the
//! animation engine and puppet runtimes (engine-agnostic).

pub mod channel;
pub mod table;
pub mod write_ops;

pub use channel::Channel;
pub use table::{read_aliases, resolve, write_aliases, ParamDef, ParamTable, ParameterTable};
pub use write_ops::{WriteBatch, WriteOp};
