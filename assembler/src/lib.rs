pub mod inputs;
pub mod protocol;
pub mod reader;

pub use inputs::Inputs;
pub use protocol::{AssemblyOptions, assemble, assemble_with_reader};
pub use reader::{FsReader, SlotReader};
