mod atomic_io;
mod compiler;
mod database;

pub use atomic_io::{write_bytes_atomic, write_text_atomic};
pub use compiler::{
    compile_def_database, compile_def_database_from_str, ContentCompileError, ContentErrorCode,
    SourceLocation,
};
pub use database::{DefDatabase, DefId, HostileArchetype, ItemDef, ItemKind, PlayerDef};
