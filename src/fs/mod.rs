pub mod locking;

pub use locking::{ensure_parent_dir, locked_read, locked_write};
