pub mod memory;

pub use memory::MemoryItemSource;
