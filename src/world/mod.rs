//! In-memory host for tests and simple embeddings.
//!
//! `MemoryWorld` keeps entity state in a map and records every position
//! update it receives. It exercises the engine the same way a real host
//! would: reads through `EntitySource`, writes through `EntitySink`.

mod memory;

pub use memory::MemoryWorld;
