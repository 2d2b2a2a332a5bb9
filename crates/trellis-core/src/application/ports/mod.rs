//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the engine
//! needs from the outside world. Adapters in `trellis-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by the engine, implemented by infrastructure
//!   - `Filesystem`: existence, read, write, mkdir, list, delete
//!   - `Fetcher`: bounded HTTPS downloads
//!   - `ContentGenerator`: binary file synthesis (images, databases)
//!   - `HookRunner`: post-create shell commands
//!
//! - **Driving (Input) Ports**: Called by hosts, implemented by
//!   `StructureService`

pub mod output;

pub use output::{
    ContentGenerator, Entry, EntryKind, Fetcher, Filesystem, GenerateRequest, HookRunner,
};
