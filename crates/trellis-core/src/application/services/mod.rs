//! Application services - orchestrate use cases.
//!
//! Services coordinate the domain layer, the engine and the ports to
//! accomplish the use cases hosts expose: create, preview, undo, validate
//! and check.

pub mod structure_service;

pub use structure_service::StructureService;
