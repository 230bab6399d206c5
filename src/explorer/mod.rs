pub mod engine;
pub mod events;
pub mod prioritizer;
pub mod registry;
pub mod state;
pub mod store;
pub mod stuck;
