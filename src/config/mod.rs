//! Configuration management.

mod settings;

pub use settings::{
    BackendKind, CorsSettings, DatabaseSettings, MediaSettings, ServerSettings, Settings,
    SnapshotSettings,
};
