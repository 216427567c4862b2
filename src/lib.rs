//! # Chitter
//!
//! A multi-tenant group-chat backend. Each tenant is a room with its own
//! isolated users, channels, and message stream; membership moves through
//! one-shot invite codes and identities move between devices through
//! one-shot transfer bundles.
//!
//! ## Architecture
//!
//! One service contract, two interchangeable storage backends:
//!
//! - **Domain Layer**: entities, the content sanitizer, and the
//!   [`domain::service::ChatService`] trait every caller goes through
//! - **Infrastructure Layer**: the transactional PostgreSQL backend, the
//!   snapshot-persisted in-memory backend, and the credential registry
//! - **Presentation Layer**: the `/api` HTTP surface and its middleware
//!
//! ## Module Structure
//!
//! ```text
//! chitter/
//! +-- config/         Configuration management
//! +-- domain/         Entities, content sanitation, service contract
//! +-- infrastructure/ Postgres + in-memory backends, credentials
//! +-- presentation/   HTTP routes, handlers, middleware
//! +-- shared/         Error taxonomy
//! ```

// Configuration module
pub mod config;

// Domain layer - entities and the service contract
pub mod domain;

// Infrastructure layer - storage backends
pub mod infrastructure;

// Presentation layer - HTTP edge
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
