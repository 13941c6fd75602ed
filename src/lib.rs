//! droplord - Idle-time trading-card drop farming for platform accounts.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── domain/          # Identifiers, farmable games, product keys
//! ├── platform/        # Platform connection trait + callback stream
//! ├── web/             # Badge-page web endpoint trait + HTTP client
//! ├── farmer/          # Per-bot farming scheduler and play loops
//! ├── bot/             # Session supervisor, registry, chat commands
//! ├── app/             # Configuration and process orchestration
//! └── testkit/         # Scripted capability doubles for tests
//! ```
//!
//! The concrete wire transport to the platform is not part of this crate;
//! deployments implement [`platform::PlatformClient`] and hand a
//! [`app::Connector`] to [`app::App::run`].

pub mod app;
pub mod bot;
pub mod domain;
pub mod error;
pub mod farmer;
pub mod platform;
pub mod testkit;
pub mod web;
