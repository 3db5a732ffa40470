//! # audio-policy-routing
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Route resolution and patch verification for audio policy configurations.
//!
//! `audio-policy-routing` reads an `audioPolicyConfiguration` document
//! (mix ports, device ports, attached devices and routes), predicts which
//! device a stream must be routed to for a requested output flag or input
//! source, and checks the hardware patch an audio service reports against
//! that prediction.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use audio_policy_routing::{check_performance_modes, MockAudioService, RoutingEngine};
//!
//! let engine = RoutingEngine::builder()
//!     .on_event(|e| tracing::debug!(?e, "routing event"))
//!     .build()?;                                    // searches /odm/etc, /vendor/etc, ...
//!
//! let service = MockAudioService::new();
//! for (flag, outcome) in check_performance_modes(&engine, &service) {
//!     match outcome {
//!         Ok(check) => println!("{flag}: {}", check.verdict),
//!         Err(e) if e.is_skip() => println!("{flag}: not supported"),
//!         Err(e) => eprintln!("{flag}: {e}"),
//!     }
//! }
//! # Ok::<(), audio_policy_routing::ConfigError>(())
//! ```
//!
//! ## Architecture
//!
//! - **Configuration**: immutable snapshot built by one recursive walk of the
//!   document, with `xi:include` module files resolved relative to the file
//! - **Resolver**: pure first-fit lookups over a snapshot
//! - **Waiter**: blocks the control thread until the service's
//!   device-changed callback arrives on its own thread, or a deadline passes
//! - **Verifier**: compares the observed patch with the prediction and
//!   returns a [`Verdict`]
//!
//! The [`RoutingEngine`] holds the current snapshot behind an atomic swap so
//! configurations can be reloaded while checks are running.

// unsafe_code lint is configured in Cargo.toml as "deny"
#![warn(missing_docs)]
// unwrap/expect allowed in tests only
#![allow(clippy::unwrap_used)]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod check;
mod config;
mod engine;
mod error;
mod event;
pub mod flags;
pub mod model;
pub mod patch;
mod resolver;
pub mod service;
mod verifier;
mod waiter;

pub use builder::RoutingEngineBuilder;
pub use check::{
    check_performance_modes, check_playback_route, check_remote_submix, PlaybackCheck,
    RemoteSubmixCheck,
};
pub use config::{EngineConfig, LocatorConfig, DEFAULT_CONFIGURATION_FILE, DEFAULT_SEARCH_DIRS};
pub use engine::RoutingEngine;
pub use error::{Capability, CheckError, ConfigError, ResolveError, ServiceError, WaitError};
pub use event::{event_callback, EventCallback, RoutingEvent};
pub use flags::{AttributeFlags, AudioAttributes, InputSource, OutputFlag, OutputFlags};
pub use model::{
    locate_configuration_file, Configuration, Device, FlagSet, MixPort, Name, Route,
};
pub use patch::{
    AudioPort, DeviceType, IoHandle, ObservedPatch, PortConfig, PortId, PortRole, PortType,
};
pub use resolver::{
    resolve_input_route, resolve_output_route, resolve_output_routes, RoutingDecision,
};
pub use service::{AudioService, CaptureRequest, MockAudioService, PlaybackRequest, StreamHandle};
pub use verifier::{verify, verify_device_routing, ExpectedRouting, Verdict};
pub use waiter::{device_callback, DeviceCallback, DeviceChange, DeviceChangeWaiter, WaitState};
