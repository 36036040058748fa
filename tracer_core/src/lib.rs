#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core curve-tracing logic (hardware-agnostic).
//!
//! All hardware access goes through `tracer_traits::AdcBus`, `Relay` and
//! `LinkPort`; time goes through `tracer_traits::Clock`.
//!
//! ## Architecture
//!
//! - **Configuration**: host-tunable sweep parameters (`config`)
//! - **Isc**: open-circuit sampling and short-circuit stabilisation (`isc`)
//! - **Scaling**: per-sweep axis weights and point spacing (`scale`)
//! - **Acquisition**: decimating capture into a bounded buffer (`engine`, `curve`)
//! - **Reporting**: host output lines and JSON (`report`)
//! - **Device**: line protocol, handshake and the armed loop (`link`, `device`)
//!
//! ## Fixed-Point Arithmetic
//!
//! Samples are raw 12-bit counts in `u16`. Weighted distances and the
//! current interpolation stay in 16 bits; the bounds are checked at compile
//! time in `fixed_point`.

pub mod builder;
pub mod config;
pub mod curve;
pub mod device;
pub mod engine;
pub mod error;
pub mod fixed_point;
pub mod hw_error;
pub mod isc;
pub mod link;
pub mod mocks;
pub mod report;
pub mod scale;
pub mod status;
pub mod tracer;

pub use builder::{DeviceBuilder, Missing};
pub use config::{AcqConfig, ConfigOutcome, ConfigParam};
pub use curve::{CurveBuffer, IvPoint};
pub use device::Device;
pub use engine::{Engine, EngineParams, EngineRun, Step};
pub use error::{BuildError, ConfigError, CurveError, LinkError, Result, TracerError};
pub use isc::{IscOutcome, OpenCircuit};
pub use link::{ChannelLink, HostEnd, Idle, LineReader, MAX_MSG_LEN, channel_link};
pub use report::SweepReport;
pub use scale::ScaleFactors;
pub use status::EndReason;
pub use tracer::Tracer;
