#![no_std]

// Core logic for the glowglobe roll controller.
//
// Everything here stays free of the Rust standard library so the same state
// machine can run inside a host emulator or next to an embedded transport.
// The robot link itself lives behind `gateway::DeviceGateway`.

pub mod gateway;
pub mod motion;
pub mod repl;
pub mod runtime;
pub mod sequencer;
pub mod sequences;
pub mod session;
pub mod telemetry;
