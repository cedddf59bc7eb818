//! Hardware-independent core library for marquee-rs
//!
//! This crate contains all platform-agnostic logic for the marquee LED
//! matrix commute clock: the screen-rotation scheduler, the connectivity
//! manager with its retry/reset policy, the solar theme engine, the
//! clock synchronizer, and the fixed-layout renderers.
//!
//! It is `#![no_std]` so it compiles on both embedded targets and
//! desktop hosts (for the simulator and tests). Every hardware and
//! network seam is a trait in [`platform`]; nothing in here performs I/O
//! on its own.

#![no_std]

pub mod clock;
pub mod config;
pub mod model;
pub mod net;
pub mod platform;
pub mod render;
pub mod scheduler;
pub mod theme;
pub mod transit;

/// Panel width in pixels.
pub const PANEL_WIDTH: u32 = 32;

/// Panel height in pixels.
pub const PANEL_HEIGHT: u32 = 32;
