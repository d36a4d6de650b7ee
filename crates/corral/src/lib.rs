// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A terminal supervisor for interactive AI coding agents: owns PTY
//! lifecycles, maintains a virtual terminal per session, runs the
//! state-detection pipeline, coordinates auto-approval, and publishes a
//! coherent event stream to subscribers.

pub mod api;
pub mod autoapprove;
pub mod bus;
pub mod config;
pub mod debounce;
pub mod driver;
pub mod error;
pub mod event;
pub mod hooks;
pub mod orchestrator;
pub mod pty;
pub mod ring;
pub mod screen;
pub mod session;
