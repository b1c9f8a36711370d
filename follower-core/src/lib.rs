#![no_std]

// Shared logic for the line-following robot.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library and reaching hardware only through the traits exposed
// by `control`, `buttons`, and `display`.

pub mod buttons;
pub mod control;
pub mod display;
pub mod menu;
pub mod mixer;
pub mod pid;
pub mod sensors;
pub mod telemetry;
pub mod tuning;
