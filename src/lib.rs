//! # sketchc - Arduino sketch build orchestrator
//!
//! sketchc resolves everything around a sketch build and hands the actual
//! compilation to `arduino-cli`.
//!
//! ## Features
//!
//! - **Deterministic build dirs**: `<temp>/arduino-sketch-<MD5>` unless `--build-path` is given
//! - **Artifact export**: `--output-dir`, `--export-binaries` or the always-export setting
//! - **Build properties**: shell-like quoting for `--build-property` and the deprecated `--build-properties`
//! - **Safe tree walk**: VCS directories pruned, symlink loops rejected
//!
//! ## Quick Start
//!
//! ```bash
//! sketchc new Blink
//! sketchc compile -b arduino:avr:uno Blink --export-binaries
//! ```
//!
//! ## Module Organization
//!
//! - [`props`] - Property tokenizer and merger
//! - [`build`] - Path resolution, tree walk, orchestration, export
//! - [`toolchain`] - Board names and the compiler/package-manager seams
//! - [`sketch`] - Sketch model and `sketch.json`
//! - [`config`] - Settings file (`sketchc.toml`) and environment overlay

/// Build pipeline.
pub mod build;

/// Settings file parsing (`sketchc.toml`).
pub mod config;

/// Error types.
pub mod errors;

/// Build property overrides.
pub mod props;

/// Sketch model.
pub mod sketch;

/// Sketch skeleton for `sketchc new`.
pub mod templates;

/// Board names and external collaborators.
pub mod toolchain;

/// Terminal UI utilities (tables, colors).
pub mod ui;
