// src/lib.rs
//! bgmusic - background music session control for games.
//!
//! One looping track at a time across screen changes, with autoplay gating,
//! retried starts, ducking and a terminal front-end for trying it out.

pub mod app;
pub mod audio;
pub mod config;
pub mod error;
pub mod fs;
pub mod ui;
