// SPDX-License-Identifier: GPL-3.0-only

//! Message handler modules
//!
//! Each module adds `handle_*` methods to [`App`](super::App) for one concern.

mod camera;
mod capture;
mod system;
