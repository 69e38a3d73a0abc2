// SPDX-License-Identifier: GPL-3.0-or-later

pub mod args;
pub mod command_line;
pub mod config;
pub mod file_paths;
pub mod header_paths;
pub mod model;
pub mod modes;
pub mod pch;
pub mod project;
