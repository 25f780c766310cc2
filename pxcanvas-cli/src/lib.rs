//! # pxcanvas-cli: pixelflut canvas command-line client
//!
//! Connects to a pixelflut server, reads and writes single pixels,
//! fills rectangles, dumps snapshots and keeps polling the canvas.

pub mod commands;
pub mod config;
