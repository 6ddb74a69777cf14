//! # vecdraw
//!
//! A 2D vector graphics engine: a canvas-style draw list, an analytic-AA
//! polygon rasterizer, and a pixel-format compositor matrix. The draw list
//! is a densely packed byte-code that can be replayed into any back end —
//! this crate ships the rasterizer and a hashing back end used for damage
//! tracking; display back ends (SDL, framebuffer, terminal) are out of
//! scope and left to the embedder.
//!
//! ## Layout
//!
//! - [`entry`] / [`opcode`] — the 9-byte wire record and its opcode table.
//! - [`drawlist`] — append/iterate/bitpack over a sequence of entries.
//! - [`formatter`] / [`parser`] — the textual long/short command syntax.
//! - [`gstate`] — the save/restore graphics-state stack and keyed property DB.
//! - [`matrix`] — the 3×2 affine transform.
//! - [`path`] — path construction, Bézier flattening, arcs.
//! - [`edge`] / [`scanline`] — the active-edge rasterizer core.
//! - [`stroke`] — offset-polyline stroke expansion.
//! - [`pixelformat`] / [`compositor`] — the format table and blend kernels.
//! - [`gradient`] / [`texture`] — per-pixel color fragments.
//! - [`shapecache`] — fingerprint-keyed coverage bitmap reuse.
//! - [`hasher`] — the tile-fingerprint damage-tracking back end.
//! - [`scheduler`] — the tiled worker-thread dispatcher (`tiled-scheduler`
//!   feature).
//! - [`color`] — the Gray/RGB/CMYK/Lab/Lch color representation.
//!
//! ```
//! use vecdraw::drawlist::DrawList;
//! use vecdraw::entry::Command;
//!
//! let mut list = DrawList::new();
//! list.add_entry(&Command::MoveTo { x: 0.0, y: 0.0 });
//! list.add_entry(&Command::LineTo { x: 10.0, y: 0.0 });
//! list.add_entry(&Command::Fill);
//! assert_eq!(list.iter().count(), 3);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![allow(dead_code)]

#[macro_use]
extern crate log;

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod ascii85;
pub mod color;
pub mod compositor;
pub mod config;
pub mod constants;
pub mod context;
pub mod drawlist;
pub mod edge;
pub mod entry;
pub mod errors;
pub mod formatter;
pub mod graphics;
pub mod gradient;
pub mod gstate;
pub mod hasher;
pub mod indices;
pub mod instruction;
pub mod matrix;
pub mod opcode;
pub mod parser;
pub mod path;
pub mod pixelformat;
#[cfg(feature = "shape-cache")]
pub mod shapecache;
pub mod scanline;
#[cfg(feature = "tiled-scheduler")]
pub mod scheduler;
pub mod stroke;
pub mod texture;

pub use color::Color;
pub use context::Context;
pub use entry::{Command, Entry};
pub use errors::{Error, IndexError, ParseError};
pub use gstate::GState;
pub use instruction::Instruction;
pub use matrix::Transform;
