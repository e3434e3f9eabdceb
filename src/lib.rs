//! # Guided Image
//!
//! A derivative-image cache: resized images, thumbnails, and placeholder
//! canvases are generated on demand, persisted under deterministic cache
//! paths, and served with the full set of HTTP caching headers. The
//! embedding application brings its own HTTP layer and image models; this
//! crate owns everything between "a request for `100x200` of `my-image`
//! arrived" and "here are the bytes, status, and headers".
//!
//! # Architecture: Dispense-Through-Cache
//!
//! Every derivative request follows one path:
//!
//! ```text
//! demand → cache key → hit?  → serve stored bytes (maybe 304)
//!                    → miss? → read source → derive → persist → serve
//! ```
//!
//! Two properties anchor the design:
//!
//! - **Keys encode pixels.** A cache path encodes every parameter that
//!   affects a derivative's content, so equal demands share an entry and
//!   different demands never collide.
//! - **Serve what's on disk.** After a write, the response body, entity tag,
//!   and mtime are all read back through the store rather than trusted from
//!   memory. What a client receives is byte-for-byte what the next client
//!   will get.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`demand`] | Demand types (resize, thumbnail, dummy) and route-value sentinel parsing |
//! | [`keys`] | Deterministic cache-key construction |
//! | [`dispenser`] | The cache-or-generate flow, fallback policy, cache emptying |
//! | [`imaging`] | Decoding, sizing math, transforms, encoding (pure Rust via the `image` crate) |
//! | [`storage`] | Filesystem-like store trait and the local-disk implementation |
//! | [`response`] | HTTP-shaped responses, conditional-request (ETag/Last-Modified) handling |
//! | [`config`] | `config.toml` loading and validation |
//! | [`logging`] | Logger seam so recoverable failures are assertable in tests |
//! | [`report`] | Cache status survey for the CLI |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Imaging
//!
//! All pixel work goes through the `image` crate — no ImageMagick, no system
//! codec packages. The binary is self-contained, and the processing seam
//! ([`imaging::ImageProcessor`]) is one trait with two methods, so tests run
//! against a recording mock instead of real decodes.
//!
//! ## Extension-less Cache Entries
//!
//! Cache paths carry dimensions, flags, and the source name but no file
//! extension; re-reading an entry sniffs the format from magic bytes. This
//! keeps keys stable when the configured output format changes, at the cost
//! of entries not being double-clickable on disk.
//!
//! ## No Single-Flight
//!
//! Two concurrent requests for the same uncached derivative may both
//! generate it. Generation is deterministic, both write the same bytes to
//! the same path, and both serve a valid response, so the race is benign
//! and the core stays lock-free.
//!
//! ## Fallback Is a Mode, Not a Guess
//!
//! When a source can't be processed, the dispenser either answers "not
//! found" (strict) or serves the unprocessed original marked with an
//! `X-Guided-Image-Fallback` header (lenient). The mode is fixed at
//! construction; both branches log, so operators see the failure either way.

pub mod config;
pub mod demand;
pub mod dispenser;
pub mod imaging;
pub mod keys;
pub mod logging;
pub mod report;
pub mod response;
pub mod storage;

pub use demand::{Dummy, Resize, SourceImage, SourceRef, ThumbMethod, Thumbnail};
pub use dispenser::{DispenseError, Dispensed, Dispenser, FallbackPolicy};
pub use response::{ImageResponse, Validators};
