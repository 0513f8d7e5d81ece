//! Tally Core
//!
//! Shared primitives for the Tally counting-label engine:
//!
//! - **Colors**: RGBA colors with linear blending
//! - **Rich Text**: styled spans for attributed label text
//! - **Number Formats**: printf-style formats such as `%d` or `%.2f`
//! - **Errors**: configuration errors raised by host-supplied settings
//!
//! # Example
//!
//! ```rust
//! use tally_core::{Color, NumberFormat};
//!
//! let format = NumberFormat::parse("%.1f%%").unwrap();
//! assert_eq!(format.render(42.26).unwrap(), "42.3%");
//!
//! let halfway = Color::lerp(&Color::BLACK, &Color::GREEN, 0.5);
//! assert_eq!(halfway.g, 0.5);
//! ```

pub mod color;
pub mod error;
pub mod format;
pub mod text;

pub use color::Color;
pub use error::{Result, TallyError};
pub use format::{NumberFormat, DEFAULT_FORMAT, MAX_FIELD_WIDTH};
pub use text::{FontWeight, RichText, SpanStyle, TextSpan};
