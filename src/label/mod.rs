//! Label files: geometry, the single-line codec and the directory layout.
//!
//! # Design Principles
//!
//! 1. **Per-line encoding**: a line's token count alone decides whether it
//!    is a rectangle or an oriented box, regardless of its neighbours.
//!
//! 2. **Permissive Construction**: geometry types accept out-of-range
//!    values so that callers can report anomalies instead of rejecting input.
//!
//! 3. **One Layout Policy**: every `images/` ↔ `labels/` mapping goes
//!    through [`PathPolicy`].
//!
//! # Example
//!
//! ```
//! use labelhub::label::{format_line, parse_line};
//!
//! let parsed = parse_line("0 0.5 0.5 0.2 0.2").unwrap().unwrap();
//! assert_eq!(
//!     format_line(&parsed.to_oriented()),
//!     "0 0.400000 0.400000 0.600000 0.400000 0.600000 0.600000 0.400000 0.600000"
//! );
//! ```

pub mod codec;
mod geometry;
pub mod layout;

pub use codec::{
    format_line, parse_line, LabelEncoding, LineError, ParsedAnnotation, Shape, ORIENTED_TOKENS,
    RECT_TOKENS,
};
pub use geometry::{OrientedBox, Point, RectBox, UNIT_EPSILON};
pub use layout::{rel_string, LabelScan, PathPolicy};
