//! exerciser-serializer: Display text for evaluation outcomes
//!
//! `serialize` turns any `EvaluationOutcome` into the text shown in the
//! result pane. It is total: every outcome has a rendering, and the same
//! outcome always renders to the same text.
//!
//! ```text
//! Success(value) ──▶ 2-space indented JSON layout, numbers at 13 significant digits
//! NoMatch        ──▶ ** no match **
//! errors         ──▶ short label + message
//! ```
//!
//! Input errors also carry a character offset; `marker_range` maps it to the
//! line/column span an editor should highlight.

mod number;
mod position;
mod pretty;
mod render;

pub use number::{format_number, round_significant, SIGNIFICANT_DIGITS};
pub use position::{marker_range, resolve_position, Position};
pub use pretty::{describe_function, pretty_print};
pub use render::{serialize, DisplayText, AWAITING_EXPRESSION, NO_MATCH};
