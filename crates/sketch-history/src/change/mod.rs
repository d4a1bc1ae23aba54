//! Reversible changes: one for the view state, one for the element set.

pub mod binding;
pub mod elements;
pub mod view;

pub use binding::{BOUND_TEXT_PADDING, redraw_text_bounding_box};
pub use elements::{
    ChangeInvariantError, ChangedFields, ElementDelta, ElementDeltas, ElementSetChange,
};
pub use view::ViewStateChange;
