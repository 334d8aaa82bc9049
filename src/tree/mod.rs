//! Source-side element graph and the tree algorithms over it: flattening,
//! legacy nested conversion, and snapshot diffing.

pub mod diff;
pub mod element;
pub mod flatten;
pub mod nested;

pub use diff::{apply, diff};
pub use element::Element;
pub use flatten::{assign_identities, flatten, Snapshot};
pub use nested::to_nested;
