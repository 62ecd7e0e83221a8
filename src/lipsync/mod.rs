//! Lip-sync for the interviewer avatar
//!
//! - `timeline`: alignment events anchored on the output clock
//! - `viseme`: label → blend target mapping
//! - `smoother`: per-mesh exponential easing on the render side

mod smoother;
mod timeline;
mod viseme;

pub use smoother::{AvatarAnimator, BlendShapeSmoother};
pub use timeline::{AlignmentEvent, LipSyncTimeline};
pub use viseme::{Viseme, VisemeWeight};
