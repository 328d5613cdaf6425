//! Body-frame locomotion: movement state, collision-resolved integration
//! and the head-pose compositor that turns body pose into a view matrix.

pub mod collision;
pub mod head_pose;
pub mod player;

pub use head_pose::{compute_view, ControllerOffset, HeadModelOffset};
pub use player::{MoveDirection, MoveSource, Player};
