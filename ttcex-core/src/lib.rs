pub mod feedback;
pub mod object;
pub mod phase;
pub mod pose;
pub mod trial;

pub use feedback::FeedbackColor;
pub use object::{CustomMotionRef, ObjectKey, ObjectSpec, OffsetFlag, RotationSpeed};
pub use phase::{CoordinatorPhase, ObjectPhase};
pub use pose::{Pose, PoseSample};
pub use trial::{ObjectRecord, TrialRecord, TrialSpec};

pub use glam::{Quat, Vec3};
