use ttcex_cache::Prefab;
use ttcex_core::{FeedbackColor, ObjectKey, Pose, Vec3};

/// Scene and tracking collaborator supplied by the host (HMD runtime, headless
/// logger, test double). All calls happen on the tick thread.
pub trait Engine {
    fn head_pose(&self) -> Pose;

    fn controller_pose(&self) -> Option<Pose> {
        None
    }

    fn spawn_object(&mut self, key: ObjectKey, prefab: &Prefab, scale: Vec3, pose: Pose);
    fn move_object(&mut self, key: ObjectKey, pose: Pose);
    fn hide_object(&mut self, key: ObjectKey);
    /// Drops every object of the finished trial.
    fn clear_objects(&mut self);

    fn configure_feedback(&mut self, _position: Vec3, _size: u32, _color: FeedbackColor) {}
    fn show_message(&mut self, text: &str);
    fn clear_message(&mut self);
}
