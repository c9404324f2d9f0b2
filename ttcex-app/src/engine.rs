use std::collections::HashMap;
use tracing::{debug, info};
use ttcex_cache::Prefab;
use ttcex_core::{FeedbackColor, ObjectKey, Pose, Vec3};
use ttcex_experiment::Engine;

/// Engine stand-in for running without a headset: keeps the scene in memory
/// and logs what a renderer would show.
#[derive(Debug)]
pub struct HeadlessEngine {
    head: Pose,
    objects: HashMap<ObjectKey, (Pose, bool)>,
    feedback_color: FeedbackColor,
    message: Option<String>,
}

impl HeadlessEngine {
    pub fn new(head_position: Vec3) -> Self {
        Self {
            head: Pose::new(head_position, Vec3::ZERO),
            objects: HashMap::new(),
            feedback_color: FeedbackColor::default(),
            message: None,
        }
    }

    pub fn visible_objects(&self) -> usize {
        self.objects.values().filter(|(_, visible)| *visible).count()
    }
}

impl Engine for HeadlessEngine {
    fn head_pose(&self) -> Pose {
        self.head
    }

    fn spawn_object(&mut self, key: ObjectKey, prefab: &Prefab, scale: Vec3, pose: Pose) {
        debug!(
            object = key.object_index,
            prefab = %prefab.name,
            ?scale,
            position = ?pose.position,
            "spawn"
        );
        self.objects.insert(key, (pose, true));
    }

    fn move_object(&mut self, key: ObjectKey, pose: Pose) {
        if let Some(entry) = self.objects.get_mut(&key) {
            entry.0 = pose;
        }
    }

    fn hide_object(&mut self, key: ObjectKey) {
        let Some(entry) = self.objects.get_mut(&key) else {
            return;
        };
        entry.1 = false;
        let position = entry.0.position;
        debug!(
            object = key.object_index,
            ?position,
            still_visible = self.visible_objects(),
            "hide"
        );
    }

    fn clear_objects(&mut self) {
        self.objects.clear();
    }

    fn configure_feedback(&mut self, position: Vec3, size: u32, color: FeedbackColor) {
        debug!(?position, size, color = color.name(), rgba = ?color.rgba(), "feedback canvas");
        self.feedback_color = color;
    }

    fn show_message(&mut self, text: &str) {
        info!(color = self.feedback_color.name(), "display: {text}");
        self.message = Some(text.to_string());
    }

    fn clear_message(&mut self) {
        self.message = None;
    }
}
