//! Body landmark types
//!
//! A landmark set is the ordered list of the 17 COCO body joints detected in
//! one frame. Coordinates are normalized to [0, 1] per axis; scaling to pixel
//! space happens at render time so both output images share one scaling.

use serde::{Deserialize, Serialize};

/// COCO body joint names (17 joints)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JointName {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

/// Number of joints in a full landmark set
pub const JOINT_COUNT: usize = 17;

impl JointName {
    /// Get joint name from model output index (0-16)
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        match index {
            0 => Some(JointName::Nose),
            1 => Some(JointName::LeftEye),
            2 => Some(JointName::RightEye),
            3 => Some(JointName::LeftEar),
            4 => Some(JointName::RightEar),
            5 => Some(JointName::LeftShoulder),
            6 => Some(JointName::RightShoulder),
            7 => Some(JointName::LeftElbow),
            8 => Some(JointName::RightElbow),
            9 => Some(JointName::LeftWrist),
            10 => Some(JointName::RightWrist),
            11 => Some(JointName::LeftHip),
            12 => Some(JointName::RightHip),
            13 => Some(JointName::LeftKnee),
            14 => Some(JointName::RightKnee),
            15 => Some(JointName::LeftAnkle),
            16 => Some(JointName::RightAnkle),
            _ => None,
        }
    }

    /// Get human-readable name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            JointName::Nose => "nose",
            JointName::LeftEye => "left_eye",
            JointName::RightEye => "right_eye",
            JointName::LeftEar => "left_ear",
            JointName::RightEar => "right_ear",
            JointName::LeftShoulder => "left_shoulder",
            JointName::RightShoulder => "right_shoulder",
            JointName::LeftElbow => "left_elbow",
            JointName::RightElbow => "right_elbow",
            JointName::LeftWrist => "left_wrist",
            JointName::RightWrist => "right_wrist",
            JointName::LeftHip => "left_hip",
            JointName::RightHip => "right_hip",
            JointName::LeftKnee => "left_knee",
            JointName::RightKnee => "right_knee",
            JointName::LeftAnkle => "left_ankle",
            JointName::RightAnkle => "right_ankle",
        }
    }
}

/// Fixed anatomical topology drawn between joints.
///
/// Connections are rendered only when both endpoints clear the confidence
/// threshold, so a partially visible body degrades to fewer lines rather than
/// noisy ones.
pub const SKELETON_CONNECTIONS: &[(JointName, JointName)] = &[
    // Head
    (JointName::Nose, JointName::LeftEye),
    (JointName::Nose, JointName::RightEye),
    (JointName::LeftEye, JointName::LeftEar),
    (JointName::RightEye, JointName::RightEar),
    // Torso
    (JointName::LeftShoulder, JointName::RightShoulder),
    (JointName::LeftShoulder, JointName::LeftHip),
    (JointName::RightShoulder, JointName::RightHip),
    (JointName::LeftHip, JointName::RightHip),
    // Arms
    (JointName::LeftShoulder, JointName::LeftElbow),
    (JointName::LeftElbow, JointName::LeftWrist),
    (JointName::RightShoulder, JointName::RightElbow),
    (JointName::RightElbow, JointName::RightWrist),
    // Legs
    (JointName::LeftHip, JointName::LeftKnee),
    (JointName::LeftKnee, JointName::LeftAnkle),
    (JointName::RightHip, JointName::RightKnee),
    (JointName::RightKnee, JointName::RightAnkle),
];

/// Single detected joint with normalized coordinates and confidence
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Landmark {
    pub joint: JointName,
    /// X coordinate (normalized 0-1)
    pub x: f32,
    /// Y coordinate (normalized 0-1)
    pub y: f32,
    /// Visibility confidence (0-1)
    pub confidence: f32,
}

impl Landmark {
    #[must_use]
    pub fn new(joint: JointName, x: f32, y: f32, confidence: f32) -> Self {
        Self {
            joint,
            x,
            y,
            confidence,
        }
    }
}

/// Landmarks detected for one body in one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkSet {
    /// Detection confidence for the body as a whole (0-1)
    pub confidence: f32,
    /// All 17 joints in COCO order, each with its own visibility confidence
    pub landmarks: Vec<Landmark>,
}

impl LandmarkSet {
    /// Look up a joint by name
    #[must_use]
    pub fn joint(&self, name: JointName) -> Option<&Landmark> {
        self.landmarks.iter().find(|l| l.joint == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_name_from_index() {
        assert_eq!(JointName::from_index(0), Some(JointName::Nose));
        assert_eq!(JointName::from_index(5), Some(JointName::LeftShoulder));
        assert_eq!(JointName::from_index(16), Some(JointName::RightAnkle));
        assert_eq!(JointName::from_index(17), None);
    }

    #[test]
    fn test_connections_reference_valid_joints() {
        // Every joint name in the topology must round-trip through an index
        for (a, b) in SKELETON_CONNECTIONS {
            let found_a = (0..JOINT_COUNT).any(|i| JointName::from_index(i) == Some(*a));
            let found_b = (0..JOINT_COUNT).any(|i| JointName::from_index(i) == Some(*b));
            assert!(found_a && found_b);
        }
    }

    #[test]
    fn test_landmark_set_lookup() {
        let set = LandmarkSet {
            confidence: 0.9,
            landmarks: vec![
                Landmark::new(JointName::Nose, 0.5, 0.2, 0.8),
                Landmark::new(JointName::LeftShoulder, 0.4, 0.4, 0.7),
            ],
        };
        assert!(set.joint(JointName::Nose).is_some());
        assert!(set.joint(JointName::RightAnkle).is_none());
    }
}
