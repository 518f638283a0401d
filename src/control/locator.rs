//! Target selection.

use crate::control::mode::Mode;
use crate::detect::Detection;

/// Class id of the follow target ("person").
pub const PERSON_CLASS_ID: u32 = 0;

/// Integer pixel centre of the selected target.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnchorPoint {
    pub x: i32,
    pub y: i32,
}

/// Pick the target for this frame.
///
/// In `ObjectDetection` nothing is ever selected. In `FollowPerson` the last
/// person detection in detector order wins; the detector has already applied
/// its confidence threshold.
pub fn locate_target(detections: &[Detection], mode: Mode) -> Option<AnchorPoint> {
    if mode != Mode::FollowPerson {
        return None;
    }
    detections
        .iter()
        .rev()
        .find(|d| d.class_id == PERSON_CLASS_ID)
        .map(|d| {
            let (x, y) = d.bbox.center();
            AnchorPoint { x, y }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn det(class_id: u32, cx: i32, cy: i32) -> Detection {
        Detection::new(class_id, 0.9, BoundingBox::new(cx - 10, cy - 10, cx + 10, cy + 10))
    }

    #[test]
    fn detection_mode_never_selects() {
        assert_eq!(locate_target(&[det(0, 100, 100)], Mode::ObjectDetection), None);
    }

    #[test]
    fn last_person_wins() {
        let dets = [det(0, 100, 100), det(2, 320, 240), det(0, 500, 500), det(5, 10, 10)];
        assert_eq!(
            locate_target(&dets, Mode::FollowPerson),
            Some(AnchorPoint { x: 500, y: 500 })
        );
    }

    #[test]
    fn no_person_means_no_target() {
        assert_eq!(locate_target(&[det(1, 100, 100), det(3, 5, 5)], Mode::FollowPerson), None);
        assert_eq!(locate_target(&[], Mode::FollowPerson), None);
    }

    #[test]
    fn anchor_is_integer_bbox_center() {
        let d = Detection::new(0, 0.6, BoundingBox::new(100, 100, 200, 300));
        assert_eq!(
            locate_target(&[d], Mode::FollowPerson),
            Some(AnchorPoint { x: 150, y: 200 })
        );
    }
}
