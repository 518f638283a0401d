/// Axis-aligned box in frame pixel coordinates.
///
/// Always satisfies `x_min <= x_max` and `y_min <= y_max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub x_min: i32,
    pub y_min: i32,
    pub x_max: i32,
    pub y_max: i32,
}

impl BoundingBox {
    /// Build a box from two corners, swapping them if given out of order.
    pub fn new(x_min: i32, y_min: i32, x_max: i32, y_max: i32) -> Self {
        Self {
            x_min: x_min.min(x_max),
            y_min: y_min.min(y_max),
            x_max: x_min.max(x_max),
            y_max: y_min.max(y_max),
        }
    }

    /// Integer centre, truncating toward the top-left corner.
    pub fn center(&self) -> (i32, i32) {
        (
            self.x_min + (self.x_max - self.x_min) / 2,
            self.y_min + (self.y_max - self.y_min) / 2,
        )
    }

    pub fn width(&self) -> i32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> i32 {
        self.y_max - self.y_min
    }
}

/// One object reported by a detector for a single frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    /// Index into the label taxonomy.
    pub class_id: u32,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    pub fn new(class_id: u32, confidence: f32, bbox: BoundingBox) -> Self {
        Self {
            class_id,
            confidence: confidence.clamp(0.0, 1.0),
            bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_are_normalised() {
        let bbox = BoundingBox::new(200, 300, 100, 100);
        assert_eq!(bbox, BoundingBox::new(100, 100, 200, 300));
        assert_eq!(bbox.width(), 100);
        assert_eq!(bbox.height(), 200);
    }

    #[test]
    fn center_truncates() {
        assert_eq!(BoundingBox::new(100, 100, 200, 300).center(), (150, 200));
        assert_eq!(BoundingBox::new(0, 0, 5, 3).center(), (2, 1));
    }
}
