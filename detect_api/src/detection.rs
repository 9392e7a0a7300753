use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
#[error("malformed detection: expected at least 6 fields, got {len}")]
pub struct MalformedDetection {
    pub len: usize,
}

/// One predicted box in the pixel space of the resized 640x640 model
/// input, in center/width/height form. Confidence range and class_id
/// integrality are passed through unchecked.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detection {
    pub center_x: f32,
    pub center_y: f32,
    pub width: f32,
    pub height: f32,
    pub confidence: f32,
    pub class_id: f32,
}

impl Detection {
    /// Reads the first six fields of a prediction row; extra fields are
    /// ignored.
    pub fn from_row(row: &[f32]) -> Result<Self, MalformedDetection> {
        if row.len() < 6 {
            return Err(MalformedDetection { len: row.len() });
        }

        Ok(Self {
            center_x: row[0],
            center_y: row[1],
            width: row[2],
            height: row[3],
            confidence: row[4],
            class_id: row[5],
        })
    }

    /// Corner form, truncated toward zero. Truncation, not rounding: it
    /// shifts an edge by up to one pixel and matches the source pipeline.
    pub fn corners(&self) -> (i32, i32, i32, i32) {
        let x_min = (self.center_x - self.width / 2.) as i32;
        let y_min = (self.center_y - self.height / 2.) as i32;
        let x_max = (self.center_x + self.width / 2.) as i32;
        let y_max = (self.center_y + self.height / 2.) as i32;
        (x_min, y_min, x_max, y_max)
    }
}
