//! Line sensor frames and the fusion step that turns them into a lateral error.
//!
//! A frame carries one bit per photo-reflective sensor, bit 0 being the
//! leftmost channel. Polarity is normalized before a frame reaches this
//! module: a set bit always means "line detected under this sensor".

use core::fmt;

/// Number of discrete sensors on the array.
pub const SENSOR_COUNT: u8 = 8;

/// Geometric center index of the array, in sensor-index units.
pub const ARRAY_CENTER: i32 = 3;

/// One sample of the sensor array.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub struct SensorFrame(u8);

impl SensorFrame {
    /// Frame with no sensor reporting a line.
    pub const EMPTY: Self = Self(0);

    /// Frame with every channel set. The array reports this when it is lifted
    /// off the track surface, which the control loop treats as a cutout.
    pub const SATURATED: Self = Self(0xFF);

    /// Wraps an already-normalized bitmask.
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Builds a frame from raw port levels where a low level means "line".
    #[must_use]
    pub const fn from_active_low(levels: u8) -> Self {
        Self(!levels)
    }

    /// Returns the raw bitmask.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` when the sensor at `index` sees the line.
    #[must_use]
    pub const fn is_active(self, index: u8) -> bool {
        index < SENSOR_COUNT && (self.0 >> index) & 1 == 1
    }

    /// Number of sensors currently over the line.
    #[must_use]
    pub const fn active_count(self) -> u32 {
        self.0.count_ones()
    }

    /// Sum of the indices of every active sensor.
    #[must_use]
    pub fn active_index_sum(self) -> u32 {
        (0..SENSOR_COUNT)
            .filter(|&index| self.is_active(index))
            .map(u32::from)
            .sum()
    }
}

impl From<u8> for SensorFrame {
    fn from(bits: u8) -> Self {
        Self(bits)
    }
}

impl fmt::Display for SensorFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for index in 0..SENSOR_COUNT {
            f.write_str(if self.is_active(index) { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Result of fusing one frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FusedError {
    /// Line seen; signed offset from the array center.
    Line(i32),
    /// No sensor active, the offset is undefined.
    Lost,
}

impl FusedError {
    /// Returns the offset, or `fallback` when the line was lost.
    #[must_use]
    pub const fn error_or(self, fallback: i32) -> i32 {
        match self {
            FusedError::Line(error) => error,
            FusedError::Lost => fallback,
        }
    }

    /// Returns `true` when no sensor saw the line.
    #[must_use]
    pub const fn is_lost(self) -> bool {
        matches!(self, FusedError::Lost)
    }
}

/// Weighted-centroid fusion over the sensor array.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SensorFusion {
    center: i32,
}

impl SensorFusion {
    /// Creates a fusion stage referenced to `center`.
    #[must_use]
    pub const fn new(center: i32) -> Self {
        Self { center }
    }

    /// Center index the error is measured against.
    #[must_use]
    pub const fn center(&self) -> i32 {
        self.center
    }

    /// Integer centroid of the active sensors minus the center index.
    ///
    /// The centroid truncates toward zero, so an error of `-3..=4` comes out
    /// of an eight-sensor array centered on index 3.
    #[must_use]
    pub fn fuse(&self, frame: SensorFrame) -> FusedError {
        let count = frame.active_count();
        if count == 0 {
            return FusedError::Lost;
        }
        let centroid = frame.active_index_sum() / count;
        // Centroid is at most SENSOR_COUNT - 1.
        let centroid = i32::try_from(centroid).unwrap_or(i32::MAX);
        FusedError::Line(centroid - self.center)
    }
}

impl Default for SensorFusion {
    fn default() -> Self {
        Self::new(ARRAY_CENTER)
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use std::string::ToString;

    use super::*;

    fn manual_error(bits: u8) -> Option<i32> {
        let mut sum = 0i32;
        let mut count = 0i32;
        for index in 0..8 {
            if bits & (1 << index) != 0 {
                sum += index;
                count += 1;
            }
        }
        if count == 0 {
            None
        } else {
            Some(sum / count - ARRAY_CENTER)
        }
    }

    #[test]
    fn fusion_matches_manual_centroid_for_every_frame() {
        let fusion = SensorFusion::default();
        for bits in 0..=u8::MAX {
            let fused = fusion.fuse(SensorFrame::from_bits(bits));
            match manual_error(bits) {
                Some(expected) => assert_eq!(fused, FusedError::Line(expected), "frame {bits:#04x}"),
                None => assert_eq!(fused, FusedError::Lost),
            }
        }
    }

    #[test]
    fn single_sensor_offsets_span_the_array() {
        let fusion = SensorFusion::default();
        assert_eq!(fusion.fuse(SensorFrame::from_bits(0b0000_0001)), FusedError::Line(-3));
        assert_eq!(fusion.fuse(SensorFrame::from_bits(0b0000_1000)), FusedError::Line(0));
        assert_eq!(fusion.fuse(SensorFrame::from_bits(0b1000_0000)), FusedError::Line(4));
    }

    #[test]
    fn centroid_truncates() {
        let fusion = SensorFusion::default();
        // Sensors 3 and 4: (3 + 4) / 2 = 3.
        assert_eq!(fusion.fuse(SensorFrame::from_bits(0b0001_1000)), FusedError::Line(0));
        // Sensors 0 and 1: (0 + 1) / 2 = 0.
        assert_eq!(fusion.fuse(SensorFrame::from_bits(0b0000_0011)), FusedError::Line(-3));
    }

    #[test]
    fn empty_frame_reports_lost_with_fallback() {
        let fused = SensorFusion::default().fuse(SensorFrame::EMPTY);
        assert!(fused.is_lost());
        assert_eq!(fused.error_or(2), 2);
    }

    #[test]
    fn active_low_levels_are_inverted() {
        let frame = SensorFrame::from_active_low(0b1111_0111);
        assert_eq!(frame.bits(), 0b0000_1000);
        assert_eq!(frame.active_count(), 1);
        assert_eq!(frame.active_index_sum(), 3);
    }

    #[test]
    fn display_lists_sensor_zero_first() {
        assert_eq!(SensorFrame::from_bits(0b0000_0011).to_string(), "11000000");
    }
}
