// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fine (per-pixel) shading correction.
//
// Every stored byte has a dark offset, subtracted first, and a white gain.
// The corrected sample is `(v - offset) * 240 / gain`, clamped to a byte, so
// a column that reads `gain` on the white target comes out at 240.

/// Level a column reading `gain` on the white target is mapped to.
pub const WHITE_TARGET: u32 = 240;

/// Offset and gain tables for one side, indexed by stored byte.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Calibration {
    offset: Vec<u8>,
    gain: Vec<u8>,
}

impl Calibration {
    /// Tables of equal length; gains below 1 are raised to 1.
    pub fn new(offset: Vec<u8>, mut gain: Vec<u8>) -> Self {
        gain.resize(offset.len(), 1);
        for g in &mut gain {
            *g = (*g).max(1);
        }
        Self { offset, gain }
    }

    /// Average the first `valid` bytes of every line of a lamp-off scan and
    /// a lamp-on scan.
    pub fn from_scans(dark: &[u8], white: &[u8], line_bytes: usize, valid: usize) -> Self {
        let average = |data: &[u8]| -> Vec<u8> {
            let lines = (data.len() / line_bytes.max(1)).max(1);
            (0..valid)
                .map(|j| {
                    let sum: u32 = data
                        .iter()
                        .skip(j)
                        .step_by(line_bytes.max(1))
                        .map(|&b| u32::from(b))
                        .sum();
                    (sum / lines as u32) as u8
                })
                .collect()
        };
        Self::new(average(dark), average(white))
    }

    /// Tables from the buffers a device keeps itself. Each buffer holds one
    /// byte per pixel for both sides, alternating front and back. Gray
    /// devices send one gain buffer; color devices one per channel, red
    /// first. The offset applies to every channel.
    pub fn from_device_buffers(offset: &[u8], gains: &[Vec<u8>], side: usize, valid_width: usize) -> Self {
        let channels = gains.len().max(1);
        let at = |buf: &[u8], j: usize| buf.get(j * 2 + side).copied().unwrap_or(0);
        let mut off = Vec::with_capacity(valid_width * channels);
        let mut gain = vec![1u8; valid_width * channels];
        for j in 0..valid_width {
            let o = at(offset, j).max(1);
            off.extend(std::iter::repeat_n(o, channels));
        }
        for (k, buf) in gains.iter().enumerate() {
            for j in 0..valid_width {
                let g = u32::from(at(buf, j)) * 3 / 4;
                gain[j * channels + k] = g as u8;
            }
        }
        Self::new(off, gain)
    }

    /// Bytes per line the tables cover.
    pub fn len(&self) -> usize {
        self.offset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offset.is_empty()
    }

    /// Whether the tables leave every sample unchanged.
    pub fn is_identity(&self) -> bool {
        self.offset.iter().all(|&o| o == 0)
            && self.gain.iter().all(|&g| u32::from(g) == WHITE_TARGET)
    }

    /// Correct one stored line in place. Bytes past the tables are left as
    /// they are.
    pub fn apply(&self, line: &mut [u8]) {
        for ((v, &o), &g) in line.iter_mut().zip(&self.offset).zip(&self.gain) {
            let lifted = u32::from(v.saturating_sub(o));
            *v = (lifted * WHITE_TARGET / u32::from(g)).min(255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_then_gain() {
        let cal = Calibration::new(vec![10, 10, 0], vec![120, 240, 200]);
        let mut line = [70, 5, 250];
        cal.apply(&mut line);
        // (70 - 10) * 240 / 120, 5 - 10 clamps at 0, 250 * 240 / 200 clamps at 255
        assert_eq!(line, [120, 0, 255]);
    }

    #[test]
    fn zero_gain_is_raised() {
        let cal = Calibration::new(vec![0], vec![0]);
        let mut line = [1];
        cal.apply(&mut line);
        assert_eq!(line, [240]);
    }

    #[test]
    fn bytes_past_the_tables_are_untouched() {
        let cal = Calibration::new(vec![0; 2], vec![120; 2]);
        let mut line = [10, 10, 10];
        cal.apply(&mut line);
        assert_eq!(line, [20, 20, 10]);
    }

    #[test]
    fn scans_are_averaged_per_column() {
        // three lines of four bytes, last column outside the valid width
        let dark = [0, 4, 8, 99, 2, 4, 8, 99, 4, 4, 8, 99];
        let white = [200, 240, 0, 99, 210, 240, 0, 99, 220, 240, 0, 99];
        let cal = Calibration::from_scans(&dark, &white, 4, 3);
        assert_eq!(cal.len(), 3);
        assert_eq!(cal.offset, vec![2, 4, 8]);
        assert_eq!(cal.gain, vec![210, 240, 1]);
    }

    #[test]
    fn flat_scans_give_identity() {
        let cal = Calibration::from_scans(&[0; 8], &[240; 8], 4, 4);
        assert!(cal.is_identity());
    }

    #[test]
    fn device_buffers_split_sides_and_channels() {
        // two pixels, front then back per pixel
        let offset = [0, 5, 7, 9];
        let gains = vec![vec![160, 200, 240, 80], vec![4, 4, 4, 4], vec![0, 0, 0, 0]];
        let front = Calibration::from_device_buffers(&offset, &gains, 0, 2);
        assert_eq!(front.offset, vec![1, 1, 1, 7, 7, 7]);
        assert_eq!(front.gain, vec![120, 3, 1, 180, 3, 1]);
        let back = Calibration::from_device_buffers(&offset, &gains[..1], 1, 2);
        assert_eq!(back.offset, vec![5, 9]);
        assert_eq!(back.gain, vec![150, 60]);
    }
}
