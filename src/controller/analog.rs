//! Analog stick processing
//!
//! Axis samples arrive one axis at a time and are stored as-is. Once per tick
//! [`AnalogProcessor::tick`] derives five vectors per stick from the latest
//! pair:
//!
//! ```text
//! raw            (h, v) unchanged
//! raw_quantized  (sign h, sign v)
//! normalized     raw / |raw|, or zero
//! deadzoned      normalized if |raw| >= deadzone, else zero
//! angled         raw direction snapped to the nearest table angle if
//!                |raw| >= deadzone and raw is not (0, 0), else zero
//! ```

use glam::{IVec2, Vec2};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use tracing::{debug, warn};

use super::action::{Stick, StickAxis};

/// Magnitudes at or below this normalize to the zero vector
pub const NORMALIZE_EPSILON: f32 = 1e-5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalogSettings {
    pub left_deadzone: f32,
    pub right_deadzone: f32,
    /// Number of snap directions for the angled vector (8 for 8-way movement)
    pub angle_divisions: NonZeroU32,
    /// Clamp every stored sample into [-1, 1]
    pub clamp_axis_input: bool,
}

impl Default for AnalogSettings {
    fn default() -> Self {
        Self {
            left_deadzone: 0.5,
            right_deadzone: 0.5,
            angle_divisions: NonZeroU32::new(32).unwrap_or(NonZeroU32::MIN),
            clamp_axis_input: false,
        }
    }
}

impl AnalogSettings {
    pub fn deadzone(&self, stick: Stick) -> f32 {
        match stick {
            Stick::Left => self.left_deadzone,
            Stick::Right => self.right_deadzone,
        }
    }
}

/// Evenly spaced snap angles in degrees, closed with an explicit 360° entry
#[derive(Clone, Debug, PartialEq)]
pub struct AngleTable {
    angles: Vec<f32>,
}

impl AngleTable {
    pub fn new(divisions: NonZeroU32) -> Self {
        let divisions = divisions.get();
        let increment = 360.0 / divisions as f32;

        let mut angles: Vec<f32> = (0..divisions).map(|i| i as f32 * increment).collect();
        angles.push(360.0);

        debug!(
            "Built angle table with {} divisions ({:.4}° apart)",
            divisions, increment
        );
        Self { angles }
    }

    pub fn angles(&self) -> &[f32] {
        &self.angles
    }

    /// Table entry closest to `angle`
    ///
    /// Scans from the last entry to the first and keeps the first strict
    /// minimum, so an exact midpoint resolves to the higher entry.
    pub fn nearest(&self, angle: f32) -> f32 {
        let mut min_difference = f32::MAX;
        let mut closest = 0.0;

        for &division in self.angles.iter().rev() {
            let difference = (angle - division).abs();
            if difference < min_difference {
                min_difference = difference;
                closest = division;
            }
        }

        closest
    }
}

/// Latest raw values of one stick
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StickSample {
    pub horizontal: f32,
    pub vertical: f32,
    pub horizontal_sign: i32,
    pub vertical_sign: i32,
}

impl StickSample {
    fn set(&mut self, axis: StickAxis, value: f32) {
        match axis {
            StickAxis::Horizontal => {
                self.horizontal = value;
                self.horizontal_sign = sign(value);
            }
            StickAxis::Vertical => {
                self.vertical = value;
                self.vertical_sign = sign(value);
            }
        }
    }

    pub fn raw(&self) -> Vec2 {
        Vec2::new(self.horizontal, self.vertical)
    }

    pub fn quantized(&self) -> IVec2 {
        IVec2::new(self.horizontal_sign, self.vertical_sign)
    }
}

fn sign(value: f32) -> i32 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DerivedStickVectors {
    pub raw: Vec2,
    pub raw_quantized: IVec2,
    pub normalized: Vec2,
    pub deadzoned: Vec2,
    pub angled: Vec2,
}

impl DerivedStickVectors {
    pub fn compute(sample: &StickSample, deadzone: f32, table: &AngleTable) -> Self {
        let raw = sample.raw();
        let magnitude = raw.length();

        let normalized = if magnitude > NORMALIZE_EPSILON {
            raw / magnitude
        } else {
            Vec2::ZERO
        };

        // An exactly centered stick has no direction, even with a zero threshold
        let outside_deadzone = magnitude >= deadzone && raw != Vec2::ZERO;

        let deadzoned = if outside_deadzone {
            normalized
        } else {
            Vec2::ZERO
        };

        let angled = if outside_deadzone {
            let mut angle = raw.y.atan2(raw.x).to_degrees();
            if angle < 0.0 {
                angle += 360.0;
            }
            let (sin, cos) = table.nearest(angle).to_radians().sin_cos();
            Vec2::new(cos, sin)
        } else {
            Vec2::ZERO
        };

        Self {
            raw,
            raw_quantized: sample.quantized(),
            normalized,
            deadzoned,
            angled,
        }
    }
}

#[derive(Clone, Debug)]
pub struct AnalogProcessor {
    settings: AnalogSettings,
    table: AngleTable,
    left_sample: StickSample,
    right_sample: StickSample,
    left: DerivedStickVectors,
    right: DerivedStickVectors,
}

impl AnalogProcessor {
    pub fn new(settings: AnalogSettings) -> Self {
        let table = AngleTable::new(settings.angle_divisions);
        Self {
            settings,
            table,
            left_sample: StickSample::default(),
            right_sample: StickSample::default(),
            left: DerivedStickVectors::default(),
            right: DerivedStickVectors::default(),
        }
    }

    pub fn settings(&self) -> &AnalogSettings {
        &self.settings
    }

    pub fn angle_table(&self) -> &AngleTable {
        &self.table
    }

    pub fn on_axis_sample(&mut self, stick: Stick, axis: StickAxis, value: f32) {
        let value = if !value.is_finite() {
            warn!("Dropping non-finite {:?} {:?} sample: {}", stick, axis, value);
            0.0
        } else if self.settings.clamp_axis_input {
            value.clamp(-1.0, 1.0)
        } else {
            value
        };

        match stick {
            Stick::Left => self.left_sample.set(axis, value),
            Stick::Right => self.right_sample.set(axis, value),
        }
    }

    /// Recomputes the derived vectors of both sticks
    pub fn tick(&mut self) {
        self.left = DerivedStickVectors::compute(
            &self.left_sample,
            self.settings.left_deadzone,
            &self.table,
        );
        self.right = DerivedStickVectors::compute(
            &self.right_sample,
            self.settings.right_deadzone,
            &self.table,
        );
    }

    pub fn sample(&self, stick: Stick) -> &StickSample {
        match stick {
            Stick::Left => &self.left_sample,
            Stick::Right => &self.right_sample,
        }
    }

    pub fn stick(&self, stick: Stick) -> &DerivedStickVectors {
        match stick {
            Stick::Left => &self.left,
            Stick::Right => &self.right,
        }
    }

    pub fn left(&self) -> &DerivedStickVectors {
        &self.left
    }

    pub fn right(&self) -> &DerivedStickVectors {
        &self.right
    }

    /// Zeroes samples and vectors; the angle table is kept
    pub fn reset(&mut self) {
        self.left_sample = StickSample::default();
        self.right_sample = StickSample::default();
        self.left = DerivedStickVectors::default();
        self.right = DerivedStickVectors::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn divisions(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn assert_vec_eq(actual: Vec2, expected: Vec2) {
        assert!(
            (actual - expected).length() < EPS,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    fn processor(deadzone: f32, n: u32) -> AnalogProcessor {
        AnalogProcessor::new(AnalogSettings {
            left_deadzone: deadzone,
            right_deadzone: deadzone,
            angle_divisions: divisions(n),
            clamp_axis_input: false,
        })
    }

    #[test]
    fn table_with_32_divisions() {
        let table = AngleTable::new(divisions(32));
        let angles = table.angles();

        assert_eq!(angles.len(), 33);
        assert_eq!(angles[0], 0.0);
        assert_eq!(angles[1], 11.25);
        assert_eq!(angles[2], 22.5);
        assert_eq!(angles[31], 348.75);
        assert_eq!(angles[32], 360.0);
    }

    #[test]
    fn single_division_table() {
        let table = AngleTable::new(divisions(1));
        assert_eq!(table.angles(), &[0.0, 360.0]);
        assert_eq!(table.nearest(90.0), 0.0);
        assert_eq!(table.nearest(270.0), 360.0);
    }

    #[test]
    fn nearest_near_full_turn_is_stable() {
        let table = AngleTable::new(divisions(32));
        let first = table.nearest(359.0);
        assert_eq!(first, 360.0);
        for _ in 0..10 {
            assert_eq!(table.nearest(359.0), first);
        }
        assert_eq!(table.nearest(1.0), 0.0);
    }

    #[test]
    fn exact_midpoint_resolves_to_higher_entry() {
        let table = AngleTable::new(divisions(8));
        assert_eq!(table.nearest(22.5), 45.0);
        assert_eq!(table.nearest(337.5), 360.0);
        assert_eq!(table.nearest(180.0), 180.0);
    }

    #[test]
    fn sample_updates_sign_per_axis() {
        let mut analog = processor(0.5, 8);
        analog.on_axis_sample(Stick::Left, StickAxis::Horizontal, -0.2);
        analog.on_axis_sample(Stick::Left, StickAxis::Vertical, 0.0);
        analog.tick();

        assert_eq!(analog.left().raw_quantized, IVec2::new(-1, 0));
        assert_vec_eq(analog.left().raw, Vec2::new(-0.2, 0.0));
        assert_eq!(analog.right().raw_quantized, IVec2::ZERO);
    }

    #[test]
    fn outside_deadzone_on_positive_x() {
        let mut analog = processor(0.5, 8);
        analog.on_axis_sample(Stick::Left, StickAxis::Horizontal, 0.6);
        analog.on_axis_sample(Stick::Left, StickAxis::Vertical, 0.0);
        analog.tick();

        let left = analog.left();
        assert_vec_eq(left.raw, Vec2::new(0.6, 0.0));
        assert_vec_eq(left.normalized, Vec2::new(1.0, 0.0));
        assert_vec_eq(left.deadzoned, Vec2::new(1.0, 0.0));
        assert_vec_eq(left.angled, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn zero_input_yields_zero_vectors() {
        let mut analog = processor(0.5, 8);
        analog.tick();

        assert_eq!(*analog.left(), DerivedStickVectors::default());
        assert_eq!(*analog.right(), DerivedStickVectors::default());
    }

    #[test]
    fn zero_input_stays_zero_without_deadzone() {
        let mut analog = processor(0.0, 8);
        analog.tick();

        assert_eq!(analog.left().angled, Vec2::ZERO);
        assert_eq!(analog.left().deadzoned, Vec2::ZERO);
    }

    #[test]
    fn tiny_deflection_past_threshold_still_snaps() {
        let table = AngleTable::new(NonZeroU32::new(8).unwrap());
        let mut sample = StickSample::default();
        sample.set(StickAxis::Vertical, 5e-6);

        let vectors = DerivedStickVectors::compute(&sample, 1e-6, &table);

        assert_eq!(vectors.normalized, Vec2::ZERO);
        assert_eq!(vectors.deadzoned, Vec2::ZERO);
        assert_vec_eq(vectors.angled, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn inside_deadzone_gates_any_direction() {
        let mut analog = processor(0.5, 8);
        for degrees in [0.0f32, 45.0, 137.0, 260.0, 359.0] {
            let (sin, cos) = degrees.to_radians().sin_cos();
            analog.on_axis_sample(Stick::Right, StickAxis::Horizontal, 0.3 * cos);
            analog.on_axis_sample(Stick::Right, StickAxis::Vertical, 0.3 * sin);
            analog.tick();

            let right = analog.right();
            assert_eq!(right.deadzoned, Vec2::ZERO);
            assert_eq!(right.angled, Vec2::ZERO);
            assert!(right.normalized.length() > 0.99);
        }
    }

    #[test]
    fn angled_snaps_to_eight_directions() {
        let mut analog = processor(0.2, 8);
        analog.on_axis_sample(Stick::Left, StickAxis::Horizontal, 0.7);
        analog.on_axis_sample(Stick::Left, StickAxis::Vertical, 0.6);
        analog.tick();

        let diagonal = std::f32::consts::FRAC_1_SQRT_2;
        assert_vec_eq(analog.left().angled, Vec2::new(diagonal, diagonal));
    }

    #[test]
    fn angled_below_x_axis_wraps_into_positive_degrees() {
        let mut analog = processor(0.2, 4);
        analog.on_axis_sample(Stick::Left, StickAxis::Horizontal, 0.1);
        analog.on_axis_sample(Stick::Left, StickAxis::Vertical, -0.9);
        analog.tick();

        assert_vec_eq(analog.left().angled, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn per_stick_deadzones() {
        let mut analog = AnalogProcessor::new(AnalogSettings {
            left_deadzone: 0.2,
            right_deadzone: 0.8,
            ..AnalogSettings::default()
        });
        for stick in [Stick::Left, Stick::Right] {
            analog.on_axis_sample(stick, StickAxis::Vertical, 0.5);
        }
        analog.tick();

        assert_vec_eq(analog.left().deadzoned, Vec2::new(0.0, 1.0));
        assert_eq!(analog.right().deadzoned, Vec2::ZERO);
    }

    #[test]
    fn tick_is_idempotent() {
        let mut analog = processor(0.5, 32);
        analog.on_axis_sample(Stick::Right, StickAxis::Horizontal, -0.4);
        analog.on_axis_sample(Stick::Right, StickAxis::Vertical, 0.8);
        analog.tick();
        let first = *analog.right();
        analog.tick();

        assert_eq!(*analog.right(), first);
    }

    #[test]
    fn out_of_range_samples_pass_through_by_default() {
        let mut analog = processor(0.5, 8);
        analog.on_axis_sample(Stick::Left, StickAxis::Horizontal, 3.0);
        analog.tick();

        assert_vec_eq(analog.left().raw, Vec2::new(3.0, 0.0));
        assert_vec_eq(analog.left().normalized, Vec2::new(1.0, 0.0));
    }

    #[test]
    fn clamp_policy_limits_samples() {
        let mut analog = AnalogProcessor::new(AnalogSettings {
            clamp_axis_input: true,
            ..AnalogSettings::default()
        });
        analog.on_axis_sample(Stick::Left, StickAxis::Horizontal, 3.0);
        analog.on_axis_sample(Stick::Left, StickAxis::Vertical, -7.5);
        analog.tick();

        assert_vec_eq(analog.left().raw, Vec2::new(1.0, -1.0));
    }

    #[test]
    fn non_finite_samples_are_zeroed() {
        let mut analog = processor(0.5, 8);
        analog.on_axis_sample(Stick::Left, StickAxis::Horizontal, f32::NAN);
        analog.on_axis_sample(Stick::Left, StickAxis::Vertical, f32::INFINITY);
        analog.tick();

        assert_eq!(*analog.left(), DerivedStickVectors::default());
    }

    #[test]
    fn reset_keeps_table() {
        let mut analog = processor(0.5, 8);
        analog.on_axis_sample(Stick::Left, StickAxis::Horizontal, 0.9);
        analog.tick();
        analog.reset();

        assert_eq!(*analog.sample(Stick::Left), StickSample::default());
        assert_eq!(*analog.left(), DerivedStickVectors::default());
        assert_eq!(analog.angle_table().angles().len(), 9);
    }
}
