//! Frame-number + sub-frame time values.
//!
//! A [`FrameTime`] keeps its fractional part in `[0, 1)`: negative times are
//! stored as a more negative frame with a non-negative sub-frame, so `-0.25`
//! frames is `(-1, 0.75)`.

use std::cmp::Ordering;
use std::ops;

use serde::{Deserialize, Serialize};

/// Largest representable sub-frame. Clamping to it keeps float noise from
/// rounding a fraction up into a whole frame.
pub const MAX_SUBFRAME: f32 = 1.0 - f32::EPSILON / 2.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameTime {
    frame: i32,
    subframe: f32,
}

impl FrameTime {
    /// Build a frame time; the sub-frame is clamped into `[0, MAX_SUBFRAME]`.
    #[inline]
    pub fn new(frame: i32, subframe: f32) -> Self {
        Self::normalized(frame, subframe)
    }

    #[inline]
    pub fn from_frame(frame: i32) -> Self {
        Self {
            frame,
            subframe: 0.0,
        }
    }

    #[inline]
    pub fn zero() -> Self {
        Self::default()
    }

    #[inline]
    pub fn frame(&self) -> i32 {
        self.frame
    }

    #[inline]
    pub fn subframe(&self) -> f32 {
        self.subframe
    }

    #[inline]
    fn normalized(frame: i32, subframe: f32) -> Self {
        let subframe = if subframe.is_nan() {
            0.0
        } else {
            subframe.clamp(0.0, MAX_SUBFRAME)
        };
        Self { frame, subframe }
    }

    /// Sum of two frame times, carrying whole frames out of the sub-frame.
    pub fn add(self, rhs: FrameTime) -> FrameTime {
        let subframe = self.subframe + rhs.subframe;
        let carry = subframe.floor();
        let frame = self
            .frame
            .saturating_add(rhs.frame)
            .saturating_add(carry as i32);
        Self::normalized(frame, subframe - carry)
    }

    /// Difference of two frame times, borrowing a whole frame when the
    /// sub-frame would go negative.
    pub fn sub(self, rhs: FrameTime) -> FrameTime {
        let subframe = self.subframe - rhs.subframe;
        let borrow = subframe.floor();
        let frame = self
            .frame
            .saturating_sub(rhs.frame)
            .saturating_add(borrow as i32);
        Self::normalized(frame, subframe - borrow)
    }

    /// Scale through the decimal representation: `from_decimal(as_decimal() * factor)`.
    #[inline]
    pub fn scale(self, factor: f64) -> FrameTime {
        Self::from_decimal(self.as_decimal() * factor)
    }

    /// Remainder of `self / rhs`. Whole-frame operands use integer remainder;
    /// otherwise the result is `self` reduced by whole multiples of `rhs`.
    /// A zero divisor yields zero.
    pub fn modulo(self, rhs: FrameTime) -> FrameTime {
        if rhs.frame == 0 && rhs.subframe == 0.0 {
            tracing::warn!("FrameTime::modulo by zero");
            return Self::zero();
        }
        if self.subframe == 0.0 && rhs.subframe == 0.0 {
            return Self::from_frame(self.frame % rhs.frame);
        }
        let (a, b) = (self.as_decimal(), rhs.as_decimal());
        if a < b {
            return self;
        }
        Self::from_decimal(a % b)
    }

    #[inline]
    pub fn floor_to_frame(&self) -> FrameTime {
        Self::from_frame(self.frame)
    }

    #[inline]
    pub fn ceil_to_frame(&self) -> FrameTime {
        if self.subframe > 0.0 {
            Self::from_frame(self.frame.saturating_add(1))
        } else {
            Self::from_frame(self.frame)
        }
    }

    #[inline]
    pub fn round_to_frame(&self) -> FrameTime {
        if self.subframe < 0.5 {
            Self::from_frame(self.frame)
        } else {
            Self::from_frame(self.frame.saturating_add(1))
        }
    }

    #[inline]
    pub fn as_decimal(&self) -> f64 {
        self.frame as f64 + self.subframe as f64
    }

    /// Floor to get the frame, keep the remainder as the sub-frame (clamped to
    /// [`MAX_SUBFRAME`]). Non-finite input maps to zero.
    pub fn from_decimal(value: f64) -> FrameTime {
        if value.is_nan() {
            return Self::zero();
        }
        let floored = value.floor();
        let subframe = ((value - floored) as f32).min(MAX_SUBFRAME);
        Self::normalized(floored as i32, subframe)
    }

    /// Convert seconds at `frame_rate` frames per second.
    #[inline]
    pub fn from_seconds(seconds: f64, frame_rate: i32) -> FrameTime {
        Self::from_decimal(seconds * frame_rate as f64)
    }

    /// Seconds at `frame_rate`; zero for a non-positive rate.
    #[inline]
    pub fn as_seconds(&self, frame_rate: i32) -> f64 {
        if frame_rate <= 0 {
            return 0.0;
        }
        self.as_decimal() / frame_rate as f64
    }
}

impl PartialOrd for FrameTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.frame.cmp(&other.frame) {
            Ordering::Equal => self.subframe.partial_cmp(&other.subframe),
            ord => Some(ord),
        }
    }
}

impl ops::Add for FrameTime {
    type Output = FrameTime;

    fn add(self, rhs: FrameTime) -> FrameTime {
        FrameTime::add(self, rhs)
    }
}

impl ops::Sub for FrameTime {
    type Output = FrameTime;

    fn sub(self, rhs: FrameTime) -> FrameTime {
        FrameTime::sub(self, rhs)
    }
}

impl ops::Rem for FrameTime {
    type Output = FrameTime;

    fn rem(self, rhs: FrameTime) -> FrameTime {
        self.modulo(rhs)
    }
}

impl ops::Mul<f64> for FrameTime {
    type Output = FrameTime;

    fn mul(self, rhs: f64) -> FrameTime {
        self.scale(rhs)
    }
}

impl From<i32> for FrameTime {
    fn from(frame: i32) -> Self {
        Self::from_frame(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_carries_whole_frames() {
        let a = FrameTime::new(2, 0.75);
        let b = FrameTime::new(1, 0.5);
        let sum = a + b;
        assert_eq!(sum.frame(), 4);
        assert_eq!(sum.subframe(), 0.25);
    }

    #[test]
    fn subtraction_borrows_and_keeps_subframe_positive() {
        let diff = FrameTime::new(1, 0.25) - FrameTime::new(1, 0.5);
        assert_eq!(diff.frame(), -1);
        assert_eq!(diff.subframe(), 0.75);
        assert_eq!(diff.as_decimal(), -0.25);
    }

    #[test]
    fn tiny_borrow_never_produces_a_full_subframe() {
        let diff = FrameTime::new(3, 0.0) - FrameTime::new(0, 1.0e-9);
        assert_eq!(diff.frame(), 2);
        assert!(diff.subframe() < 1.0);
        assert_eq!(diff.subframe(), MAX_SUBFRAME);
    }

    #[test]
    fn negative_decimal_uses_more_negative_frame() {
        let t = FrameTime::from_decimal(-2.5);
        assert_eq!(t.frame(), -3);
        assert_eq!(t.subframe(), 0.5);
    }

    #[test]
    fn from_decimal_clamps_subframe() {
        let t = FrameTime::from_decimal(4.999_999_999_9);
        assert_eq!(t.frame(), 4);
        assert_eq!(t.subframe(), MAX_SUBFRAME);
        assert_eq!(t.floor_to_frame(), FrameTime::from_frame(4));
    }

    #[test]
    fn decimal_round_trip() {
        for (frame, sub) in [(0, 0.0), (7, 0.5), (-4, 0.125), (120, 0.3), (3, MAX_SUBFRAME)] {
            let t = FrameTime::new(frame, sub);
            assert_eq!(FrameTime::from_decimal(t.as_decimal()), t);
        }
    }

    #[test]
    fn scale_goes_through_decimal() {
        let t = FrameTime::new(3, 0.5);
        assert_eq!(t.scale(2.0), FrameTime::from_frame(7));
        assert_eq!(t * 0.5, FrameTime::from_decimal(1.75));
    }

    #[test]
    fn modulo_whole_and_fractional() {
        assert_eq!(
            FrameTime::from_frame(17) % FrameTime::from_frame(5),
            FrameTime::from_frame(2)
        );
        let r = FrameTime::new(8, 0.25) % FrameTime::new(2, 0.5);
        assert_eq!(r, FrameTime::new(0, 0.75));
        let r = FrameTime::new(7, 0.5) % FrameTime::from_frame(2);
        assert_eq!(r, FrameTime::new(1, 0.5));
        let small = FrameTime::new(1, 0.5) % FrameTime::new(2, 0.5);
        assert_eq!(small, FrameTime::new(1, 0.5));
        assert_eq!(FrameTime::new(3, 0.5) % FrameTime::zero(), FrameTime::zero());
    }

    #[test]
    fn frame_rounding() {
        let t = FrameTime::new(5, 0.5);
        assert_eq!(t.floor_to_frame().frame(), 5);
        assert_eq!(t.ceil_to_frame().frame(), 6);
        assert_eq!(t.round_to_frame().frame(), 6);
        assert_eq!(FrameTime::new(5, 0.49).round_to_frame().frame(), 5);
        assert_eq!(FrameTime::from_frame(5).ceil_to_frame().frame(), 5);
    }

    #[test]
    fn ordering_is_frame_then_subframe() {
        assert!(FrameTime::new(1, 0.9) < FrameTime::new(2, 0.0));
        assert!(FrameTime::new(2, 0.1) > FrameTime::new(2, 0.0));
        assert!(FrameTime::from_decimal(-0.5) < FrameTime::zero());
    }

    #[test]
    fn seconds_conversion() {
        let t = FrameTime::from_seconds(0.5, 30);
        assert_eq!(t, FrameTime::from_frame(15));
        assert_eq!(t.as_seconds(30), 0.5);
        assert_eq!(t.as_seconds(0), 0.0);
    }
}
