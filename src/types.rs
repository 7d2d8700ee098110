use fixed::types::I32F32;

/// Length in the drawing surface's working unit (user unit).
///
/// Values are stored as I32F32 and every arithmetic step rounds to a
/// thousandth of a unit, so repeated layout passes over the same input give
/// bit-identical geometry.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Length(I32F32);

impl Length {
    pub const ZERO: Length = Length(I32F32::from_bits(0));

    pub fn from_f32(value: f32) -> Length {
        if !value.is_finite() {
            return Length::ZERO;
        }
        let milli = (value as f64 * 1000.0).round();
        let milli = milli.clamp(i64::MIN as f64, i64::MAX as f64) as i64;
        Length::from_milli_i64(milli)
    }

    pub fn to_f32(self) -> f32 {
        self.0.to_num()
    }

    pub fn to_milli_i64(self) -> i64 {
        let bits = self.0.to_bits() as i128;
        let denom = 1i128 << 32;
        let scaled = bits * 1000;
        let adj = if scaled >= 0 { denom / 2 } else { -denom / 2 };
        let milli = (scaled + adj) / denom;
        milli.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    pub fn max(self, other: Length) -> Length {
        if self >= other { self } else { other }
    }

    pub fn min(self, other: Length) -> Length {
        if self <= other { self } else { other }
    }

    /// `self * num / den` computed on milli units, so scaling by a ratio of
    /// two lengths is exact whenever the result is representable.
    pub fn scale(self, num: Length, den: Length) -> Length {
        let den = den.to_milli_i64() as i128;
        if den == 0 {
            return Length::ZERO;
        }
        let value = (self.to_milli_i64() as i128).saturating_mul(num.to_milli_i64() as i128);
        Length::from_milli_i128(div_round_i128(value, den))
    }

    /// Division rounding up to the next milli, so that `n` shares always add
    /// back up to at least the original length.
    pub fn div_ceil(self, parts: usize) -> Length {
        if parts == 0 {
            return Length::ZERO;
        }
        let milli = self.to_milli_i64() as i128;
        let parts = parts as i128;
        let value = if milli >= 0 {
            (milli + parts - 1) / parts
        } else {
            milli / parts
        };
        Length::from_milli_i128(value)
    }

    pub fn approx_eq(self, other: Length, tolerance_milli: i64) -> bool {
        (self.to_milli_i64() - other.to_milli_i64()).abs() <= tolerance_milli
    }

    pub fn from_milli_i64(milli: i64) -> Length {
        Length::from_milli_i128(milli as i128)
    }

    fn from_milli_i128(milli: i128) -> Length {
        let denom = 1i128 << 32;
        let adj = if milli >= 0 { 500 } else { -500 };
        let bits = (milli * denom + adj) / 1000;
        let bits = bits.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
        Length(I32F32::from_bits(bits))
    }
}

impl std::ops::Add for Length {
    type Output = Length;
    fn add(self, rhs: Length) -> Length {
        Length::from_milli_i128(self.to_milli_i64() as i128 + rhs.to_milli_i64() as i128)
    }
}

impl std::ops::AddAssign for Length {
    fn add_assign(&mut self, rhs: Length) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub for Length {
    type Output = Length;
    fn sub(self, rhs: Length) -> Length {
        Length::from_milli_i128(self.to_milli_i64() as i128 - rhs.to_milli_i64() as i128)
    }
}

impl std::ops::SubAssign for Length {
    fn sub_assign(&mut self, rhs: Length) {
        *self = *self - rhs;
    }
}

impl std::ops::Mul<i32> for Length {
    type Output = Length;
    fn mul(self, rhs: i32) -> Length {
        let milli = self.to_milli_i64() as i128;
        Length::from_milli_i128(milli.saturating_mul(rhs as i128))
    }
}

impl std::ops::Div<i32> for Length {
    type Output = Length;
    fn div(self, rhs: i32) -> Length {
        if rhs == 0 {
            Length::ZERO
        } else {
            let milli = self.to_milli_i64() as i128;
            Length::from_milli_i128(div_round_i128(milli, rhs as i128))
        }
    }
}

impl std::ops::Mul<f32> for Length {
    type Output = Length;
    fn mul(self, rhs: f32) -> Length {
        if !rhs.is_finite() {
            return Length::ZERO;
        }
        let milli = (self.to_milli_i64() as f64 * rhs as f64).round();
        Length::from_milli_i64(milli.clamp(i64::MIN as f64, i64::MAX as f64) as i64)
    }
}

impl std::ops::Div<f32> for Length {
    type Output = Length;
    fn div(self, rhs: f32) -> Length {
        if rhs == 0.0 || !rhs.is_finite() {
            Length::ZERO
        } else {
            self * (1.0 / rhs)
        }
    }
}

fn div_round_i128(num: i128, den: i128) -> i128 {
    if den == 0 {
        return 0;
    }
    let den_abs = den.abs();
    let sign = if (num < 0) != (den < 0) { -1 } else { 1 };
    sign * ((num.abs() + (den_abs / 2)) / den_abs)
}

impl std::ops::Neg for Length {
    type Output = Length;
    fn neg(self) -> Length {
        Length::from_milli_i128(-(self.to_milli_i64() as i128))
    }
}

impl std::iter::Sum for Length {
    fn sum<I: Iterator<Item = Length>>(iter: I) -> Length {
        iter.fold(Length::ZERO, |acc, v| acc + v)
    }
}

impl<'a> std::iter::Sum<&'a Length> for Length {
    fn sum<I: Iterator<Item = &'a Length>>(iter: I) -> Length {
        iter.fold(Length::ZERO, |acc, v| acc + *v)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: Length,
    pub height: Length,
}

impl Size {
    /// A4 in millimetres.
    pub fn a4_mm() -> Self {
        Self {
            width: Length::from_f32(210.0),
            height: Length::from_f32(297.0),
        }
    }

    /// A4 in points.
    pub fn a4_pt() -> Self {
        Self {
            width: Length::from_f32(595.28),
            height: Length::from_f32(841.89),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: Length,
    pub y: Length,
    pub width: Length,
    pub height: Length,
}

impl Rect {
    pub fn new(x: Length, y: Length, width: Length, height: Length) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Margins {
    pub top: Length,
    pub right: Length,
    pub bottom: Length,
    pub left: Length,
}

impl Margins {
    pub fn all(value: f32) -> Self {
        let v = Length::from_f32(value);
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }
}

/// An RGB triple. Transparency is expressed as `Option<Color>::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl From<[u8; 3]> for Color {
    fn from(value: [u8; 3]) -> Self {
        Color::rgb(value[0], value[1], value[2])
    }
}

impl From<(u8, u8, u8)> for Color {
    fn from(value: (u8, u8, u8)) -> Self {
        Color::rgb(value.0, value.1, value.2)
    }
}
