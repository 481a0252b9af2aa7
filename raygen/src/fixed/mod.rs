//! Saturating fixed-point arithmetic
//!
//! The engine works exclusively in [`Fixed`], a signed Q16.16 value stored in
//! a 32-bit word.  Every operation that can overflow is computed exactly at
//! full width, then brought back to the destination format by [`resize`],
//! which reports whether the value had to be clipped:
//!
//! ```
//! use raygen::fixed::{self, Fixed};
//!
//! let (v, clipped) = fixed::add(Fixed::from_bits(-0x1_0000), Fixed::HALF);
//! assert_eq!(v, Fixed::from_bits(-0x8000)); // -1.0 + 0.5 = -0.5
//! assert!(!clipped);
//!
//! let (v, clipped) = fixed::add(Fixed::MAX, Fixed::ONE);
//! assert_eq!(v, Fixed::MAX); // saturated, never wrapped
//! assert!(clipped);
//! ```
//!
//! The `std::ops` implementations on [`Fixed`] use the same saturating
//! arithmetic but discard the clip flag.
pub mod vec3;
pub use vec3::Vec3;

/// Number of fractional bits in a [`Fixed`] value
pub const FRAC_BITS: u32 = 16;

/// Description of a fixed-point word format
///
/// A format has `int_bits` integer bits (including the sign bit, if any) and
/// `frac_bits` fractional bits, for a total width of at most 64 bits.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Format {
    /// Number of integer bits
    pub int_bits: u32,
    /// Number of fractional bits
    pub frac_bits: u32,
    /// Whether the format is two's-complement signed
    pub signed: bool,
}

impl Format {
    /// The engine's native format, a signed Q16.16 word
    pub const Q16_16: Format = Format::signed(16, FRAC_BITS);

    /// Builds a signed format
    pub const fn signed(int_bits: u32, frac_bits: u32) -> Self {
        Self {
            int_bits,
            frac_bits,
            signed: true,
        }
    }

    /// Builds an unsigned format
    pub const fn unsigned(int_bits: u32, frac_bits: u32) -> Self {
        Self {
            int_bits,
            frac_bits,
            signed: false,
        }
    }

    /// Total word width, in bits
    pub const fn width(&self) -> u32 {
        self.int_bits + self.frac_bits
    }

    /// Smallest representable raw value
    pub const fn min_raw(&self) -> i128 {
        if self.signed {
            -(1i128 << (self.width() - 1))
        } else {
            0
        }
    }

    /// Largest representable raw value
    pub const fn max_raw(&self) -> i128 {
        if self.signed {
            (1i128 << (self.width() - 1)) - 1
        } else {
            (1i128 << self.width()) - 1
        }
    }

    /// Truncates a raw value to this format's width (two's-complement wrap)
    fn wrap(&self, v: i128) -> i128 {
        let modulus = 1i128 << self.width();
        let m = v & (modulus - 1);
        if self.signed && m > self.max_raw() {
            m - modulus
        } else {
            m
        }
    }
}

/// Behavior of [`resize`] when a value does not fit the destination format
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Overflow {
    /// Clamp to the nearest representable extreme
    #[default]
    Saturate,
    /// Keep the low bits of the value (two's-complement wraparound)
    Wrap,
}

/// Re-quantizes a raw value from one fixed-point format to another
///
/// The fractional part is adjusted by an arithmetic shift (truncating toward
/// negative infinity when bits are dropped), then the result is fitted into
/// the destination's range according to `overflow`.  The returned flag is
/// `true` whenever the shifted value was out of range, in both overflow modes.
///
/// `raw` must be a valid value of `from`; formats wider than 64 bits are not
/// supported.
///
/// ```
/// use raygen::fixed::{resize, Format, Overflow};
///
/// let q8_8 = Format::unsigned(8, 8);
/// let from = Format::unsigned(16, 16);
/// assert_eq!(resize(0x8000, from, q8_8, Overflow::Saturate), (0x80, false));
/// assert_eq!(
///     resize(0x0100_ffff, from, q8_8, Overflow::Saturate),
///     (0xffff, true)
/// );
/// ```
pub fn resize(
    raw: i64,
    from: Format,
    to: Format,
    overflow: Overflow,
) -> (i64, bool) {
    debug_assert!(from.width() <= 64 && to.width() <= 64);
    let (out, clipped) = resize_wide(i128::from(raw), from, to, overflow);
    (out as i64, clipped)
}

/// Like [`resize`], but accepts sources up to 126 bits wide (full products)
fn resize_wide(
    v: i128,
    from: Format,
    to: Format,
    overflow: Overflow,
) -> (i128, bool) {
    let v = if to.frac_bits >= from.frac_bits {
        v << (to.frac_bits - from.frac_bits)
    } else {
        v >> (from.frac_bits - to.frac_bits)
    };
    if v < to.min_raw() || v > to.max_raw() {
        let out = match overflow {
            Overflow::Saturate => v.clamp(to.min_raw(), to.max_raw()),
            Overflow::Wrap => to.wrap(v),
        };
        (out, true)
    } else {
        (v, false)
    }
}

/// Multiplies two raw values of the same format
///
/// The exact product is formed at double width, then truncated back to `fmt`
/// with [`resize`] semantics.  `fmt` may be at most 63 bits wide.
///
/// ```
/// use raygen::fixed::{mul_fmt, Format, Overflow};
///
/// let uq16_16 = Format::unsigned(16, 16);
/// // 2.0 × 0.5 = 1.0
/// assert_eq!(
///     mul_fmt(0x2_0000, 0x8000, uq16_16, Overflow::Saturate),
///     (0x1_0000, false)
/// );
/// ```
pub fn mul_fmt(
    a: i64,
    b: i64,
    fmt: Format,
    overflow: Overflow,
) -> (i64, bool) {
    debug_assert!(fmt.width() <= 63);
    let wide = Format {
        int_bits: 2 * fmt.int_bits,
        frac_bits: 2 * fmt.frac_bits,
        signed: fmt.signed,
    };
    let prod = i128::from(a) * i128::from(b);
    let (out, clipped) = resize_wide(prod, wide, fmt, overflow);
    (out as i64, clipped)
}

////////////////////////////////////////////////////////////////////////////////

/// Signed Q16.16 fixed-point value
///
/// Ordering and equality compare the underlying raw words.
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fixed(i32);

impl std::fmt::Debug for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fixed({} = {:#010x})", self.to_f64(), self.0 as u32)
    }
}

impl std::fmt::Display for Fixed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_f64())
    }
}

impl Fixed {
    /// Zero
    pub const ZERO: Fixed = Fixed(0);
    /// One half
    pub const HALF: Fixed = Fixed(1 << (FRAC_BITS - 1));
    /// One
    pub const ONE: Fixed = Fixed(1 << FRAC_BITS);
    /// Smallest positive value (one unit in the last place)
    pub const EPSILON: Fixed = Fixed(1);
    /// Largest representable value (≈ 32767.99998)
    pub const MAX: Fixed = Fixed(i32::MAX);
    /// Smallest representable value (-32768.0)
    pub const MIN: Fixed = Fixed(i32::MIN);

    /// Builds a value from its raw two's-complement representation
    #[inline]
    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    /// Returns the raw two's-complement representation
    #[inline]
    pub const fn to_bits(self) -> i32 {
        self.0
    }

    /// Builds a value from a 32-bit stream word
    #[inline]
    pub const fn from_word(word: u32) -> Self {
        Self(word as i32)
    }

    /// Returns the value as a 32-bit stream word
    #[inline]
    pub const fn to_word(self) -> u32 {
        self.0 as u32
    }

    /// Converts an integer, saturating if it is out of range
    pub fn from_int(v: i64) -> (Self, bool) {
        let (raw, clipped) = resize(
            v,
            Format::signed(64, 0),
            Format::Q16_16,
            Overflow::Saturate,
        );
        (Self(raw as i32), clipped)
    }

    /// Converts a float, truncating toward zero and saturating
    ///
    /// `NaN` converts to zero and is reported as clipped.
    pub fn from_f64(v: f64) -> (Self, bool) {
        if v.is_nan() {
            return (Self::ZERO, true);
        }
        let scaled = (v * f64::from(1u32 << FRAC_BITS)).trunc();
        if scaled > f64::from(i32::MAX) {
            (Self::MAX, true)
        } else if scaled < f64::from(i32::MIN) {
            (Self::MIN, true)
        } else {
            (Self(scaled as i32), false)
        }
    }

    /// Converts to a float (exact)
    pub fn to_f64(self) -> f64 {
        f64::from(self.0) / f64::from(1u32 << FRAC_BITS)
    }

    /// Returns the integer part, truncating toward zero
    #[inline]
    pub const fn trunc(self) -> i32 {
        self.0 / (1 << FRAC_BITS)
    }

    /// Checks whether the value is strictly positive
    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }
}

/// Saturating addition
#[inline]
pub fn add(a: Fixed, b: Fixed) -> (Fixed, bool) {
    let sum = i64::from(a.0) + i64::from(b.0);
    narrow(sum, Format::signed(17, FRAC_BITS))
}

/// Saturating subtraction
#[inline]
pub fn sub(a: Fixed, b: Fixed) -> (Fixed, bool) {
    let diff = i64::from(a.0) - i64::from(b.0);
    narrow(diff, Format::signed(17, FRAC_BITS))
}

/// Saturating multiplication
///
/// The full Q32.32 product is truncated (not rounded) back to Q16.16.
#[inline]
pub fn mul(a: Fixed, b: Fixed) -> (Fixed, bool) {
    let (out, clipped) = mul_fmt(
        i64::from(a.0),
        i64::from(b.0),
        Format::Q16_16,
        Overflow::Saturate,
    );
    (Fixed(out as i32), clipped)
}

/// Saturating negation (only `Fixed::MIN` clips)
#[inline]
pub fn neg(a: Fixed) -> (Fixed, bool) {
    sub(Fixed::ZERO, a)
}

/// Saturating absolute value (only `Fixed::MIN` clips)
#[inline]
pub fn abs(a: Fixed) -> (Fixed, bool) {
    if a.0 < 0 { neg(a) } else { (a, false) }
}

/// Arithmetic shift right by `n` bits (divides by `2^n`, rounding down)
#[inline]
pub fn shr(a: Fixed, n: u32) -> Fixed {
    Fixed(a.0 >> n.min(31))
}

/// Saturating shift left by `n` bits (multiplies by `2^n`)
#[inline]
pub fn shl(a: Fixed, n: u32) -> (Fixed, bool) {
    let v = i64::from(a.0) << n.min(32);
    narrow(v, Format::signed(48, FRAC_BITS))
}

#[inline]
fn narrow(raw: i64, from: Format) -> (Fixed, bool) {
    let (out, clipped) = resize(raw, from, Format::Q16_16, Overflow::Saturate);
    (Fixed(out as i32), clipped)
}

impl std::ops::Add for Fixed {
    type Output = Fixed;
    fn add(self, rhs: Fixed) -> Fixed {
        add(self, rhs).0
    }
}

impl std::ops::Sub for Fixed {
    type Output = Fixed;
    fn sub(self, rhs: Fixed) -> Fixed {
        sub(self, rhs).0
    }
}

impl std::ops::Mul for Fixed {
    type Output = Fixed;
    fn mul(self, rhs: Fixed) -> Fixed {
        mul(self, rhs).0
    }
}

impl std::ops::Neg for Fixed {
    type Output = Fixed;
    fn neg(self) -> Fixed {
        neg(self).0
    }
}

impl std::ops::AddAssign for Fixed {
    fn add_assign(&mut self, rhs: Fixed) {
        *self = *self + rhs;
    }
}

impl std::ops::SubAssign for Fixed {
    fn sub_assign(&mut self, rhs: Fixed) {
        *self = *self - rhs;
    }
}

impl std::ops::MulAssign for Fixed {
    fn mul_assign(&mut self, rhs: Fixed) {
        *self = *self * rhs;
    }
}

impl From<i16> for Fixed {
    fn from(v: i16) -> Self {
        Fixed(i32::from(v) << FRAC_BITS)
    }
}

////////////////////////////////////////////////////////////////////////////////
