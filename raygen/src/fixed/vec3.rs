//! Three-component vectors of [`Fixed`] values
use super::Fixed;
use nalgebra::Vector3;

/// Selects one component of a [`Vec3`]
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    serde::Serialize,
    serde::Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum Component {
    /// Horizontal
    X,
    /// Vertical
    #[default]
    Y,
    /// Depth
    Z,
}

/// Ordered triple of fixed-point values
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Vec3 {
    /// X component
    pub x: Fixed,
    /// Y component
    pub y: Fixed,
    /// Z component
    pub z: Fixed,
}

impl Vec3 {
    /// The zero vector
    pub const ZERO: Vec3 = Vec3::new(Fixed::ZERO, Fixed::ZERO, Fixed::ZERO);

    /// Builds a new vector
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// Builds a vector from raw Q16.16 words
    pub const fn from_bits(x: i32, y: i32, z: i32) -> Self {
        Self::new(Fixed::from_bits(x), Fixed::from_bits(y), Fixed::from_bits(z))
    }

    /// Returns the selected component
    pub fn get(&self, c: Component) -> Fixed {
        match c {
            Component::X => self.x,
            Component::Y => self.y,
            Component::Z => self.z,
        }
    }

    /// Converts from a float vector, truncating each component toward zero
    pub fn from_vector(v: &Vector3<f64>) -> (Self, bool) {
        let (x, cx) = Fixed::from_f64(v.x);
        let (y, cy) = Fixed::from_f64(v.y);
        let (z, cz) = Fixed::from_f64(v.z);
        (Self::new(x, y, z), cx | cy | cz)
    }

    /// Converts to a float vector (exact)
    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x.to_f64(), self.y.to_f64(), self.z.to_f64())
    }

    /// Returns the components as an array, in `x, y, z` order
    pub const fn to_array(self) -> [Fixed; 3] {
        [self.x, self.y, self.z]
    }

    /// Applies a fallible scalar operation componentwise
    fn zip_with(
        self,
        other: Vec3,
        f: impl Fn(Fixed, Fixed) -> (Fixed, bool),
    ) -> (Vec3, bool) {
        let (x, cx) = f(self.x, other.x);
        let (y, cy) = f(self.y, other.y);
        let (z, cz) = f(self.z, other.z);
        (Vec3::new(x, y, z), cx | cy | cz)
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Componentwise saturating addition
pub fn add(a: Vec3, b: Vec3) -> (Vec3, bool) {
    a.zip_with(b, super::add)
}

/// Componentwise saturating subtraction
pub fn sub(a: Vec3, b: Vec3) -> (Vec3, bool) {
    a.zip_with(b, super::sub)
}

/// Multiplies every component by a scalar
pub fn scale(v: Vec3, s: Fixed) -> (Vec3, bool) {
    v.zip_with(Vec3::new(s, s, s), super::mul)
}

/// Adds a scalar to every component
pub fn add_scalar(v: Vec3, s: Fixed) -> (Vec3, bool) {
    v.zip_with(Vec3::new(s, s, s), super::add)
}

/// Dot product
///
/// Each product is truncated to Q16.16 before the sum is accumulated.
pub fn dot(a: Vec3, b: Vec3) -> (Fixed, bool) {
    let (p, c0) = a.zip_with(b, super::mul);
    let (s, c1) = super::add(p.x, p.y);
    let (s, c2) = super::add(s, p.z);
    (s, c0 | c1 | c2)
}

/// Cross product
pub fn cross(a: Vec3, b: Vec3) -> (Vec3, bool) {
    let (l, cl) = Vec3::new(a.y, a.z, a.x)
        .zip_with(Vec3::new(b.z, b.x, b.y), super::mul);
    let (r, cr) = Vec3::new(a.z, a.x, a.y)
        .zip_with(Vec3::new(b.y, b.z, b.x), super::mul);
    let (out, c) = sub(l, r);
    (out, cl | cr | c)
}

/// Linear interpolation, `a·(1 − t) + b·t`
pub fn lerp(a: Vec3, b: Vec3, t: Fixed) -> (Vec3, bool) {
    let (s, c0) = super::sub(Fixed::ONE, t);
    let (a, c1) = scale(a, s);
    let (b, c2) = scale(b, t);
    let (out, c3) = add(a, b);
    (out, c0 | c1 | c2 | c3)
}

impl std::ops::Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        add(self, rhs).0
    }
}

impl std::ops::Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        sub(self, rhs).0
    }
}

impl std::ops::Mul<Fixed> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: Fixed) -> Vec3 {
        scale(self, rhs).0
    }
}

impl std::ops::Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    fn vec(x: f64, y: f64, z: f64) -> Vec3 {
        let (v, clipped) = Vec3::from_vector(&Vector3::new(x, y, z));
        assert!(!clipped);
        v
    }

    #[test]
    fn test_add_scalar() {
        let s = Fixed::from_bits(-0x1_8000);
        let (v, clipped) = add_scalar(vec(1.0, 2.0, 3.0), s);
        assert_eq!(v, Vec3::from_bits(-0x8000, 0x8000, 0x1_8000));
        assert_eq!(v.x.to_word(), 0xffff_8000);
        assert!(!clipped);
    }

    #[test]
    fn test_cross() {
        let a = vec(-1.5, -2.5, -3.5);
        let b = vec(-5.5, 6.5, 7.5);
        let (v, clipped) = cross(a, b);
        assert_eq!(v.x.to_word(), 0x0004_0000);
        assert_eq!(v.y.to_word(), 0x001e_8000);
        assert_eq!(v.z.to_word(), 0xffe8_8000);
        assert!(!clipped);
    }

    #[test]
    fn test_cross_orthogonal() {
        let x = vec(1.0, 0.0, 0.0);
        let y = vec(0.0, 1.0, 0.0);
        assert_eq!(cross(x, y), (vec(0.0, 0.0, 1.0), false));
        assert_eq!(cross(y, x), (vec(0.0, 0.0, -1.0), false));
        assert_eq!(cross(x, x), (Vec3::ZERO, false));
    }

    #[test]
    fn test_dot() {
        let a = Vec3::from_bits(0x18_0000, 0xccd, -0x3_2000);
        let b = Vec3::from_bits(-0x3_8000, 0xd_0000, 0x666);
        let (v, clipped) = dot(a, b);
        assert!(!clipped);
        assert_relative_eq!(v.to_f64(), -83.428125, epsilon = 1e-4);
    }

    #[test]
    fn test_dot_saturates() {
        let big = vec(200.0, 200.0, 0.0);
        let (v, clipped) = dot(big, big);
        assert_eq!(v, Fixed::MAX);
        assert!(clipped);
    }

    #[test]
    fn test_lerp() {
        let a = vec(0.25, 0.5, 0.5);
        let b = vec(0.5, 0.75, 1.0);
        let expected = [
            (0x0000, [0x4000, 0x8000, 0x8000]),
            (0x4000, [0x5000, 0x9000, 0xa000]),
            (0x8000, [0x6000, 0xa000, 0xc000]),
            (0xc000, [0x7000, 0xb000, 0xe000]),
            (0x1_0000, [0x8000, 0xc000, 0x1_0000]),
        ];
        for (t, [x, y, z]) in expected {
            let (v, clipped) = lerp(a, b, Fixed::from_bits(t));
            assert_eq!(v, Vec3::from_bits(x, y, z), "bad lerp at t = {t:#x}");
            assert!(!clipped);
        }
    }

    #[test]
    fn test_clip_is_aggregated() {
        let a = Vec3::new(Fixed::MAX, Fixed::ONE, Fixed::ZERO);
        let b = Vec3::new(Fixed::ONE, Fixed::ONE, Fixed::ONE);
        let (v, clipped) = add(a, b);
        assert!(clipped);
        // Other components are unaffected by the clip in x
        assert_eq!(v, Vec3::new(Fixed::MAX, Fixed::from(2), Fixed::ONE));
    }

    #[test]
    fn test_scale_and_ops() {
        let v = vec(1.0, -2.0, 0.5);
        assert_eq!(scale(v, Fixed::from(2)), (vec(2.0, -4.0, 1.0), false));
        assert_eq!(v * Fixed::from(2), vec(2.0, -4.0, 1.0));
        assert_eq!(v + v, vec(2.0, -4.0, 1.0));
        assert_eq!(v - v, Vec3::ZERO);
        assert_eq!(-v, vec(-1.0, 2.0, -0.5));
    }

    #[test]
    fn test_component() {
        let v = vec(1.0, 2.0, 3.0);
        assert_eq!(v.get(Component::X), Fixed::from(1));
        assert_eq!(v.get(Component::default()), Fixed::from(2));
        assert_eq!(v.get(Component::Z), Fixed::from(3));
        assert_eq!(Component::Z.to_string(), "z");
        assert_eq!("x".parse::<Component>(), Ok(Component::X));
    }
}
