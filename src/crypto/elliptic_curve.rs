//! Short Weierstrass curves over prime fields, as used by ECDH PACE.
//!
//! Points are exposed in affine form; scalar multiplication runs in Jacobian coordinates
//! so that only a single field inversion is needed per multiplication.

use {
    super::prime_field::{PrimeField, Uint},
    crate::{
        ensure_err,
        error::{Error, Result},
    },
    rand::{CryptoRng, RngCore},
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EllipticCurve {
    field: PrimeField,
    a: Uint,
    b: Uint,
    generator: Point,
    order: Uint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Point {
    Infinity,
    Affine { x: Uint, y: Uint },
}

/// `(X, Y, Z)` representing `(X / Z^2, Y / Z^3)`, with `Z = 0` at infinity.
#[derive(Clone, Copy, Debug)]
struct Jacobian {
    x: Uint,
    y: Uint,
    z: Uint,
}

impl EllipticCurve {
    /// Curve `y^2 = x^3 + a x + b` over `F_p` with generator `(gx, gy)` of prime order `n`.
    ///
    /// Parameters are big-endian octet strings. Only cofactor one curves are supported.
    pub fn from_parameters(
        p: &[u8],
        a: &[u8],
        b: &[u8],
        gx: &[u8],
        gy: &[u8],
        n: &[u8],
    ) -> Result<Self> {
        let modulus = Uint::try_from_be_slice(p).ok_or(Error::Crypto("modulus too large"))?;
        let order = Uint::try_from_be_slice(n).ok_or(Error::Crypto("order too large"))?;
        let field = PrimeField::from_modulus(modulus);
        let mut curve = Self {
            field,
            a: field.os2fe(a)?,
            b: field.os2fe(b)?,
            generator: Point::Infinity,
            order,
        };

        // Non-singular: 4a^3 + 27b^2 != 0
        let a3 = field.mul(field.square(curve.a), curve.a);
        let b2 = field.square(curve.b);
        let discriminant = field.add(
            field.mul(field.from_u64(4), a3),
            field.mul(field.from_u64(27), b2),
        );
        ensure_err!(!discriminant.is_zero(), Error::Crypto("singular curve"));

        let generator = Point::Affine {
            x: field.os2fe(gx)?,
            y: field.os2fe(gy)?,
        };
        ensure_err!(
            curve.is_on_curve(&generator),
            Error::Crypto("generator not on curve")
        );
        curve.generator = generator;
        Ok(curve)
    }

    pub fn field(&self) -> &PrimeField {
        &self.field
    }

    pub fn generator(&self) -> Point {
        self.generator
    }

    pub fn order(&self) -> Uint {
        self.order
    }

    /// The same curve with a different base point, as produced by PACE generic mapping.
    pub fn with_generator(&self, generator: Point) -> Result<Self> {
        ensure_err!(
            generator != Point::Infinity && self.is_on_curve(&generator),
            Error::Crypto("mapped generator is not a valid point")
        );
        Ok(Self {
            generator,
            ..self.clone()
        })
    }

    pub fn is_on_curve(&self, point: &Point) -> bool {
        match *point {
            Point::Infinity => true,
            Point::Affine { x, y } => {
                let f = &self.field;
                let rhs = f.add(
                    f.add(f.mul(f.square(x), x), f.mul(self.a, x)),
                    self.b,
                );
                x < f.modulus() && y < f.modulus() && f.square(y) == rhs
            }
        }
    }

    pub fn negate(&self, point: &Point) -> Point {
        match *point {
            Point::Infinity => Point::Infinity,
            Point::Affine { x, y } => Point::Affine {
                x,
                y: self.field.neg(y),
            },
        }
    }

    pub fn add(&self, p: &Point, q: &Point) -> Point {
        let sum = self.jacobian_add(self.to_jacobian(p), self.to_jacobian(q));
        self.to_affine(sum)
    }

    /// Scalar multiplication by double-and-add. Not constant time.
    pub fn mul(&self, scalar: Uint, point: &Point) -> Point {
        let base = self.to_jacobian(point);
        let mut acc = Jacobian::INFINITY;
        for i in (0..scalar.bit_len()).rev() {
            acc = self.jacobian_double(acc);
            if scalar.bit(i) {
                acc = self.jacobian_add(acc, base);
            }
        }
        self.to_affine(acc)
    }

    /// Uniform scalar in `[1, n - 1]` by rejection sampling.
    pub fn random_scalar(&self, rng: &mut (impl CryptoRng + RngCore)) -> Uint {
        let bits = self.order.bit_len();
        let mut bytes = vec![0_u8; bits.div_ceil(8)];
        loop {
            rng.fill_bytes(&mut bytes);
            bytes[0] &= 0xFF >> (bytes.len() * 8 - bits);
            if let Some(scalar) = Uint::try_from_be_slice(&bytes) {
                if !scalar.is_zero() && scalar < self.order {
                    return scalar;
                }
            }
        }
    }

    /// Decode an uncompressed point `04 || X || Y` and check that it is on the curve.
    pub fn pt_from_bytes(&self, bytes: &[u8]) -> Result<Point> {
        let len = self.field.byte_len();
        ensure_err!(
            bytes.len() == 1 + 2 * len && bytes[0] == 0x04,
            Error::Crypto("not an uncompressed point")
        );
        let point = Point::Affine {
            x: self.field.os2fe(&bytes[1..1 + len])?,
            y: self.field.os2fe(&bytes[1 + len..])?,
        };
        ensure_err!(self.is_on_curve(&point), Error::Crypto("point not on curve"));
        Ok(point)
    }

    pub fn pt_to_bytes(&self, point: &Point) -> Vec<u8> {
        match *point {
            Point::Infinity => vec![0x00],
            Point::Affine { x, y } => {
                let mut bytes = vec![0x04];
                bytes.extend(self.field.fe2os(x));
                bytes.extend(self.field.fe2os(y));
                bytes
            }
        }
    }

    /// Elliptic curve key agreement, TR-03111 section 4.3.1. Returns the x-coordinate of the
    /// shared point.
    pub fn ecka(&self, private_key: Uint, public_key: &Point) -> Result<Vec<u8>> {
        match self.mul(private_key, public_key) {
            Point::Infinity => Err(Error::Crypto("shared point at infinity")),
            Point::Affine { x, .. } => Ok(self.field.fe2os(x)),
        }
    }

    fn to_jacobian(&self, point: &Point) -> Jacobian {
        match *point {
            Point::Infinity => Jacobian::INFINITY,
            Point::Affine { x, y } => Jacobian {
                x,
                y,
                z: Uint::from(1_u64),
            },
        }
    }

    fn to_affine(&self, point: Jacobian) -> Point {
        let f = &self.field;
        let Some(z_inv) = f.inv(point.z) else {
            return Point::Infinity;
        };
        let z_inv2 = f.square(z_inv);
        Point::Affine {
            x: f.mul(point.x, z_inv2),
            y: f.mul(point.y, f.mul(z_inv2, z_inv)),
        }
    }

    // dbl-1998-cmo-2
    fn jacobian_double(&self, p: Jacobian) -> Jacobian {
        if p.z.is_zero() || p.y.is_zero() {
            return Jacobian::INFINITY;
        }
        let f = &self.field;
        let xx = f.square(p.x);
        let yy = f.square(p.y);
        let zz = f.square(p.z);
        let s = f.mul(f.from_u64(4), f.mul(p.x, yy));
        let m = f.add(f.mul(f.from_u64(3), xx), f.mul(self.a, f.square(zz)));
        let x = f.sub(f.square(m), f.add(s, s));
        let y = f.sub(
            f.mul(m, f.sub(s, x)),
            f.mul(f.from_u64(8), f.square(yy)),
        );
        let z = f.mul(f.add(p.y, p.y), p.z);
        Jacobian { x, y, z }
    }

    // add-1998-cmo-2
    fn jacobian_add(&self, p: Jacobian, q: Jacobian) -> Jacobian {
        if p.z.is_zero() {
            return q;
        }
        if q.z.is_zero() {
            return p;
        }
        let f = &self.field;
        let z1z1 = f.square(p.z);
        let z2z2 = f.square(q.z);
        let u1 = f.mul(p.x, z2z2);
        let u2 = f.mul(q.x, z1z1);
        let s1 = f.mul(p.y, f.mul(q.z, z2z2));
        let s2 = f.mul(q.y, f.mul(p.z, z1z1));
        if u1 == u2 {
            return if s1 == s2 {
                self.jacobian_double(p)
            } else {
                Jacobian::INFINITY
            };
        }
        let h = f.sub(u2, u1);
        let r = f.sub(s2, s1);
        let hh = f.square(h);
        let hhh = f.mul(h, hh);
        let v = f.mul(u1, hh);
        let x = f.sub(f.sub(f.square(r), hhh), f.add(v, v));
        let y = f.sub(f.mul(r, f.sub(v, x)), f.mul(s1, hhh));
        let z = f.mul(f.mul(p.z, q.z), h);
        Jacobian { x, y, z }
    }
}

impl Jacobian {
    const INFINITY: Self = Self {
        x: Uint::ZERO,
        y: Uint::ZERO,
        z: Uint::ZERO,
    };
}
