//! GF(2^8) arithmetic tables
//!
//! All field arithmetic runs off three precomputed tables: a log table,
//! an antilog table duplicated across a window of exponents so that sums
//! and differences of logs index it directly, and a full 64 KiB
//! multiplication table. Multiplication dominates the parity and
//! recovery inner loops; the flat table wins over chaining log/antilog
//! lookups there, while division (only used while building matrices)
//! stays on the log path.

use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use std::io::{self, Write};

/// Primitive polynomial x^8 + x^4 + x^3 + x^2 + 1, reduction constant
const PRIM_POLY: u8 = 0x1d;

/// Non-zero field elements; also the multiplicative order of the generator
const ORDER: usize = 255;

/// Antilog window covers exponents [-255, 509] so that any sum or
/// difference of two logs in [0, 254] indexes it without wrapping
const EXP_WINDOW_MIN: i16 = -(ORDER as i16);
const EXP_WINDOW_LEN: usize = 3 * ORDER;

static TABLES: Lazy<GaloisField> = Lazy::new(GaloisField::build);

/// The process-wide field tables, built on first use.
#[inline]
pub fn galois() -> &'static GaloisField {
    &TABLES
}

/// Lookup tables for GF(2^8) over the 0x1d polynomial.
pub struct GaloisField {
    /// log[a] for a != 0; log[0] is never consulted
    log: [u8; 256],
    /// antilog window, exponent e lives at index e - EXP_WINDOW_MIN
    exp: Vec<u8>,
    /// mul[a << 8 | b] = a * b
    mul: Vec<u8>,
}

impl GaloisField {
    fn build() -> Self {
        let mut log = [0u8; 256];
        let mut pow = [0u8; ORDER];

        // Walk the powers of the generator (2): b = 2^l
        let mut b: u8 = 1;
        for l in 0..ORDER {
            log[b as usize] = l as u8;
            pow[l] = b;
            b = (b << 1) ^ if b & 0x80 != 0 { PRIM_POLY } else { 0 };
        }

        // Periodic extension of the antilog table across the window
        let mut exp = vec![0u8; EXP_WINDOW_LEN];
        for (i, cell) in exp.iter_mut().enumerate() {
            let e = i as i16 + EXP_WINDOW_MIN;
            *cell = pow[e.rem_euclid(ORDER as i16) as usize];
        }

        let mut field = GaloisField {
            log,
            exp,
            mul: Vec::new(),
        };

        // Flat multiplication table from the log path
        let mut mul = vec![0u8; 256 * 256];
        for a in 0..256usize {
            for b in 0..256usize {
                if a != 0 && b != 0 {
                    mul[(a << 8) | b] =
                        field.exp_at(field.log[a] as i16 + field.log[b] as i16);
                }
            }
        }
        field.mul = mul;
        field
    }

    #[inline]
    fn exp_at(&self, e: i16) -> u8 {
        self.exp[(e - EXP_WINDOW_MIN) as usize]
    }

    /// Field multiplication. Total, one table lookup.
    #[inline]
    pub fn mult(&self, a: u8, b: u8) -> u8 {
        self.mul[((a as usize) << 8) | b as usize]
    }

    /// Field division.
    ///
    /// Fails for b = 0; 0 / b = 0 for every b != 0. The antilog window
    /// absorbs the negative log difference, so there is no conditional
    /// reduction of the exponent.
    #[inline]
    pub fn div(&self, a: u8, b: u8) -> Result<u8> {
        if b == 0 {
            return Err(Error::InvalidArgument(
                "division by zero in GF(2^8)".to_string(),
            ));
        }
        if a == 0 {
            return Ok(0);
        }
        Ok(self.div_nonzero(a, b))
    }

    /// Division with both operands known non-zero.
    #[inline]
    fn div_nonzero(&self, a: u8, b: u8) -> u8 {
        self.exp_at(self.log[a as usize] as i16 - self.log[b as usize] as i16)
    }

    /// Discrete log of a non-zero element.
    #[inline]
    pub fn log(&self, a: u8) -> u8 {
        debug_assert!(a != 0, "log(0) is undefined");
        self.log[a as usize]
    }

    /// Antilog: the generator raised to `e`, for any exponent in the
    /// window [-255, 509].
    #[inline]
    pub fn ilog(&self, e: i16) -> u8 {
        self.exp_at(e)
    }

    /// Verify the field laws across every byte pair.
    ///
    /// Checks commutativity, the multiplicative identities of zero and
    /// one, (a*b)/a = b, the log/antilog round trips, and (on a fixed
    /// set of third operands per pair) associativity and distributivity
    /// over XOR. log(0) and div(_, 0) are undefined and not evaluated.
    pub fn self_test(&self) -> Result<()> {
        fn check(ok: bool, what: &str, a: usize, b: usize) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(Error::InternalInvariant(format!(
                    "{what} failed for a={a:#04x}, b={b:#04x}"
                )))
            }
        }

        const THIRD: [u8; 8] = [0, 1, 2, 3, PRIM_POLY, 0x53, 0x80, 0xff];

        for a in 0..256usize {
            let a8 = a as u8;
            check(self.mult(a8, 0) == 0, "a*0 == 0", a, 0)?;
            check(self.mult(0, a8) == 0, "0*a == 0", 0, a)?;
            check(self.mult(a8, 1) == a8, "a*1 == a", a, 1)?;
            if a != 0 {
                check(
                    self.ilog(self.log(a8) as i16) == a8,
                    "ilog(log(a)) == a",
                    a,
                    0,
                )?;
            }
            if a < ORDER {
                check(
                    self.log(self.ilog(a as i16)) == a8,
                    "log(ilog(a)) == a",
                    a,
                    0,
                )?;
            }
            for b in 0..256usize {
                let b8 = b as u8;
                let ab = self.mult(a8, b8);
                check(ab == self.mult(b8, a8), "a*b == b*a", a, b)?;
                if a != 0 {
                    check(self.div(ab, a8)? == b8, "(a*b)/a == b", a, b)?;
                }
                for c in THIRD {
                    check(
                        self.mult(a8, self.mult(b8, c)) == self.mult(ab, c),
                        "a*(b*c) == (a*b)*c",
                        a,
                        b,
                    )?;
                    check(
                        self.mult(a8, b8 ^ c) == ab ^ self.mult(a8, c),
                        "a*(b^c) == a*b ^ a*c",
                        a,
                        b,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Write the full log/antilog, multiplication, and division tables
    /// in tab-separated form. Diagnostic only.
    pub fn dump_tables(&self, out: &mut dyn Write) -> io::Result<()> {
        writeln!(out, "log/ilog")?;
        write!(out, "\tX")?;
        for a in 1..256usize {
            write!(out, "\t{}", self.log[a])?;
        }
        writeln!(out)?;
        for e in 0..ORDER {
            write!(out, "\t{}", self.ilog(e as i16))?;
        }
        writeln!(out, "\tX")?;

        writeln!(out, "mult")?;
        for a in 1..256usize {
            for b in 1..256usize {
                write!(out, "\t{}", self.mult(a as u8, b as u8))?;
            }
            writeln!(out)?;
        }

        writeln!(out, "div")?;
        for a in 1..256usize {
            for b in 1..256usize {
                write!(out, "\t{}", self.div_nonzero(a as u8, b as u8))?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}
