use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::Arc;

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{Signed, ToPrimitive, Zero};
use pgcodec_core::error::{unexpected_null, BoxDynError, Error};
use pgcodec_core::io::BufExt;
use pgcodec_core::IsNull;

use crate::arguments::PgArgumentBuffer;
use crate::codec::Codec;
use crate::host::{Float64Scanner, Float64Valuer, HostValue, Int64Scanner, Int64Valuer};
use crate::map::PgTypeMap;
use crate::plan::{missing_capability, EncodePlan, ScanPlan};
use crate::types::{decode_opt, native_encode_plan, native_scan_plan, WireValue};
use crate::value::{PgValueFormat, Value};

const SIGN_POSITIVE: u16 = 0x0000;
const SIGN_NEGATIVE: u16 = 0x4000;
const SIGN_NAN: u16 = 0xC000;
const SIGN_POS_INF: u16 = 0xD000;
const SIGN_NEG_INF: u16 = 0xF000;

const NBASE: u32 = 10_000;

/// An arbitrary precision `NUMERIC` value.
///
/// A number is `int × 10^exp`. The same value has many representations (`1 × 10^2` and
/// `100 × 10^0`); decoding produces the one with no trailing zeros in `int` when the exponent is
/// non-negative, and exactly the column's scale otherwise.
///
/// ### Note: `NaN`
/// PostgreSQL's `NaN` compares equal to itself, unlike IEEE-754. Here it is a plain variant and
/// `PgNumeric::NaN == PgNumeric::NaN` holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PgNumeric {
    Number { int: BigInt, exp: i32 },
    NaN,
    Infinity,
    NegativeInfinity,
}

impl Default for PgNumeric {
    fn default() -> Self {
        PgNumeric::Number {
            int: BigInt::zero(),
            exp: 0,
        }
    }
}

impl PgNumeric {
    pub fn new(int: impl Into<BigInt>, exp: i32) -> Self {
        PgNumeric::Number {
            int: int.into(),
            exp,
        }
    }

    /// The exact integer value, failing for special values and any fractional remainder.
    pub fn to_bigint(&self) -> Result<BigInt, BoxDynError> {
        let PgNumeric::Number { int, exp } = self else {
            return Err(Error::overflow(format!("cannot convert {self} to an integer")).into());
        };

        if int.is_zero() {
            return Ok(BigInt::zero());
        }

        if *exp >= 0 {
            return Ok(int * pow10(exp.unsigned_abs()));
        }

        let (quotient, remainder) = int.div_rem(&pow10(exp.unsigned_abs()));

        if !remainder.is_zero() {
            return Err(Error::overflow(format!("cannot convert {self} to an integer without loss"))
                .into());
        }

        Ok(quotient)
    }
}

fn pow10(n: u32) -> BigInt {
    BigInt::from(10_u8).pow(n)
}

impl From<i64> for PgNumeric {
    fn from(n: i64) -> Self {
        PgNumeric::new(n, 0)
    }
}

impl TryFrom<f64> for PgNumeric {
    type Error = BoxDynError;

    /// Goes through the shortest decimal string that round-trips `v`, so `0.1_f64` becomes
    /// exactly `0.1`.
    fn try_from(v: f64) -> Result<Self, Self::Error> {
        if v.is_nan() {
            return Ok(PgNumeric::NaN);
        }

        if v.is_infinite() {
            return Ok(if v > 0.0 {
                PgNumeric::Infinity
            } else {
                PgNumeric::NegativeInfinity
            });
        }

        v.to_string().parse()
    }
}

impl TryFrom<&PgNumeric> for i64 {
    type Error = BoxDynError;

    fn try_from(n: &PgNumeric) -> Result<Self, Self::Error> {
        n.to_bigint()?
            .to_i64()
            .ok_or_else(|| Error::overflow(format!("{n} is out of range for int8")).into())
    }
}

impl TryFrom<&PgNumeric> for f64 {
    type Error = BoxDynError;

    fn try_from(n: &PgNumeric) -> Result<Self, Self::Error> {
        Ok(match n {
            PgNumeric::NaN => f64::NAN,
            PgNumeric::Infinity => f64::INFINITY,
            PgNumeric::NegativeInfinity => f64::NEG_INFINITY,
            PgNumeric::Number { .. } => n.to_string().parse()?,
        })
    }
}

impl Display for PgNumeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (int, exp) = match self {
            PgNumeric::NaN => return f.write_str("NaN"),
            PgNumeric::Infinity => return f.write_str("Infinity"),
            PgNumeric::NegativeInfinity => return f.write_str("-Infinity"),
            PgNumeric::Number { int, exp } => (int, *exp),
        };

        if exp >= 0 {
            write!(f, "{int}")?;

            if !int.is_zero() {
                for _ in 0..exp {
                    f.write_str("0")?;
                }
            }

            return Ok(());
        }

        let scale = exp.unsigned_abs() as usize;
        let digits = int.magnitude().to_string();

        if int.is_negative() {
            f.write_str("-")?;
        }

        if digits.len() <= scale {
            f.write_str("0.")?;
            for _ in digits.len()..scale {
                f.write_str("0")?;
            }
            f.write_str(&digits)
        } else {
            let (whole, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{whole}.{frac}")
        }
    }
}

impl FromStr for PgNumeric {
    type Err = BoxDynError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NaN" => return Ok(PgNumeric::NaN),
            "Infinity" => return Ok(PgNumeric::Infinity),
            "-Infinity" => return Ok(PgNumeric::NegativeInfinity),
            _ => {}
        }

        let invalid = || BoxDynError::from(format!("{s:?} is not a number"));

        let unsigned = s.strip_prefix(['-', '+']).unwrap_or(s);
        let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        if (whole.is_empty() && frac.is_empty())
            || !whole.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let mut digits = format!("{whole}{frac}");
        let mut exp = -i32::try_from(frac.len()).map_err(|_| invalid())?;

        // an integer is stored without its trailing zeros
        if frac.is_empty() {
            while digits.len() > 1 && digits.ends_with('0') {
                digits.pop();
                exp += 1;
            }
        }

        let mut int: BigInt = digits.parse().map_err(|_| invalid())?;
        if s.starts_with('-') {
            int = -int;
        }

        Ok(PgNumeric::Number { int, exp })
    }
}

impl WireValue for PgNumeric {
    fn encode_binary(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        let (int, exp) = match self {
            PgNumeric::Number { int, exp } => (int, *exp),
            special => {
                let sign = match special {
                    PgNumeric::NaN => SIGN_NAN,
                    PgNumeric::Infinity => SIGN_POS_INF,
                    _ => SIGN_NEG_INF,
                };

                buf.extend(&0_i16.to_be_bytes());
                buf.extend(&0_i16.to_be_bytes());
                buf.extend(&sign.to_be_bytes());
                buf.extend(&0_i16.to_be_bytes());
                return Ok(());
            }
        };

        let sign = if int.is_negative() {
            SIGN_NEGATIVE
        } else {
            SIGN_POSITIVE
        };

        // Shift the exponent down to a multiple of 4 so every base-10000 digit lines up with
        // the decimal point.
        let shift = exp.rem_euclid(4);
        let exp4 = exp - shift;
        let abs = int.magnitude() * BigUint::from(10_u16.pow(shift.unsigned_abs()));

        let (whole, frac) = if exp4 < 0 {
            let divisor = BigUint::from(10_u8).pow(exp4.unsigned_abs());
            let (whole, frac) = abs.div_rem(&divisor);
            (whole, Some((frac, exp4.unsigned_abs() / 4)))
        } else {
            (abs, None)
        };

        let mut whole_digits = to_nbase_digits(whole);
        whole_digits.reverse();

        let mut frac_digits = Vec::new();
        if let Some((frac, count)) = frac {
            frac_digits = to_nbase_digits(frac);
            frac_digits.resize(count as usize, 0);
            frac_digits.reverse();
        }

        let mut weight = if whole_digits.is_empty() {
            exp4 / 4 - 1 + i32::try_from(frac_digits.len())?
        } else {
            i32::try_from(whole_digits.len())? - 1 + exp4.max(0) / 4
        };

        // trailing zero groups are implied by dscale
        while frac_digits.last() == Some(&0) {
            frac_digits.pop();
        }

        let ndigits = whole_digits.len() + frac_digits.len();
        if ndigits == 0 {
            weight = 0;
        }

        let dscale = if exp < 0 { exp.unsigned_abs() } else { 0 };

        let ndigits = i16::try_from(ndigits)
            .map_err(|_| Error::overflow(format!("{self} has too many digits for numeric")))?;
        let weight = i16::try_from(weight)
            .map_err(|_| Error::overflow(format!("{self} is out of range for numeric")))?;
        let dscale = i16::try_from(dscale)
            .map_err(|_| Error::overflow(format!("{self} has too large a scale for numeric")))?;

        buf.extend(&ndigits.to_be_bytes());
        buf.extend(&weight.to_be_bytes());
        buf.extend(&sign.to_be_bytes());
        buf.extend(&dscale.to_be_bytes());

        for digit in whole_digits.iter().chain(&frac_digits) {
            buf.extend(&digit.to_be_bytes());
        }

        Ok(())
    }

    fn encode_text(&self, buf: &mut PgArgumentBuffer) -> Result<(), BoxDynError> {
        buf.put_str(&self.to_string());
        Ok(())
    }

    fn decode_binary(mut src: &[u8]) -> Result<Self, BoxDynError> {
        let ndigits = src.try_get_i16()?;
        let weight = src.try_get_i16()?;
        let sign = src.try_get_u16()?;
        let dscale = src.try_get_i16()?;

        match sign {
            SIGN_NAN => return Ok(PgNumeric::NaN),
            SIGN_POS_INF => return Ok(PgNumeric::Infinity),
            SIGN_NEG_INF => return Ok(PgNumeric::NegativeInfinity),
            SIGN_POSITIVE | SIGN_NEGATIVE => {}
            _ => return Err(Error::protocol(format!("invalid numeric sign: {sign:#06x}")).into()),
        }

        let ndigits = u16::try_from(ndigits)
            .map_err(|_| Error::protocol(format!("invalid numeric digit count: {ndigits}")))?;

        if ndigits == 0 {
            return Ok(PgNumeric::default());
        }

        let mut accum = BigInt::zero();
        for _ in 0..ndigits {
            let digit = src.try_get_u16()?;
            if u32::from(digit) >= NBASE {
                return Err(Error::protocol(format!("invalid numeric digit: {digit}")).into());
            }

            accum = accum * NBASE + u32::from(digit);
        }

        let ndigits = i32::from(ndigits);
        let weight = i32::from(weight);
        let mut exp = (weight - ndigits + 1) * 4;

        if dscale > 0 {
            let frac_digits = (ndigits - weight - 1) * 4;
            let dscale = i32::from(dscale);

            if dscale > frac_digits {
                let n = dscale - frac_digits;
                accum *= pow10(n.unsigned_abs());
                exp -= n;
            } else if dscale < frac_digits {
                let n = frac_digits - dscale;
                accum /= pow10(n.unsigned_abs());
                exp += n;
            }
        }

        if accum.is_zero() {
            exp = exp.min(0);
        } else if exp >= 0 {
            loop {
                let (reduced, remainder) = accum.div_rem(&BigInt::from(10_u8));
                if !remainder.is_zero() {
                    break;
                }
                accum = reduced;
                exp += 1;
            }
        }

        if sign == SIGN_NEGATIVE {
            accum = -accum;
        }

        Ok(PgNumeric::Number { int: accum, exp })
    }

    fn decode_text(src: &str) -> Result<Self, BoxDynError> {
        src.parse()
    }
}

/// Base-10000 digits of `n`, least significant first.
fn to_nbase_digits(mut n: BigUint) -> Vec<u16> {
    let nbase = BigUint::from(NBASE);
    let mut digits = Vec::new();

    while !n.is_zero() {
        let (quotient, remainder) = n.div_rem(&nbase);
        // remainder < 10000
        digits.push(remainder.to_u16().unwrap_or_default());
        n = quotient;
    }

    digits
}

impl Int64Valuer for PgNumeric {
    fn int64_value(&self) -> Result<Option<i64>, BoxDynError> {
        i64::try_from(self).map(Some)
    }
}

impl Float64Valuer for PgNumeric {
    fn float64_value(&self) -> Result<Option<f64>, BoxDynError> {
        f64::try_from(self).map(Some)
    }
}

impl Int64Scanner for PgNumeric {
    fn scan_int64(&mut self, v: Option<i64>) -> Result<(), BoxDynError> {
        *self = v.ok_or_else(unexpected_null::<PgNumeric>)?.into();
        Ok(())
    }
}

impl Float64Scanner for PgNumeric {
    fn scan_float64(&mut self, v: Option<f64>) -> Result<(), BoxDynError> {
        *self = v.ok_or_else(unexpected_null::<PgNumeric>)?.try_into()?;
        Ok(())
    }
}

impl HostValue for PgNumeric {
    crate::impl_host_any!();

    fn as_int64_valuer(&self) -> Option<&dyn Int64Valuer> {
        Some(self)
    }

    fn as_float64_valuer(&self) -> Option<&dyn Float64Valuer> {
        Some(self)
    }

    fn as_int64_scanner(&mut self) -> Option<&mut dyn Int64Scanner> {
        Some(self)
    }

    fn as_float64_scanner(&mut self) -> Option<&mut dyn Float64Scanner> {
        Some(self)
    }
}

#[derive(Debug, Copy, Clone)]
enum Source {
    Float64Valuer,
    Int64Valuer,
    TextValuer,
}

#[derive(Debug)]
struct NumericEncodePlan {
    source: Source,
    format: PgValueFormat,
}

impl EncodePlan for NumericEncodePlan {
    fn encode(
        &self,
        _: &PgTypeMap,
        value: &dyn HostValue,
        buf: &mut PgArgumentBuffer,
    ) -> Result<IsNull, BoxDynError> {
        let host = value.type_name();

        let numeric = match self.source {
            Source::Float64Valuer => value
                .as_float64_valuer()
                .ok_or_else(|| missing_capability(host, "Float64Valuer"))?
                .float64_value()?
                .map(PgNumeric::try_from)
                .transpose()?,
            Source::Int64Valuer => value
                .as_int64_valuer()
                .ok_or_else(|| missing_capability(host, "Int64Valuer"))?
                .int64_value()?
                .map(PgNumeric::from),
            Source::TextValuer => value
                .as_text_valuer()
                .ok_or_else(|| missing_capability(host, "TextValuer"))?
                .text_value()?
                .map(|s| s.parse::<PgNumeric>())
                .transpose()?,
        };

        let Some(numeric) = numeric else {
            return Ok(IsNull::Yes);
        };

        numeric.encode(self.format, buf)?;

        Ok(IsNull::No)
    }
}

#[derive(Debug, Copy, Clone)]
enum Sink {
    Float64Scanner,
    Int64Scanner,
    TextScanner,
}

#[derive(Debug)]
struct NumericScanPlan {
    sink: Sink,
    format: PgValueFormat,
}

impl ScanPlan for NumericScanPlan {
    fn scan(
        &self,
        _: &PgTypeMap,
        src: Option<&[u8]>,
        target: &mut dyn HostValue,
    ) -> Result<(), BoxDynError> {
        let numeric = decode_opt::<PgNumeric>(self.format, src)?;
        let host = target.type_name();

        match self.sink {
            Sink::Float64Scanner => {
                let v = numeric.as_ref().map(f64::try_from).transpose()?;

                target
                    .as_float64_scanner()
                    .ok_or_else(|| missing_capability(host, "Float64Scanner"))?
                    .scan_float64(v)
            }
            Sink::Int64Scanner => {
                let v = numeric.as_ref().map(i64::try_from).transpose()?;

                target
                    .as_int64_scanner()
                    .ok_or_else(|| missing_capability(host, "Int64Scanner"))?
                    .scan_int64(v)
            }
            Sink::TextScanner => {
                let scanner = target
                    .as_text_scanner()
                    .ok_or_else(|| missing_capability(host, "TextScanner"))?;

                match numeric {
                    Some(n) => scanner.scan_text(Some(&n.to_string())),
                    None => scanner.scan_text(None),
                }
            }
        }
    }
}

/// `numeric`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NumericCodec;

impl Codec for NumericCodec {
    fn format_supported(&self, _: PgValueFormat) -> bool {
        true
    }

    fn preferred_format(&self) -> PgValueFormat {
        PgValueFormat::Binary
    }

    fn plan_encode(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        value: &dyn HostValue,
    ) -> Option<Arc<dyn EncodePlan>> {
        if value.is::<PgNumeric>() {
            return Some(native_encode_plan::<PgNumeric>(format));
        }

        let source = if value.as_float64_valuer().is_some() {
            Source::Float64Valuer
        } else if value.as_int64_valuer().is_some() {
            Source::Int64Valuer
        } else if value.as_text_valuer().is_some() {
            Source::TextValuer
        } else {
            return None;
        };

        Some(Arc::new(NumericEncodePlan { source, format }))
    }

    fn plan_scan(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        target: &mut dyn HostValue,
    ) -> Option<Arc<dyn ScanPlan>> {
        if target.is::<PgNumeric>() {
            return Some(native_scan_plan::<PgNumeric>(format));
        }

        let sink = if target.as_float64_scanner().is_some() {
            Sink::Float64Scanner
        } else if target.as_int64_scanner().is_some() {
            Sink::Int64Scanner
        } else if target.as_text_scanner().is_some() {
            Sink::TextScanner
        } else {
            return None;
        };

        Some(Arc::new(NumericScanPlan { sink, format }))
    }

    fn decode_value(
        &self,
        _: &PgTypeMap,
        _: u32,
        format: PgValueFormat,
        src: Option<&[u8]>,
    ) -> Result<Value, BoxDynError> {
        Ok(decode_opt::<PgNumeric>(format, src)?.map_or(Value::Null, Value::Numeric))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binary(n: &PgNumeric) -> Vec<u8> {
        let mut buf = PgArgumentBuffer::new();
        n.encode_binary(&mut buf).unwrap();
        buf.into_inner()
    }

    fn num(s: &str) -> PgNumeric {
        s.parse().unwrap()
    }

    #[test]
    fn test_encode_binary_layout() {
        // 12345.6789: weight 1, dscale 4, digits [1, 2345, 6789]
        assert_eq!(
            binary(&num("12345.6789")),
            [0, 3, 0, 1, 0, 0, 0, 4, 0, 1, 0x09, 0x29, 0x1a, 0x85]
        );

        // 0.00001234: leading zero group keeps weight at -1
        assert_eq!(
            binary(&num("0.00001234")),
            [0, 2, 0xff, 0xff, 0, 0, 0, 8, 0, 0, 0x04, 0xd2]
        );

        // -10000: one digit with weight 1
        assert_eq!(binary(&num("-10000")), [0, 1, 0, 1, 0x40, 0, 0, 0, 0, 1]);

        assert_eq!(binary(&PgNumeric::NaN), [0, 0, 0, 0, 0xc0, 0, 0, 0]);
        assert_eq!(binary(&PgNumeric::default()), [0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_binary_normalizes() {
        let n = PgNumeric::decode_binary(&binary(&num("12345.6789"))).unwrap();
        assert_eq!(n, PgNumeric::new(123_456_789, -4));

        // trailing zero digits fold into the exponent
        let n = PgNumeric::decode_binary(&binary(&PgNumeric::new(1_000_000, 0))).unwrap();
        assert_eq!(n, PgNumeric::new(1, 6));

        // the scale is kept exactly
        let n = PgNumeric::decode_binary(&binary(&PgNumeric::new(150, -2))).unwrap();
        assert_eq!(n.to_string(), "1.50");

        let n = PgNumeric::decode_binary(&binary(&PgNumeric::NegativeInfinity)).unwrap();
        assert_eq!(n, PgNumeric::NegativeInfinity);
    }

    #[test]
    fn test_long_mantissa_survives() {
        let s = "-123456789012345678901234567890.000000000000000000001";
        let n = PgNumeric::decode_binary(&binary(&num(s))).unwrap();
        assert_eq!(n.to_string(), s);
    }

    #[test]
    fn test_text() {
        assert_eq!(num("100"), PgNumeric::new(1, 2));
        assert_eq!(num("100").to_string(), "100");
        assert_eq!(num("-0.05").to_string(), "-0.05");
        assert_eq!(num("0").to_string(), "0");
        assert_eq!(num("Infinity"), PgNumeric::Infinity);

        assert!("1e5".parse::<PgNumeric>().is_err());
        assert!("".parse::<PgNumeric>().is_err());
        assert!("-".parse::<PgNumeric>().is_err());
    }

    #[test]
    fn test_integer_conversion() {
        assert_eq!(i64::try_from(&num("1200")).unwrap(), 1200);
        assert_eq!(i64::try_from(&num("12.00")).unwrap(), 12);
        assert!(i64::try_from(&num("12.5")).is_err());
        assert!(i64::try_from(&num("99999999999999999999")).is_err());
        assert!(i64::try_from(&PgNumeric::NaN).is_err());
    }

    #[test]
    fn test_float_conversion() {
        assert_eq!(PgNumeric::try_from(0.1_f64).unwrap(), PgNumeric::new(1, -1));
        assert_eq!(f64::try_from(&num("2.5")).unwrap(), 2.5);
        assert!(f64::try_from(&PgNumeric::NaN).unwrap().is_nan());
    }
}
