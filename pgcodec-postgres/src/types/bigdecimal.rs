use bigdecimal::BigDecimal;
use pgcodec_core::error::{unexpected_null, BoxDynError, Error};

use crate::host::{DatabaseValuer, DynamicScanner, HostValue};
use crate::types::PgNumeric;
use crate::value::Value;

impl TryFrom<&BigDecimal> for PgNumeric {
    type Error = BoxDynError;

    fn try_from(decimal: &BigDecimal) -> Result<Self, Self::Error> {
        // `BigDecimal` stores `int × 10^-scale`
        let (int, scale) = decimal.as_bigint_and_exponent();

        let exp = scale
            .checked_neg()
            .and_then(|exp| i32::try_from(exp).ok())
            .ok_or_else(|| Error::overflow(format!("{decimal} is out of range for numeric")))?;

        Ok(PgNumeric::new(int, exp))
    }
}

impl TryFrom<PgNumeric> for BigDecimal {
    type Error = BoxDynError;

    fn try_from(numeric: PgNumeric) -> Result<Self, Self::Error> {
        match numeric {
            PgNumeric::Number { int, exp } => Ok(BigDecimal::new(int, -i64::from(exp))),
            special => Err(format!("BigDecimal does not support {special}").into()),
        }
    }
}

impl DatabaseValuer for BigDecimal {
    fn database_value(&self) -> Result<Value, BoxDynError> {
        PgNumeric::try_from(self).map(Value::Numeric)
    }
}

impl DynamicScanner for BigDecimal {
    fn scan_value(&mut self, value: Value) -> Result<(), BoxDynError> {
        *self = match value {
            Value::Numeric(n) => n.try_into()?,
            Value::Int2(n) => n.into(),
            Value::Int4(n) => n.into(),
            Value::Int8(n) => n.into(),
            Value::Text(s) => s.parse()?,
            Value::Null => return Err(unexpected_null::<BigDecimal>()),
            other => return Err(format!("cannot scan {other:?} into BigDecimal").into()),
        };

        Ok(())
    }
}

impl HostValue for BigDecimal {
    crate::impl_host_any!();

    fn as_database_valuer(&self) -> Option<&dyn DatabaseValuer> {
        Some(self)
    }

    fn as_dynamic_scanner(&mut self) -> Option<&mut dyn DynamicScanner> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bigdecimal_to_pgnumeric() {
        let decimal: BigDecimal = "12345.67890".parse().unwrap();
        assert_eq!(
            PgNumeric::try_from(&decimal).unwrap(),
            PgNumeric::new(1_234_567_890, -5)
        );

        let decimal: BigDecimal = "-0.00001234".parse().unwrap();
        assert_eq!(
            PgNumeric::try_from(&decimal).unwrap().to_string(),
            "-0.00001234"
        );
    }

    #[test]
    fn test_pgnumeric_to_bigdecimal() {
        let decimal = BigDecimal::try_from(PgNumeric::new(15, 3)).unwrap();
        assert_eq!(decimal, "15000".parse::<BigDecimal>().unwrap());

        assert!(BigDecimal::try_from(PgNumeric::NaN).is_err());
    }
}
