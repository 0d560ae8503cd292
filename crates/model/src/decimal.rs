use std::{
    fmt::{Debug, Display},
    iter::Sum,
    str::FromStr,
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const DECIMALS: u8 = 2;

/// Fixed-point money value with two decimal places, stored as i64.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Decimal(i64);

impl Decimal {
    pub fn int(value: i64) -> Decimal {
        Decimal(value * 10i64.pow(DECIMALS as u32))
    }

    pub fn zero() -> Decimal {
        Decimal(0)
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn inner(&self) -> i64 {
        self.0
    }

    /// Even share for one of `parts` participants. Truncates at the cent;
    /// refunds must mirror recorded charges, not recompute the share.
    pub fn split(&self, parts: u32) -> Decimal {
        if parts == 0 {
            return *self;
        }
        Decimal(self.0 / parts as i64)
    }
}

impl Debug for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl Display for Decimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let value = self.0 as f64 / 10i64.pow(DECIMALS as u32) as f64;
        write!(f, "{:.2}", value)
    }
}

impl From<f64> for Decimal {
    fn from(value: f64) -> Self {
        Decimal((value * 10f64.powi(DECIMALS as i32)) as i64)
    }
}

impl From<u32> for Decimal {
    fn from(value: u32) -> Self {
        Decimal::int(value as i64)
    }
}

impl TryFrom<&str> for Decimal {
    type Error = ParseDecimalError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let val = value.parse::<f64>().map_err(|_| ParseDecimalError)?;
        Ok(Decimal::from(val))
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::try_from(s)
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, other: Decimal) -> Decimal {
        Decimal(self.0 + other.0)
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, other: Decimal) -> Decimal {
        Decimal(self.0 - other.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, other: Decimal) -> Decimal {
        Decimal((self.0 * other.0) / 10i64.pow(DECIMALS as u32))
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, other: Decimal) -> Decimal {
        Decimal((self.0 * 10i64.pow(DECIMALS as u32)) / other.0)
    }
}

impl std::ops::AddAssign for Decimal {
    fn add_assign(&mut self, other: Decimal) {
        self.0 += other.0;
    }
}

impl std::ops::SubAssign for Decimal {
    fn sub_assign(&mut self, other: Decimal) {
        self.0 -= other.0;
    }
}

impl Sum for Decimal {
    fn sum<I: Iterator<Item = Decimal>>(iter: I) -> Decimal {
        iter.fold(Decimal::zero(), |acc, x| acc + x)
    }
}

#[derive(Debug)]
pub struct ParseDecimalError;

impl std::fmt::Display for ParseDecimalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse decimal value")
    }
}

impl std::error::Error for ParseDecimalError {}

impl Serialize for Decimal {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for Decimal {
    fn deserialize<D>(deserializer: D) -> Result<Decimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        Ok(Decimal(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!("1000.00", format!("{}", Decimal::int(1000)));
        assert_eq!("-1000.00", format!("{}", Decimal::int(-1000)));
        assert_eq!("0.00", format!("{}", Decimal::zero()));
        assert_eq!("1234.56", format!("{}", Decimal::from(1234.56)));
    }

    #[test]
    fn test_arithmetic() {
        let price = Decimal::int(1000);
        let surcharge = Decimal::from(250.50);
        assert_eq!(Decimal::from(1250.50), price + surcharge);
        assert_eq!(Decimal::from(749.50), price - surcharge);

        let total = Decimal::int(1200) * Decimal::from(1.5);
        assert_eq!(Decimal::int(1800), total);

        let share = Decimal::int(2000) / Decimal::int(4);
        assert_eq!(Decimal::int(500), share);
    }

    #[test]
    fn test_split() {
        assert_eq!(Decimal::int(1000), Decimal::int(2000).split(2));
        assert_eq!(Decimal::from(666.66), Decimal::int(2000).split(3));
        // zero parts is a caller bug, keep the value instead of dividing
        assert_eq!(Decimal::int(2000), Decimal::int(2000).split(0));
    }

    #[test]
    fn test_split_mirrors_back() {
        let total = Decimal::int(1999);
        let share = total.split(3);
        let mut balance = Decimal::int(5000);
        balance -= share;
        balance += share;
        assert_eq!(Decimal::int(5000), balance);
    }

    #[test]
    fn test_sum() {
        let sum: Decimal = vec![Decimal::int(1), Decimal::from(2.5), Decimal::int(3)]
            .into_iter()
            .sum();
        assert_eq!(Decimal::from(6.5), sum);
    }
}
