//! Money value object.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Money amount in Indian rupees, stored as integer paise to avoid floating
/// point drift when folding line totals.
///
/// On the wire the storefront backend uses plain JSON numbers in rupees
/// (`149.5`), so serialization goes through rupees and decoding rounds to
/// the nearest paisa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money {
    paise: i64,
}

impl Money {
    /// Creates a money amount from paise.
    pub const fn from_paise(paise: i64) -> Self {
        Self { paise }
    }

    /// Creates a money amount from whole rupees.
    pub const fn from_rupees(rupees: i64) -> Self {
        Self {
            paise: rupees * 100,
        }
    }

    /// Creates a money amount from a fractional rupee value, rounding to the
    /// nearest paisa.
    pub fn from_rupees_f64(rupees: f64) -> Self {
        Self {
            paise: (rupees * 100.0).round() as i64,
        }
    }

    /// Returns zero money.
    pub const fn zero() -> Self {
        Self { paise: 0 }
    }

    /// Returns the amount in paise.
    pub fn paise(&self) -> i64 {
        self.paise
    }

    /// Returns the whole-rupee portion.
    pub fn rupees(&self) -> i64 {
        self.paise / 100
    }

    /// Returns the paise remainder after whole rupees.
    pub fn paise_part(&self) -> i64 {
        self.paise.abs() % 100
    }

    /// Returns the amount as fractional rupees.
    pub fn as_rupees_f64(&self) -> f64 {
        self.paise as f64 / 100.0
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.paise == 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            paise: self.paise * i64::from(quantity),
        }
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.paise < 0 {
            write!(f, "-₹{}.{:02}", self.rupees().abs(), self.paise_part())
        } else {
            write!(f, "₹{}.{:02}", self.rupees(), self.paise_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            paise: self.paise + rhs.paise,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            paise: self.paise - rhs.paise,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.paise += rhs.paise;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.paise % 100 == 0 {
            serializer.serialize_i64(self.rupees())
        } else {
            serializer.serialize_f64(self.as_rupees_f64())
        }
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rupees = f64::deserialize(deserializer)?;
        Ok(Money::from_rupees_f64(rupees))
    }
}
