//! This module defines the unit types used for generation and emissions accounting.
//!
//! Generation is sampled as instantaneous power in MW. Carbon factors are expressed as tonnes of
//! CO2 per MWh, which is numerically the same as kg of CO2 per kWh. Multiplying a sampled power by
//! a factor therefore gives tonnes of CO2 for one hour at that rate, and dividing emissions by
//! power gives an intensity in kgCO2/kWh with no further rescaling.
use float_cmp::{ApproxEq, F64Margin};

/// Round a value to the given number of decimal places, rounding halves away from zero.
pub fn round_dp(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);

    // Adding positive zero turns -0.0 into 0.0 so we never write "-0" to output files
    (value * scale).round() / scale + 0.0
}

/// Represents a dimensionless quantity.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, derive_more::Add, derive_more::Sub)]
pub struct Dimensionless(pub f64);

macro_rules! unit_struct {
    ($name:ident) => {
        /// Represents a type of quantity.
        #[derive(
            Debug, Clone, Copy, PartialEq, PartialOrd, Default, derive_more::Add, derive_more::Sub,
        )]
        pub struct $name(pub f64);

        impl $name {
            /// Returns the value of the unit type as a f64.
            pub fn value(self) -> f64 {
                self.0
            }

            /// Round to the given number of decimal places, rounding halves away from zero.
            pub fn round_dp(self, decimals: i32) -> Self {
                Self(round_dp(self.0, decimals))
            }
        }

        impl From<f64> for $name {
            fn from(val: f64) -> Self {
                Self(val)
            }
        }

        impl std::ops::AddAssign for $name {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl std::iter::Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl<'a> std::iter::Sum<&'a $name> for $name {
            fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
                Self(iter.map(|x| x.0).sum())
            }
        }

        impl std::ops::Mul<Dimensionless> for $name {
            type Output = $name;
            fn mul(self, rhs: Dimensionless) -> $name {
                $name(self.0 * rhs.0)
            }
        }

        impl ApproxEq for $name {
            type Margin = F64Margin;

            fn approx_eq<M: Into<Self::Margin>>(self, other: Self, margin: M) -> bool {
                self.0.approx_eq(other.0, margin)
            }
        }
    };
}

macro_rules! impl_mul {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Mul<$Rhs> for $Lhs {
            type Output = $Out;
            fn mul(self, rhs: $Rhs) -> $Out {
                <$Out>::from(self.0 * rhs.0)
            }
        }
        impl std::ops::Mul<$Lhs> for $Rhs {
            type Output = $Out;
            fn mul(self, lhs: $Lhs) -> $Out {
                <$Out>::from(self.0 * lhs.0)
            }
        }
    };
}

macro_rules! impl_div {
    ($Lhs:ty, $Rhs:ty, $Out:ty) => {
        impl std::ops::Div<$Rhs> for $Lhs {
            type Output = $Out;
            fn div(self, rhs: $Rhs) -> $Out {
                <$Out>::from(self.0 / rhs.0)
            }
        }
    };
}

impl From<f64> for Dimensionless {
    fn from(val: f64) -> Self {
        Self(val)
    }
}

// Base quantities
unit_struct!(Power);
unit_struct!(Emissions);

// Derived quantities
unit_struct!(CarbonFactor);
unit_struct!(EmissionIntensity);

// Multiplication rules
impl_mul!(Power, CarbonFactor, Emissions);

// Division rules
impl_div!(Emissions, Power, EmissionIntensity);
impl_div!(Power, Power, Dimensionless);
