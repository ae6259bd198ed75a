//! Voting power arithmetic.
//!
//! On-chain voter weights are `u64`, but intermediate sums across many assets or
//! multiplying plugins can exceed that. [`VoteWeight`] is backed by a `u128` and
//! every operation is checked, so an overflow surfaces as [`WeightOverflow`]
//! instead of wrapping.

use thiserror::Error ;



/// Arithmetic on a [`VoteWeight`] exceeded its representable range.
#[derive( Error, Debug, Clone, Copy, PartialEq, Eq )]
#[error( "Vote weight overflow: {lhs} {op} {rhs}" )]
pub struct WeightOverflow {
    lhs: u128,
    op: &'static str,
    rhs: u128,
}

/// A non-negative amount of voting power.
///
/// Zero is a legitimate result (the voter has no power), distinct from a failed
/// resolution which is always reported as an error.
#[derive( Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash )]
pub struct VoteWeight( u128 );

impl VoteWeight {

    pub const ZERO: Self = Self( 0 );

    /// Creates a weight from a raw amount.
    pub const fn new( amount: u128 ) -> Self { Self( amount )}

    /// The raw amount.
    #[inline] pub const fn get( self ) -> u128 { self.0 }

    #[inline] pub const fn is_zero( self ) -> bool { self.0 == 0 }

    /// Adds two weights.
    ///
    /// # Errors
    /// Returns [`WeightOverflow`] if the sum does not fit.
    pub fn checked_add( self, rhs: Self ) -> Result<Self, WeightOverflow> {
        self.0.checked_add( rhs.0 )
            .map( Self )
            .ok_or( WeightOverflow { lhs: self.0, op: "+", rhs: rhs.0 })
    }

    /// Multiplies a weight by a scalar.
    ///
    /// # Errors
    /// Returns [`WeightOverflow`] if the product does not fit.
    pub fn checked_mul( self, factor: u128 ) -> Result<Self, WeightOverflow> {
        self.0.checked_mul( factor )
            .map( Self )
            .ok_or( WeightOverflow { lhs: self.0, op: "*", rhs: factor })
    }

    /// Narrows the weight to the `u64` stored in voter weight records.
    ///
    /// # Errors
    /// Returns [`WeightOverflow`] if the amount exceeds `u64::MAX`.
    pub fn to_u64( self ) -> Result<u64, WeightOverflow> {
        u64::try_from( self.0 ).map_err(| _ | WeightOverflow { lhs: self.0, op: "as u64", rhs: u128::from( u64::MAX )})
    }

    /// Sums an iterator of weights, failing on the first overflow.
    ///
    /// # Errors
    /// Returns [`WeightOverflow`] if the running total does not fit.
    pub fn try_sum( weights: impl IntoIterator<Item = Self> ) -> Result<Self, WeightOverflow> {
        weights.into_iter().try_fold( Self::ZERO, Self::checked_add )
    }

}

impl From<u64> for VoteWeight {
    fn from( amount: u64 ) -> Self { Self( u128::from( amount ))}
}

impl std::fmt::Display for VoteWeight {
    fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result {
        std::fmt::Display::fmt( &self.0, f )
    }
}
