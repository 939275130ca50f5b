//! Types shared by the api and the stores.
//!
//! Everything that is persisted or sent over the wire is identified by an
//! [`Id`], a snowflake tagged with the kind of object it points at.

pub mod auth;
pub mod blog;
pub mod user;

use crate::{
    model::{
        auth::{InvalidAuthTokenHashError, NonPositiveLifetimeError},
        user::InvalidUsernameError,
    },
    snowflake::{Epoch, Snowflake, SnowflakeGenerator},
};
use serde::{Deserialize, Serialize};
use std::{
    fmt::{self, Display},
    marker::PhantomData,
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::{UtcDateTime, macros::utc_datetime};

/// Stored data that does not satisfy the model's invariants.
#[derive(Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum ModelValidationError {
    #[error(transparent)]
    Username(#[from] InvalidUsernameError),
    #[error(transparent)]
    NonPositiveLifetime(#[from] NonPositiveLifetimeError),
    #[error(transparent)]
    TokenHash(#[from] InvalidAuthTokenHashError),
    #[error("Like count may not be negative: {0}")]
    NegativeLikes(i64),
}

/// Ids count from the start of 2025.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct BloglistEpoch;

impl Epoch for BloglistEpoch {
    const EPOCH_TIME: UtcDateTime = utc_datetime!(2025-01-01 00:00);
}

pub type BloglistSnowflake = Snowflake<BloglistEpoch>;
pub type BloglistSnowflakeGenerator = SnowflakeGenerator<BloglistEpoch>;

/// Identifies an object of the kind named by `Marker`, so a blog id is never
/// accepted where a user id is expected.
///
/// On the wire an id is a plain integer. In the database it is a `BIGINT`
/// holding the same bits.
#[derive(
    Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Id<Marker> {
    snowflake: BloglistSnowflake,
    #[serde(skip)]
    marker: PhantomData<Marker>,
}

impl<Marker> Id<Marker> {
    #[must_use]
    pub fn new(snowflake: BloglistSnowflake) -> Self {
        Self {
            snowflake,
            marker: PhantomData,
        }
    }

    #[must_use]
    pub fn snowflake(self) -> BloglistSnowflake {
        self.snowflake
    }

    /// Reinterprets a `BIGINT` column.
    #[must_use]
    pub fn from_stored(value: i64) -> Self {
        Self::from(value.cast_unsigned())
    }

    /// The value for a `BIGINT` column.
    #[must_use]
    pub fn stored(self) -> i64 {
        self.snowflake.get().cast_signed()
    }
}

impl<Marker> Display for Id<Marker> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.snowflake.get())
    }
}

impl<Marker> FromStr for Id<Marker> {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self::from)
    }
}

impl<Marker> From<BloglistSnowflake> for Id<Marker> {
    fn from(value: BloglistSnowflake) -> Self {
        Self::new(value)
    }
}

impl<Marker> From<u64> for Id<Marker> {
    fn from(value: u64) -> Self {
        Self::new(BloglistSnowflake::new(value))
    }
}

impl<Marker> From<Id<Marker>> for u64 {
    fn from(value: Id<Marker>) -> Self {
        value.snowflake.get()
    }
}
