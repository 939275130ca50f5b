//! Module for working with snowflake IDs.
//!
//! A snowflake packs, from the most significant bit down, the milliseconds
//! since an [`Epoch`] (42 bits), a worker id (5 bits), a process id (5 bits)
//! and a rolling increment (12 bits). Ids from one generator therefore sort
//! in creation order.
//!
//! See <https://discord.com/developers/docs/reference#snowflakes>

use derive_where::derive_where;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error as _, Unexpected},
};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const TIMESTAMP_BITS: u32 = 42;
pub const WORKER_ID_BITS: u32 = 5;
pub const PROCESS_ID_BITS: u32 = 5;
pub const INCREMENT_BITS: u32 = 12;

const PROCESS_ID_SHIFT: u32 = INCREMENT_BITS;
const WORKER_ID_SHIFT: u32 = PROCESS_ID_SHIFT + PROCESS_ID_BITS;
const TIMESTAMP_SHIFT: u32 = WORKER_ID_SHIFT + WORKER_ID_BITS;

const fn mask(bits: u32) -> u64 {
    (1 << bits) - 1
}

pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum SnowflakeError {
    #[error("Specified time was before the snowflake epoch.")]
    TimeBeforeEpoch,
    #[error("Resulting timestamp uses too many bits.")]
    TimestampTooLarge,
}

macro_rules! snowflake_part {
    ($name:ident, $bits:ident) => {
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(u8);

        impl $name {
            #[must_use]
            pub fn new(value: u8) -> Option<Self> {
                (u64::from(value) <= mask($bits)).then_some(Self(value))
            }

            #[must_use]
            pub fn get(self) -> u8 {
                self.0
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let value = u8::deserialize(deserializer)?;
                Self::new(value).ok_or_else(|| {
                    D::Error::invalid_value(
                        Unexpected::Unsigned(value.into()),
                        &concat!(stringify!($name), " within range"),
                    )
                })
            }
        }
    };
}

snowflake_part!(WorkerId, WORKER_ID_BITS);
snowflake_part!(ProcessId, PROCESS_ID_BITS);

#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    /// Packs the parts into a snowflake. Bits of `millis` and `increment`
    /// beyond their field width are discarded.
    #[must_use]
    pub fn from_parts(
        millis: u64,
        worker_id: WorkerId,
        process_id: ProcessId,
        increment: u16,
    ) -> Self {
        Self::new(
            (millis & mask(TIMESTAMP_BITS)) << TIMESTAMP_SHIFT
                | u64::from(worker_id.get()) << WORKER_ID_SHIFT
                | u64::from(process_id.get()) << PROCESS_ID_SHIFT
                | u64::from(increment) & mask(INCREMENT_BITS),
        )
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn millis_since_epoch(self) -> u64 {
        self.0 >> TIMESTAMP_SHIFT
    }

    #[must_use]
    pub fn created_at(self) -> UtcDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        // 42 bits always fit into an i64.
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(self.millis_since_epoch().cast_signed())
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        #[allow(clippy::cast_possible_truncation)]
        WorkerId(((self.0 >> WORKER_ID_SHIFT) & mask(WORKER_ID_BITS)) as u8)
    }

    #[must_use]
    pub fn process_id(self) -> ProcessId {
        #[allow(clippy::cast_possible_truncation)]
        ProcessId(((self.0 >> PROCESS_ID_SHIFT) & mask(PROCESS_ID_BITS)) as u8)
    }

    #[must_use]
    pub fn increment(self) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let increment = (self.0 & mask(INCREMENT_BITS)) as u16;
        increment
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<SnowflakeEpoch> From<Snowflake<SnowflakeEpoch>> for u64 {
    fn from(value: Snowflake<SnowflakeEpoch>) -> Self {
        value.get()
    }
}

pub fn millis_since_epoch<SnowflakeEpoch: Epoch>(time: UtcDateTime) -> Result<u64, SnowflakeError> {
    let elapsed = time - SnowflakeEpoch::EPOCH_TIME;
    if elapsed.is_negative() {
        return Err(SnowflakeError::TimeBeforeEpoch);
    }

    let millis = u64::try_from(elapsed.whole_milliseconds())
        .map_err(|_| SnowflakeError::TimestampTooLarge)?;
    if millis > mask(TIMESTAMP_BITS) {
        return Err(SnowflakeError::TimestampTooLarge);
    }

    Ok(millis)
}

#[derive_where(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    process_id: ProcessId,
    next_increment: u16,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            next_increment: 0,
            phantom_data: PhantomData,
        }
    }

    #[must_use]
    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    #[must_use]
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    pub fn generate_at(
        &mut self,
        time: UtcDateTime,
    ) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeError>
    where
        SnowflakeEpoch: Epoch,
    {
        let millis = millis_since_epoch::<SnowflakeEpoch>(time)?;

        let increment = self.next_increment;
        #[allow(clippy::cast_possible_truncation)]
        let next = ((u64::from(increment) + 1) & mask(INCREMENT_BITS)) as u16;
        self.next_increment = next;

        Ok(Snowflake::from_parts(
            millis,
            self.worker_id,
            self.process_id,
            increment,
        ))
    }

    pub fn generate(&mut self) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeError>
    where
        SnowflakeEpoch: Epoch,
    {
        self.generate_at(UtcDateTime::now())
    }
}

#[cfg(test)]
mod tests {
    use crate::snowflake::{
        Epoch, ProcessId, Snowflake, SnowflakeError, SnowflakeGenerator, WorkerId,
        millis_since_epoch,
    };
    use time::{Duration, UtcDateTime, macros::utc_datetime};

    struct MillennialEpoch;
    impl Epoch for MillennialEpoch {
        const EPOCH_TIME: UtcDateTime = utc_datetime!(2000-1-1 00:00);
    }

    #[test]
    fn legal_part_values() {
        for legal_id in [0, 0xD, 0x1F] {
            assert!(WorkerId::new(legal_id).is_some());
            assert!(ProcessId::new(legal_id).is_some());
        }
        for illegal_id in [0x20, 0xF0, u8::MAX] {
            assert!(WorkerId::new(illegal_id).is_none());
            assert!(ProcessId::new(illegal_id).is_none());
        }
    }

    #[test]
    fn part_deserialization_checks_range() {
        assert_eq!(
            serde_json::from_str::<WorkerId>("31").unwrap(),
            WorkerId::new(31).unwrap()
        );
        assert!(serde_json::from_str::<ProcessId>("32").is_err());
    }

    #[test]
    fn timestamp_range() {
        assert_eq!(
            millis_since_epoch::<MillennialEpoch>(MillennialEpoch::EPOCH_TIME),
            Ok(0)
        );
        assert_eq!(
            millis_since_epoch::<MillennialEpoch>(
                MillennialEpoch::EPOCH_TIME + Duration::milliseconds(0x03FF_FFFF_FFFF)
            ),
            Ok(0x03FF_FFFF_FFFF)
        );
        assert_eq!(
            millis_since_epoch::<MillennialEpoch>(
                MillennialEpoch::EPOCH_TIME - Duration::milliseconds(1)
            ),
            Err(SnowflakeError::TimeBeforeEpoch)
        );
        assert_eq!(
            millis_since_epoch::<MillennialEpoch>(
                MillennialEpoch::EPOCH_TIME + Duration::milliseconds(0x0400_0000_0000)
            ),
            Err(SnowflakeError::TimestampTooLarge)
        );
    }

    #[test]
    fn snowflake_from_into_parts() {
        let worker_id = WorkerId::new(1).unwrap();
        let process_id = ProcessId::new(1).unwrap();

        let snowflake = Snowflake::<MillennialEpoch>::from_parts(1, worker_id, process_id, 1);
        assert_eq!(snowflake.get(), 4_329_473);

        let time = utc_datetime!(2025-10-24 10:30);
        let millis = millis_since_epoch::<MillennialEpoch>(time).unwrap();
        let worker_id = WorkerId::new(0b10101).unwrap();
        let process_id = ProcessId::new(0b10001).unwrap();

        let snowflake =
            Snowflake::<MillennialEpoch>::from_parts(millis, worker_id, process_id, 100);
        assert_eq!(snowflake.millis_since_epoch(), millis);
        assert_eq!(snowflake.created_at(), time);
        assert_eq!(snowflake.worker_id(), worker_id);
        assert_eq!(snowflake.process_id(), process_id);
        assert_eq!(snowflake.increment(), 100);
    }

    #[test]
    fn snowflake_generator() {
        let worker_id = WorkerId::new(10).unwrap();
        let process_id = ProcessId::new(0).unwrap();
        let time = utc_datetime!(2025-10-24 10:55);
        let millis = millis_since_epoch::<MillennialEpoch>(time).unwrap();

        let mut generator = SnowflakeGenerator::<MillennialEpoch>::new(worker_id, process_id);

        let first = generator.generate_at(time).unwrap();
        let second = generator.generate_at(time).unwrap();
        assert_eq!(first, Snowflake::from_parts(millis, worker_id, process_id, 0));
        assert_eq!(second, Snowflake::from_parts(millis, worker_id, process_id, 1));
        assert!(first < second);

        assert_eq!(
            generator.generate_at(MillennialEpoch::EPOCH_TIME - Duration::seconds(1)),
            Err(SnowflakeError::TimeBeforeEpoch)
        );
    }

    #[test]
    fn increment_wraps_around() {
        let mut generator = SnowflakeGenerator::<MillennialEpoch>::default();
        let time = utc_datetime!(2025-10-24 10:55);

        let last = (0..0x1000)
            .map(|_| generator.generate_at(time).unwrap())
            .last()
            .unwrap();
        assert_eq!(last.increment(), 0xFFF);
        assert_eq!(generator.generate_at(time).unwrap().increment(), 0);
    }
}
