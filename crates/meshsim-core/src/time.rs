use serde::{Deserialize, Serialize};

/// One hourly bucket of the simulation, identified by `(day, hour)`.
///
/// All simulated metrics are resolved to hourly slots; minute granularity is
/// always zero. A simulation of `d` days has exactly `d * 24` slots.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TimeSlot {
    /// Zero-based day index within the simulation.
    pub day: u32,
    /// Hour of day, `0..24`.
    pub hour: u32,
}

impl TimeSlot {
    /// Hours per simulated day.
    pub const HOURS_PER_DAY: u32 = 24;

    /// Creates a slot from a day index and an hour of day.
    #[must_use]
    pub const fn new(day: u32, hour: u32) -> Self {
        Self { day, hour }
    }

    /// Map key format consumed by the persistence layer: `"day-hour-0"`.
    #[must_use]
    pub fn slot_key(&self) -> String {
        format!("{}-{}-0", self.day, self.hour)
    }

    /// Millisecond offset of this slot from the simulation start date.
    #[must_use]
    pub const fn offset_ms(&self) -> i64 {
        self.day as i64 * 86_400_000 + self.hour as i64 * 3_600_000
    }

    /// All slots of a simulation lasting `days` days, in chronological order.
    pub fn iter_all(days: u32) -> impl Iterator<Item = TimeSlot> {
        (0..days).flat_map(|day| (0..Self::HOURS_PER_DAY).map(move |hour| TimeSlot { day, hour }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_key_format() {
        assert_eq!(TimeSlot::new(0, 0).slot_key(), "0-0-0");
        assert_eq!(TimeSlot::new(3, 17).slot_key(), "3-17-0");
    }

    #[test]
    fn test_iter_all_is_chronological_and_complete() {
        let slots: Vec<TimeSlot> = TimeSlot::iter_all(2).collect();
        assert_eq!(slots.len(), 48);
        assert_eq!(slots[0], TimeSlot::new(0, 0));
        assert_eq!(slots[23], TimeSlot::new(0, 23));
        assert_eq!(slots[24], TimeSlot::new(1, 0));
        assert!(slots.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_offset_ms() {
        assert_eq!(TimeSlot::new(0, 0).offset_ms(), 0);
        assert_eq!(TimeSlot::new(0, 1).offset_ms(), 3_600_000);
        assert_eq!(TimeSlot::new(1, 0).offset_ms(), 86_400_000);
        assert_eq!(TimeSlot::new(1, 2).offset_ms(), 93_600_000);
    }
}
