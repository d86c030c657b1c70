use time::{OffsetDateTime, UtcOffset, Weekday};

/// Seven day mask, bit `n` set when the day `n` days after Sunday is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WeekdayMask(u8);
impl WeekdayMask {
	pub const ALL: WeekdayMask = WeekdayMask(0b111_1111);

	pub fn from_bits(bits: i16) -> Self {
		Self((bits & 0b111_1111) as u8)
	}

	pub fn from_days(days: &[Weekday]) -> Self {
		days.iter().fold(Self(0), |mask, day| Self(mask.0 | bit(*day)))
	}

	pub fn bits(self) -> i16 {
		i16::from(self.0)
	}

	pub fn contains(self, day: Weekday) -> bool {
		self.0 & bit(day) != 0
	}

	pub fn without(self, day: Weekday) -> Self {
		Self(self.0 & !bit(day))
	}

	pub fn is_empty(self) -> bool {
		self.0 == 0
	}
}

/// Converts a UTC instant to the operator's wall clock.
pub fn local_time(now: OffsetDateTime, utc_offset_hours: i8) -> OffsetDateTime {
	let offset = UtcOffset::from_hms(utc_offset_hours, 0, 0).unwrap_or(UtcOffset::UTC);

	now.to_offset(offset)
}

/// A template is due when its trigger hour is the current local hour and today is in its mask.
pub fn is_due(trigger_hour: u8, mask: WeekdayMask, local_now: OffsetDateTime) -> bool {
	trigger_hour == local_now.hour() && mask.contains(local_now.weekday())
}

fn bit(day: Weekday) -> u8 {
	1 << day.number_days_from_sunday()
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn mask_bits_follow_sunday_first_order() {
		let mask = WeekdayMask::from_days(&[Weekday::Sunday, Weekday::Saturday]);

		assert_eq!(mask.bits(), 0b100_0001);
		assert!(mask.contains(Weekday::Sunday));
		assert!(!mask.contains(Weekday::Monday));
	}

	#[test]
	fn local_time_applies_offset() {
		let local = local_time(datetime!(2026-10-20 05:00 UTC), 9);

		assert_eq!(local.hour(), 14);
		assert_eq!(local.weekday(), Weekday::Tuesday);
	}
}
