use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime, Timelike};
use uuid::Uuid;

use crate::models::{BookedSlot, DayAvailability, DayHours, DayStatus, TimeSlot, WorkingHours};

pub const SLOT_MINUTES: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Free,
    Booked,
    /// Not a slot start inside the day's working hours, or the day is off or unconfigured.
    OutsideHours,
}

/// Slot start times for one working day, every 30 minutes while the whole slot fits before `end`.
pub fn generate_slot_times(day: &DayHours) -> Vec<NaiveTime> {
    if !day.is_working {
        return Vec::new();
    }

    let step = SLOT_MINUTES * 60;
    let end = day.end.num_seconds_from_midnight();
    let mut cursor = day.start.num_seconds_from_midnight();
    let mut times = Vec::new();

    while cursor + step <= end {
        if let Some(time) = NaiveTime::from_num_seconds_from_midnight_opt(cursor, 0) {
            times.push(time);
        }
        cursor += step;
    }

    times
}

/// Pure availability computation for a single dentist. Bookings of other dentists
/// and cancelled bookings never occupy a slot.
pub struct AvailabilityCalculator<'a> {
    dentist_id: Uuid,
    hours: &'a WorkingHours,
    booked: &'a [BookedSlot],
}

impl<'a> AvailabilityCalculator<'a> {
    pub fn new(dentist_id: Uuid, hours: &'a WorkingHours, booked: &'a [BookedSlot]) -> Self {
        Self { dentist_id, hours, booked }
    }

    fn booked_times(&self, date: NaiveDate) -> HashSet<NaiveTime> {
        self.booked
            .iter()
            .filter(|b| b.dentist_id == self.dentist_id && b.is_active() && b.date == date)
            .map(|b| b.time)
            .collect()
    }

    pub fn calculate_day(&self, date: NaiveDate) -> DayAvailability {
        let Some(day) = self.hours.for_date(date) else {
            return empty_day(date, DayStatus::NotConfigured);
        };

        let booked = self.booked_times(date);
        let time_slots: Vec<TimeSlot> = generate_slot_times(day)
            .into_iter()
            .map(|time| TimeSlot::new(time, booked.contains(&time)))
            .collect();

        let total_slots = time_slots.len();
        let available_slots = time_slots.iter().filter(|s| s.is_available).count();

        let status = if total_slots == 0 {
            DayStatus::Unavailable
        } else if available_slots == 0 {
            DayStatus::FullyBooked
        } else if available_slots * 2 < total_slots {
            DayStatus::Limited
        } else {
            DayStatus::Available
        };

        DayAvailability {
            date,
            status,
            available_slots,
            total_slots,
            time_slots,
        }
    }

    /// Inclusive on both ends; an inverted range yields no days.
    pub fn calculate_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<DayAvailability> {
        start
            .iter_days()
            .take_while(|date| *date <= end)
            .map(|date| self.calculate_day(date))
            .collect()
    }

    pub fn slot_state(&self, date: NaiveDate, time: NaiveTime) -> SlotState {
        let on_grid = self.hours
            .for_date(date)
            .is_some_and(|day| generate_slot_times(day).contains(&time));

        if !on_grid {
            SlotState::OutsideHours
        } else if self.booked_times(date).contains(&time) {
            SlotState::Booked
        } else {
            SlotState::Free
        }
    }

    pub fn is_bookable(&self, date: NaiveDate, time: NaiveTime) -> bool {
        self.slot_state(date, time) == SlotState::Free
    }
}

fn empty_day(date: NaiveDate, status: DayStatus) -> DayAvailability {
    DayAvailability {
        date,
        status,
        available_slots: 0,
        total_slots: 0,
        time_slots: Vec::new(),
    }
}
