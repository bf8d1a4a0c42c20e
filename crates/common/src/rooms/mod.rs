//! Free room lookup against weekly class schedules

use crate::db::models::{Room, RoomSchedule};
use crate::errors::{AppError, Result};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Room kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Classroom,
    Lab,
}

impl RoomKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomKind::Classroom => "classroom",
            RoomKind::Lab => "lab",
        }
    }
}

/// A time window on one weekday, with optional room filters
#[derive(Debug, Clone)]
pub struct RoomQuery {
    /// 0 = Sunday .. 6 = Saturday
    pub weekday: i16,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub building: Option<String>,
    pub min_capacity: Option<i32>,
    pub kind: Option<RoomKind>,
}

impl RoomQuery {
    pub fn validate(&self) -> Result<()> {
        if !(0..=6).contains(&self.weekday) {
            return Err(AppError::validation("weekday", "Weekday must be 0 (Sunday) to 6"));
        }
        if self.start >= self.end {
            return Err(AppError::validation("end", "End time must be after start time"));
        }
        Ok(())
    }

    fn admits(&self, room: &Room) -> bool {
        if let Some(building) = &self.building {
            if !room.building.eq_ignore_ascii_case(building.trim()) {
                return false;
            }
        }
        if let Some(min) = self.min_capacity {
            if room.capacity < min {
                return false;
            }
        }
        if let Some(kind) = self.kind {
            if room.kind != kind.as_str() {
                return false;
            }
        }
        true
    }
}

/// Parse `HH:MM` or `HH:MM:SS`
pub fn parse_time(value: &str, field: &str) -> Result<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| AppError::validation(field, "Time must be HH:MM"))
}

/// Half-open interval overlap: `[a_start, a_end)` against `[b_start, b_end)`
pub fn overlaps(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && b_start < a_end
}

/// Rooms with no slot on the query's weekday overlapping its window
///
/// Sorted by building, then room number.
pub fn free_rooms(rooms: &[Room], schedules: &[RoomSchedule], query: &RoomQuery) -> Result<Vec<Room>> {
    query.validate()?;

    let busy: HashSet<Uuid> = schedules
        .iter()
        .filter(|slot| slot.weekday == query.weekday)
        .filter(|slot| overlaps(slot.starts_at, slot.ends_at, query.start, query.end))
        .map(|slot| slot.room_id)
        .collect();

    let mut free: Vec<Room> = rooms
        .iter()
        .filter(|room| !busy.contains(&room.id) && query.admits(room))
        .cloned()
        .collect();

    free.sort_by(|a, b| {
        a.building
            .cmp(&b.building)
            .then_with(|| a.room_number.cmp(&b.room_number))
    });
    Ok(free)
}

/// A room's occupied slots on one weekday, earliest first
pub fn day_schedule(room_id: Uuid, schedules: &[RoomSchedule], weekday: i16) -> Vec<RoomSchedule> {
    let mut slots: Vec<RoomSchedule> = schedules
        .iter()
        .filter(|slot| slot.room_id == room_id && slot.weekday == weekday)
        .cloned()
        .collect();
    slots.sort_by_key(|slot| slot.starts_at);
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn room(building: &str, number: &str, capacity: i32, kind: &str) -> Room {
        Room {
            id: Uuid::new_v4(),
            building: building.to_string(),
            room_number: number.to_string(),
            capacity,
            kind: kind.to_string(),
            created_at: Utc::now().into(),
        }
    }

    fn slot(room: &Room, weekday: i16, start: NaiveTime, end: NaiveTime) -> RoomSchedule {
        RoomSchedule {
            id: Uuid::new_v4(),
            room_id: room.id,
            weekday,
            starts_at: start,
            ends_at: end,
            course_code: Some("CSE110".to_string()),
        }
    }

    fn query(start: NaiveTime, end: NaiveTime) -> RoomQuery {
        RoomQuery {
            weekday: 1,
            start,
            end,
            building: None,
            min_capacity: None,
            kind: None,
        }
    }

    #[test]
    fn test_half_open_windows_touching_do_not_overlap() {
        assert!(!overlaps(t(8, 0), t(9, 20), t(9, 20), t(10, 50)));
        assert!(overlaps(t(8, 0), t(9, 21), t(9, 20), t(10, 50)));
        assert!(overlaps(t(9, 0), t(12, 0), t(10, 0), t(11, 0)));
    }

    #[test]
    fn test_free_rooms_excludes_busy_rooms() {
        let a = room("UB2", "101", 40, "classroom");
        let b = room("UB2", "102", 40, "classroom");
        let schedules = vec![
            slot(&a, 1, t(9, 30), t(10, 50)),
            // Different weekday does not count
            slot(&b, 2, t(9, 30), t(10, 50)),
        ];

        let free = free_rooms(&[a.clone(), b.clone()], &schedules, &query(t(10, 0), t(11, 0))).unwrap();
        assert_eq!(free.len(), 1);
        assert_eq!(free[0].id, b.id);

        let after = free_rooms(&[a, b], &schedules, &query(t(10, 50), t(12, 0))).unwrap();
        assert_eq!(after.len(), 2);
    }

    #[test]
    fn test_free_rooms_filters_and_sorts() {
        let rooms = vec![
            room("UB3", "201", 30, "lab"),
            room("ub2", "305", 60, "classroom"),
            room("UB2", "104", 25, "classroom"),
        ];

        let all = free_rooms(&rooms, &[], &query(t(8, 0), t(9, 0))).unwrap();
        let labels: Vec<_> = all.iter().map(|r| format!("{} {}", r.building, r.room_number)).collect();
        assert_eq!(labels, vec!["UB2 104", "UB3 201", "ub2 305"]);

        let mut q = query(t(8, 0), t(9, 0));
        q.building = Some("UB2".into());
        q.min_capacity = Some(30);
        let filtered = free_rooms(&rooms, &[], &q).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].room_number, "305");

        let mut labs = query(t(8, 0), t(9, 0));
        labs.kind = Some(RoomKind::Lab);
        assert_eq!(free_rooms(&rooms, &[], &labs).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let err = free_rooms(&[], &[], &query(t(11, 0), t(11, 0))).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));

        let mut q = query(t(8, 0), t(9, 0));
        q.weekday = 7;
        assert!(free_rooms(&[], &[], &q).is_err());
    }

    #[test]
    fn test_parse_time() {
        assert_eq!(parse_time("08:00", "start").unwrap(), t(8, 0));
        assert_eq!(parse_time("14:30:00", "start").unwrap(), t(14, 30));
        assert!(parse_time("2pm", "start").is_err());
    }

    #[test]
    fn test_day_schedule_sorted() {
        let a = room("UB2", "101", 40, "classroom");
        let schedules = vec![
            slot(&a, 1, t(14, 0), t(15, 20)),
            slot(&a, 1, t(8, 0), t(9, 20)),
            slot(&a, 3, t(8, 0), t(9, 20)),
        ];
        let day = day_schedule(a.id, &schedules, 1);
        assert_eq!(day.len(), 2);
        assert_eq!(day[0].starts_at, t(8, 0));
    }
}
