//! Room finder handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::AppState;
use bracu_loop_common::{
    db::models::{Room, RoomSchedule},
    errors::{AppError, Result},
    rooms::{parse_time, RoomKind, RoomQuery},
};

#[derive(Debug, Deserialize)]
pub struct FreeRoomParams {
    pub weekday: i16,
    pub start: String,
    pub end: String,
    pub building: Option<String>,
    pub min_capacity: Option<i32>,
    pub kind: Option<RoomKind>,
}

impl FreeRoomParams {
    fn into_query(self) -> Result<RoomQuery> {
        let query = RoomQuery {
            weekday: self.weekday,
            start: parse_time(&self.start, "start")?,
            end: parse_time(&self.end, "end")?,
            building: self.building.filter(|b| !b.trim().is_empty()),
            min_capacity: self.min_capacity,
            kind: self.kind,
        };
        query.validate()?;
        Ok(query)
    }
}

#[derive(Debug, Deserialize)]
pub struct ScheduleParams {
    pub weekday: i16,
}

#[derive(Serialize)]
pub struct RoomDayResponse {
    pub room: Room,
    pub weekday: i16,
    pub slots: Vec<RoomSchedule>,
}

pub async fn list_rooms(State(state): State<AppState>) -> Result<Json<Vec<Room>>> {
    Ok(Json(state.repo().list_rooms().await?))
}

/// Rooms with no class overlapping the requested window
pub async fn free_rooms(
    State(state): State<AppState>,
    Query(params): Query<FreeRoomParams>,
) -> Result<Json<Vec<Room>>> {
    let query = params.into_query()?;
    Ok(Json(state.repo().find_free_rooms(&query).await?))
}

/// One room's classes on a weekday
pub async fn room_schedule(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<ScheduleParams>,
) -> Result<Json<RoomDayResponse>> {
    if !(0..=6).contains(&params.weekday) {
        return Err(AppError::validation(
            "weekday",
            "Weekday must be 0 (Sunday) to 6",
        ));
    }

    let (room, slots) = state.repo().room_day(id, params.weekday).await?;
    Ok(Json(RoomDayResponse {
        room,
        weekday: params.weekday,
        slots,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(start: &str, end: &str) -> FreeRoomParams {
        FreeRoomParams {
            weekday: 2,
            start: start.to_string(),
            end: end.to_string(),
            building: Some("  ".to_string()),
            min_capacity: None,
            kind: Some(RoomKind::Lab),
        }
    }

    #[test]
    fn test_free_room_params_parse() {
        let query = params("08:00", "09:20").into_query().unwrap();
        assert_eq!(query.weekday, 2);
        assert!(query.building.is_none());
        assert_eq!(query.kind, Some(RoomKind::Lab));
    }

    #[test]
    fn test_free_room_params_reject_bad_times() {
        assert!(params("8am", "09:20").into_query().is_err());
        assert!(params("11:00", "09:20").into_query().is_err());
    }
}
