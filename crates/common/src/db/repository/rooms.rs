//! Room and schedule data access

use super::Repository;
use crate::db::models::*;
use crate::errors::{AppError, Result};
use crate::rooms::{day_schedule, free_rooms, RoomQuery};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use uuid::Uuid;

impl Repository {
    // ========================================================================
    // Room Operations
    // ========================================================================

    /// All rooms, by building then number
    pub async fn list_rooms(&self) -> Result<Vec<Room>> {
        RoomEntity::find()
            .order_by_asc(RoomColumn::Building)
            .order_by_asc(RoomColumn::RoomNumber)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Occupied slots on one weekday
    pub async fn schedules_on(&self, weekday: i16) -> Result<Vec<RoomSchedule>> {
        RoomScheduleEntity::find()
            .filter(RoomScheduleColumn::Weekday.eq(weekday))
            .order_by_asc(RoomScheduleColumn::StartsAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Rooms free for the whole query window
    pub async fn find_free_rooms(&self, query: &RoomQuery) -> Result<Vec<Room>> {
        query.validate()?;
        let (rooms, schedules) =
            futures::try_join!(self.list_rooms(), self.schedules_on(query.weekday))?;
        free_rooms(&rooms, &schedules, query)
    }

    /// A room and its occupied slots on one weekday
    pub async fn room_day(&self, room_id: Uuid, weekday: i16) -> Result<(Room, Vec<RoomSchedule>)> {
        let room = RoomEntity::find_by_id(room_id)
            .one(self.read_conn())
            .await?
            .ok_or_else(|| AppError::NotFound {
                resource_type: "room".to_string(),
                id: room_id.to_string(),
            })?;

        let schedules = self.schedules_on(weekday).await?;
        Ok((room, day_schedule(room_id, &schedules, weekday)))
    }
}
