//! Table mappings for each entity.

use super::SqlValue;
use crate::model::booking::{Booking, BookingStatus};
use crate::model::entity::Entity;
use crate::model::rating::Rating;
use crate::model::route::Route;
use crate::model::trip::{Trip, TripStatus};
use crate::model::user::User;
use rusqlite::types::FromSql;
use rusqlite::Row;

/// Maps an entity onto one table with a `TEXT` UUID primary key named `id`.
pub trait SqlEntity: Entity {
    const TABLE: &'static str;
    /// Non-key columns, in bind order.
    const COLUMNS: &'static [&'static str];

    /// Values for `COLUMNS`, in the same order.
    fn column_values(&self) -> Vec<SqlValue>;

    /// Builds the entity from a row selected as `id, COLUMNS...`.
    fn from_row(row: &Row<'_>) -> Result<Self, String>;
}

fn column<T: FromSql>(row: &Row<'_>, name: &str) -> Result<T, String> {
    row.get::<_, T>(name)
        .map_err(|err| format!("column `{name}`: {err}"))
}

fn text(value: &str) -> SqlValue {
    SqlValue::Text(value.to_string())
}

fn optional_text(value: Option<&str>) -> SqlValue {
    value.map_or(SqlValue::Null, text)
}

impl SqlEntity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] =
        &["first_name", "last_name", "email", "password_hash", "phone"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.first_name),
            text(&self.last_name),
            text(&self.email),
            text(&self.password_hash),
            optional_text(self.phone.as_deref()),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, String> {
        Ok(Self {
            id: Some(column(row, "id")?),
            first_name: column(row, "first_name")?,
            last_name: column(row, "last_name")?,
            email: column(row, "email")?,
            password_hash: column(row, "password_hash")?,
            phone: column(row, "phone")?,
        })
    }
}

impl SqlEntity for Route {
    const TABLE: &'static str = "routes";
    const COLUMNS: &'static [&'static str] =
        &["origin", "destination", "distance_km", "duration_minutes"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.origin),
            text(&self.destination),
            SqlValue::Real(self.distance_km),
            SqlValue::Integer(i64::from(self.duration_minutes)),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, String> {
        Ok(Self {
            id: Some(column(row, "id")?),
            origin: column(row, "origin")?,
            destination: column(row, "destination")?,
            distance_km: column(row, "distance_km")?,
            duration_minutes: column(row, "duration_minutes")?,
        })
    }
}

impl SqlEntity for Trip {
    const TABLE: &'static str = "trips";
    const COLUMNS: &'static [&'static str] = &[
        "driver_id",
        "route_id",
        "departure_at",
        "seats_total",
        "price_cents",
        "status",
    ];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.driver_id),
            text(&self.route_id),
            SqlValue::Integer(self.departure_at),
            SqlValue::Integer(i64::from(self.seats_total)),
            SqlValue::Integer(self.price_cents),
            text(self.status.as_str()),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, String> {
        let status: String = column(row, "status")?;
        Ok(Self {
            id: Some(column(row, "id")?),
            driver_id: column(row, "driver_id")?,
            route_id: column(row, "route_id")?,
            departure_at: column(row, "departure_at")?,
            seats_total: column(row, "seats_total")?,
            price_cents: column(row, "price_cents")?,
            status: TripStatus::parse(&status)
                .ok_or_else(|| format!("invalid trip status `{status}` in trips.status"))?,
        })
    }
}

impl SqlEntity for Booking {
    const TABLE: &'static str = "bookings";
    const COLUMNS: &'static [&'static str] =
        &["user_id", "trip_id", "seats", "status", "created_at"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.user_id),
            text(&self.trip_id),
            SqlValue::Integer(i64::from(self.seats)),
            text(self.status.as_str()),
            SqlValue::Integer(self.created_at),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, String> {
        let status: String = column(row, "status")?;
        Ok(Self {
            id: Some(column(row, "id")?),
            user_id: column(row, "user_id")?,
            trip_id: column(row, "trip_id")?,
            seats: column(row, "seats")?,
            status: BookingStatus::parse(&status)
                .ok_or_else(|| format!("invalid booking status `{status}` in bookings.status"))?,
            created_at: column(row, "created_at")?,
        })
    }
}

impl SqlEntity for Rating {
    const TABLE: &'static str = "ratings";
    const COLUMNS: &'static [&'static str] = &["user_id", "trip_id", "score", "comment"];

    fn column_values(&self) -> Vec<SqlValue> {
        vec![
            text(&self.user_id),
            text(&self.trip_id),
            SqlValue::Integer(i64::from(self.score)),
            optional_text(self.comment.as_deref()),
        ]
    }

    fn from_row(row: &Row<'_>) -> Result<Self, String> {
        Ok(Self {
            id: Some(column(row, "id")?),
            user_id: column(row, "user_id")?,
            trip_id: column(row, "trip_id")?,
            score: column(row, "score")?,
            comment: column(row, "comment")?,
        })
    }
}
