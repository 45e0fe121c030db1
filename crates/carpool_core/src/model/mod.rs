//! Domain entities persisted by every storage backend.
//!
//! # Responsibility
//! - Define the canonical records for users, routes, trips, bookings and
//!   ratings.
//! - Describe each entity through the `Entity` trait so one generic store per
//!   backend family can persist all of them.
//!
//! # Invariants
//! - `id` is `None` until a store assigns it during `create`.
//! - Once assigned, an identifier is never changed or reused.

pub mod booking;
pub mod entity;
pub mod rating;
pub mod route;
pub mod trip;
pub mod user;
