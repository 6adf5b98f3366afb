pub mod availability;
pub mod blocked;
pub mod calendar;
pub mod generator;
