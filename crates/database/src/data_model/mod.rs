pub mod occupancy;
pub mod station;
pub mod street;
