pub mod events;
pub mod images;
pub mod search;
pub mod uploads;
