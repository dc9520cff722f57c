pub mod capture;
pub mod notification;
pub mod polling;
pub mod recognition;
pub mod shared;
