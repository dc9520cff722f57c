pub mod infrastructure;
pub mod poll_logger;
pub mod poller_state;
pub mod recognition_poller;
