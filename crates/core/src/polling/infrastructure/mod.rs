pub mod threaded_poll_loop;
