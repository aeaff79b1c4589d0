mod helpers;
mod test_scheduler;
mod test_utils;
