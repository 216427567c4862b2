//! HTTP endpoint tests.

mod attachment_tests;
mod channel_tests;
mod room_tests;
mod snapshot_tests;
mod system_tests;
mod transfer_tests;
mod user_tests;
