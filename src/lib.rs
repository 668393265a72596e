//! Query the X server for the user's idle time.
//!
//! Asks the MIT-SCREEN-SAVER extension how many milliseconds have passed
//! since the last input event. The [`idle`] module owns the session and the
//! query itself; [`format`] renders the answer for humans.

pub mod format;
pub mod idle;
