//! Idle detection via the X11 MIT-SCREEN-SAVER extension.
//!
//! Queries the idle counter the server keeps for the screen saver: the
//! milliseconds since the last input event. The calls this needs from the X
//! client libraries sit behind [`XScreenSaver`] so tests can script them; the
//! real bindings live in [`xlib`].

pub mod xlib;

use std::ffi::c_int;

use thiserror::Error;
use tracing::debug;

/// Failure modes of a single idle query.
///
/// The display strings are the tool's stderr diagnostics, one fixed line per
/// failure.
#[derive(Debug, Error)]
pub enum IdleError {
    /// No connection to the X server could be established.
    #[error("couldn't open display")]
    NoDisplay,

    /// The server does not speak the screen saver extension.
    #[error("screen saver extension not supported")]
    ExtensionUnsupported,

    /// The client-side info buffer could not be allocated.
    #[error("couldn't allocate screen saver info")]
    AllocationFailed,

    /// The info request itself failed.
    #[error("couldn't query screen saver info")]
    QueryFailed,
}

/// The X client-library calls an idle query is built from.
///
/// Every method is synchronous and side effects stay inside the handles
/// passed in, mirroring the underlying C surface.
pub trait XScreenSaver {
    type Display;
    type Window: Copy;
    type Info;

    /// Connect to the default display. `None` when no server answers.
    fn open_display(&self) -> Option<Self::Display>;

    /// Close a connection returned by [`Self::open_display`].
    fn close_display(&self, display: &mut Self::Display);

    /// Root window of the connection's default screen.
    fn default_root_window(&self, display: &Self::Display) -> Self::Window;

    /// Negotiate extension presence. `Some((event_base, error_base))` when
    /// the server supports it.
    fn query_extension(&self, display: &Self::Display) -> Option<(c_int, c_int)>;

    /// Allocate an info buffer. `None` when allocation fails.
    fn alloc_info(&self) -> Option<Self::Info>;

    /// Fill `info` with the current screen saver state; false on failure.
    fn query_info(
        &self,
        display: &Self::Display,
        window: Self::Window,
        info: &mut Self::Info,
    ) -> bool;

    /// Milliseconds since the last input event, read from a filled buffer.
    fn idle_millis(&self, info: &Self::Info) -> u64;

    /// Release a buffer returned by [`Self::alloc_info`].
    fn free_info(&self, info: Self::Info);
}

/// An open session with the display server.
///
/// Exists only after a successful open, and closes the connection when
/// dropped, so every exit path releases it exactly once.
pub struct Connection<'a, X: XScreenSaver> {
    api: &'a X,
    display: X::Display,
}

impl<'a, X: XScreenSaver> Connection<'a, X> {
    /// Connect to the default display resolved from the environment.
    pub fn open(api: &'a X) -> Result<Self, IdleError> {
        let display = api.open_display().ok_or(IdleError::NoDisplay)?;
        debug!("connected to the default display");
        Ok(Self { api, display })
    }

    /// Root window of the connection's default screen.
    pub fn root_window(&self) -> X::Window {
        self.api.default_root_window(&self.display)
    }
}

impl<X: XScreenSaver> Drop for Connection<'_, X> {
    fn drop(&mut self) {
        self.api.close_display(&mut self.display);
    }
}

/// Ask the server how many milliseconds have passed since the last input
/// event.
///
/// Performs one allocation and exactly one matching release per call; the
/// buffer is released on the failure path too. Extension negotiation runs
/// first so an unsupported server is reported before anything is allocated.
pub fn query_idle_millis<X: XScreenSaver>(conn: &Connection<'_, X>) -> Result<u64, IdleError> {
    let api = conn.api;

    let Some((event_base, error_base)) = api.query_extension(&conn.display) else {
        return Err(IdleError::ExtensionUnsupported);
    };
    debug!(event_base, error_base, "screen saver extension present");

    let mut info = api.alloc_info().ok_or(IdleError::AllocationFailed)?;

    let root = conn.root_window();
    let idle = if api.query_info(&conn.display, root, &mut info) {
        Some(api.idle_millis(&info))
    } else {
        None
    };

    api.free_info(info);

    idle.ok_or(IdleError::QueryFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;

    /// Scriptable stand-in for the X client libraries, counting every
    /// resource acquisition and release.
    #[derive(Default)]
    struct FakeServer {
        refuse_display: bool,
        without_extension: bool,
        refuse_alloc: bool,
        fail_query: bool,
        idle: u64,
        opens: Cell<u32>,
        closes: Cell<u32>,
        allocs: Cell<u32>,
        frees: Cell<u32>,
    }

    struct FakeInfo {
        idle: u64,
    }

    fn bump(counter: &Cell<u32>) {
        counter.set(counter.get() + 1);
    }

    impl XScreenSaver for FakeServer {
        type Display = ();
        type Window = u64;
        type Info = FakeInfo;

        fn open_display(&self) -> Option<()> {
            if self.refuse_display {
                return None;
            }
            bump(&self.opens);
            Some(())
        }

        fn close_display(&self, _display: &mut ()) {
            bump(&self.closes);
        }

        fn default_root_window(&self, _display: &()) -> u64 {
            42
        }

        fn query_extension(&self, _display: &()) -> Option<(c_int, c_int)> {
            (!self.without_extension).then_some((91, 92))
        }

        fn alloc_info(&self) -> Option<FakeInfo> {
            if self.refuse_alloc {
                return None;
            }
            bump(&self.allocs);
            Some(FakeInfo { idle: 0 })
        }

        fn query_info(&self, _display: &(), window: u64, info: &mut FakeInfo) -> bool {
            // The query must target the root window handed out above.
            assert_eq!(window, 42);
            if self.fail_query {
                return false;
            }
            info.idle = self.idle;
            true
        }

        fn idle_millis(&self, info: &FakeInfo) -> u64 {
            info.idle
        }

        fn free_info(&self, _info: FakeInfo) {
            bump(&self.frees);
        }
    }

    #[test]
    fn test_refused_display_reports_no_display() {
        let server = FakeServer {
            refuse_display: true,
            ..FakeServer::default()
        };

        let err = Connection::open(&server).map(|_| ()).unwrap_err();
        assert!(matches!(err, IdleError::NoDisplay));
        // No successful open, so nothing to close.
        assert_eq!(server.closes.get(), 0);
    }

    #[test]
    fn test_successful_query_reports_idle_millis() {
        let server = FakeServer {
            idle: 1_234,
            ..FakeServer::default()
        };

        let conn = Connection::open(&server).unwrap();
        assert_eq!(query_idle_millis(&conn).unwrap(), 1_234);
        assert_eq!(server.allocs.get(), 1);
        assert_eq!(server.frees.get(), 1);
    }

    #[test]
    fn test_missing_extension_skips_allocation() {
        let server = FakeServer {
            without_extension: true,
            ..FakeServer::default()
        };

        let conn = Connection::open(&server).unwrap();
        let err = query_idle_millis(&conn).unwrap_err();
        assert!(matches!(err, IdleError::ExtensionUnsupported));
        assert_eq!(server.allocs.get(), 0);
        assert_eq!(server.frees.get(), 0);
    }

    #[test]
    fn test_failed_allocation_frees_nothing() {
        let server = FakeServer {
            refuse_alloc: true,
            ..FakeServer::default()
        };

        let conn = Connection::open(&server).unwrap();
        let err = query_idle_millis(&conn).unwrap_err();
        assert!(matches!(err, IdleError::AllocationFailed));
        assert_eq!(server.frees.get(), 0);
    }

    #[test]
    fn test_failed_query_still_frees_the_buffer() {
        let server = FakeServer {
            fail_query: true,
            ..FakeServer::default()
        };

        let conn = Connection::open(&server).unwrap();
        let err = query_idle_millis(&conn).unwrap_err();
        assert!(matches!(err, IdleError::QueryFailed));
        assert_eq!(server.allocs.get(), 1);
        assert_eq!(server.frees.get(), 1);
    }

    #[test]
    fn test_connection_closes_exactly_once() {
        let server = FakeServer::default();

        let conn = Connection::open(&server).unwrap();
        drop(conn);
        assert_eq!(server.opens.get(), 1);
        assert_eq!(server.closes.get(), 1);
    }

    #[test]
    fn test_connection_closes_after_failed_query() {
        let server = FakeServer {
            fail_query: true,
            ..FakeServer::default()
        };

        {
            let conn = Connection::open(&server).unwrap();
            let _ = query_idle_millis(&conn);
        }
        assert_eq!(server.closes.get(), 1);
    }

    #[test]
    fn test_zero_idle_is_a_valid_answer() {
        let server = FakeServer::default();

        let conn = Connection::open(&server).unwrap();
        assert_eq!(query_idle_millis(&conn).unwrap(), 0);
    }

    #[test]
    fn test_diagnostics_are_fixed_strings() {
        assert_eq!(IdleError::NoDisplay.to_string(), "couldn't open display");
        assert_eq!(
            IdleError::ExtensionUnsupported.to_string(),
            "screen saver extension not supported"
        );
        assert_eq!(
            IdleError::AllocationFailed.to_string(),
            "couldn't allocate screen saver info"
        );
        assert_eq!(
            IdleError::QueryFailed.to_string(),
            "couldn't query screen saver info"
        );
    }
}
