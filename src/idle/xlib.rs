//! Production [`XScreenSaver`] over dynamically loaded libX11 and libXss.
//!
//! The libraries are resolved once at startup and every symbol is called
//! through the loaded handles, so the binary itself links against neither.
//! All unsafe FFI is confined to this module.

use std::ffi::c_int;
use std::ptr;

use tracing::debug;
use x11_dl::xlib;
use x11_dl::xlib::Xlib;
use x11_dl::xss::XScreenSaverInfo;
use x11_dl::xss::Xss;

use super::IdleError;
use super::XScreenSaver;

/// The loaded X client libraries.
///
/// libXss is allowed to be absent at load time. Without it the extension
/// cannot be spoken at all, which surfaces as
/// [`IdleError::ExtensionUnsupported`] once negotiation runs, after the
/// display connection has been attempted.
pub struct XlibScreenSaver {
    xlib: Xlib,
    xss: Option<Xss>,
}

impl XlibScreenSaver {
    /// Load libX11 and, when present, libXss.
    pub fn load() -> Result<Self, IdleError> {
        let xlib = match Xlib::open() {
            Ok(lib) => lib,
            Err(err) => {
                debug!("failed to load libX11: {err}");
                return Err(IdleError::NoDisplay);
            }
        };

        let xss = match Xss::open() {
            Ok(lib) => Some(lib),
            Err(err) => {
                debug!("failed to load libXss: {err}");
                None
            }
        };

        Ok(Self { xlib, xss })
    }
}

/// The handle types here are plain pointers, so the compiler cannot rule out
/// a replayed handle. The contract is one [`XScreenSaver::close_display`] per
/// open, one [`XScreenSaver::free_info`] per alloc, and no
/// [`XScreenSaver::idle_millis`] read before a successful
/// [`XScreenSaver::query_info`] on the same buffer.
/// [`query_idle_millis`](super::query_idle_millis) follows this sequence.
impl XScreenSaver for XlibScreenSaver {
    type Display = *mut xlib::Display;
    type Window = xlib::Window;
    type Info = *mut XScreenSaverInfo;

    fn open_display(&self) -> Option<Self::Display> {
        // NULL asks Xlib to resolve the display from the environment.
        let display = unsafe { (self.xlib.XOpenDisplay)(ptr::null()) };
        (!display.is_null()).then_some(display)
    }

    fn close_display(&self, display: &mut Self::Display) {
        unsafe { (self.xlib.XCloseDisplay)(*display) };
    }

    fn default_root_window(&self, display: &Self::Display) -> Self::Window {
        unsafe { (self.xlib.XDefaultRootWindow)(*display) }
    }

    fn query_extension(&self, display: &Self::Display) -> Option<(c_int, c_int)> {
        let xss = self.xss.as_ref()?;
        let mut event_base: c_int = 0;
        let mut error_base: c_int = 0;
        let present = unsafe {
            (xss.XScreenSaverQueryExtension)(*display, &mut event_base, &mut error_base)
        };
        (present != 0).then_some((event_base, error_base))
    }

    fn alloc_info(&self) -> Option<Self::Info> {
        let xss = self.xss.as_ref()?;
        let info = unsafe { (xss.XScreenSaverAllocInfo)() };
        if info.is_null() {
            return None;
        }
        // The C allocator hands back uninitialized memory; zero it so the
        // fields read as 0 until the first query fills them.
        unsafe { info.write_bytes(0, 1) };
        Some(info)
    }

    fn query_info(
        &self,
        display: &Self::Display,
        window: Self::Window,
        info: &mut Self::Info,
    ) -> bool {
        let Some(xss) = self.xss.as_ref() else {
            return false;
        };
        let status = unsafe { (xss.XScreenSaverQueryInfo)(*display, window, *info) };
        status != 0
    }

    // c_ulong is narrower than u64 on 32-bit targets, so the conversion is
    // only an identity on 64-bit ones.
    #[allow(clippy::useless_conversion)]
    fn idle_millis(&self, info: &Self::Info) -> u64 {
        // Only called with a buffer filled by a successful query.
        u64::from(unsafe { (**info).idle })
    }

    fn free_info(&self, info: Self::Info) {
        unsafe { (self.xlib.XFree)(info.cast()) };
    }
}
