//! Profiling utilities based on the `puffin` crate.

pub use puffin::{GlobalProfiler, profile_function, profile_scope};

/// Profiling backend options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilingBackend {
    /// Record scopes in-process only.
    InProcess,
    /// Send profiling data to puffin_viewer via HTTP.
    #[cfg(feature = "profiling")]
    PuffinHttp,
}

#[cfg(feature = "profiling")]
static PROFILING_SERVER: std::sync::OnceLock<puffin_http::Server> = std::sync::OnceLock::new();

/// Address the puffin HTTP server binds to.
#[cfg(feature = "profiling")]
pub const SERVER_ADDR: &str = "0.0.0.0:8585";

/// Initialize profiling with the specified backend.
///
/// # Example
/// ```no_run
/// use orrery_core::profiling::{init_profiling, ProfilingBackend};
///
/// init_profiling(ProfilingBackend::InProcess);
/// ```
pub fn init_profiling(backend: ProfilingBackend) {
    puffin::set_scopes_on(true);

    match backend {
        ProfilingBackend::InProcess => {
            tracing::debug!("Puffin scopes enabled (in-process)");
        }
        #[cfg(feature = "profiling")]
        ProfilingBackend::PuffinHttp => {
            if PROFILING_SERVER.get().is_some() {
                return;
            }
            match puffin_http::Server::new(SERVER_ADDR) {
                Ok(server) => {
                    tracing::info!("Puffin profiler server started on http://{}", SERVER_ADDR);
                    // Keep the server alive for the rest of the process.
                    let _ = PROFILING_SERVER.set(server);
                }
                Err(e) => {
                    tracing::error!("Failed to start puffin server: {}", e);
                }
            }
        }
    }
}

/// Returns whether puffin is currently recording scopes.
#[inline]
pub fn is_enabled() -> bool {
    puffin::are_scopes_on()
}

/// Mark the start of a new frame for profiling.
///
/// Call this once per frame in your main loop to organize profiling data by frame.
#[inline]
pub fn new_frame() {
    if is_enabled() {
        puffin::GlobalProfiler::lock().new_frame();
    }
}
