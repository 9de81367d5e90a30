/// Router Module Index
///
/// Splits the gate's surface in two: the JSON API the client router consults, and the
/// guarded page loads that end in the SPA shell or a redirect.

/// Health check, route table and navigation checks (JSON).
pub mod public;

/// Static assets plus the guarded fallback for every other page load.
pub mod pages;
