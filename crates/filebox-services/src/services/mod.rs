#[cfg(feature = "remote-scan")]
pub mod remote_scan;

#[cfg(feature = "remote-scan")]
pub use remote_scan::HttpScanService;
