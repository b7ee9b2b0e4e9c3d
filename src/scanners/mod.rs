pub mod plan;
pub mod registry;

pub use plan::{ComposeScanPlan, PlannedScan};
pub use registry::{ScannerDefinition, ScannerName, ScannerRegistry};

pub const TLS_QUALYS_CERTIFICATE_TRUSTED: &str = "tls_qualys_certificate_trusted";
pub const TLS_QUALYS_ENCRYPTION_QUALITY: &str = "tls_qualys_encryption_quality";
pub const PLAIN_HTTPS: &str = "plain_https";
pub const STRICT_TRANSPORT_SECURITY: &str = "http_security_header_strict_transport_security";
pub const X_FRAME_OPTIONS: &str = "http_security_header_x_frame_options";
pub const X_CONTENT_TYPE_OPTIONS: &str = "http_security_header_x_content_type_options";
pub const FTP: &str = "ftp";
pub const DNSSEC: &str = "DNSSEC";
