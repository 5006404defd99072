//! Route paths and request field names

/// AJAX upload endpoint
pub const UPLOAD_PATH: &str = "/ajax/ibc_upload";

/// Browser configuration endpoint (nonce, DAM URL, log switch)
pub const CLIENT_CONFIG_PATH: &str = "/ajax/ibc_config";

pub const HEALTH_PATH: &str = "/health";

/// Public prefix of the media library
pub const UPLOADS_PATH: &str = "/uploads";

/// Body fields that may carry the nonce, in lookup order
pub const NONCE_FIELDS: [&str; 2] = ["_ajax_nonce", "_wpnonce"];

/// Header that may carry the nonce when the body does not
pub const NONCE_HEADER: &str = "x-wp-nonce";

pub const SERVICE_NAME: &str = "ibc-api";
