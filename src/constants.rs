pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
pub const DEFAULT_MAX_CONNECTIONS: &str = "5";
pub const DEFAULT_TOKEN_TTL_HOURS: &str = "24";
pub const DEFAULT_MEDIA_ROOT: &str = "/vol/web/media";
pub const DEFAULT_MEDIA_URL: &str = "/static/media/";
pub const DEFAULT_MAX_UPLOAD_BYTES: &str = "10485760";

/// Upper bound for JSON request bodies.
pub const MAX_FORM_BYTES: u64 = 1024 * 64;

pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";
