//! Shared constants for Warden components.

/// Default listen address (Unix socket, prefixed with `unix:`)
pub const DEFAULT_LISTEN_ADDR: &str = "unix:/run/nginx-captcha.sock";

/// Default path of the pre-generated CAPTCHA pool
pub const DEFAULT_DB_PATH: &str = "/var/cache/nginx-captcha/captcha.db";

/// Default TrueType font used when generating the pool
pub const DEFAULT_FONT_PATH: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf";

/// Authentication cookie name
pub const AUTHENTICATION_NAME: &str = "t6f6e7r83mv6g8mzr4m739k6p";

/// Form input carrying the challenge hash
pub const CHALLENGE_FORM_KEY: &str = "44TQnXMjKY4h4Uv7";

/// Form input carrying the user's answer
pub const RESPONSE_FORM_KEY: &str = "j4drYUqwwaC8s6rD";

/// DOM id of the CAPTCHA image
pub const IMAGE_ID: &str = "Gk4qsP9hNcS6dBwZ";

/// Challenge record validity (1 minute)
pub const CHALLENGE_TTL_SECS: u64 = 60;

/// Authentication record validity (1 day)
pub const AUTHENTICATION_TTL_SECS: u64 = 86_400;

/// Record sweeper period bounds (seconds)
pub const SWEEP_INTERVAL_MIN_SECS: u64 = 15;
pub const SWEEP_INTERVAL_MAX_SECS: u64 = 30;

/// CAPTCHA image parameters
pub mod captcha {
    /// Case-insensitive character set
    pub const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

    /// Number of characters per CAPTCHA
    pub const TEXT_LENGTH: usize = 6;

    /// Image width in pixels
    pub const WIDTH: u32 = 320;

    /// Image height in pixels
    pub const HEIGHT: u32 = 100;
}

/// HTTP header names set by the reverse proxy
pub mod headers {
    /// Client address
    pub const X_REAL_IP: &str = "X-Real-IP";

    /// Host the client originally asked for
    pub const X_FORWARDED_HOST: &str = "X-Forwarded-Host";

    /// Original request URI (logging and web-font detection)
    pub const X_ORIGINAL_URI: &str = "X-Original-URI";

    /// `https` when the proxy terminated TLS
    pub const X_SCHEME: &str = "X-Scheme";

    /// `TRUE` to scope cookies to the eTLD+1 wildcard domain
    pub const X_TLD_PLUS_ONE: &str = "X-TLDPlusOne";

    /// `TRUE` to render the lite template
    pub const X_LITE_TEMPLATE: &str = "X-LiteTemplate";

    /// `TRUE` to accept CORS preflight requests
    pub const X_ALLOW_OPTIONS: &str = "X-Allow-OPTIONS";

    /// `TRUE` to let web-font fetches through without a cookie
    pub const X_ALLOW_WEB_FONT: &str = "X-Allow-Web-Font";

    /// Cache directive emitted with every challenge page
    pub const CLEAR_SITE_DATA: &str = "Clear-Site-Data";
}

/// Path extensions treated as web fonts
pub const WEB_FONT_EXTENSIONS: &[&str] = &[".woff", ".woff2", ".ttf", ".otf", ".eot"];
