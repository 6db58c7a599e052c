/// Application name
pub const APP_NAME: &str = "Salon";

/// Timestamp format used in the console rendering of a message
pub const MESSAGE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";
