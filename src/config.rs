/// Configuration for the application.
#[derive(Debug)]
pub struct Config {
    /// The port to listen on. Defaults to 8000. Can be overridden with the `ITEMS_PORT`
    /// environment variable.
    pub http_port: u16,
}

impl Config {
    pub fn new() -> Self {
        Self { http_port: envmnt::get_u16("ITEMS_PORT", 8000) }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}
