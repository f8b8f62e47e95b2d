//! Token service defaults: `issuer`, `audience`, `keyrefresh="1m"`,
//! `realm="governor"`.

#[derive(Clone, Debug)]
pub struct TokenConfig {
    pub issuer: String,
    pub audience: String,
    pub realm: String,
    pub keyrefresh: std::time::Duration,
    pub hbmaxfail: u32,
}

impl Default for TokenConfig {
    fn default() -> Self {
        TokenConfig {
            issuer: String::new(),
            audience: String::new(),
            realm: "governor".to_string(),
            keyrefresh: std::time::Duration::from_secs(60),
            hbmaxfail: 3,
        }
    }
}
