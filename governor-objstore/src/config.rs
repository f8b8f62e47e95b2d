//! S3 connection defaults: `location="us-east-1"`, `hbinterval="5s"`,
//! `hbmaxfail` 3-6.

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub region: String,
    pub force_path_style: bool,
    pub canary_bucket: String,
    pub hbinterval: std::time::Duration,
    pub hbmaxfail: u32,
}

impl Default for S3Config {
    fn default() -> Self {
        S3Config {
            endpoint: None,
            region: "us-east-1".to_string(),
            force_path_style: false,
            canary_bucket: "governor-canary".to_string(),
            hbinterval: std::time::Duration::from_secs(5),
            hbmaxfail: 3,
        }
    }
}
