//! Connection options assembled from discrete fields:
//! `user= password= dbname= host= port= sslmode=`.

#[derive(Debug, Clone)]
pub struct PgConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub sslmode: bool,
    pub hbinterval: std::time::Duration,
    pub hbmaxfail: u32,
}

impl Default for PgConfig {
    fn default() -> Self {
        PgConfig {
            host: "localhost".to_string(),
            port: 5432,
            dbname: String::new(),
            user: String::new(),
            password: String::new(),
            sslmode: false,
            hbinterval: std::time::Duration::from_secs(5),
            hbmaxfail: 3,
        }
    }
}

impl PgConfig {
    pub fn connect_options(&self) -> sqlx::postgres::PgConnectOptions {
        sqlx::postgres::PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.dbname)
            .username(&self.user)
            .password(&self.password)
            .ssl_mode(if self.sslmode {
                sqlx::postgres::PgSslMode::Require
            } else {
                sqlx::postgres::PgSslMode::Prefer
            })
    }
}
