use pc_db::DatabaseConfig;

#[derive(Clone, Debug, clap::Args)]
pub struct DbParams {
    /// Database host.
    #[clap(env = "DB_HOST", long, default_value = "localhost")]
    pub db_host: String,

    /// Database port.
    #[clap(env = "DB_PORT", long, default_value_t = 5432)]
    pub db_port: u16,

    /// Database name.
    #[clap(env = "DB_NAME", long, default_value = "pulsechain_explorer")]
    pub db_name: String,

    /// Database user.
    #[clap(env = "DB_USER", long, default_value = "postgres")]
    pub db_user: String,

    /// Database password (optional).
    #[clap(env = "DB_PASSWORD", long)]
    pub db_password: Option<String>,

    /// Connection pool size.
    #[clap(env = "DB_MAX_CONNECTIONS", long, default_value_t = 20)]
    pub db_max_connections: u32,
}

impl DbParams {
    pub fn database_config(&self) -> DatabaseConfig {
        DatabaseConfig {
            host: self.db_host.clone(),
            port: self.db_port,
            name: self.db_name.clone(),
            user: self.db_user.clone(),
            password: self.db_password.clone(),
            max_connections: self.db_max_connections,
        }
    }
}
