use tokio::task::JoinHandle;
use tokio_postgres::NoTls;
use tracing::warn;

use sqlab_models::{SqlabError, SqlabResult};

/// Connection settings for the sandbox cluster.
#[derive(Debug, Clone)]
pub struct SandboxConfig {
    pub host: String,
    pub port: u16,
    pub admin_user: String,
    pub admin_password: String,
    /// Applied as `statement_timeout` on interactive sessions, in ms.
    pub statement_timeout_ms: u64,
}

/// Fully resolved target of one connection.
#[derive(Debug, Clone)]
pub struct ConnectTarget {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl ConnectTarget {
    /// Connect as the cluster administrator to `dbname`.
    pub fn admin(config: &SandboxConfig, dbname: impl Into<String>) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            dbname: dbname.into(),
            user: config.admin_user.clone(),
            password: config.admin_password.clone(),
        }
    }

    /// Connect as a learner role to its own database.
    pub fn tenant(
        config: &SandboxConfig,
        dbname: impl Into<String>,
        role: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            dbname: dbname.into(),
            user: role.into(),
            password: password.into(),
        }
    }
}

/// An open sandbox session. The caller owns the connection for its whole
/// lifetime; dropping the client ends the driver task, so the socket is
/// never leaked.
pub struct SandboxConnection {
    pub client: tokio_postgres::Client,
    driver: JoinHandle<()>,
}

impl SandboxConnection {
    /// Close the session and wait for the driver task to finish.
    pub async fn close(self) {
        let SandboxConnection { client, driver } = self;
        drop(client);
        let _ = driver.await;
    }
}

/// Open a connection to the sandbox cluster.
pub async fn connect(target: &ConnectTarget) -> SqlabResult<SandboxConnection> {
    let mut config = tokio_postgres::Config::new();
    config
        .host(&target.host)
        .port(target.port)
        .dbname(&target.dbname)
        .user(&target.user)
        .password(&target.password);

    let (client, connection) = config.connect(NoTls).await.map_err(|e| {
        SqlabError::connection(format!(
            "connect to {} as {} failed: {}",
            target.dbname, target.user, e
        ))
    })?;

    let dbname = target.dbname.clone();
    let driver = tokio::spawn(async move {
        if let Err(e) = connection.await {
            warn!(dbname = %dbname, error = %e, "sandbox connection closed with error");
        }
    });

    Ok(SandboxConnection { client, driver })
}
