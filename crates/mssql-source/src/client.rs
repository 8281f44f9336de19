//! SQL Server connection setup.

use row_source::SourceError;
use tiberius::{Client, Config};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::info;

/// A connected tiberius client over tokio TCP.
pub type SqlServerClient = Client<Compat<TcpStream>>;

/// Connect to SQL Server.
///
/// `connection_string` uses ADO.NET syntax, e.g.
/// `server=tcp:localhost,1433;database=Sales;user id=sync;password=...;TrustServerCertificate=true`.
pub async fn connect(connection_string: &str) -> Result<SqlServerClient, SourceError> {
    let config = Config::from_ado_string(connection_string)
        .map_err(|e| SourceError::Connection(format!("Invalid connection string: {e}")))?;

    let addr = config.get_addr();
    let tcp = TcpStream::connect(addr.as_str())
        .await
        .map_err(|e| SourceError::Connection(format!("Failed to connect to {addr}: {e}")))?;

    tcp.set_nodelay(true).ok();

    let client = Client::connect(config, tcp.compat_write())
        .await
        .map_err(|e| SourceError::Connection(format!("Failed to authenticate: {e}")))?;

    info!("Connected to SQL Server at {addr}");
    Ok(client)
}

/// Classify a tiberius error raised while running a query.
pub(crate) fn query_error(e: tiberius::error::Error) -> SourceError {
    use tiberius::error::Error;

    match e {
        Error::Io { .. } | Error::Tls(_) => SourceError::Connection(e.to_string()),
        other => SourceError::Query(other.to_string()),
    }
}
