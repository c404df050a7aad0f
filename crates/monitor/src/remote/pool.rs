//! Keyed SSH connection pool.
//!
//! Sessions are grouped by `user@host:port`. `acquire` hands out an
//! idle live session (dead ones are discarded lazily) or establishes a
//! new one; the returned [`PooledSession`] guard gives the session back
//! on drop, so release happens on every exit path. The per-key lock
//! covers only pool bookkeeping, never the SSH handshake itself.

use std::collections::HashMap;
use std::net::{TcpStream, ToSocketAddrs};
use std::ops::Deref;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use ssh2::Session;
use thiserror::Error;
use tracing::{debug, warn};

use crate::conf::RemoteServerConfig;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("cannot resolve {0}")]
    Resolve(String),
    #[error("TCP connect to {host} failed: {source}")]
    Connect {
        host: String,
        #[source]
        source: std::io::Error,
    },
    #[error("SSH authentication failed for {0}")]
    AuthFailed(String),
    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

type Slot = Arc<Mutex<Vec<Session>>>;

pub struct SshConnectionPool {
    /// Idle sessions kept per key once a borrower returns one.
    pool_size: usize,
    pools: Mutex<HashMap<String, Slot>>,
}

impl SshConnectionPool {
    pub fn new(pool_size: usize) -> Self {
        Self {
            pool_size,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Borrow a session for `server`, reusing an idle one when its
    /// transport is still live.
    pub fn acquire(&self, server: &RemoteServerConfig) -> Result<PooledSession, RemoteError> {
        let key = pool_key(&server.username, &server.host, server.port);
        let slot = self.slot(&key);

        let reused = {
            let mut idle = lock_unpoisoned(&slot);
            let mut found = None;
            while let Some(session) = idle.pop() {
                if session_alive(&session) {
                    found = Some(session);
                    break;
                }
                // Dropping a dead session closes its transport.
                debug!(key = %key, "discarding dead pooled SSH session");
            }
            found
        };

        let session = match reused {
            Some(session) => session,
            None => {
                debug!(key = %key, "establishing new SSH session");
                connect(server)?
            }
        };

        Ok(PooledSession {
            session: Some(session),
            slot,
            pool_size: self.pool_size,
        })
    }

    /// Drop every idle session. Called once at shutdown.
    pub fn close_all(&self) {
        let mut pools = lock_unpoisoned(&self.pools);
        for (key, slot) in pools.drain() {
            let count = lock_unpoisoned(&slot).drain(..).count();
            if count > 0 {
                debug!(key = %key, count, "closed idle SSH sessions");
            }
        }
    }

    fn slot(&self, key: &str) -> Slot {
        let mut pools = lock_unpoisoned(&self.pools);
        pools.entry(key.to_string()).or_default().clone()
    }
}

/// RAII borrow of a pooled session. On drop the session rejoins the
/// idle set when it is below capacity, otherwise it is closed.
pub struct PooledSession {
    // Invariant: `Some` until drop.
    session: Option<Session>,
    slot: Slot,
    pool_size: usize,
}

impl Deref for PooledSession {
    type Target = Session;

    fn deref(&self) -> &Session {
        self.session.as_ref().expect("session present until drop")
    }
}

impl Drop for PooledSession {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            let mut idle = lock_unpoisoned(&self.slot);
            if idle.len() < self.pool_size {
                idle.push(session);
            }
            // Over capacity: dropping the session closes it.
        }
    }
}

pub(crate) fn pool_key(user: &str, host: &str, port: u16) -> String {
    format!("{user}@{host}:{port}")
}

/// Lazy liveness probe used at acquire time; no timer-driven checks.
fn session_alive(session: &Session) -> bool {
    session.authenticated() && session.keepalive_send().is_ok()
}

fn connect(server: &RemoteServerConfig) -> Result<Session, RemoteError> {
    let target = format!("{}:{}", server.host, server.port);
    let addr = target
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| RemoteError::Resolve(target.clone()))?;

    let tcp = TcpStream::connect_timeout(&addr, Duration::from_secs(server.timeout)).map_err(
        |e| RemoteError::Connect {
            host: target.clone(),
            source: e,
        },
    )?;

    let mut session = Session::new()?;
    session.set_tcp_stream(tcp);
    session.set_timeout((server.timeout * 1000) as u32);
    session.handshake()?;

    if let Some(key_file) = &server.key_file {
        session.userauth_pubkey_file(&server.username, None, Path::new(key_file), None)?;
    } else if let Some(password) = &server.password {
        session.userauth_password(&server.username, password)?;
    }

    if !session.authenticated() {
        warn!(host = %server.host, user = %server.username, "SSH authentication failed");
        return Err(RemoteError::AuthFailed(target));
    }
    Ok(session)
}

/// A poisoned pool lock only means another borrower panicked mid
/// bookkeeping; the session lists stay structurally valid.
fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_key_format() {
        assert_eq!(pool_key("deploy", "10.0.0.2", 22), "deploy@10.0.0.2:22");
        assert_eq!(pool_key("root", "db.internal", 2222), "root@db.internal:2222");
    }

    #[test]
    fn test_pool_slot_is_shared_per_key() {
        let pool = SshConnectionPool::new(3);
        let a = pool.slot("deploy@10.0.0.2:22");
        let b = pool.slot("deploy@10.0.0.2:22");
        assert!(Arc::ptr_eq(&a, &b));
        let c = pool.slot("deploy@10.0.0.3:22");
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn test_close_all_empties_pools() {
        let pool = SshConnectionPool::new(3);
        let _ = pool.slot("deploy@10.0.0.2:22");
        pool.close_all();
        let pools = lock_unpoisoned(&pool.pools);
        assert!(pools.is_empty());
    }
}
