use std::hash::{Hash, Hasher};

use model::Scope;
use sqlx::{postgres::PgConnection, Connection, PgPool};
use tracking::store::Result;

use super::convert_error;

/// Holds a Postgres session advisory lock for one scope. The lock lives on
/// a dedicated connection detached from the pool; dropping the guard drops
/// the connection, which releases the lock server-side even if the cycle
/// panicked halfway through.
pub struct ScopeLeaseGuard {
    _connection: PgConnection,
}

/// Advisory lock key for a scope. `DefaultHasher` uses fixed keys, so the
/// value is stable across processes sharing the same database.
pub fn scope_key(scope: &Scope) -> i64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    scope.company.hash(&mut hasher);
    scope.region.hash(&mut hasher);
    hasher.finish() as i64
}

pub async fn try_acquire(
    pool: &PgPool,
    scope: &Scope,
) -> Result<Option<ScopeLeaseGuard>> {
    let mut connection = pool
        .acquire()
        .await
        .map_err(convert_error)?
        .detach();

    let (locked,): (bool,) = sqlx::query_as("SELECT pg_try_advisory_lock($1);")
        .bind(scope_key(scope))
        .fetch_one(&mut connection)
        .await
        .map_err(convert_error)?;

    if locked {
        Ok(Some(ScopeLeaseGuard {
            _connection: connection,
        }))
    } else {
        let _ = connection.close().await;
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_is_stable_and_scope_sensitive() {
        let a = Scope::new("streetcar", "montreal");
        let b = Scope::new("streetcar", "quebec");
        assert_eq!(scope_key(&a), scope_key(&a));
        assert_ne!(scope_key(&a), scope_key(&b));
    }
}
