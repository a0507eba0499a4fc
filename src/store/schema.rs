use anyhow::{bail, Result};
use scylla::client::session::Session;

// ============================================================================
// ScyllaDB Schema
// ============================================================================
//
// orders: one partition per order. Static columns hold the current snapshot,
// clustering rows hold the event history, so a snapshot update and its events
// share a partition and can be written in one conditional batch.
//
// ============================================================================

const TABLES: [&str; 3] = [
    "CREATE TABLE IF NOT EXISTS orders (
        order_id uuid,
        sequence_number bigint,
        owner_id uuid static,
        status text static,
        version bigint static,
        document text static,
        event_id uuid,
        event_type text,
        event_version int,
        event_data text,
        user_id uuid,
        correlation_id uuid,
        causation_id uuid,
        recorded_at timestamp,
        metadata map<text, text>,
        PRIMARY KEY (order_id, sequence_number)
    ) WITH CLUSTERING ORDER BY (sequence_number ASC)",
    "CREATE TABLE IF NOT EXISTS orders_by_owner (
        owner_id uuid,
        order_id uuid,
        created_at timestamp,
        PRIMARY KEY (owner_id, order_id)
    )",
    "CREATE TABLE IF NOT EXISTS products (
        product_id uuid PRIMARY KEY,
        name text,
        category text,
        price text,
        stock bigint
    )",
];

fn validate_keyspace_name(keyspace: &str) -> Result<()> {
    let valid = !keyspace.is_empty()
        && keyspace.len() <= 48
        && keyspace.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        bail!("Invalid keyspace name: {keyspace:?}");
    }
    Ok(())
}

/// Create the keyspace and tables if missing, then switch the session to the keyspace
pub async fn ensure_schema(session: &Session, keyspace: &str) -> Result<()> {
    validate_keyspace_name(keyspace)?;

    session
        .query_unpaged(
            format!(
                "CREATE KEYSPACE IF NOT EXISTS {keyspace} WITH REPLICATION = \
                 {{'class': 'SimpleStrategy', 'replication_factor': 1}}"
            ),
            &[],
        )
        .await?;

    session.use_keyspace(keyspace, false).await?;

    for statement in TABLES {
        session.query_unpaged(statement, &[]).await?;
    }

    tracing::info!(keyspace = %keyspace, tables = TABLES.len(), "✅ Schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyspace_names() {
        assert!(validate_keyspace_name("storefront").is_ok());
        assert!(validate_keyspace_name("shop_2024").is_ok());
        assert!(validate_keyspace_name("").is_err());
        assert!(validate_keyspace_name("shop; DROP KEYSPACE x").is_err());
    }

    #[test]
    fn test_order_snapshot_lives_in_static_columns() {
        let orders = TABLES[0];
        for column in ["owner_id uuid static", "status text static", "version bigint static", "document text static"] {
            assert!(orders.contains(column), "missing {column}");
        }
        assert!(orders.contains("PRIMARY KEY (order_id, sequence_number)"));
    }

    #[test]
    fn test_event_metadata_is_stored_per_event() {
        let orders = TABLES[0];
        assert!(orders.contains("metadata map<text, text>,"));
        assert!(!orders.contains("metadata map<text, text> static"));
    }
}
