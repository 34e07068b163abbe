//! Identity handling: the deduplicated name set built before node creation,
//! and the name → identifier map read back after it.
//!
//! Store identifiers are unknown until the store assigns them, so edge
//! creation cannot start until every node exists and one bulk read has
//! rebuilt the complete mapping. That read is the barrier between the node
//! phase and the edge phase.

use std::collections::{BTreeSet, HashMap};

use anyhow::{bail, Context, Result};
use graphload_client::{OrientClient, Rid};
use tracing::{debug, info};

use crate::records::EdgePair;

/// Deduplicated set of node names drawn from both record sources.
///
/// Ordered, so batch composition is deterministic for a given input.
pub type IdentitySet = BTreeSet<String>;

/// Name → store-assigned identifier, built once per run after node creation
/// and read-only from then on.
pub type IdentityMap = HashMap<String, Rid>;

/// Unions node names from the popularity map keys and both endpoints of
/// every edge pair. Pure; no I/O.
pub fn build_identity_set(
    popularity: &HashMap<String, i64>,
    edges: &[EdgePair],
) -> IdentitySet {
    let mut set: IdentitySet = popularity.keys().cloned().collect();
    for pair in edges {
        set.insert(pair.from.clone());
        set.insert(pair.to.clone());
    }
    set
}

/// Reads every node's name and identifier back from the store.
///
/// One full scan of the node class. Inline batch responses are not relied on
/// to report an identifier per created record; re-reading guarantees a
/// complete mapping, including nodes that pre-existed this run.
pub async fn resolve_identities(client: &OrientClient) -> Result<IdentityMap> {
    let sql = format!("SELECT FROM {} LIMIT -1", client.node_class());
    let rows = client
        .query(&sql)
        .await
        .context("bulk identifier read failed")?;
    let map = identity_map_from_rows(&rows)?;
    info!("Resolved {} identifiers from {} rows", map.len(), rows.len());
    Ok(map)
}

/// Builds the identity map from raw result rows.
///
/// Every row must carry a well-formed `@rid`; a row without one is malformed
/// and fatal. Rows without a string `name` are skipped: they can only be
/// records created outside this loader, and edge endpoints are always names.
/// A repeated name keeps the last row, though the unique name index makes
/// repeats impossible in practice.
pub fn identity_map_from_rows(rows: &[serde_json::Value]) -> Result<IdentityMap> {
    let mut map = IdentityMap::with_capacity(rows.len());
    for row in rows {
        let rid = match row.get("@rid").and_then(|v| v.as_str()) {
            Some(rid) if looks_like_rid(rid) => rid,
            _ => bail!("identifier read returned a malformed row: {}", row),
        };
        match row.get("name").and_then(|v| v.as_str()) {
            Some(name) => {
                map.insert(name.to_string(), rid.to_string());
            }
            None => debug!("Ignoring nameless record {} in identifier read", rid),
        }
    }
    Ok(map)
}

/// Shape check for `#cluster:position` tokens. Identifiers are interpolated
/// into edge statements verbatim, so anything else is rejected here.
fn looks_like_rid(token: &str) -> bool {
    let Some(rest) = token.strip_prefix('#') else {
        return false;
    };
    let Some((cluster, position)) = rest.split_once(':') else {
        return false;
    };
    !cluster.is_empty()
        && !position.is_empty()
        && cluster.bytes().all(|b| b.is_ascii_digit())
        && position.bytes().all(|b| b.is_ascii_digit())
}
