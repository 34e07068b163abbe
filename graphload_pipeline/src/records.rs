//! Record-source loading for the two flat inputs: a node-attribute table
//! (`name,popularity`) and an edge list (`from,to`).
//!
//! Parsing is deliberately trivial: one record per line, split at the first
//! comma, fields whitespace-trimmed and stripped of surrounding double
//! quotes. Lines that fail to parse are skipped with a warning and counted;
//! only failing to open or read a source is fatal.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use tracing::warn;

// ---------------------------------------------------------------------------
// Record types
// ---------------------------------------------------------------------------

/// One parsed line of the node-attribute source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub name: String,
    pub popularity: i64,
}

/// One parsed line of the edge-list source: a directed pair of node names,
/// not yet resolved to store identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgePair {
    pub from: String,
    pub to: String,
}

/// Parsed contents of both record sources.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    /// Node name → popularity. A name repeated in the source keeps its last
    /// occurrence.
    pub popularity: HashMap<String, i64>,
    /// Edge pairs in source order. Repeated pairs are kept.
    pub edges: Vec<EdgePair>,
    /// Malformed node lines skipped.
    pub skipped_node_lines: usize,
    /// Malformed edge lines skipped.
    pub skipped_edge_lines: usize,
}

// ---------------------------------------------------------------------------
// Line parsing
// ---------------------------------------------------------------------------

/// Splits a line at its first comma and normalizes both fields.
fn split_fields(line: &str) -> Option<(&str, &str)> {
    let (left, right) = line.split_once(',')?;
    Some((clean_field(left), clean_field(right)))
}

/// Trims whitespace, then surrounding double quotes.
fn clean_field(field: &str) -> &str {
    field.trim().trim_matches('"')
}

/// Parses one node-attribute line.
///
/// `None` when the line has no comma, an empty name, or a popularity that is
/// not a base-10 integer.
pub fn parse_node_line(line: &str) -> Option<NodeRecord> {
    let (name, popularity) = split_fields(line)?;
    if name.is_empty() {
        return None;
    }
    let popularity = popularity.parse::<i64>().ok()?;
    Some(NodeRecord {
        name: name.to_string(),
        popularity,
    })
}

/// Parses one edge-list line.
///
/// `None` when the line has no comma or either endpoint is empty. Extra
/// commas end up inside the `to` field, matching first-comma splitting.
pub fn parse_edge_line(line: &str) -> Option<EdgePair> {
    let (from, to) = split_fields(line)?;
    if from.is_empty() || to.is_empty() {
        return None;
    }
    Some(EdgePair {
        from: from.to_string(),
        to: to.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Source loading
// ---------------------------------------------------------------------------

/// Reads the node-attribute source into a name → popularity map.
///
/// Returns the map and the count of malformed lines skipped. Blank lines are
/// ignored without counting. Fails only when the file cannot be opened or a
/// read error occurs mid-stream.
pub fn load_node_source(path: &Path) -> Result<(HashMap<String, i64>, usize)> {
    let file = File::open(path)
        .with_context(|| format!("failed to open node source {}", path.display()))?;
    let mut popularity = HashMap::new();
    let mut skipped = 0usize;
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line =
            line.with_context(|| format!("read error in node source {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_node_line(&line) {
            Some(record) => {
                popularity.insert(record.name, record.popularity);
            }
            None => {
                skipped += 1;
                warn!("Skipping malformed node line {}: {}", idx + 1, line);
            }
        }
    }
    Ok((popularity, skipped))
}

/// Reads the edge-list source into an ordered pair list.
///
/// Returns the pairs and the count of malformed lines skipped, with the same
/// blank-line and failure semantics as [`load_node_source`].
pub fn load_edge_source(path: &Path) -> Result<(Vec<EdgePair>, usize)> {
    let file = File::open(path)
        .with_context(|| format!("failed to open edge source {}", path.display()))?;
    let mut edges = Vec::new();
    let mut skipped = 0usize;
    for (idx, line) in BufReader::new(file).lines().enumerate() {
        let line =
            line.with_context(|| format!("read error in edge source {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match parse_edge_line(&line) {
            Some(pair) => edges.push(pair),
            None => {
                skipped += 1;
                warn!("Skipping malformed edge line {}: {}", idx + 1, line);
            }
        }
    }
    Ok((edges, skipped))
}

/// Reads both record sources.
pub fn load_records(nodes_path: &Path, edges_path: &Path) -> Result<RecordSet> {
    let (popularity, skipped_node_lines) = load_node_source(nodes_path)?;
    let (edges, skipped_edge_lines) = load_edge_source(edges_path)?;
    Ok(RecordSet {
        popularity,
        edges,
        skipped_node_lines,
        skipped_edge_lines,
    })
}
