//! Operator query library over the loaded graph.
//!
//! A fixed set of parameterized SQL templates run through the store's
//! command endpoint. An edge points from a node to each of its children,
//! so `out()` walks to children, `in()` walks to parents, and a root has
//! no incoming edge. String arguments are escaped before interpolation and
//! numeric arguments are parsed up front.

use anyhow::{bail, Context, Result};
use graphload_client::{escape_sql_str, OrientClient};

/// Task name, argument usage, one-line description.
const TASKS: &[(&str, &str, &str)] = &[
    ("children", "<name>", "children of the named node"),
    ("children-count", "<name>", "number of children of the named node"),
    ("grandchildren", "<name>", "grandchildren of the named node"),
    ("parents", "<name>", "parents of the named node"),
    ("parents-count", "<name>", "number of parents of the named node"),
    ("grandparents", "<name>", "grandparents of the named node"),
    ("names-count", "", "number of distinct node names"),
    ("roots", "", "nodes with no parent"),
    ("roots-count", "", "number of nodes with no parent"),
    ("most-children", "", "nodes with the largest child count"),
    (
        "fewest-children",
        "",
        "nodes with the smallest child count, among nodes with children",
    ),
    ("rename", "<old> <new>", "rename a node"),
    ("set-popularity", "<name> <value>", "set a node's popularity"),
    (
        "reachable",
        "<source> <exclude>",
        "nodes reachable from source within depth 6, avoiding the excluded node",
    ),
    (
        "reachable-count",
        "<source> <exclude>",
        "number of nodes reachable from source within depth 6, avoiding the excluded node",
    ),
    (
        "neighborhood-popularity",
        "<name> <radius>",
        "popularity sum over the undirected neighborhood within the radius",
    ),
    (
        "shortest-path-popularity",
        "<source> <target>",
        "popularity sum along the shortest path between two nodes",
    ),
    (
        "best-path",
        "<source> <target>",
        "directed path between two nodes with the greatest popularity sum",
    ),
];

/// Runs one named task against the store and returns its result rows.
pub async fn run_task(
    client: &OrientClient,
    name: &str,
    args: &[String],
) -> Result<Vec<serde_json::Value>> {
    let sql = task_sql(client.node_class(), name, args)?;
    tracing::debug!("Task {}: {}", name, sql);
    let rows = client
        .query(&sql)
        .await
        .with_context(|| format!("task {} failed", name))?;
    Ok(rows)
}

/// Builds the SQL for one named task. Fails on unknown names, missing
/// arguments, and non-numeric values where a number is required.
fn task_sql(node_class: &str, task: &str, args: &[String]) -> Result<String> {
    let v = node_class;
    let sql = match task {
        "children" => {
            let name = escape_sql_str(required(args, 0, task)?);
            format!("SELECT expand(out()) FROM {v} WHERE name = '{name}'")
        }
        "children-count" => {
            let name = escape_sql_str(required(args, 0, task)?);
            format!("SELECT out().size() FROM {v} WHERE name = '{name}'")
        }
        "grandchildren" => {
            let name = escape_sql_str(required(args, 0, task)?);
            format!("SELECT expand(out().out()) FROM {v} WHERE name = '{name}'")
        }
        "parents" => {
            let name = escape_sql_str(required(args, 0, task)?);
            format!("SELECT expand(in()) FROM {v} WHERE name = '{name}'")
        }
        "parents-count" => {
            let name = escape_sql_str(required(args, 0, task)?);
            format!("SELECT in().size() FROM {v} WHERE name = '{name}'")
        }
        "grandparents" => {
            let name = escape_sql_str(required(args, 0, task)?);
            format!("SELECT expand(in().in()) FROM {v} WHERE name = '{name}'")
        }
        "names-count" => format!("SELECT count(distinct(name)) FROM {v}"),
        "roots" => format!("SELECT FROM {v} WHERE in().size() = 0"),
        "roots-count" => format!("SELECT count(*) FROM {v} WHERE in().size() = 0"),
        "most-children" => format!(
            "SELECT FROM {v} WHERE out().size() = (SELECT max(out().size()) FROM {v})"
        ),
        "fewest-children" => format!(
            "SELECT FROM {v} WHERE out().size() = \
             (SELECT min(out().size()) FROM {v} WHERE out().size() > 0)"
        ),
        "rename" => {
            let old = escape_sql_str(required(args, 0, task)?);
            let new = escape_sql_str(required(args, 1, task)?);
            format!("UPDATE {v} SET name = '{new}' WHERE name = '{old}'")
        }
        "set-popularity" => {
            let name = escape_sql_str(required(args, 0, task)?);
            let value: i64 = required(args, 1, task)?
                .parse()
                .context("the popularity value must be an integer")?;
            format!("UPDATE {v} SET popularity = {value} WHERE name = '{name}'")
        }
        "reachable" => {
            let source = escape_sql_str(required(args, 0, task)?);
            let exclude = escape_sql_str(required(args, 1, task)?);
            format!(
                "SELECT FROM (TRAVERSE out() FROM \
                 (SELECT FROM {v} WHERE name = '{source}') \
                 WHILE $depth <= 6 AND @rid != (SELECT @rid FROM {v} WHERE name = '{exclude}'))"
            )
        }
        "reachable-count" => {
            let source = escape_sql_str(required(args, 0, task)?);
            let exclude = escape_sql_str(required(args, 1, task)?);
            format!(
                "SELECT count(*) FROM (TRAVERSE out() FROM \
                 (SELECT FROM {v} WHERE name = '{source}') \
                 WHILE $depth <= 6 AND @rid != (SELECT @rid FROM {v} WHERE name = '{exclude}'))"
            )
        }
        "neighborhood-popularity" => {
            let name = escape_sql_str(required(args, 0, task)?);
            let radius: i64 = required(args, 1, task)?
                .parse()
                .context("the radius must be an integer")?;
            format!(
                "SELECT sum(popularity) FROM (TRAVERSE both() FROM \
                 (SELECT FROM {v} WHERE name = '{name}') WHILE $depth <= {radius})"
            )
        }
        "shortest-path-popularity" => {
            let source = escape_sql_str(required(args, 0, task)?);
            let target = escape_sql_str(required(args, 1, task)?);
            format!(
                "SELECT sum(popularity) FROM (SELECT expand(shortestPath(\
                 (SELECT FROM {v} WHERE name = '{source}'), \
                 (SELECT FROM {v} WHERE name = '{target}'))))"
            )
        }
        "best-path" => {
            let source = escape_sql_str(required(args, 0, task)?);
            let target = escape_sql_str(required(args, 1, task)?);
            let paths = format!(
                "SELECT allSimplePaths(\
                 (SELECT FROM {v} WHERE name = '{source}'), \
                 (SELECT FROM {v} WHERE name = '{target}'), \
                 {{maxDepth: 50, direction: 'OUT'}}) AS path"
            );
            let ranked = format!(
                "SELECT path, (SELECT sum(popularity) FROM (SELECT expand(path))) \
                 AS sum_popularity FROM ({paths}) UNWIND path \
                 ORDER BY sum_popularity DESC LIMIT 1"
            );
            format!("SELECT expand(path) FROM ({ranked})")
        }
        _ => bail!("unknown task '{}'\n{}", task, library_help()),
    };
    Ok(sql)
}

fn required<'a>(args: &'a [String], index: usize, task: &str) -> Result<&'a str> {
    match args.get(index) {
        Some(value) => Ok(value.as_str()),
        None => bail!("usage: graphload task {} {}", task, usage_of(task)),
    }
}

fn usage_of(task: &str) -> &'static str {
    TASKS
        .iter()
        .find(|(name, _, _)| *name == task)
        .map(|(_, usage, _)| *usage)
        .unwrap_or("")
}

fn library_help() -> String {
    let mut out = String::from("available tasks:\n");
    for (name, usage, description) in TASKS {
        let invocation = format!("{} {}", name, usage);
        out.push_str(&format!("  {:<42} {}\n", invocation.trim_end(), description));
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
