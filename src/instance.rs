//! Module for parsing and representing p-center instances.
//!
//! Three input formats are understood:
//! - OR-Library `pmed` text files (`N E P` header followed by `i j length` edges),
//! - TSPLIB coordinate files (`NODE_COORD_SECTION`), with the center count taken
//!   from a `CENTERS:` header or supplied by the caller,
//! - JSON documents with a `centerNum` and a `graph` holding edges or nodes.
//!
//! Node ids are 1-indexed in every file format and 0-indexed internally.

use crate::error::{Error, Result};
use crate::graph::Length;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A node with planar coordinates (geometric instances)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Node identifier (0-indexed)
    pub id: usize,
    /// X coordinate
    pub x: f64,
    /// Y coordinate
    pub y: f64,
}

impl Node {
    pub fn new(id: usize, x: f64, y: f64) -> Self {
        Node { id, x, y }
    }
}

/// An undirected weighted edge (topological instances)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub source: usize,
    pub target: usize,
    pub length: Length,
}

impl Edge {
    pub fn new(source: usize, target: usize, length: Length) -> Self {
        Edge { source, target, length }
    }
}

/// How pairwise distances are defined for an instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Topology {
    /// Shortest paths over an edge list
    Edges(Vec<Edge>),
    /// Euclidean distances between coordinates
    Coordinates(Vec<Node>),
}

/// A parsed p-center instance, before any preprocessing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PCenterInstance {
    /// Name of the instance
    pub name: String,
    /// Comment/description
    pub comment: String,
    /// Number of nodes
    pub node_count: usize,
    /// Number of facilities to open (P)
    pub center_count: usize,
    /// Edge list or coordinates
    pub topology: Topology,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonInstance {
    center_num: usize,
    graph: JsonGraph,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsonGraph {
    #[serde(default)]
    node_num: Option<usize>,
    #[serde(default)]
    edges: Vec<JsonEdge>,
    #[serde(default)]
    nodes: Vec<JsonNode>,
}

#[derive(Debug, Deserialize)]
struct JsonEdge {
    source: usize,
    target: usize,
    length: Length,
}

#[derive(Debug, Deserialize)]
struct JsonNode {
    x: f64,
    y: f64,
}

impl PCenterInstance {
    /// Parse an instance file, choosing the format from its extension and content
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let is_json = path.extension().map(|e| e == "json").unwrap_or(false)
            || content.trim_start().starts_with('{');

        if is_json {
            Self::from_json_str(&name, &content)
        } else if content.contains("NODE_COORD_SECTION") {
            Self::from_tsplib_str(&name, &content)
        } else {
            Self::from_pmed_str(&name, &content)
        }
    }

    /// Parse an OR-Library pmed file
    pub fn from_pmed_str(name: &str, content: &str) -> Result<Self> {
        let mut lines = content
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty());

        let (header_line, header) = lines
            .next()
            .ok_or_else(|| Error::invalid_instance("empty pmed file"))?;
        let header: Vec<&str> = header.split_whitespace().collect();
        if header.len() < 3 {
            return Err(Error::parse(header_line, "expected header `N E P`"));
        }
        let node_count: usize = parse_field(header[0], header_line, "node count")?;
        let edge_count: usize = parse_field(header[1], header_line, "edge count")?;
        let center_count: usize = parse_field(header[2], header_line, "center count")?;

        let mut edges = Vec::with_capacity(edge_count);
        for (line_no, line) in lines {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 3 {
                return Err(Error::parse(line_no, "expected edge `source target length`"));
            }
            let source: usize = parse_field(parts[0], line_no, "edge source")?;
            let target: usize = parse_field(parts[1], line_no, "edge target")?;
            let length: Length = parse_field(parts[2], line_no, "edge length")?;
            edges.push(Edge::new(
                to_zero_based(source, node_count, line_no)?,
                to_zero_based(target, node_count, line_no)?,
                length,
            ));
        }

        if edges.len() != edge_count {
            log::warn!(
                "{}: header announces {} edges but {} were read",
                name,
                edge_count,
                edges.len()
            );
        }

        Ok(PCenterInstance {
            name: name.to_string(),
            comment: String::new(),
            node_count,
            center_count,
            topology: Topology::Edges(edges),
        })
    }

    /// Parse a TSPLIB coordinate file.
    ///
    /// The center count is read from a `CENTERS:` (or `P:`) header when present and
    /// is left at zero otherwise, to be provided with [`PCenterInstance::with_centers`].
    pub fn from_tsplib_str(name: &str, content: &str) -> Result<Self> {
        let mut instance_name = name.to_string();
        let mut comment = String::new();
        let mut dimension = 0usize;
        let mut center_count = 0usize;
        let mut coords: Vec<(usize, f64, f64)> = Vec::new();
        let mut in_coords = false;

        for (index, line) in content.lines().enumerate() {
            let line_no = index + 1;
            let line = line.trim();

            if line.is_empty() {
                continue;
            }
            if line == "EOF" {
                break;
            }
            if line.starts_with("NODE_COORD_SECTION") {
                in_coords = true;
                continue;
            }

            if let Some((key, value)) = line.split_once(':') {
                let value = value.trim();
                match key.trim() {
                    "NAME" => instance_name = value.to_string(),
                    "COMMENT" => comment = value.to_string(),
                    "DIMENSION" => dimension = parse_field(value, line_no, "dimension")?,
                    "CENTERS" | "P" => center_count = parse_field(value, line_no, "center count")?,
                    _ => {}
                }
                in_coords = false;
                continue;
            }

            if in_coords {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() < 3 {
                    return Err(Error::parse(line_no, "expected coordinate `id x y`"));
                }
                let id: usize = parse_field(parts[0], line_no, "node id")?;
                let x: f64 = parse_field(parts[1], line_no, "x coordinate")?;
                let y: f64 = parse_field(parts[2], line_no, "y coordinate")?;
                coords.push((id, x, y));
            }
        }

        if dimension == 0 {
            dimension = coords.len();
        }
        if coords.len() != dimension {
            return Err(Error::invalid_instance(format!(
                "DIMENSION is {} but {} coordinates were given",
                dimension,
                coords.len()
            )));
        }

        let mut nodes: Vec<Option<Node>> = vec![None; dimension];
        for (line_index, (id, x, y)) in coords.into_iter().enumerate() {
            let id = to_zero_based(id, dimension, line_index + 1)?;
            nodes[id] = Some(Node::new(id, x, y));
        }
        let nodes = nodes
            .into_iter()
            .enumerate()
            .map(|(i, n)| n.ok_or_else(|| Error::invalid_instance(format!("missing coordinates for node {}", i + 1))))
            .collect::<Result<Vec<_>>>()?;

        Ok(PCenterInstance {
            name: instance_name,
            comment,
            node_count: dimension,
            center_count,
            topology: Topology::Coordinates(nodes),
        })
    }

    /// Parse a JSON instance document
    pub fn from_json_str(name: &str, content: &str) -> Result<Self> {
        let parsed: JsonInstance = serde_json::from_str(content)?;
        let graph = parsed.graph;

        let (node_count, topology) = if !graph.nodes.is_empty() {
            let nodes: Vec<Node> = graph
                .nodes
                .iter()
                .enumerate()
                .map(|(i, n)| Node::new(i, n.x, n.y))
                .collect();
            if let Some(declared) = graph.node_num {
                if declared != nodes.len() {
                    return Err(Error::invalid_instance(format!(
                        "nodeNum is {} but {} nodes were given",
                        declared,
                        nodes.len()
                    )));
                }
            }
            (nodes.len(), Topology::Coordinates(nodes))
        } else if !graph.edges.is_empty() {
            let node_count = graph.node_num.unwrap_or_else(|| {
                graph
                    .edges
                    .iter()
                    .map(|e| e.source.max(e.target))
                    .max()
                    .unwrap_or(0)
            });
            let edges = graph
                .edges
                .iter()
                .enumerate()
                .map(|(i, e)| -> Result<Edge> {
                    Ok(Edge::new(
                        to_zero_based(e.source, node_count, i + 1)?,
                        to_zero_based(e.target, node_count, i + 1)?,
                        e.length,
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            (node_count, Topology::Edges(edges))
        } else {
            return Err(Error::invalid_instance("graph has neither edges nor nodes"));
        };

        Ok(PCenterInstance {
            name: name.to_string(),
            comment: String::new(),
            node_count,
            center_count: parsed.center_num,
            topology,
        })
    }

    /// Override the number of centers to open
    pub fn with_centers(mut self, center_count: usize) -> Self {
        self.center_count = center_count;
        self
    }

    /// Whether distances come from coordinates
    pub fn is_geometric(&self) -> bool {
        matches!(self.topology, Topology::Coordinates(_))
    }

    /// Coordinates of geometric instances
    pub fn nodes(&self) -> Option<&[Node]> {
        match &self.topology {
            Topology::Coordinates(nodes) => Some(nodes),
            Topology::Edges(_) => None,
        }
    }

    /// Check dimensions and the requested center count
    pub fn validate(&self) -> Result<()> {
        if self.node_count == 0 {
            return Err(Error::invalid_instance("instance has no nodes"));
        }
        if self.center_count == 0 || self.center_count >= self.node_count {
            return Err(Error::InfeasibleConfiguration {
                centers: self.center_count,
                nodes: self.node_count,
            });
        }
        match &self.topology {
            Topology::Edges(edges) => {
                if let Some(e) = edges
                    .iter()
                    .find(|e| e.source >= self.node_count || e.target >= self.node_count)
                {
                    return Err(Error::invalid_instance(format!(
                        "edge ({}, {}) references a node outside 1..={}",
                        e.source + 1,
                        e.target + 1,
                        self.node_count
                    )));
                }
            }
            Topology::Coordinates(nodes) => {
                if nodes.len() != self.node_count {
                    return Err(Error::invalid_instance(format!(
                        "{} coordinates for {} nodes",
                        nodes.len(),
                        self.node_count
                    )));
                }
                if nodes.iter().any(|n| !n.x.is_finite() || !n.y.is_finite()) {
                    return Err(Error::invalid_instance("non-finite coordinate"));
                }
            }
        }
        Ok(())
    }

    /// Get statistics about the instance
    pub fn statistics(&self) -> InstanceStatistics {
        let (edge_count, min_length, max_length, avg_length) = match &self.topology {
            Topology::Edges(edges) if !edges.is_empty() => {
                let min = edges.iter().map(|e| e.length).min().unwrap_or(0);
                let max = edges.iter().map(|e| e.length).max().unwrap_or(0);
                let avg = edges.iter().map(|e| e.length as f64).sum::<f64>() / edges.len() as f64;
                (edges.len(), Some(min), Some(max), Some(avg))
            }
            _ => (0, None, None, None),
        };

        let bounding_box = self.nodes().map(|nodes| {
            nodes.iter().fold(
                (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
                |(min_x, min_y, max_x, max_y), n| {
                    (min_x.min(n.x), min_y.min(n.y), max_x.max(n.x), max_y.max(n.y))
                },
            )
        });

        InstanceStatistics {
            name: self.name.clone(),
            node_count: self.node_count,
            center_count: self.center_count,
            geometric: self.is_geometric(),
            edge_count,
            min_edge_length: min_length,
            max_edge_length: max_length,
            avg_edge_length: avg_length,
            bounding_box,
        }
    }
}

fn parse_field<T: std::str::FromStr>(token: &str, line: usize, what: &str) -> Result<T> {
    token
        .parse()
        .map_err(|_| Error::parse(line, format!("invalid {}: `{}`", what, token)))
}

fn to_zero_based(id: usize, node_count: usize, line: usize) -> Result<usize> {
    if id == 0 || id > node_count {
        return Err(Error::parse(
            line,
            format!("node id {} outside 1..={}", id, node_count),
        ));
    }
    Ok(id - 1)
}

/// Statistics about a p-center instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub name: String,
    pub node_count: usize,
    pub center_count: usize,
    pub geometric: bool,
    pub edge_count: usize,
    pub min_edge_length: Option<Length>,
    pub max_edge_length: Option<Length>,
    pub avg_edge_length: Option<f64>,
    pub bounding_box: Option<(f64, f64, f64, f64)>,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Instance: {}", self.name)?;
        writeln!(f, "  Nodes: {}", self.node_count)?;
        writeln!(f, "  Centers: {}", self.center_count)?;
        writeln!(f, "  Kind: {}", if self.geometric { "geometric" } else { "topological" })?;
        if self.edge_count > 0 {
            writeln!(f, "  Edges: {}", self.edge_count)?;
        }
        if let (Some(min), Some(max), Some(avg)) =
            (self.min_edge_length, self.max_edge_length, self.avg_edge_length)
        {
            writeln!(f, "  Edge length: min {} / avg {:.2} / max {}", min, avg, max)?;
        }
        if let Some((min_x, min_y, max_x, max_y)) = self.bounding_box {
            writeln!(
                f,
                "  Bounding box: ({:.2}, {:.2}) - ({:.2}, {:.2})",
                min_x, min_y, max_x, max_y
            )?;
        }
        Ok(())
    }
}
