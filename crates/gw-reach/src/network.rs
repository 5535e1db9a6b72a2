//! Upstream contributing network between monitoring stations.
//!
//! Each row names a downstream station, its display name and the stations
//! whose reported fluxes it accumulates. The listed contributors are what the
//! roll-up sums; the graph view is kept alongside so multi-hop chains can be
//! inspected without changing that contract.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use gw_core::StationId;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::{ReachError, ReachResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    /// Contributors in listed order, without repeats.
    pub upstream: Vec<StationId>,
}

#[derive(Clone, Debug, Default)]
pub struct UpstreamNetwork {
    stations: Vec<Station>,
    /// Edges run from contributor to downstream station.
    graph: DiGraph<StationId, ()>,
    node_map: HashMap<StationId, NodeIndex>,
}

impl UpstreamNetwork {
    pub fn load(path: &Path) -> ReachResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| ReachError::io(path, e))?;
        let network = Self::parse(&text, path)?;
        tracing::info!(
            path = %path.display(),
            stations = network.len(),
            "Loaded upstream network"
        );
        Ok(network)
    }

    /// Rows have no header: `downstream_id,name,upstream_id...`.
    pub fn parse(text: &str, origin: &Path) -> ReachResult<Self> {
        let mut stations = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim_end();
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() < 2 || fields[0].is_empty() {
                return Err(ReachError::Network {
                    path: origin.to_path_buf(),
                    line_no: idx + 1,
                    reason: "expected downstream_id,name[,upstream_id...]".into(),
                });
            }
            let id = fields[0].to_string();
            let mut upstream: Vec<StationId> = Vec::with_capacity(fields.len() - 2);
            for us in fields[2..].iter().filter(|f| !f.is_empty()) {
                if upstream.iter().any(|u| u == us) {
                    tracing::warn!(
                        station = %id,
                        upstream = %us,
                        line_no = idx + 1,
                        "Upstream station listed twice; counting it once"
                    );
                    continue;
                }
                upstream.push(us.to_string());
            }
            stations.push(Station {
                id,
                name: fields[1].to_string(),
                upstream,
            });
        }
        Self::from_stations(stations)
    }

    pub fn from_stations(stations: Vec<Station>) -> ReachResult<Self> {
        let mut graph = DiGraph::new();
        let mut node_map: HashMap<StationId, NodeIndex> = HashMap::new();

        let get_or_insert =
            |map: &mut HashMap<StationId, NodeIndex>, g: &mut DiGraph<StationId, ()>, id: &str| {
                *map.entry(id.to_string())
                    .or_insert_with(|| g.add_node(id.to_string()))
            };

        let mut seen = HashSet::with_capacity(stations.len());
        for station in &stations {
            if !seen.insert(station.id.as_str()) {
                return Err(ReachError::DuplicateStation {
                    station: station.id.clone(),
                });
            }
            let ds = get_or_insert(&mut node_map, &mut graph, &station.id);
            for us in &station.upstream {
                let us = get_or_insert(&mut node_map, &mut graph, us);
                graph.add_edge(us, ds, ());
            }
        }

        Ok(Self {
            stations,
            graph,
            node_map,
        })
    }

    /// Downstream stations in file order.
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn get(&self, id: &str) -> Option<&Station> {
        self.stations.iter().find(|s| s.id == id)
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn graph(&self) -> &DiGraph<StationId, ()> {
        &self.graph
    }

    /// Every station that reaches `id` through one or more contributor links,
    /// `id` itself excluded.
    pub fn transitive_upstream(&self, id: &str) -> Vec<StationId> {
        let Some(&start) = self.node_map.get(id) else {
            return Vec::new();
        };
        let mut stack: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(start, Direction::Incoming)
            .collect();
        let mut visited = HashSet::new();
        let mut result = Vec::new();
        while let Some(node) = stack.pop() {
            if node == start || !visited.insert(node) {
                continue;
            }
            result.push(self.graph[node].clone());
            stack.extend(self.graph.neighbors_directed(node, Direction::Incoming));
        }
        result.sort();
        result
    }

    /// Contributors reachable only through another contributor; empty when
    /// the station's list is already flattened.
    pub fn unlisted_upstream(&self, id: &str) -> Vec<StationId> {
        let Some(station) = self.get(id) else {
            return Vec::new();
        };
        self.transitive_upstream(id)
            .into_iter()
            .filter(|s| !station.upstream.contains(s))
            .collect()
    }
}
