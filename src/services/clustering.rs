// src/services/clustering.rs
// DOCUMENTATION: Greedy hierarchical point clustering for the trip map
// PURPOSE: Partition markers into clusters and single pins for a viewport and zoom

use crate::models::{Coordinates, Marker, Viewport, ViewportBounds};
use geojson::{feature, Feature, FeatureCollection, Geometry, JsonObject};
use serde_json::Value;
use std::f64::consts::PI;

/// Cluster radius in screen pixels
pub const CLUSTER_RADIUS_PX: f64 = 75.0;
/// Past this zoom every marker is shown on its own
pub const MAX_CLUSTER_ZOOM: u8 = 20;
/// Tile size the radius is measured against
const TILE_EXTENT: f64 = 512.0;
const MIN_POINTS: usize = 2;
/// Marks a node no level has claimed yet
const UNCLAIMED: u8 = u8::MAX;

#[derive(Debug, Clone, Copy, PartialEq)]
enum NodeKind {
    /// Index into the marker list
    Leaf(usize),
    Cluster(u64),
}

/// A point or cluster on one zoom level, in projected [0, 1] space
#[derive(Debug, Clone)]
struct Node {
    x: f64,
    y: f64,
    /// Lowest zoom that has processed this node
    zoom: u8,
    parent: Option<u64>,
    num_points: usize,
    kind: NodeKind,
}

/// One entry of a clustering result
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterItem {
    Cluster {
        id: u64,
        point_count: usize,
        center: Coordinates,
    },
    Single(Marker),
}

/// Where to move the camera when a cluster is clicked
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterExpansion {
    pub cluster_id: u64,
    pub expansion_zoom: u8,
    pub ease_to: Viewport,
}

/// Web Mercator x in [0, 1]
fn lng_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

/// Web Mercator y in [0, 1], clamped at the poles
fn lat_y(lat: f64) -> f64 {
    let sin = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

fn x_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

fn y_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

/// Glyph diameter in pixels for a cluster of `count` markers
pub fn cluster_glyph_size(count: usize) -> f64 {
    (20.0 + count as f64 / 100.0 * 20.0).min(30.0)
}

/// Cluster hierarchy over a fixed marker set
/// DOCUMENTATION: Built once per request; level z holds the result of greedily
/// merging level z+1 with a radius of `CLUSTER_RADIUS_PX / (512 * 2^z)`. The top
/// level (`MAX_CLUSTER_ZOOM + 1`) holds the raw markers. Cluster ids encode the
/// index and level of the node they grew from, so expansion needs no lookup table.
pub struct ClusterIndex {
    markers: Vec<Marker>,
    levels: Vec<Vec<Node>>,
    max_zoom: u8,
}

impl ClusterIndex {
    pub fn new(markers: Vec<Marker>) -> Self {
        Self::with_max_zoom(markers, MAX_CLUSTER_ZOOM)
    }

    pub fn with_max_zoom(markers: Vec<Marker>, max_zoom: u8) -> Self {
        let max_zoom = max_zoom.min(30);
        let leaves: Vec<Node> = markers
            .iter()
            .enumerate()
            .map(|(i, m)| Node {
                x: lng_x(m.longitude),
                y: lat_y(m.latitude),
                zoom: UNCLAIMED,
                parent: None,
                num_points: 1,
                kind: NodeKind::Leaf(i),
            })
            .collect();

        let leaf_count = markers.len() as u64;
        let mut levels: Vec<Vec<Node>> = vec![Vec::new(); max_zoom as usize + 2];
        levels[max_zoom as usize + 1] = leaves;

        for zoom in (0..=max_zoom).rev() {
            let (lower, upper) = levels.split_at_mut(zoom as usize + 1);
            lower[zoom as usize] = Self::cluster_level(&mut upper[0], zoom, leaf_count);
        }

        log::debug!(
            "Cluster index built: {} markers, {} nodes at zoom 0",
            markers.len(),
            levels[0].len()
        );

        Self {
            markers,
            levels,
            max_zoom,
        }
    }

    fn cluster_level(points: &mut [Node], zoom: u8, leaf_count: u64) -> Vec<Node> {
        let radius = CLUSTER_RADIUS_PX / (TILE_EXTENT * 2f64.powi(zoom as i32));
        let radius_sq = radius * radius;
        let mut out = Vec::new();

        for i in 0..points.len() {
            if points[i].zoom <= zoom {
                continue;
            }
            points[i].zoom = zoom;

            let (px, py) = (points[i].x, points[i].y);
            let neighbors: Vec<usize> = (0..points.len())
                .filter(|&j| {
                    let dx = points[j].x - px;
                    let dy = points[j].y - py;
                    points[j].zoom > zoom && dx * dx + dy * dy <= radius_sq
                })
                .collect();

            let origin_points = points[i].num_points;
            let num_points =
                origin_points + neighbors.iter().map(|&j| points[j].num_points).sum::<usize>();

            if num_points < MIN_POINTS {
                out.push(points[i].clone());
                continue;
            }

            let id = ((i as u64) << 5) + (zoom as u64 + 1) + leaf_count;
            let mut wx = px * origin_points as f64;
            let mut wy = py * origin_points as f64;
            for &j in &neighbors {
                let neighbor = &mut points[j];
                neighbor.zoom = zoom;
                neighbor.parent = Some(id);
                wx += neighbor.x * neighbor.num_points as f64;
                wy += neighbor.y * neighbor.num_points as f64;
            }
            points[i].parent = Some(id);

            out.push(Node {
                x: wx / num_points as f64,
                y: wy / num_points as f64,
                zoom: UNCLAIMED,
                parent: None,
                num_points,
                kind: NodeKind::Cluster(id),
            });
        }

        out
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    fn level_for(&self, zoom: f64) -> usize {
        if !zoom.is_finite() || zoom < 0.0 {
            return 0;
        }
        (zoom.floor() as usize).min(self.max_zoom as usize + 1)
    }

    fn item(&self, node: &Node) -> Option<ClusterItem> {
        match node.kind {
            NodeKind::Leaf(i) => self.markers.get(i).cloned().map(ClusterItem::Single),
            NodeKind::Cluster(id) => Some(ClusterItem::Cluster {
                id,
                point_count: node.num_points,
                center: Coordinates {
                    lat: y_lat(node.y),
                    lng: x_lng(node.x),
                },
            }),
        }
    }

    fn range(&self, level: usize, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<ClusterItem> {
        self.levels[level]
            .iter()
            .filter(|n| n.x >= min_x && n.x <= max_x && n.y >= min_y && n.y <= max_y)
            .filter_map(|n| self.item(n))
            .collect()
    }

    /// Clusters and single markers inside `bounds` at `zoom`
    /// DOCUMENTATION: Bounds crossing the antimeridian (west > east) are split in two.
    pub fn get_clusters(&self, bounds: &ViewportBounds, zoom: f64) -> Vec<ClusterItem> {
        let mut min_lng = ((bounds.west + 180.0).rem_euclid(360.0)) - 180.0;
        let min_lat = bounds.south.clamp(-90.0, 90.0);
        let mut max_lng = if bounds.east == 180.0 {
            180.0
        } else {
            ((bounds.east + 180.0).rem_euclid(360.0)) - 180.0
        };
        let max_lat = bounds.north.clamp(-90.0, 90.0);

        if bounds.east - bounds.west >= 360.0 {
            min_lng = -180.0;
            max_lng = 180.0;
        } else if min_lng > max_lng {
            let east_half = self.get_clusters(
                &ViewportBounds {
                    west: min_lng,
                    south: min_lat,
                    east: 180.0,
                    north: max_lat,
                },
                zoom,
            );
            let west_half = self.get_clusters(
                &ViewportBounds {
                    west: -180.0,
                    south: min_lat,
                    east: max_lng,
                    north: max_lat,
                },
                zoom,
            );
            return east_half.into_iter().chain(west_half).collect();
        }

        let level = self.level_for(zoom);
        self.range(
            level,
            lng_x(min_lng),
            lat_y(max_lat),
            lng_x(max_lng),
            lat_y(min_lat),
        )
    }

    fn decode(&self, cluster_id: u64) -> Option<(usize, usize)> {
        let offset = cluster_id.checked_sub(self.markers.len() as u64)?;
        let origin_zoom = (offset % 32) as usize;
        let origin_index = (offset >> 5) as usize;
        if origin_zoom == 0 || origin_zoom > self.max_zoom as usize + 1 {
            return None;
        }
        Some((origin_index, origin_zoom))
    }

    fn children(&self, cluster_id: u64) -> Option<Vec<&Node>> {
        let (origin_index, origin_zoom) = self.decode(cluster_id)?;
        let level = &self.levels[origin_zoom];
        level.get(origin_index)?;
        let children: Vec<&Node> = level
            .iter()
            .filter(|n| n.parent == Some(cluster_id))
            .collect();
        (!children.is_empty()).then_some(children)
    }

    /// Direct children of a cluster, one level up
    pub fn cluster_children(&self, cluster_id: u64) -> Option<Vec<ClusterItem>> {
        let children = self.children(cluster_id)?;
        Some(children.into_iter().filter_map(|n| self.item(n)).collect())
    }

    /// Lowest zoom at which the cluster's members are no longer grouped together
    pub fn expansion_zoom(&self, cluster_id: u64) -> Option<u8> {
        let (_, origin_zoom) = self.decode(cluster_id)?;
        let mut expansion = origin_zoom as u8 - 1;
        let mut current = cluster_id;

        while expansion <= self.max_zoom {
            let children = self.children(current)?;
            expansion += 1;
            match children.as_slice() {
                [only] => match only.kind {
                    NodeKind::Cluster(next) => current = next,
                    NodeKind::Leaf(_) => break,
                },
                _ => break,
            }
        }

        Some(expansion.min(self.max_zoom))
    }

    /// Expansion zoom plus the camera target centered on the cluster
    pub fn expansion(&self, cluster_id: u64) -> Option<ClusterExpansion> {
        let (origin_index, origin_zoom) = self.decode(cluster_id)?;
        let origin_level = origin_zoom - 1;
        let node = self.levels[origin_level]
            .iter()
            .find(|n| n.kind == NodeKind::Cluster(cluster_id))
            .or_else(|| self.levels[origin_zoom].get(origin_index))?;
        let expansion_zoom = self.expansion_zoom(cluster_id)?;

        Some(ClusterExpansion {
            cluster_id,
            expansion_zoom,
            ease_to: Viewport {
                center: Coordinates {
                    lat: y_lat(node.y),
                    lng: x_lng(node.x),
                },
                zoom: expansion_zoom as f64,
            },
        })
    }
}

/// Render a clustering result the way map SDKs consume it
pub fn to_feature_collection(items: &[ClusterItem]) -> FeatureCollection {
    let features = items.iter().map(item_feature).collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn item_feature(item: &ClusterItem) -> Feature {
    let mut properties = JsonObject::new();
    let (id, position) = match item {
        ClusterItem::Cluster {
            id,
            point_count,
            center,
        } => {
            properties.insert("cluster".to_string(), Value::Bool(true));
            properties.insert("cluster_id".to_string(), Value::from(*id));
            properties.insert("point_count".to_string(), Value::from(*point_count));
            properties.insert(
                "point_count_abbreviated".to_string(),
                Value::from(abbreviate(*point_count)),
            );
            properties.insert("size".to_string(), Value::from(cluster_glyph_size(*point_count)));
            (
                feature::Id::Number(serde_json::Number::from(*id)),
                *center,
            )
        }
        ClusterItem::Single(marker) => {
            let style = marker.category.style();
            properties.insert("cluster".to_string(), Value::Bool(false));
            properties.insert("locationId".to_string(), Value::from(marker.id.clone()));
            properties.insert("category".to_string(), serde_json::json!(marker.category));
            properties.insert("day".to_string(), Value::from(marker.day));
            properties.insert("name".to_string(), Value::from(marker.name.clone()));
            properties.insert("color".to_string(), Value::from(style.color));
            properties.insert("glyph".to_string(), Value::from(style.glyph));
            properties.insert("zIndex".to_string(), Value::from(marker.category.z_index()));
            properties.insert("synthetic".to_string(), Value::Bool(marker.synthetic));
            (
                feature::Id::String(marker.id.clone()),
                marker.coordinates(),
            )
        }
    };

    let point: geo_types::Point<f64> = position.into();
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::from(&point))),
        id: Some(id),
        properties: Some(properties),
        foreign_members: None,
    }
}

fn abbreviate(count: usize) -> String {
    match count {
        0..=999 => count.to_string(),
        1000..=9999 => format!("{:.1}k", count as f64 / 1000.0),
        _ => format!("{}k", count / 1000),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MarkerCategory, MarkerDetails};

    fn marker(id: &str, lat: f64, lng: f64) -> Marker {
        Marker {
            id: id.to_string(),
            latitude: lat,
            longitude: lng,
            name: id.to_string(),
            category: MarkerCategory::Place,
            day: 1,
            synthetic: false,
            details: MarkerDetails::default(),
        }
    }

    fn count_points(items: &[ClusterItem]) -> usize {
        items
            .iter()
            .map(|item| match item {
                ClusterItem::Cluster { point_count, .. } => *point_count,
                ClusterItem::Single(_) => 1,
            })
            .sum()
    }

    fn sample() -> Vec<Marker> {
        vec![
            marker("a", 48.8584, 2.2945),
            marker("b", 48.8606, 2.3376),
            marker("c", 48.8530, 2.3499),
            marker("d", 40.7128, -74.0060),
        ]
    }

    #[test]
    fn test_low_zoom_groups_nearby_markers() {
        let index = ClusterIndex::new(sample());
        let items = index.get_clusters(&ViewportBounds::WORLD, 2.0);

        assert_eq!(items.len(), 2);
        assert_eq!(count_points(&items), 4);
        assert!(items
            .iter()
            .any(|i| matches!(i, ClusterItem::Cluster { point_count: 3, .. })));
    }

    #[test]
    fn test_max_zoom_shows_every_marker() {
        let index = ClusterIndex::new(sample());
        let items = index.get_clusters(&ViewportBounds::WORLD, 21.0);
        assert_eq!(items.len(), 4);
        assert!(items.iter().all(|i| matches!(i, ClusterItem::Single(_))));
    }

    #[test]
    fn test_bounds_limit_results() {
        let index = ClusterIndex::new(sample());
        let europe = ViewportBounds {
            west: -10.0,
            south: 35.0,
            east: 30.0,
            north: 60.0,
        };
        let items = index.get_clusters(&europe, 21.0);
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn test_antimeridian_bounds() {
        let index = ClusterIndex::new(vec![marker("fiji", -17.7, 178.0), marker("samoa", -13.8, -172.0)]);
        let pacific = ViewportBounds {
            west: 170.0,
            south: -30.0,
            east: -165.0,
            north: 0.0,
        };
        assert_eq!(index.get_clusters(&pacific, 21.0).len(), 2);
    }

    #[test]
    fn test_expansion_zoom_splits_cluster() {
        let index = ClusterIndex::new(sample());
        let items = index.get_clusters(&ViewportBounds::WORLD, 2.0);
        let cluster_id = items
            .iter()
            .find_map(|i| match i {
                ClusterItem::Cluster { id, .. } => Some(*id),
                _ => None,
            })
            .unwrap();

        let expansion = index.expansion(cluster_id).unwrap();
        assert!(expansion.expansion_zoom > 2);
        assert!(expansion.expansion_zoom <= MAX_CLUSTER_ZOOM);
        assert_eq!(expansion.ease_to.zoom, expansion.expansion_zoom as f64);

        let zoom = expansion.expansion_zoom as f64;
        let split = index.get_clusters(&ViewportBounds::WORLD, zoom);
        assert!(split.len() > items.len());
        assert_eq!(count_points(&split), 4);
    }

    #[test]
    fn test_identical_points_cap_expansion() {
        let index = ClusterIndex::new(vec![marker("x", 10.0, 10.0), marker("y", 10.0, 10.0)]);
        let items = index.get_clusters(&ViewportBounds::WORLD, 0.0);
        let ClusterItem::Cluster { id, .. } = items[0] else {
            panic!("expected a cluster");
        };
        assert_eq!(index.expansion_zoom(id), Some(MAX_CLUSTER_ZOOM));
    }

    #[test]
    fn test_unknown_cluster_id() {
        let index = ClusterIndex::new(sample());
        assert!(index.expansion_zoom(0).is_none());
        assert!(index.expansion(999_999).is_none());
    }

    #[test]
    fn test_empty_index() {
        let index = ClusterIndex::new(Vec::new());
        assert!(index.get_clusters(&ViewportBounds::WORLD, 5.0).is_empty());
    }

    #[test]
    fn test_feature_collection_shape() {
        let index = ClusterIndex::new(sample());
        let items = index.get_clusters(&ViewportBounds::WORLD, 2.0);
        let collection = to_feature_collection(&items);
        let json = serde_json::to_value(&collection).unwrap();

        assert_eq!(json["type"], "FeatureCollection");
        let features = json["features"].as_array().unwrap();
        assert_eq!(features.len(), 2);
        let single = features
            .iter()
            .find(|f| f["properties"]["cluster"] == false)
            .unwrap();
        assert_eq!(single["properties"]["locationId"], "d");
        assert_eq!(single["properties"]["color"], "#4CAF50");
        assert_eq!(single["geometry"]["coordinates"][0], -74.006);
    }

    #[test]
    fn test_glyph_size() {
        assert_eq!(cluster_glyph_size(2), 20.4);
        assert_eq!(cluster_glyph_size(50), 30.0);
        assert_eq!(cluster_glyph_size(500), 30.0);
    }

    #[test]
    fn test_projection_round_trip() {
        let lat = 48.8584;
        assert!((y_lat(lat_y(lat)) - lat).abs() < 1e-9);
        assert!((x_lng(lng_x(2.2945)) - 2.2945).abs() < 1e-9);
    }
}
