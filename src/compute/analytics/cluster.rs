//! DBSCAN density clustering in planar meters.

use super::{density, hull_area_km2};
use crate::compute::projection::WebMercator;
use crate::compute::validation::{validate_distance, validate_locations};
use crate::error::Result;
use geo::Coord;
use hexloc_types::{Cluster, Location};
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};

type IndexedCoord = GeomWithData<[f64; 2], usize>;

/// Density-based clustering (DBSCAN).
///
/// A location is a *core* point when at least `min_samples` locations,
/// itself included, lie within `eps_meters` of it. Clusters are the sets of
/// points density-reachable from core points; everything else is noise and
/// is dropped. Cluster ids are assigned `0, 1, 2, …` in input order of each
/// cluster's first core point, and a border point reachable from several
/// clusters joins the first one that reaches it, so the result is fully
/// determined by the input order.
///
/// Returns an empty list without projecting when there are fewer locations
/// than `min_samples`.
///
/// # Errors
///
/// `InvalidInput` if `eps_meters` is negative or not finite, or if a
/// location is out of range.
pub fn cluster(locations: &[Location], eps_meters: f64, min_samples: usize) -> Result<Vec<Cluster>> {
    validate_distance("eps_meters", eps_meters)?;
    validate_locations(locations)?;
    let min_samples = min_samples.max(1);

    if locations.len() < min_samples {
        return Ok(Vec::new());
    }

    let coords = WebMercator::project_all(locations.iter().map(|l| &l.coordinates));
    let labels = dbscan_labels(&coords, eps_meters, min_samples);

    let cluster_count = labels.iter().flatten().max().map_or(0, |max| max + 1);
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); cluster_count];
    for (index, label) in labels.iter().enumerate() {
        if let Some(id) = label {
            members[*id].push(index);
        }
    }

    let clusters: Vec<Cluster> = members
        .into_iter()
        .enumerate()
        .map(|(cluster_id, indices)| summarize(cluster_id, &indices, locations, &coords))
        .collect();

    log::debug!(
        "clustered {} locations into {} clusters (eps={}m, min_samples={})",
        locations.len(),
        clusters.len(),
        eps_meters,
        min_samples
    );

    Ok(clusters)
}

/// Cluster label per point, `None` for noise.
fn dbscan_labels(coords: &[Coord<f64>], eps: f64, min_samples: usize) -> Vec<Option<usize>> {
    let tree: RTree<IndexedCoord> = RTree::bulk_load(
        coords
            .iter()
            .enumerate()
            .map(|(i, c)| GeomWithData::new([c.x, c.y], i))
            .collect(),
    );

    let neighborhoods: Vec<Vec<usize>> = coords
        .iter()
        .map(|c| region_query(&tree, c, eps))
        .collect();
    let is_core: Vec<bool> = neighborhoods
        .iter()
        .map(|n| n.len() >= min_samples)
        .collect();

    let mut labels: Vec<Option<usize>> = vec![None; coords.len()];
    let mut next_id = 0;
    let mut stack = Vec::new();

    for seed in 0..coords.len() {
        if labels[seed].is_some() || !is_core[seed] {
            continue;
        }

        labels[seed] = Some(next_id);
        stack.push(seed);

        while let Some(point) = stack.pop() {
            if !is_core[point] {
                continue;
            }
            for &neighbor in &neighborhoods[point] {
                if labels[neighbor].is_none() {
                    labels[neighbor] = Some(next_id);
                    if is_core[neighbor] {
                        stack.push(neighbor);
                    }
                }
            }
        }

        next_id += 1;
    }

    labels
}

/// Indices of all points within `eps` of `center` (inclusive), ascending.
fn region_query(tree: &RTree<IndexedCoord>, center: &Coord<f64>, eps: f64) -> Vec<usize> {
    let envelope = AABB::from_corners([center.x - eps, center.y - eps], [center.x + eps, center.y + eps]);
    let eps_2 = eps * eps;

    let mut found: Vec<usize> = tree
        .locate_in_envelope_intersecting(&envelope)
        .filter(|item| {
            let [x, y] = *item.geom();
            let (dx, dy) = (x - center.x, y - center.y);
            dx * dx + dy * dy <= eps_2
        })
        .map(|item| item.data)
        .collect();
    found.sort_unstable();
    found
}

fn summarize(
    cluster_id: usize,
    indices: &[usize],
    locations: &[Location],
    coords: &[Coord<f64>],
) -> Cluster {
    let member_coords: Vec<Coord<f64>> = indices.iter().map(|&i| coords[i]).collect();
    let n = member_coords.len() as f64;

    let centroid = Coord {
        x: member_coords.iter().map(|c| c.x).sum::<f64>() / n,
        y: member_coords.iter().map(|c| c.y).sum::<f64>() / n,
    };

    let radius_meters = member_coords
        .iter()
        .map(|c| (c.x - centroid.x).hypot(c.y - centroid.y))
        .fold(0.0, f64::max);

    let area_km2 = hull_area_km2(&member_coords);

    Cluster {
        cluster_id,
        centroid: WebMercator::to_geographic(centroid),
        locations: indices.iter().map(|&i| locations[i].clone()).collect(),
        radius_meters,
        density_per_km2: density(indices.len(), area_km2),
    }
}
