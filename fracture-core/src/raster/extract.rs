//! Polygon vertex recovery from a flooded label grid.
//!
//! Interior pixels are sampled on a stride-2 lattice; a pixel whose 3x3
//! neighbourhood holds at least three labels (two near the grid border) is a
//! junction and becomes a vertex of every label present. The first and last
//! rows are scanned pixel by pixel for label changes so cells touching those
//! sides get their border points.

use std::collections::BTreeMap;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::{LabelGrid, NO_LABEL};

/// Grid coordinate of a recovered vertex
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PixelVertex {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedVertices {
    /// Distinct vertices per label, sorted by (x, y)
    pub by_label: BTreeMap<u32, Vec<PixelVertex>>,
    /// Junction pixels found by the interior scan
    pub interior_count: usize,
}

impl ExtractedVertices {
    fn add(&mut self, label: u32, x: u32, y: u32) {
        if label != NO_LABEL {
            self.by_label.entry(label).or_default().push(PixelVertex { x, y });
        }
    }
}

/// Collect junction vertices for every label in `grid`.
pub fn extract_vertices(grid: &LabelGrid) -> ExtractedVertices {
    let mut out = ExtractedVertices::default();
    if grid.width < 2 || grid.height < 2 {
        return out;
    }

    scan_edge_row(grid, 0, &mut out);

    let rows: Vec<u32> = (1..grid.height.saturating_sub(2)).step_by(2).collect();
    #[cfg(feature = "parallel")]
    let junctions: Vec<Vec<(PixelVertex, Vec<u32>)>> =
        rows.par_iter().map(|&j| scan_interior_row(grid, j)).collect();
    #[cfg(not(feature = "parallel"))]
    let junctions: Vec<Vec<(PixelVertex, Vec<u32>)>> =
        rows.iter().map(|&j| scan_interior_row(grid, j)).collect();

    for (v, labels) in junctions.into_iter().flatten() {
        out.interior_count += 1;
        for label in labels {
            out.add(label, v.x, v.y);
        }
    }

    scan_edge_row(grid, grid.height - 1, &mut out);

    for vertices in out.by_label.values_mut() {
        vertices.sort_unstable();
        vertices.dedup();
    }
    out
}

/// Record the row ends and every label change along `row`, right to left.
fn scan_edge_row(grid: &LabelGrid, row: u32, out: &mut ExtractedVertices) {
    let w = grid.width;
    let at = |x: u32| grid.labels[row as usize * w as usize + x as usize];
    let mut last = at(w - 1);
    out.add(last, w - 1, row);
    for i in (1..w - 1).rev() {
        let current = at(i);
        if current != last {
            out.add(last, i, row);
            out.add(current, i, row);
            last = current;
        }
    }
    out.add(at(0), 0, row);
}

fn scan_interior_row(grid: &LabelGrid, j: u32) -> Vec<(PixelVertex, Vec<u32>)> {
    let (w, h) = (grid.width, grid.height);
    let mut junctions = Vec::new();
    if w < 3 {
        return junctions;
    }
    let mut found: Vec<u32> = Vec::with_capacity(9);
    for i in (1..=w - 2).rev().step_by(2) {
        found.clear();
        for y in j - 1..=j + 1 {
            for x in i - 1..=i + 1 {
                let label = grid.labels[y as usize * w as usize + x as usize];
                if !found.contains(&label) {
                    found.push(label);
                }
            }
        }
        let near_edge = i >= w - 3 || i <= 2 || j <= 1 || j >= h - 3;
        let required = if near_edge { 2 } else { 3 };
        if found.len() >= required {
            junctions.push((PixelVertex { x: i, y: j }, found.clone()));
        }
    }
    junctions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_from(rows: &[&[u32]]) -> LabelGrid {
        LabelGrid {
            width: rows[0].len() as u32,
            height: rows.len() as u32,
            labels: rows.iter().flat_map(|r| r.iter().copied()).collect(),
        }
    }

    #[test]
    fn test_uniform_grid_has_only_corners() {
        let grid = LabelGrid { width: 9, height: 7, labels: vec![3; 63] };
        let v = extract_vertices(&grid);
        assert_eq!(v.interior_count, 0);
        assert_eq!(v.by_label.len(), 1);
        let corners: Vec<(u32, u32)> = v.by_label[&3].iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(corners, vec![(0, 0), (0, 6), (8, 0), (8, 6)]);
    }

    #[test]
    fn test_edge_row_change_is_shared() {
        let grid = grid_from(&[
            &[0, 0, 0, 1, 1, 1],
            &[0, 0, 0, 1, 1, 1],
            &[0, 0, 0, 1, 1, 1],
            &[0, 0, 0, 1, 1, 1],
        ]);
        let v = extract_vertices(&grid);
        let has = |label: u32, x: u32, y: u32| v.by_label[&label].contains(&PixelVertex { x, y });
        // Label change between x = 2 and x = 3 recorded for both sides
        assert!(has(0, 2, 0) && has(1, 2, 0));
        assert!(has(0, 2, 3) && has(1, 2, 3));
        assert!(has(0, 0, 0) && has(1, 5, 3));
    }

    #[test]
    fn test_three_way_junction() {
        // Three labels meet around (5, 5)
        let mut labels = vec![0u32; 11 * 11];
        for y in 0..11u32 {
            for x in 0..11u32 {
                labels[(y * 11 + x) as usize] = if y <= 5 {
                    if x <= 5 { 0 } else { 1 }
                } else {
                    2
                };
            }
        }
        let grid = LabelGrid { width: 11, height: 11, labels };
        let v = extract_vertices(&grid);
        assert!(v.interior_count > 0);
        for label in 0..3 {
            assert!(
                v.by_label[&label].iter().any(|p| p.x.abs_diff(5) <= 1 && p.y.abs_diff(5) <= 1),
                "label {} missing the junction",
                label
            );
        }
    }
}
