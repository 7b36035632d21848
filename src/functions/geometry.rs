//! Geometry to raster cell resolution
//!
//! | Geometry | Default rule | `all_touched` |
//! |----------|--------------|---------------|
//! | Point | containing cell | containing cell |
//! | Line | cells under samples taken every half cell along the path | every cell the path crosses |
//! | Polygon | cells whose center is inside (holes excluded) | centers inside plus every cell the boundary crosses |

use std::collections::BTreeSet;

use geo::{Contains, Coord, Geometry, LineString, Point, Polygon};
use wkt::TryFromWkt;

use super::{FunctionError, RasterLayer};

/// Parse a WKT string (`POINT (1 2)`, `POLYGON ((...))`, ...)
pub fn parse_geometry(text: &str) -> Result<Geometry<f64>, FunctionError> {
    Geometry::<f64>::try_from_wkt_str(text.trim())
        .map_err(|e| FunctionError::InvalidGeometry(e.to_string()))
}

/// True for a point, or a multi-point with exactly one point
pub fn is_single_point(geometry: &Geometry<f64>) -> bool {
    match geometry {
        Geometry::Point(_) => true,
        Geometry::MultiPoint(mp) => mp.0.len() == 1,
        _ => false,
    }
}

/// Cells `(line, sample)` of `layer` covered by `geometry`, sorted and unique
pub fn geometry_cells(
    layer: &RasterLayer,
    geometry: &Geometry<f64>,
    all_touched: bool,
) -> Vec<(usize, usize)> {
    let mut cells = BTreeSet::new();
    collect(layer, geometry, all_touched, &mut cells);
    cells.into_iter().collect()
}

fn collect(
    layer: &RasterLayer,
    geometry: &Geometry<f64>,
    all_touched: bool,
    cells: &mut BTreeSet<(usize, usize)>,
) {
    match geometry {
        Geometry::Point(p) => point_cell(layer, p, cells),
        Geometry::MultiPoint(mp) => mp.0.iter().for_each(|p| point_cell(layer, p, cells)),
        Geometry::Line(line) => path_cells(layer, &[line.start, line.end], all_touched, cells),
        Geometry::LineString(ls) => path_cells(layer, &ls.0, all_touched, cells),
        Geometry::MultiLineString(mls) => mls
            .0
            .iter()
            .for_each(|ls| path_cells(layer, &ls.0, all_touched, cells)),
        Geometry::Polygon(polygon) => polygon_cells(layer, polygon, all_touched, cells),
        Geometry::MultiPolygon(mp) => mp
            .0
            .iter()
            .for_each(|polygon| polygon_cells(layer, polygon, all_touched, cells)),
        Geometry::Rect(rect) => polygon_cells(layer, &rect.to_polygon(), all_touched, cells),
        Geometry::Triangle(triangle) => {
            polygon_cells(layer, &triangle.to_polygon(), all_touched, cells)
        }
        Geometry::GeometryCollection(gc) => gc
            .0
            .iter()
            .for_each(|g| collect(layer, g, all_touched, cells)),
    }
}

fn point_cell(layer: &RasterLayer, point: &Point<f64>, cells: &mut BTreeSet<(usize, usize)>) {
    if let Some(cell) = layer.cell_at(point.x(), point.y()) {
        cells.insert(cell);
    }
}

fn path_cells(
    layer: &RasterLayer,
    coords: &[Coord<f64>],
    all_touched: bool,
    cells: &mut BTreeSet<(usize, usize)>,
) {
    let transform = layer.transform();
    let pixels: Vec<(f64, f64)> = coords.iter().map(|c| transform.to_pixel(c.x, c.y)).collect();

    if let [only] = pixels.as_slice() {
        cells.extend(layer.cell_index(only.0.floor(), only.1.floor()));
        return;
    }

    let window = (layer.samples() as f64, layer.lines() as f64);
    for segment in pixels.windows(2) {
        let Some((from, to)) = clip_segment(segment[0], segment[1], window) else {
            continue;
        };
        if all_touched {
            traverse(from, to, |col, row| {
                cells.extend(layer.cell_index(col as f64, row as f64));
            });
        } else {
            sample_segment(from, to, |col, row| {
                cells.extend(layer.cell_index(col, row));
            });
        }
    }
}

/// Part of the segment `from`-`to` inside `[0, width] x [0, height]` (pixel
/// coordinates), after Liang and Barsky. `None` when it misses the window.
fn clip_segment(
    from: (f64, f64),
    to: (f64, f64),
    (width, height): (f64, f64),
) -> Option<((f64, f64), (f64, f64))> {
    if !(from.0.is_finite() && from.1.is_finite() && to.0.is_finite() && to.1.is_finite()) {
        return None;
    }
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let (mut t0, mut t1) = (0.0f64, 1.0f64);
    for (p, q) in [
        (-dx, from.0),
        (dx, width - from.0),
        (-dy, from.1),
        (dy, height - from.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    // endpoints inside the window are kept exactly
    let at = |t: f64| (from.0 + t * dx, from.1 + t * dy);
    let start = if t0 > 0.0 { at(t0) } else { from };
    let end = if t1 < 1.0 { at(t1) } else { to };
    Some((start, end))
}

/// Visit the cell under every point taken at half-cell spacing from `from` to `to`
fn sample_segment(from: (f64, f64), to: (f64, f64), mut visit: impl FnMut(f64, f64)) {
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);
    let length = dx.hypot(dy);
    if !length.is_finite() {
        return;
    }
    let steps = (length / 0.5).ceil().max(1.0) as usize;
    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        visit((from.0 + t * dx).floor(), (from.1 + t * dy).floor());
    }
}

/// Visit every cell crossed by the segment `from`-`to` (pixel coordinates).
///
/// Grid traversal after Amanatides and Woo; cells touched only at a corner
/// are visited as well.
fn traverse(from: (f64, f64), to: (f64, f64), mut visit: impl FnMut(i64, i64)) {
    if !(from.0.is_finite() && from.1.is_finite() && to.0.is_finite() && to.1.is_finite()) {
        return;
    }
    let (mut col, mut row) = (from.0.floor() as i64, from.1.floor() as i64);
    let (end_col, end_row) = (to.0.floor() as i64, to.1.floor() as i64);
    let (dx, dy) = (to.0 - from.0, to.1 - from.1);

    let step_col = if dx > 0.0 { 1 } else { -1 };
    let step_row = if dy > 0.0 { 1 } else { -1 };
    let delta_col = if dx != 0.0 { 1.0 / dx.abs() } else { f64::INFINITY };
    let delta_row = if dy != 0.0 { 1.0 / dy.abs() } else { f64::INFINITY };
    let mut next_col = if dx > 0.0 {
        ((col + 1) as f64 - from.0) / dx
    } else if dx < 0.0 {
        (col as f64 - from.0) / dx
    } else {
        f64::INFINITY
    };
    let mut next_row = if dy > 0.0 {
        ((row + 1) as f64 - from.1) / dy
    } else if dy < 0.0 {
        (row as f64 - from.1) / dy
    } else {
        f64::INFINITY
    };

    visit(col, row);
    let steps = (end_col - col).abs() + (end_row - row).abs();
    for _ in 0..steps {
        let move_col = if col == end_col {
            false
        } else if row == end_row {
            true
        } else {
            next_col < next_row
        };
        if move_col {
            col += step_col;
            next_col += delta_col;
        } else {
            row += step_row;
            next_row += delta_row;
        }
        visit(col, row);
    }
}

fn polygon_cells(
    layer: &RasterLayer,
    polygon: &Polygon<f64>,
    all_touched: bool,
    cells: &mut BTreeSet<(usize, usize)>,
) {
    let transform = layer.transform();
    let Some(window) = pixel_window(layer, polygon.exterior()) else {
        return;
    };
    let (col_range, row_range) = window;

    for line in row_range {
        for sample in col_range.clone() {
            let (x, y) = transform.cell_center(line, sample);
            if polygon.contains(&Point::new(x, y)) {
                cells.insert((line, sample));
            }
        }
    }

    if all_touched {
        path_cells(layer, &polygon.exterior().0, true, cells);
        for ring in polygon.interiors() {
            path_cells(layer, &ring.0, true, cells);
        }
    }
}

type CellRange = std::ops::Range<usize>;

/// Sample and line ranges of the raster overlapped by the bounding box of `ring`
fn pixel_window(layer: &RasterLayer, ring: &LineString<f64>) -> Option<(CellRange, CellRange)> {
    let transform = layer.transform();
    let (mut min_col, mut min_row) = (f64::INFINITY, f64::INFINITY);
    let (mut max_col, mut max_row) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
    for c in ring.coords() {
        let (col, row) = transform.to_pixel(c.x, c.y);
        min_col = min_col.min(col);
        max_col = max_col.max(col);
        min_row = min_row.min(row);
        max_row = max_row.max(row);
    }
    if !(min_col.is_finite() && max_col.is_finite() && min_row.is_finite() && max_row.is_finite()) {
        return None;
    }

    let clamp = |v: f64, len: usize| v.max(0.0).min(len as f64) as usize;
    let cols = clamp(min_col.floor(), layer.samples())..clamp(max_col.ceil(), layer.samples());
    let rows = clamp(min_row.floor(), layer.lines())..clamp(max_row.ceil(), layer.lines());
    (!cols.is_empty() && !rows.is_empty()).then_some((cols, rows))
}
