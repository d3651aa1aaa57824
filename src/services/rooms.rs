//! Point-in-polygon room classification
//!
//! Rooms are ordered polygons on a floor plan. Overlap between polygons on
//! the same floor is legal; the first containing polygon in declaration
//! order wins, which is how ambiguous borders (a stair landing inside a
//! hall outline) are resolved.

use crate::domain::types::RoomPolygon;

/// Ray-casting containment test
///
/// Casts a horizontal ray from the point and counts edge crossings; odd
/// parity means inside. Polygons with fewer than three vertices contain
/// nothing.
pub fn point_in_polygon(px: f64, pz: f64, polygon: &[[f64; 2]]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = polygon.len() - 1;
    for i in 0..polygon.len() {
        let [xi, zi] = polygon[i];
        let [xj, zj] = polygon[j];
        if (zi > pz) != (zj > pz) && px < (xj - xi) * (pz - zi) / (zj - zi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// First room in declaration order containing the point, if any
pub fn classify(rooms: &[RoomPolygon], x: f64, z: f64) -> Option<&str> {
    rooms
        .iter()
        .find(|room| point_in_polygon(x, z, &room.polygon))
        .map(|room| room.id.as_str())
}
