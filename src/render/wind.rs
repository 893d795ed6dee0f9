//! Wind unit conversion and barb geometry.

/// km/h per knot.
pub const KMH_PER_KNOT: f64 = 1.852;

pub fn kmh_to_knots(speed_kmh: f64) -> f64 {
    speed_kmh / KMH_PER_KNOT
}

/// Wind vector, same unit as the input speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindComponents {
    /// Eastward component.
    pub u: f64,
    /// Northward component.
    pub v: f64,
}

impl WindComponents {
    pub fn speed(&self) -> f64 {
        self.u.hypot(self.v)
    }
}

/// Splits a speed and the direction the wind blows *from* (degrees) into u/v.
///
/// A northerly (0°) wind moves south, so `v` is negative.
pub fn wind_components(speed: f64, direction_deg: f64) -> WindComponents {
    let rad = direction_deg.to_radians();
    WindComponents {
        u: -speed * rad.sin(),
        v: -speed * rad.cos(),
    }
}

/// Barb counts for a speed in knots, rounded to the nearest 5 kt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarbCounts {
    pub flags: u32,
    pub full_barbs: u32,
    pub half_barbs: u32,
}

impl BarbCounts {
    pub fn from_knots(knots: f64) -> Self {
        let mut remaining = ((knots.max(0.0) / 5.0).round() as u32) * 5;
        let flags = remaining / 50;
        remaining %= 50;
        let full_barbs = remaining / 10;
        remaining %= 10;
        Self {
            flags,
            full_barbs,
            half_barbs: remaining / 5,
        }
    }

    pub fn is_calm(&self) -> bool {
        self.flags == 0 && self.full_barbs == 0 && self.half_barbs == 0
    }
}

/// Pixel offsets relative to the station, y growing downwards.
pub type Offset = (i32, i32);

/// Drawable pieces of a wind barb.
#[derive(Debug, Clone, PartialEq)]
pub enum BarbGlyph {
    /// Rounds to 0 kt: a circle of the given radius.
    Calm { radius: i32 },
    Barb {
        /// Staff from the station to its tip, pointing where the wind comes from.
        staff: (Offset, Offset),
        /// Triangles for 50 kt each.
        flags: Vec<[Offset; 3]>,
        /// Line segments for 10 kt (full) and 5 kt (half) each.
        barbs: Vec<(Offset, Offset)>,
    },
}

/// Lays out a barb of staff length `length` px for the given wind components (knots).
pub fn barb_glyph(components: WindComponents, length: f64) -> BarbGlyph {
    let counts = BarbCounts::from_knots(components.speed());
    if counts.is_calm() {
        return BarbGlyph::Calm {
            radius: (length * 0.15).round().max(2.0) as i32,
        };
    }

    // Unit vector from the station towards the upwind side, in pixel space.
    let (ux, uy) = {
        let s = components.speed();
        (-components.u / s, components.v / s)
    };
    // Barbs hang off the clockwise side of the staff.
    let (px, py) = (-uy, ux);

    let point = |along: f64, across: f64| -> Offset {
        (
            (ux * along + px * across).round() as i32,
            (uy * along + py * across).round() as i32,
        )
    };

    let spacing = length * 0.12;
    let barb_len = length * 0.4;
    let mut position = length;

    let flags = (0..counts.flags)
        .map(|_| {
            let tri = [
                point(position, 0.0),
                point(position - spacing, barb_len),
                point(position - spacing * 1.5, 0.0),
            ];
            position -= spacing * 1.5;
            tri
        })
        .collect::<Vec<_>>();
    if counts.flags > 0 {
        position -= spacing * 0.5;
    }

    let mut barbs = Vec::new();
    for _ in 0..counts.full_barbs {
        barbs.push((point(position, 0.0), point(position + spacing, barb_len)));
        position -= spacing;
    }
    if counts.half_barbs > 0 {
        // A lone half barb sits slightly in from the tip.
        if counts.flags == 0 && counts.full_barbs == 0 {
            position -= spacing;
        }
        barbs.push((
            point(position, 0.0),
            point(position + spacing * 0.5, barb_len * 0.5),
        ));
    }

    BarbGlyph::Barb {
        staff: ((0, 0), point(length, 0.0)),
        flags,
        barbs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-2
    }

    #[test]
    fn northerly_wind_points_south() {
        let c = wind_components(kmh_to_knots(36.0), 0.0);
        assert!(close(c.u, 0.0), "u = {}", c.u);
        assert!(close(c.v, -19.44), "v = {}", c.v);
    }

    #[test]
    fn easterly_wind_points_west() {
        let c = wind_components(kmh_to_knots(36.0), 90.0);
        assert!(close(c.u, -19.44), "u = {}", c.u);
        assert!(close(c.v, 0.0), "v = {}", c.v);
    }

    #[test]
    fn barb_counts_round_to_five_knots() {
        assert_eq!(
            BarbCounts::from_knots(65.0),
            BarbCounts {
                flags: 1,
                full_barbs: 1,
                half_barbs: 1
            }
        );
        assert_eq!(
            BarbCounts::from_knots(17.6),
            BarbCounts {
                flags: 0,
                full_barbs: 2,
                half_barbs: 0
            }
        );
        assert!(BarbCounts::from_knots(2.4).is_calm());
    }

    #[test]
    fn slow_wind_is_calm() {
        let glyph = barb_glyph(wind_components(2.4, 180.0), 40.0);
        assert!(matches!(glyph, BarbGlyph::Calm { .. }));
    }

    #[test]
    fn four_knots_draws_a_half_barb() {
        let BarbGlyph::Barb { flags, barbs, .. } = barb_glyph(wind_components(4.0, 180.0), 40.0)
        else {
            panic!("expected a barb");
        };
        assert!(flags.is_empty());
        assert_eq!(barbs.len(), 1);

        // 8 km/h is about 4.3 kt.
        assert!(matches!(
            barb_glyph(wind_components(kmh_to_knots(8.0), 90.0), 40.0),
            BarbGlyph::Barb { .. }
        ));
    }

    #[test]
    fn staff_points_upwind() {
        // From the north: staff goes up (negative y).
        let BarbGlyph::Barb { staff, .. } = barb_glyph(wind_components(20.0, 0.0), 40.0) else {
            panic!("expected a barb");
        };
        assert_eq!(staff, ((0, 0), (0, -40)));

        // From the east: staff goes right.
        let BarbGlyph::Barb { staff, .. } = barb_glyph(wind_components(20.0, 90.0), 40.0) else {
            panic!("expected a barb");
        };
        assert_eq!(staff, ((0, 0), (40, 0)));
    }

    #[test]
    fn glyph_has_one_piece_per_count() {
        let BarbGlyph::Barb { flags, barbs, .. } = barb_glyph(wind_components(65.0, 225.0), 40.0)
        else {
            panic!("expected a barb");
        };
        assert_eq!(flags.len(), 1);
        assert_eq!(barbs.len(), 2);
    }
}
