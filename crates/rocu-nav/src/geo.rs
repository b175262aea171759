use rocu_proto::Position;

/// Metres per degree of latitude used by the local flat-earth projection.
pub const METERS_PER_DEG: f64 = 111_111.0;

/// Local north/east offset in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Offset {
    pub north_m: f64,
    pub east_m: f64,
}

impl Offset {
    pub fn distance_m(&self) -> f64 {
        self.north_m.hypot(self.east_m)
    }
}

/// Equirectangular offset from `from` to `to`, scaled at `from`'s latitude.
/// Only meaningful over short ranges.
pub fn offset_m(from: Position, to: Position) -> Offset {
    let north_m = (to.lat - from.lat) * METERS_PER_DEG;
    let east_m = (to.lon - from.lon) * METERS_PER_DEG * from.lat.to_radians().cos();
    Offset { north_m, east_m }
}

/// Proportional velocity toward an offset, each axis saturated at `max`.
pub fn steer(off: Offset, gain: f64, max: f64) -> (f64, f64) {
    (
        (off.north_m * gain).clamp(-max, max),
        (off.east_m * gain).clamp(-max, max),
    )
}
