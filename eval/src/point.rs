use derive_more::{Add, From, Sub};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Add, Sub, From, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(self, other: Point) -> f64 {
        let d = self - other;
        d.x * d.x + d.y * d.y
    }
}
