#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }

    /// Linear interpolation: `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(&self, other: &Point, t: f64) -> Point {
        Point::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
        )
    }

    /// One movement step of at most `speed` toward `target`, never overshooting.
    pub fn step_toward(&self, target: &Point, speed: f64) -> Point {
        let dist = self.distance(target);
        if dist <= speed || dist == 0.0 {
            return *target;
        }
        self.lerp(target, speed / dist)
    }

    /// Point at `length` from `self` in the direction of `target`.
    /// Degenerates to `self` when both points coincide.
    pub fn toward(&self, target: &Point, length: f64) -> Point {
        let dist = self.distance(target);
        if dist == 0.0 {
            return *self;
        }
        self.lerp(target, length / dist)
    }

    /// Point on the circle of `radius` around `self` at `angle` radians.
    pub fn on_circle(&self, radius: f64, angle: f64) -> Point {
        Point::new(self.x + radius * angle.cos(), self.y + radius * angle.sin())
    }

    pub fn sub(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn dot(&self, other: &Point) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Integer encoding used for cache keys and the text protocol.
    pub fn rounded(&self) -> (i64, i64) {
        (self.x.round() as i64, self.y.round() as i64)
    }
}

/// Inclusive map rectangle. Coordinates range over `[0, width - 1] x [0, height - 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn contains(&self, pos: &Point) -> bool {
        pos.x >= 0.0 && pos.x <= self.width - 1.0 && pos.y >= 0.0 && pos.y <= self.height - 1.0
    }

    pub fn clamp(&self, pos: Point) -> Point {
        Point::new(
            pos.x.clamp(0.0, self.width - 1.0),
            pos.y.clamp(0.0, self.height - 1.0),
        )
    }

    pub fn center(&self) -> Point {
        Point::new((self.width - 1.0) / 2.0, (self.height - 1.0) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_toward_does_not_overshoot() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(300.0, 400.0);
        assert_eq!(a.step_toward(&b, 800.0), b);

        let c = Point::new(3000.0, 4000.0);
        let stepped = a.step_toward(&c, 800.0);
        assert!((stepped.distance(&a) - 800.0).abs() < 1e-9);
        assert!((stepped.x - 480.0).abs() < 1e-9);
        assert!((stepped.y - 640.0).abs() < 1e-9);
    }

    #[test]
    fn test_bounds_clamp() {
        let bounds = Bounds::new(16001.0, 9001.0);
        let clamped = bounds.clamp(Point::new(-50.0, 9500.0));
        assert_eq!(clamped, Point::new(0.0, 9000.0));
        assert!(bounds.contains(&clamped));
    }
}
