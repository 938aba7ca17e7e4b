/// A value interpolated linearly across a time domain, clamped at both ends
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Lerp {
    start_domain: f64,
    end_domain: f64,
    start_value: f64,
    end_value: f64,
}

impl Lerp {
    pub fn new(start_domain: f64, start_value: f64, end_domain: f64, end_value: f64) -> Self {
        Self {
            start_domain,
            end_domain,
            start_value,
            end_value,
        }
    }

    pub fn set(&mut self, start_domain: f64, start_value: f64, end_domain: f64, end_value: f64) {
        *self = Self::new(start_domain, start_value, end_domain, end_value);
    }

    pub fn value(&self, domain: f64) -> f64 {
        let range = self.end_domain - self.start_domain;
        if range <= 0.0 {
            return if domain >= self.end_domain {
                self.end_value
            } else {
                self.start_value
            };
        }
        let f = ((domain - self.start_domain) / range).clamp(0.0, 1.0);
        self.start_value * (1.0 - f) + self.end_value * f
    }

    pub fn end_value(&self) -> f64 {
        self.end_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_clamps_outside_domain() {
        let l = Lerp::new(1.0, 0.0, 3.0, 1.0);
        assert_eq!(l.value(0.0), 0.0);
        assert_eq!(l.value(2.0), 0.5);
        assert_eq!(l.value(10.0), 1.0);
    }

    #[test]
    fn test_empty_domain_snaps() {
        let l = Lerp::new(2.0, 0.25, 2.0, 0.75);
        assert_eq!(l.value(1.0), 0.25);
        assert_eq!(l.value(2.0), 0.75);
    }
}
