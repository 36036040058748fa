//! Bounded curve storage.

use serde::Serialize;

use crate::config::MAX_IV_POINTS_CAPACITY;
use crate::error::CurveError;

/// Raw conversion pair. `voltage` is channel 0, `current` channel 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IvPoint {
    pub voltage: u16,
    pub current: u16,
}

impl IvPoint {
    #[inline]
    pub const fn new(voltage: u16, current: u16) -> Self {
        Self { voltage, current }
    }
}

/// Append-only point buffer with a fixed capacity.
///
/// The most recently pushed point may have its current revised once, until
/// the next push or an explicit `seal_last`.
#[derive(Debug, Clone)]
pub struct CurveBuffer {
    points: Vec<IvPoint>,
    capacity: usize,
    revisable: bool,
}

impl CurveBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self, CurveError> {
        let max = usize::from(MAX_IV_POINTS_CAPACITY);
        if capacity > max {
            return Err(CurveError::CapacityTooLarge {
                requested: capacity,
                max,
            });
        }
        Ok(Self {
            points: Vec::with_capacity(capacity),
            capacity,
            revisable: false,
        })
    }

    /// Append a point and return its index.
    #[inline]
    pub fn push(&mut self, point: IvPoint) -> Result<usize, CurveError> {
        if self.points.len() >= self.capacity {
            return Err(CurveError::Full {
                capacity: self.capacity,
            });
        }
        self.points.push(point);
        self.revisable = true;
        Ok(self.points.len() - 1)
    }

    /// Replace the current of the last point. Allowed once per point.
    #[inline]
    pub fn revise_last_current(&mut self, current: u16) -> Result<(), CurveError> {
        match self.points.last_mut() {
            Some(last) if self.revisable => {
                last.current = current;
                self.revisable = false;
                Ok(())
            }
            _ => Err(CurveError::NotRevisable),
        }
    }

    /// Freeze the last point without revising it.
    #[inline]
    pub fn seal_last(&mut self) {
        self.revisable = false;
    }

    /// Whether the last point still awaits its current revision.
    #[inline]
    pub fn is_pending(&self) -> bool {
        self.revisable
    }

    #[inline]
    pub fn last(&self) -> Option<&IvPoint> {
        self.points.last()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.points.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn points(&self) -> &[IvPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<IvPoint> {
        self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_fails_when_full() {
        let mut buf = CurveBuffer::with_capacity(2).unwrap();
        assert_eq!(buf.push(IvPoint::new(0, 10)).unwrap(), 0);
        assert_eq!(buf.push(IvPoint::new(1, 9)).unwrap(), 1);
        assert!(buf.is_full());
        assert_eq!(
            buf.push(IvPoint::new(2, 8)),
            Err(CurveError::Full { capacity: 2 })
        );
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn revision_allowed_once() {
        let mut buf = CurveBuffer::with_capacity(4).unwrap();
        assert_eq!(buf.revise_last_current(1), Err(CurveError::NotRevisable));
        buf.push(IvPoint::new(5, 100)).unwrap();
        assert!(buf.is_pending());
        buf.revise_last_current(98).unwrap();
        assert_eq!(buf.last(), Some(&IvPoint::new(5, 98)));
        assert_eq!(buf.revise_last_current(97), Err(CurveError::NotRevisable));
    }

    #[test]
    fn seal_blocks_revision() {
        let mut buf = CurveBuffer::with_capacity(4).unwrap();
        buf.push(IvPoint::new(5, 100)).unwrap();
        buf.seal_last();
        assert!(!buf.is_pending());
        assert!(buf.revise_last_current(1).is_err());
    }

    #[test]
    fn capacity_is_bounded() {
        let cap = usize::from(MAX_IV_POINTS_CAPACITY);
        assert!(CurveBuffer::with_capacity(cap).is_ok());
        assert!(matches!(
            CurveBuffer::with_capacity(usize::from(MAX_IV_POINTS_CAPACITY) + 1),
            Err(CurveError::CapacityTooLarge { .. })
        ));
    }
}
