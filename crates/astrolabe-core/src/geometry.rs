//! Geometric primitives for node placement.
//!
//! This module provides the value types used to place diagram nodes. They are
//! immutable: every operation returns a new value.
//!
//! # Overview
//!
//! - [`Point`] - A 2D coordinate in diagram space
//! - [`Dimension`] - Non-negative width and height
//! - [`Rectangle`] - An axis-aligned box defined by its top-left corner and a [`Dimension`]
//!
//! # Coordinate System
//!
//! Astrolabe uses the screen coordinate system:
//!
//! ```text
//!   (0,0) ────────► +X
//!     │
//!     │
//!     ▼
//!    +Y
//! ```
//!
//! A child node's position is expressed in its parent's frame. The graph
//! never interprets positions; only rendering collaborators and the
//! vertical ordering of sequence-diagram activations do.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A 2D point with integer coordinates.
///
/// # Examples
///
/// ```
/// # use astrolabe_core::geometry::Point;
/// let origin = Point::new(5, 0);
/// let moved = origin.checked_translate(10, 15);
///
/// assert_eq!(moved, Some(Point::new(15, 15)));
/// assert_eq!(origin.checked_translate(i32::MAX, 0), None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    x: i32,
    y: i32,
}

impl Point {
    /// Creates a new point with the specified coordinates
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the x-coordinate of the point
    pub fn x(self) -> i32 {
        self.x
    }

    /// Returns the y-coordinate of the point
    pub fn y(self) -> i32 {
        self.y
    }

    /// Returns a new point offset by `dx` and `dy`, or `None` when a
    /// coordinate leaves the `i32` range.
    pub fn checked_translate(self, dx: i32, dy: i32) -> Option<Self> {
        Some(Self {
            x: self.x.checked_add(dx)?,
            y: self.y.checked_add(dy)?,
        })
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A pair of non-negative width and height values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Dimension {
    width: u32,
    height: u32,
}

impl Dimension {
    /// Creates a new dimension.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the width.
    pub fn width(self) -> u32 {
        self.width
    }

    /// Returns the height.
    pub fn height(self) -> u32 {
        self.height
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An axis-aligned rectangle, stored as its top-left and bottom-right
/// corners so that every corner of a rectangle is a representable point.
///
/// The size of any such rectangle fits a [`Dimension`]: the distance between
/// two `i32` values is at most `u32::MAX`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rectangle {
    min: Point,
    max: Point,
}

impl Rectangle {
    /// Creates the smallest rectangle containing both points.
    pub fn spanning(a: Point, b: Point) -> Self {
        Self {
            min: Point::new(a.x().min(b.x()), a.y().min(b.y())),
            max: Point::new(a.x().max(b.x()), a.y().max(b.y())),
        }
    }

    /// Returns the top-left corner.
    pub fn origin(self) -> Point {
        self.min
    }

    /// Returns the bottom-right corner.
    pub fn max_point(self) -> Point {
        self.max
    }

    /// Returns the size of the rectangle.
    pub fn dimension(self) -> Dimension {
        Dimension::new(
            self.min.x().abs_diff(self.max.x()),
            self.min.y().abs_diff(self.max.y()),
        )
    }

    /// Checks whether the point lies inside the rectangle (edges included).
    pub fn contains(self, point: Point) -> bool {
        (self.min.x()..=self.max.x()).contains(&point.x())
            && (self.min.y()..=self.max.y()).contains(&point.y())
    }

    /// Returns the smallest rectangle containing this rectangle and the point.
    pub fn include_point(self, point: Point) -> Self {
        if self.contains(point) {
            return self;
        }
        Self {
            min: Point::new(self.min.x().min(point.x()), self.min.y().min(point.y())),
            max: Point::new(self.max.x().max(point.x()), self.max.y().max(point.y())),
        }
    }
}

impl fmt::Display for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}]", self.min, self.dimension())
    }
}
