//! Materialized grid of text cells.
//!
//! Cells are addressed by column `x` and row `y`, both zero-based. A merged
//! cell spans a rectangle; every point it covers resolves to the same cell.

use crate::geom::{Point, Rect};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    /// Covered area; `1x1` unless merged.
    pub rect: Rect,
}

impl Cell {
    pub fn is_merged(&self) -> bool {
        self.rect.area() > 1
    }
}

#[derive(Debug, Clone, Default)]
pub struct Grid {
    /// Keyed by top-left `(y, x)` so iteration is row-major.
    cells: BTreeMap<(i64, i64), Cell>,
    /// Covered point → top-left key, for merged cells only.
    merged: HashMap<Point, (i64, i64)>,
    width: i64,
    height: i64,
}

impl Grid {
    pub fn new() -> Self {
        Self::default()
    }

    /// One cell per character; spaces are empty cells.
    pub fn from_chars(text: &str) -> Self {
        let mut grid = Grid::new();
        for (y, line) in text.lines().enumerate() {
            for (x, ch) in line.chars().enumerate() {
                if !ch.is_whitespace() {
                    grid.set(x as i64, y as i64, ch.to_string());
                }
            }
        }
        grid
    }

    /// One row per line, cells split on `delimiter` and trimmed.
    pub fn from_delimited(text: &str, delimiter: char) -> Self {
        let mut grid = Grid::new();
        for (y, line) in text.lines().enumerate() {
            for (x, field) in line.split(delimiter).enumerate() {
                grid.set(x as i64, y as i64, field.trim());
            }
        }
        grid
    }

    /// Store `text` at `(x, y)`; blank text clears the cell.
    pub fn set(&mut self, x: i64, y: i64, text: impl Into<String>) {
        let text = text.into();
        let key = self.merged.get(&Point::new(x, y)).copied().unwrap_or((y, x));
        if text.trim().is_empty() {
            if self.cells.get(&key).is_some_and(|c| !c.is_merged()) {
                self.cells.remove(&key);
            }
            return;
        }
        let rect = self.cells.get(&key).map_or(Rect::cell(x, y), |c| c.rect);
        self.cells.insert(key, Cell { text, rect });
        self.width = self.width.max(rect.right());
        self.height = self.height.max(rect.bottom());
    }

    /// Merge `rect` into one cell carrying the text of its top-left cell.
    /// Returns `false` when `rect` overlaps an existing merged cell.
    pub fn merge(&mut self, rect: Rect) -> bool {
        if rect.is_empty() || rect.points().any(|p| self.merged.contains_key(&p)) {
            return false;
        }
        let key = (rect.top(), rect.left());
        let text = self.cells.get(&key).map(|c| c.text.clone()).unwrap_or_default();
        for p in rect.points() {
            self.cells.remove(&(p.y, p.x));
            self.merged.insert(p, key);
        }
        self.cells.insert(key, Cell { text, rect });
        self.width = self.width.max(rect.right());
        self.height = self.height.max(rect.bottom());
        true
    }

    pub fn width(&self) -> i64 {
        self.width
    }

    pub fn height(&self) -> i64 {
        self.height
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }

    /// The cell covering `p`, merged or not.
    pub fn cell_at(&self, p: Point) -> Option<&Cell> {
        let key = self.merged.get(&p).copied().unwrap_or((p.y, p.x));
        self.cells.get(&key)
    }

    pub fn text_at(&self, x: i64, y: i64) -> Option<&str> {
        self.cell_at(Point::new(x, y)).map(|c| c.text.as_str())
    }

    /// Non-empty cells in row-major order of their top-left corner.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn region(&self, rect: Rect) -> GridRegion<'_> {
        GridRegion { grid: self, rect }
    }
}

/// Read-only window onto a grid.
#[derive(Debug, Clone, Copy)]
pub struct GridRegion<'a> {
    grid: &'a Grid,
    rect: Rect,
}

impl<'a> GridRegion<'a> {
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Cells whose top-left corner lies inside the window.
    pub fn cells(&self) -> impl Iterator<Item = &'a Cell> + use<'a> {
        let rect = self.rect;
        self.grid.cells.values().filter(move |c| rect.contains_point(c.rect.top_left()))
    }

    /// Cell texts, row-major, concatenated.
    pub fn text(&self) -> String {
        self.cells().map(|c| c.text.as_str()).collect()
    }
}

impl fmt::Display for GridRegion<'_> {
    /// Renders one character per point (first char of the covering cell, `.` when empty).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in self.rect.top()..self.rect.bottom() {
            let line: String = (self.rect.left()..self.rect.right())
                .map(|x| self.grid.text_at(x, y).and_then(|t| t.chars().next()).unwrap_or('.'))
                .collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_character_grids() {
        let grid = Grid::from_chars(" AB\n8o*\n7 o\n");
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.height(), 3);
        assert_eq!(grid.text_at(0, 0), None);
        assert_eq!(grid.text_at(2, 0), Some("B"));
        assert_eq!(grid.text_at(1, 2), None);
        assert_eq!(grid.cells().map(|c| c.text.as_str()).collect::<String>(), "AB8o*7o");
        assert_eq!(grid.region(Rect::new(1, 1, 2, 2)).text(), "o*o");
        assert_eq!(grid.region(grid.bounds()).to_string(), ".AB\n8o*\n7.o\n");
    }

    #[test]
    fn delimited_rows_trim_fields() {
        let grid = Grid::from_delimited("name; qty\n apple ;3\n", ';');
        assert_eq!(grid.text_at(1, 0), Some("qty"));
        assert_eq!(grid.text_at(0, 1), Some("apple"));
        assert_eq!(grid.bounds(), Rect::new(0, 0, 2, 2));
    }

    #[test]
    fn merged_cells_cover_their_span() {
        let mut grid = Grid::from_chars("T.\n..\n");
        assert!(grid.merge(Rect::new(0, 0, 2, 1)));
        assert!(!grid.merge(Rect::new(1, 0, 1, 2)));
        let title = grid.cell_at(Point::new(1, 0)).unwrap();
        assert_eq!(title.text, "T");
        assert_eq!(title.rect, Rect::new(0, 0, 2, 1));
        assert!(title.is_merged());

        grid.set(1, 0, "Title");
        assert_eq!(grid.text_at(0, 0), Some("Title"));
        assert_eq!(grid.cells().count(), 3);
    }
}
