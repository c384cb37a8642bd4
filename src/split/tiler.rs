use tracing::debug;

use super::frame::{CellFrame, FullFrame};
use crate::error::{Error, Result};

/// 单元格在逻辑屏幕上的矩形
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CellRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

/// 网格划分：等分后余数归最后一行/最后一列
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Layout {
    pub rows: usize,
    pub cols: usize,
    pub width: usize,
    pub height: usize,
}

impl Layout {
    /// 行列数必须在 `1..=height` / `1..=width` 之内，否则会出现空单元格
    pub fn new(width: usize, height: usize, rows: usize, cols: usize) -> Result<Layout> {
        if rows == 0 || cols == 0 || rows > height || cols > width {
            return Err(Error::InvalidGrid {
                rows,
                cols,
                width,
                height,
            });
        }
        Ok(Layout {
            rows,
            cols,
            width,
            height,
        })
    }

    pub fn cell_width(&self) -> usize {
        self.width / self.cols
    }

    pub fn cell_height(&self) -> usize {
        self.height / self.rows
    }

    pub fn rect(&self, row: usize, col: usize) -> CellRect {
        let x = col * self.cell_width();
        let y = row * self.cell_height();
        let width = if col == self.cols - 1 {
            self.width - x
        } else {
            self.cell_width()
        };
        let height = if row == self.rows - 1 {
            self.height - y
        } else {
            self.cell_height()
        };
        CellRect {
            x,
            y,
            width,
            height,
        }
    }
}

/// `rows x cols` 个单元格，每个单元格是一段按原始顺序排列的帧
#[derive(Clone, Debug)]
pub struct Grid {
    pub layout: Layout,
    /// 行优先：`cells[row * cols + col]`
    cells: Vec<Vec<CellFrame>>,
}

impl Grid {
    pub fn rows(&self) -> usize {
        self.layout.rows
    }

    pub fn cols(&self) -> usize {
        self.layout.cols
    }

    pub fn cell(&self, row: usize, col: usize) -> &[CellFrame] {
        &self.cells[row * self.layout.cols + col]
    }

    /// 按行优先顺序拿走所有单元格，附带坐标
    pub fn into_cells(self) -> impl Iterator<Item = (usize, usize, Vec<CellFrame>)> {
        let cols = self.layout.cols;
        self.cells
            .into_iter()
            .enumerate()
            .map(move |(i, frames)| (i / cols, i % cols, frames))
    }
}

/// 把完整帧切成网格。完整帧在切分后被释放。
#[tracing::instrument(skip(frames), fields(frames = frames.len()))]
pub fn split(
    frames: Vec<FullFrame>,
    width: usize,
    height: usize,
    rows: usize,
    cols: usize,
) -> Result<Grid> {
    let layout = Layout::new(width, height, rows, cols)?;
    let mut cells: Vec<Vec<CellFrame>> = (0..rows * cols)
        .map(|_| Vec::with_capacity(frames.len()))
        .collect();

    for frame in frames {
        for row in 0..rows {
            for col in 0..cols {
                let rect = layout.rect(row, col);
                cells[row * cols + col].push(extract(&frame, rect));
            }
        }
    }

    debug!(
        cell_width = layout.cell_width(),
        cell_height = layout.cell_height(),
        "split frames into grid"
    );

    Ok(Grid { layout, cells })
}

fn extract(frame: &FullFrame, rect: CellRect) -> CellFrame {
    let mut pixels = Vec::with_capacity(rect.width * rect.height);
    for y in rect.y..rect.y + rect.height {
        let start = y * frame.width + rect.x;
        pixels.extend_from_slice(&frame.pixels[start..start + rect.width]);
    }
    CellFrame {
        pixels,
        width: rect.width,
        height: rect.height,
        delay: frame.delay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rgb::RGBA8;

    /// 每个像素编码自己的坐标，便于检查拼接
    fn coordinate_frame(width: usize, height: usize, delay: u16) -> FullFrame {
        let pixels = (0..width * height)
            .map(|i| RGBA8::new((i % width) as u8, (i / width) as u8, delay as u8, 255))
            .collect();
        FullFrame {
            pixels,
            width,
            height,
            delay,
        }
    }

    #[test]
    fn remainder_goes_to_last_row_and_column() {
        let layout = Layout::new(10, 7, 3, 4).unwrap();
        assert_eq!(layout.cell_width(), 2);
        assert_eq!(layout.cell_height(), 2);
        assert_eq!(
            layout.rect(2, 3),
            CellRect {
                x: 6,
                y: 4,
                width: 4,
                height: 3
            }
        );
        assert_eq!(
            layout.rect(0, 0),
            CellRect {
                x: 0,
                y: 0,
                width: 2,
                height: 2
            }
        );
    }

    #[test]
    fn cells_cover_every_pixel_exactly_once() {
        for (width, height) in [(1, 1), (5, 3), (17, 9), (64, 48)] {
            for rows in 1..=4usize.min(height) {
                for cols in 1..=4usize.min(width) {
                    let layout = Layout::new(width, height, rows, cols).unwrap();
                    let mut hits = vec![0u8; width * height];
                    for row in 0..rows {
                        let total: usize = (0..cols).map(|c| layout.rect(row, c).width).sum();
                        assert_eq!(total, width);
                    }
                    for col in 0..cols {
                        let total: usize = (0..rows).map(|r| layout.rect(r, col).height).sum();
                        assert_eq!(total, height);
                    }
                    for row in 0..rows {
                        for col in 0..cols {
                            let rect = layout.rect(row, col);
                            for y in rect.y..rect.y + rect.height {
                                for x in rect.x..rect.x + rect.width {
                                    hits[y * width + x] += 1;
                                }
                            }
                        }
                    }
                    assert!(hits.iter().all(|h| *h == 1), "{width}x{height} {rows}x{cols}");
                }
            }
        }
    }

    #[test]
    fn stitching_cells_reproduces_frames() {
        let frames = vec![coordinate_frame(7, 5, 3), coordinate_frame(7, 5, 9)];
        let grid = split(frames.clone(), 7, 5, 2, 3).unwrap();

        for (i, original) in frames.iter().enumerate() {
            let mut stitched = vec![RGBA8::default(); 7 * 5];
            for row in 0..2 {
                for col in 0..3 {
                    let rect = grid.layout.rect(row, col);
                    let cell = &grid.cell(row, col)[i];
                    assert_eq!((cell.width, cell.height), (rect.width, rect.height));
                    assert_eq!(cell.delay, original.delay);
                    for y in 0..rect.height {
                        for x in 0..rect.width {
                            stitched[(rect.y + y) * 7 + rect.x + x] = cell.pixels[y * rect.width + x];
                        }
                    }
                }
            }
            assert_eq!(stitched, original.pixels);
        }
    }

    #[test]
    fn each_cell_keeps_frame_order() {
        let frames = (1..=5).map(|d| coordinate_frame(4, 4, d)).collect();
        let grid = split(frames, 4, 4, 2, 2).unwrap();
        for (_, _, cell) in grid.into_cells() {
            let delays: Vec<u16> = cell.iter().map(|f| f.delay).collect();
            assert_eq!(delays, vec![1, 2, 3, 4, 5]);
        }
    }

    #[test]
    fn into_cells_is_row_major() {
        let grid = split(vec![coordinate_frame(4, 4, 1)], 4, 4, 2, 2).unwrap();
        let keys: Vec<(usize, usize)> = grid.into_cells().map(|(r, c, _)| (r, c)).collect();
        assert_eq!(keys, vec![(0, 0), (0, 1), (1, 0), (1, 1)]);
    }

    #[test]
    fn rejects_degenerate_grids() {
        assert!(matches!(
            Layout::new(4, 4, 0, 2),
            Err(Error::InvalidGrid { rows: 0, .. })
        ));
        assert!(matches!(
            Layout::new(3, 4, 1, 4),
            Err(Error::InvalidGrid { cols: 4, .. })
        ));
        assert!(split(vec![coordinate_frame(2, 2, 1)], 2, 2, 3, 1).is_err());
    }
}
