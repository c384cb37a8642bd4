use rgb::RGBA8;
use tracing::debug;

use super::frame::{normalize_delay, Disposal, FullFrame, RawFrame, BACKGROUND};

/// 虚拟画布：`current` 是实际显示的内容，`saved` 是 restore-to-previous 用的快照
#[derive(Debug)]
struct Canvas {
    width: usize,
    height: usize,
    current: Vec<RGBA8>,
    saved: Vec<RGBA8>,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Canvas {
        Canvas {
            width,
            height,
            current: vec![BACKGROUND; width * height],
            saved: vec![BACKGROUND; width * height],
        }
    }

    fn snapshot(&mut self) {
        self.saved.copy_from_slice(&self.current);
    }

    fn restore(&mut self) {
        self.current.copy_from_slice(&self.saved);
    }

    /// 覆盖绘制补丁，透明索引处保留下层像素。超出画布的部分被裁掉。
    fn draw(&mut self, frame: &RawFrame) {
        let left = frame.left as usize;
        let top = frame.top as usize;
        let patch_width = frame.width as usize;
        if left >= self.width {
            return;
        }
        let visible = patch_width.min(self.width - left);
        for (row, indices) in frame.indices.chunks_exact(patch_width.max(1)).enumerate() {
            if top + row >= self.height {
                break;
            }
            let start = (top + row) * self.width + left;
            let dest = &mut self.current[start..start + visible];
            for (pixel, index) in dest.iter_mut().zip(indices) {
                if let Some(color) = frame.color(*index) {
                    *pixel = color;
                }
            }
        }
    }

    /// 超出画布的部分被裁掉
    fn clear_rect(&mut self, left: usize, top: usize, width: usize, height: usize) {
        if left >= self.width {
            return;
        }
        let width = width.min(self.width - left);
        for y in top..(top + height).min(self.height) {
            let start = y * self.width + left;
            self.current[start..start + width].fill(BACKGROUND);
        }
    }

    fn capture(&self, delay: u16) -> FullFrame {
        FullFrame {
            pixels: self.current.clone(),
            width: self.width,
            height: self.height,
            delay: normalize_delay(delay),
        }
    }

    /// 在帧已经被捕获之后执行，只影响下一帧
    fn dispose(&mut self, frame: &RawFrame) {
        match frame.disposal {
            Disposal::Unspecified | Disposal::Keep => {}
            Disposal::Background => self.clear_rect(
                frame.left as usize,
                frame.top as usize,
                frame.width as usize,
                frame.height as usize,
            ),
            Disposal::Previous => self.restore(),
        }
    }
}

/// 按帧顺序在画布上重放补丁，得到每一帧的完整 RGBA 图像。
///
/// 解码阶段已经保证补丁落在 `width x height` 之内，这里仍会裁剪越界部分。
#[tracing::instrument(skip(frames), fields(frames = frames.len()))]
pub fn composite(frames: &[RawFrame], width: usize, height: usize) -> Vec<FullFrame> {
    let mut canvas = Canvas::new(width, height);
    let mut full_frames = Vec::with_capacity(frames.len());

    for (id, frame) in frames.iter().enumerate() {
        // 绘制前保存，dispose 时回到这里
        if frame.disposal == Disposal::Previous {
            canvas.snapshot();
        }

        canvas.draw(frame);
        full_frames.push(canvas.capture(frame.delay));
        canvas.dispose(frame);

        debug!(frame = id, disposal = ?frame.disposal, "composited frame");
    }

    full_frames
}
