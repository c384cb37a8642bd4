use rgb::RGBA8;
use tracing::{debug, warn};

use super::frame::RawFrame;
use crate::error::FormatError;

/// 解码结果：逻辑屏幕尺寸和按顺序排列的原始帧
#[derive(Debug)]
pub struct Decoded {
    pub width: u16,
    pub height: u16,
    pub frames: Vec<RawFrame>,
}

/// 解析 GIF 字节流。
///
/// 像素补丁以索引形式返回（LZW 已解压、隔行已还原），调色板解析为 RGBA。
/// 补丁超出逻辑屏幕视为格式错误。没有任何帧、帧缺少调色板的流由 gif 解码器
/// 直接拒绝，以 [`FormatError::Decode`] 返回。
#[tracing::instrument(skip(bytes), fields(len = bytes.len()))]
pub fn decode(bytes: &[u8]) -> Result<Decoded, FormatError> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options.read_info(bytes)?;

    let width = decoder.width();
    let height = decoder.height();
    let global_palette = decoder.global_palette().map(rgba_palette);

    let mut frames = vec![];
    while let Some(frame) = decoder.read_next_frame()? {
        let id = frames.len();
        check_bounds(id, frame, width, height)?;

        let palette = match &frame.palette {
            Some(local) => rgba_palette(local),
            None => global_palette.clone().unwrap_or_default(),
        };

        let expected = frame.width as usize * frame.height as usize;
        if frame.buffer.len() != expected {
            return Err(FormatError::PixelCount {
                frame: id,
                expected,
                actual: frame.buffer.len(),
            });
        }

        if let Some(max) = frame.buffer.iter().max() {
            if *max as usize >= palette.len() {
                warn!(
                    frame = id,
                    index = max,
                    palette = palette.len(),
                    "pixel index outside palette, treated as transparent"
                );
            }
        }

        debug!(
            frame = id,
            left = frame.left,
            top = frame.top,
            width = frame.width,
            height = frame.height,
            dispose = ?frame.dispose,
            delay = frame.delay,
            "decoded frame"
        );

        frames.push(RawFrame {
            left: frame.left,
            top: frame.top,
            width: frame.width,
            height: frame.height,
            indices: frame.buffer.to_vec(),
            palette,
            transparent: frame.transparent,
            disposal: frame.dispose.into(),
            delay: frame.delay,
        });
    }

    Ok(Decoded {
        width,
        height,
        frames,
    })
}

fn check_bounds(id: usize, frame: &gif::Frame, width: u16, height: u16) -> Result<(), FormatError> {
    let right = frame.left as u32 + frame.width as u32;
    let bottom = frame.top as u32 + frame.height as u32;
    if right > width as u32 || bottom > height as u32 {
        return Err(FormatError::PatchOutOfBounds {
            frame: id,
            left: frame.left,
            top: frame.top,
            width: frame.width,
            height: frame.height,
            screen_width: width,
            screen_height: height,
        });
    }
    Ok(())
}

/// GIF 调色板是连续的 RGB 三元组
fn rgba_palette(rgb: &[u8]) -> Vec<RGBA8> {
    rgb.chunks_exact(3)
        .map(|c| RGBA8::new(c[0], c[1], c[2], 255))
        .collect()
}
