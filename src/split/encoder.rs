use std::borrow::Cow;

use imagequant::ControlFlow;
use rgb::RGBA8;
use tracing::debug;

use super::frame::CellFrame;
use crate::error::EncodeError;
use crate::thread::CancelToken;

/// GIF 调色板最多 256 色
pub const MAX_COLORS: u32 = 256;

/// 量化参数
#[derive(Clone, Debug, PartialEq)]
pub struct QuantizeSettings {
    /// `1-10`.
    /// 更快的速度生成的图像质量更低。默认使用 imagequant 的默认值。
    pub speed: Option<u8>,
    /// `0-100`，最低质量，默认`0`，不能高于最大值
    pub quality_min: Option<u8>,
    /// `0-100`，最大质量，默认`100`，不能低于最小值
    pub quality_max: Option<u8>,
    /// 设置为1.0可获得平滑图像
    pub dithering_level: f32,
}

impl Default for QuantizeSettings {
    fn default() -> Self {
        QuantizeSettings {
            speed: None,
            quality_min: None,
            quality_max: None,
            dithering_level: 1.0,
        }
    }
}

impl QuantizeSettings {
    fn attributes(&self, cancel: &CancelToken) -> Result<imagequant::Attributes, EncodeError> {
        let mut attr = imagequant::new();
        attr.set_max_colors(MAX_COLORS)?;

        if let Some(speed) = self.speed {
            attr.set_speed(speed as i32)?;
        }
        attr.set_quality(
            self.quality_min.unwrap_or(0),
            self.quality_max.unwrap_or(100),
        )?;

        // 其他单元格失败后中断正在进行的量化
        let cancel = cancel.clone();
        attr.set_progress_callback(move |_| {
            if cancel.is_cancelled() {
                ControlFlow::Break
            } else {
                ControlFlow::Continue
            }
        });
        Ok(attr)
    }
}

/// 把一个网格单元的帧序列编码为独立的循环播放 GIF
pub struct CellEncoder<'a> {
    settings: &'a QuantizeSettings,
    cancel: CancelToken,
}

impl<'a> CellEncoder<'a> {
    pub fn new(settings: &'a QuantizeSettings, cancel: CancelToken) -> CellEncoder<'a> {
        CellEncoder { settings, cancel }
    }

    pub fn encode(&self, frames: &[CellFrame]) -> Result<Vec<u8>, EncodeError> {
        if frames.is_empty() {
            return Err(EncodeError::Empty);
        }
        for (id, frame) in frames.iter().enumerate() {
            check_buffer(id, frame)?;
        }

        let width = dimension(frames.iter().map(|f| f.width).max().unwrap_or(0))?;
        let height = dimension(frames.iter().map(|f| f.height).max().unwrap_or(0))?;
        let attr = self.settings.attributes(&self.cancel)?;

        let mut bytes = vec![];
        {
            let mut encoder = gif::Encoder::new(&mut bytes, width, height, &[])?;
            encoder.set_repeat(gif::Repeat::Infinite)?;

            for (id, frame) in frames.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    return Err(EncodeError::Cancelled);
                }
                let gif_frame = self.quantize(&attr, frame)?;
                encoder.write_frame(&gif_frame)?;
                debug!(frame = id, delay = frame.delay, "encoded cell frame");
            }
            // encoder 在这里被释放，写入文件尾
        }
        Ok(bytes)
    }

    /// 为单帧生成调色板并映射像素
    fn quantize(
        &self,
        attr: &imagequant::Attributes,
        frame: &CellFrame,
    ) -> Result<gif::Frame<'static>, EncodeError> {
        let mut image =
            imagequant::Image::new_borrowed(attr, &frame.pixels, frame.width, frame.height, 0.0)?;
        let mut res = attr.quantize(&mut image)?;
        res.set_dithering_level(self.settings.dithering_level)?;
        let (palette, mut indices) = res.remapped(&mut image)?;

        let transparent = merge_transparent(&palette, &mut indices);

        let mut rgb_palette: Vec<u8> = Vec::with_capacity(palette.len() * 3);
        for color in palette.iter() {
            rgb_palette.push(color.r);
            rgb_palette.push(color.g);
            rgb_palette.push(color.b);
        }

        Ok(gif::Frame {
            width: dimension(frame.width)?,
            height: dimension(frame.height)?,
            buffer: Cow::Owned(indices),
            palette: Some(rgb_palette),
            transparent,
            delay: frame.delay,
            // 每帧都是整幅画面，透明区域不能透出上一帧
            dispose: gif::DisposalMethod::Background,
            ..gif::Frame::default()
        })
    }
}

/// 单元格编码入口
pub fn encode_cell(
    frames: &[CellFrame],
    settings: &QuantizeSettings,
    cancel: CancelToken,
) -> Result<Vec<u8>, EncodeError> {
    CellEncoder::new(settings, cancel).encode(frames)
}

fn check_buffer(id: usize, frame: &CellFrame) -> Result<(), EncodeError> {
    let expected = frame.width * frame.height;
    if frame.pixels.len() != expected || expected == 0 {
        return Err(EncodeError::BufferSize {
            frame: id,
            expected,
            actual: frame.pixels.len(),
        });
    }
    Ok(())
}

fn dimension(value: usize) -> Result<u16, EncodeError> {
    u16::try_from(value).map_err(|_| EncodeError::TooLarge(value))
}

/// GIF 只有一个透明索引：alpha < 128 的调色板项都映射到第一个这样的项
fn merge_transparent(palette: &[RGBA8], indices: &mut [u8]) -> Option<u8> {
    let transparent = palette.iter().position(|c| c.a < 128)? as u8;
    for index in indices.iter_mut() {
        if palette[*index as usize].a < 128 {
            *index = transparent;
        }
    }
    Some(transparent)
}
