use std::io;

pub type Result<T> = std::result::Result<T, Error>;

/// 输入的 GIF 数据有问题，解码阶段直接终止
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("gif decode failed: {0}")]
    Decode(#[from] gif::DecodingError),

    #[error(
        "frame {frame}: patch {width}x{height}+{left}+{top} exceeds logical screen {screen_width}x{screen_height}"
    )]
    PatchOutOfBounds {
        frame: usize,
        left: u16,
        top: u16,
        width: u16,
        height: u16,
        screen_width: u16,
        screen_height: u16,
    },

    #[error("frame {frame}: expected {expected} pixel indices, got {actual}")]
    PixelCount {
        frame: usize,
        expected: usize,
        actual: usize,
    },
}

/// 单个网格单元重新编码失败
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("frame {frame}: pixel buffer holds {actual} pixels, expected {expected}")]
    BufferSize {
        frame: usize,
        expected: usize,
        actual: usize,
    },

    #[error("cell has no frames")]
    Empty,

    #[error("dimension {0} does not fit in a gif")]
    TooLarge(usize),

    #[error("quantization failed: {0:?}")]
    Quantize(imagequant::Error),

    #[error("gif encode failed: {0}")]
    Gif(#[from] gif::EncodingError),

    /// 其他单元已经失败，本单元被放弃
    #[error("encode cancelled")]
    Cancelled,

    /// 工作线程在返回结果之前退出（任务 panic）
    #[error("encode worker exited without a result")]
    WorkerLost,
}

impl From<imagequant::Error> for EncodeError {
    fn from(err: imagequant::Error) -> Self {
        match err {
            imagequant::Error::Aborted => EncodeError::Cancelled,
            err => EncodeError::Quantize(err),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("cell row {} col {}: {source}", .row + 1, .col + 1)]
    Encode {
        row: usize,
        col: usize,
        #[source]
        source: EncodeError,
    },

    #[error("cannot split {width}x{height} into {rows} rows x {cols} cols")]
    InvalidGrid {
        rows: usize,
        cols: usize,
        width: usize,
        height: usize,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub fn encode(row: usize, col: usize, source: EncodeError) -> Self {
        Error::Encode { row, col, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_error_names_cell_one_based() {
        let err = Error::encode(
            0,
            2,
            EncodeError::BufferSize {
                frame: 1,
                expected: 4,
                actual: 3,
            },
        );
        let msg = err.to_string();
        assert!(msg.starts_with("cell row 1 col 3:"), "{msg}");
        assert!(msg.contains("expected 4"), "{msg}");
    }

    #[test]
    fn aborted_quantization_maps_to_cancelled() {
        let err: EncodeError = imagequant::Error::Aborted.into();
        assert!(matches!(err, EncodeError::Cancelled));
    }

    #[test]
    fn format_errors_convert_into_top_level() {
        let err: Error = FormatError::PixelCount {
            frame: 2,
            expected: 6,
            actual: 5,
        }
        .into();
        assert!(matches!(
            err,
            Error::Format(FormatError::PixelCount { frame: 2, .. })
        ));
        assert_eq!(err.to_string(), "frame 2: expected 6 pixel indices, got 5");
    }
}
