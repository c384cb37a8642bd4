//! 把动画 GIF 按网格切分成多个独立的动画 GIF。
//!
//! 流水线：解码原始帧 -> 按 disposal 规则合成完整帧 -> 按网格切分 -> 多线程重新量化编码。

pub mod error;
pub mod split;
pub mod thread;

pub use error::{EncodeError, Error, FormatError, Result};
pub use split::{split_animation, EncodedGrid, NamingScheme, Progress, SplitOptions, Splitter, Stage};
