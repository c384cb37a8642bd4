mod compositor;
mod decoder;
mod encoder;
mod frame;
mod splitter;
mod tiler;

pub use compositor::composite;
pub use decoder::{decode, Decoded};
pub use encoder::{encode_cell, CellEncoder, QuantizeSettings, MAX_COLORS};
pub use frame::{normalize_delay, CellFrame, Disposal, FullFrame, RawFrame, BACKGROUND, MIN_DELAY};
pub use splitter::{
    default_workers, encode_percent, split_animation, Composited, EncodedGrid, NamingScheme,
    Progress, SplitOptions, Splitter, Stage, MAX_WORKERS,
};
pub use tiler::{split, CellRect, Grid, Layout};
