use std::sync::mpsc;
use std::sync::Arc;
use std::thread::available_parallelism;

use tracing::{debug, info};

use super::compositor::composite;
use super::decoder::decode;
use super::encoder::{encode_cell, QuantizeSettings};
use super::frame::{CellFrame, FullFrame};
use super::tiler::{split, Grid, Layout};
use crate::error::{EncodeError, Error, Result};
use crate::thread::{CancelToken, ThreadPool};

/// 同时编码的单元格上限
pub const MAX_WORKERS: usize = 4;

/// 流水线阶段，以及界面上对应的进度百分比
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Stage {
    Decoding,
    Compositing,
    Splitting,
    Encoding,
    Done,
}

impl Stage {
    /// 解码/合成/切分占前 50%，编码占后 50%
    pub fn percent(self) -> u8 {
        match self {
            Stage::Decoding => 0,
            Stage::Compositing => 20,
            Stage::Splitting => 40,
            Stage::Encoding => 50,
            Stage::Done => 100,
        }
    }
}

/// 编码阶段的显示进度
pub fn encode_percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return Stage::Encoding.percent();
    }
    let share = (completed as f64 / total as f64 * 50.0).round() as u8;
    Stage::Encoding.percent() + share.min(50)
}

/// 进度回调，只在调用方线程上执行
pub trait Progress {
    fn stage(&mut self, _stage: Stage) {}

    /// 每完成一个单元格调用一次，`completed` 从 1 递增到 `total`
    fn encoded(&mut self, completed: usize, total: usize);
}

impl<F: FnMut(usize, usize)> Progress for F {
    fn encoded(&mut self, completed: usize, total: usize) {
        self(completed, total)
    }
}

#[derive(Clone, Debug)]
pub struct SplitOptions {
    pub rows: usize,
    pub cols: usize,
    /// 编码线程数，限制在 `1..=MAX_WORKERS`
    pub max_workers: usize,
    pub quantize: QuantizeSettings,
}

impl SplitOptions {
    pub fn new(rows: usize, cols: usize) -> SplitOptions {
        SplitOptions {
            rows,
            cols,
            max_workers: default_workers(),
            quantize: QuantizeSettings::default(),
        }
    }

    pub fn workers(&self) -> usize {
        self.max_workers.clamp(1, MAX_WORKERS)
    }
}

/// 系统并行资源，最多 4
pub fn default_workers() -> usize {
    available_parallelism()
        .map(|n| n.get())
        .unwrap_or(MAX_WORKERS)
        .min(MAX_WORKERS)
}

/// 输出文件命名方式
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum NamingScheme {
    /// `{base}_row{r}_col{c}`
    #[default]
    RowCol,
    /// `{base}_r{r}_c{c}`
    Short,
}

impl NamingScheme {
    /// 不带扩展名，行列从 1 开始
    pub fn stem(self, base: &str, row: usize, col: usize) -> String {
        match self {
            NamingScheme::RowCol => format!("{base}_row{}_col{}", row + 1, col + 1),
            NamingScheme::Short => format!("{base}_r{}_c{}", row + 1, col + 1),
        }
    }
}

/// 合成完成的全部帧
#[derive(Debug)]
pub struct Composited {
    pub width: usize,
    pub height: usize,
    pub frames: Vec<FullFrame>,
}

/// 每个单元格编码后的 GIF 字节
#[derive(Clone, Debug)]
pub struct EncodedGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Vec<u8>>,
}

impl EncodedGrid {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> &[u8] {
        &self.cells[row * self.cols + col]
    }

    /// 行优先遍历
    pub fn iter(&self) -> impl Iterator<Item = (usize, usize, &[u8])> + '_ {
        self.cells
            .iter()
            .enumerate()
            .map(move |(i, bytes)| (i / self.cols, i % self.cols, bytes.as_slice()))
    }
}

/// 拆分流水线：解码 -> 合成 -> 切分 -> 并行编码
#[derive(Debug)]
pub struct Splitter {
    options: SplitOptions,
}

impl Splitter {
    pub fn new(options: SplitOptions) -> Splitter {
        Splitter { options }
    }

    pub fn run<P: Progress + ?Sized>(&self, bytes: &[u8], progress: &mut P) -> Result<EncodedGrid> {
        let composited = self.composite(bytes, progress)?;
        self.split_and_encode(composited, progress)
    }

    /// 解码并合成所有帧。网格参数在这里就会校验，避免白做合成。
    pub fn composite<P: Progress + ?Sized>(
        &self,
        bytes: &[u8],
        progress: &mut P,
    ) -> Result<Composited> {
        progress.stage(Stage::Decoding);
        let decoded = decode(bytes)?;
        let width = decoded.width as usize;
        let height = decoded.height as usize;
        Layout::new(width, height, self.options.rows, self.options.cols)?;
        info!(width, height, frames = decoded.frames.len(), "decoded gif");

        progress.stage(Stage::Compositing);
        let frames = composite(&decoded.frames, width, height);
        Ok(Composited {
            width,
            height,
            frames,
        })
    }

    pub fn split_and_encode<P: Progress + ?Sized>(
        &self,
        composited: Composited,
        progress: &mut P,
    ) -> Result<EncodedGrid> {
        progress.stage(Stage::Splitting);
        let grid = split(
            composited.frames,
            composited.width,
            composited.height,
            self.options.rows,
            self.options.cols,
        )?;

        progress.stage(Stage::Encoding);
        let encoded = self.encode_grid(grid, progress)?;
        progress.stage(Stage::Done);
        Ok(encoded)
    }

    pub fn encode_grid<P: Progress + ?Sized>(
        &self,
        grid: Grid,
        progress: &mut P,
    ) -> Result<EncodedGrid> {
        self.encode_with(grid, progress, encode_cell)
    }

    /// 按行优先把单元格分批交给线程池，每批最多 `workers` 个。
    ///
    /// 第一个失败的单元格会触发取消，错误立即返回，后续批次不再提交。
    fn encode_with<P, E>(&self, grid: Grid, progress: &mut P, encode: E) -> Result<EncodedGrid>
    where
        P: Progress + ?Sized,
        E: Fn(&[CellFrame], &QuantizeSettings, CancelToken) -> std::result::Result<Vec<u8>, EncodeError>
            + Send
            + Sync
            + 'static,
    {
        let rows = grid.rows();
        let cols = grid.cols();
        let total = rows * cols;

        let pool = ThreadPool::new(self.options.workers())?;
        let cancel = pool.cancel_token();
        let settings = Arc::new(self.options.quantize.clone());
        let encode = Arc::new(encode);

        let mut cells: Vec<Vec<u8>> = vec![vec![]; total];
        let mut completed = 0;
        let mut tasks = grid.into_cells();

        loop {
            let batch: Vec<_> = tasks.by_ref().take(pool.size()).collect();
            if batch.is_empty() {
                break;
            }

            let (result_sender, result_receiver) = mpsc::channel();
            let mut pending: Vec<(usize, usize)> = Vec::with_capacity(batch.len());
            for (row, col, frames) in batch {
                pending.push((row, col));
                let result_sender = result_sender.clone();
                let settings = Arc::clone(&settings);
                let encode = Arc::clone(&encode);
                let cancel = cancel.clone();
                // 每个任务独占自己单元格的像素
                pool.execute(move || {
                    let result = if cancel.is_cancelled() {
                        Err(EncodeError::Cancelled)
                    } else {
                        encode(&frames, &settings, cancel)
                    };
                    let _ = result_sender.send((row, col, result));
                });
            }
            drop(result_sender);

            while !pending.is_empty() {
                let (row, col, result) = match result_receiver.recv() {
                    Ok(message) => message,
                    Err(_) => {
                        cancel.cancel();
                        let (row, col) = pending[0];
                        return Err(Error::encode(row, col, EncodeError::WorkerLost));
                    }
                };
                pending.retain(|key| *key != (row, col));

                match result {
                    Ok(bytes) => {
                        debug!(row, col, len = bytes.len(), "cell encoded");
                        cells[row * cols + col] = bytes;
                        completed += 1;
                        progress.encoded(completed, total);
                    }
                    Err(source) => {
                        // 通知仍在运行的任务尽快退出
                        cancel.cancel();
                        return Err(Error::encode(row, col, source));
                    }
                }
            }
        }

        info!(cells = total, "encoded all cells");
        Ok(EncodedGrid { rows, cols, cells })
    }
}

/// 一步完成拆分，使用默认编码参数
pub fn split_animation<P: Progress>(
    bytes: &[u8],
    rows: usize,
    cols: usize,
    mut on_progress: P,
) -> Result<EncodedGrid> {
    Splitter::new(SplitOptions::new(rows, cols)).run(bytes, &mut on_progress)
}
