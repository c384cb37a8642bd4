use clap::Parser;
use colored::Colorize;
use gif_grid_split::split::{encode_percent, FullFrame, NamingScheme, SplitOptions, Splitter, Stage};
use gif_grid_split::{Progress, Result};
use rgb::ComponentBytes;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use crate::{BYTES_INTEGER, SECOND_CONSTANT};

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Naming {
    /// name_row1_col1.gif
    RowCol,
    /// name_r1_c1.gif
    Short,
}

impl From<Naming> for NamingScheme {
    fn from(naming: Naming) -> Self {
        match naming {
            Naming::RowCol => NamingScheme::RowCol,
            Naming::Short => NamingScheme::Short,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(help = "要切分的 GIF 文件")]
    input: PathBuf,

    #[arg(short = 'r', long, default_value_t = 2, help = "行数，不能大于图像高度")]
    rows: usize,

    #[arg(short = 'c', long, default_value_t = 2, help = "列数，不能大于图像宽度")]
    cols: usize,

    #[arg(short = 'o', long, help = "输出目录，默认与输入文件相同")]
    out_dir: Option<PathBuf>,

    #[arg(short = 'b', long, help = "输出文件名前缀，默认使用输入文件名")]
    base_name: Option<String>,

    #[arg(long, value_enum, default_value_t = Naming::RowCol, help = "输出文件命名方式")]
    naming: Naming,

    #[arg(short = 'j', long, help = "编码线程数，1-4，默认取系统并行资源数（最多 4）")]
    jobs: Option<usize>,

    #[arg(
        short = 's',
        long,
        help = "1-10，更快的速度生成的图像质量更低"
    )]
    speed: Option<u8>,

    #[arg(
        short = 'n',
        long,
        help = "0-100，量化的最低质量，默认最低 0，不能高于最大值"
    )]
    quality_min: Option<u8>,

    #[arg(
        short = 'x',
        long,
        help = "0-100，量化的最大质量，默认最高100，不能低于最小值"
    )]
    quality_max: Option<u8>,

    #[arg(short = 'd', long, help = "设置为1.0可获得平滑图像，默认 1.0")]
    dithering_level: Option<f32>,

    #[arg(long, help = "把合成后的完整帧另存为 PNG 到该目录，便于检查")]
    frames_dir: Option<PathBuf>,
}

/// 处理命令行参数
pub fn args_handle() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    // 获取命令行参数
    let args = Args::parse();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("\n{} {}", "Error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let start_time = Instant::now();
    let bytes = fs::read(&args.input)?;

    let mut options = SplitOptions::new(args.rows, args.cols);
    if let Some(jobs) = args.jobs {
        options.max_workers = jobs;
    }
    options.quantize.speed = args.speed;
    options.quantize.quality_min = args.quality_min;
    options.quantize.quality_max = args.quality_max;
    if let Some(dithering_level) = args.dithering_level {
        options.quantize.dithering_level = dithering_level;
    }

    let splitter = Splitter::new(options);
    let mut bar = ProgressBar::new();

    let composited = splitter.composite(&bytes, &mut bar)?;
    if let Some(frames_dir) = &args.frames_dir {
        write_frames(frames_dir, &composited.frames)?;
    }
    let encoded = splitter.split_and_encode(composited, &mut bar)?;

    // 输出目录
    let out_dir = match &args.out_dir {
        Some(dir) => dir.clone(),
        None => args
            .input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    fs::create_dir_all(&out_dir)?;

    let base = match &args.base_name {
        Some(base) => base.clone(),
        None => args
            .input
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "split".to_string()),
    };

    let naming = NamingScheme::from(args.naming);
    let mut total_size = 0;
    for (row, col, gif) in encoded.iter() {
        let path = out_dir.join(format!("{}.gif", naming.stem(&base, row, col)));
        fs::write(&path, gif)?;
        total_size += gif.len();
    }

    let second = start_time.elapsed().as_millis() as f64 / SECOND_CONSTANT;
    println!();
    println!(
        "Wrote {} files ({:.1} KiB) to {}",
        (encoded.rows() * encoded.cols()).to_string().green(),
        total_size as f64 / BYTES_INTEGER,
        out_dir.display()
    );
    println!("Total time: {}s", second);
    Ok(())
}

/// 每帧一个 RGBA PNG：frame_0000.png, frame_0001.png ...
fn write_frames(dir: &Path, frames: &[FullFrame]) -> Result<()> {
    fs::create_dir_all(dir)?;
    for (id, frame) in frames.iter().enumerate() {
        let file = File::create(dir.join(format!("frame_{id:04}.png")))?;
        let ref mut w = BufWriter::new(file);

        let mut encoder = png::Encoder::new(w, frame.width as u32, frame.height as u32);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_color(png::ColorType::Rgba);

        let mut writer = encoder.write_header().map_err(io::Error::other)?;
        writer
            .write_image_data(frame.pixels.as_bytes())
            .map_err(io::Error::other)?;
    }
    Ok(())
}

/// 终端进度条
struct ProgressBar {
    pbstr: String,
    pbwid: String,
}

impl ProgressBar {
    fn new() -> ProgressBar {
        ProgressBar {
            pbstr: "\u{25A0}".repeat(20),
            pbwid: "-".repeat(20),
        }
    }

    /// 更新进度条
    fn update(&self, percent: u8, text: &str) {
        let perc = percent.min(100) as f64 / 100.0;
        let lpad = (perc * 20.00).floor() as usize;

        print!(
            "\r{}: {}{} {}% {:<24}",
            "Processing".cyan(),
            &self.pbstr[0..'\u{25A0}'.len_utf8() * lpad],
            &self.pbwid[0..20 - lpad],
            percent,
            text
        );
        let _ = io::stdout().flush();
    }
}

impl Progress for ProgressBar {
    fn stage(&mut self, stage: Stage) {
        let text = match stage {
            Stage::Decoding => "Decoding GIF...",
            Stage::Compositing => "Compositing frames...",
            Stage::Splitting => "Splitting into grid...",
            Stage::Encoding => "Encoding cells...",
            Stage::Done => "Done!",
        };
        self.update(stage.percent(), text);
    }

    fn encoded(&mut self, completed: usize, total: usize) {
        self.update(
            encode_percent(completed, total),
            &format!("Encoding: {completed}/{total}"),
        );
    }
}
