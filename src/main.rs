use std::process::ExitCode;

mod command;

/// 用来转换文件大小
const BYTES_INTEGER: f64 = 1024.00;
/// 转换毫秒为秒
const SECOND_CONSTANT: f64 = 1000.00;

fn main() -> ExitCode {
    command::args_handle()
}
