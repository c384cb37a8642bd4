use std::borrow::Cow;
use std::fs;
use std::process::Command;

use tempfile::tempdir;

fn sample_gif() -> Vec<u8> {
    let palette = [255, 0, 0, 0, 0, 255];
    let mut bytes = vec![];
    {
        let mut encoder = gif::Encoder::new(&mut bytes, 6, 4, &palette).unwrap();
        for index in [0u8, 1] {
            let frame = gif::Frame {
                width: 6,
                height: 4,
                delay: 8,
                buffer: Cow::Owned(vec![index; 24]),
                ..gif::Frame::default()
            };
            encoder.write_frame(&frame).unwrap();
        }
    }
    bytes
}

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_gif-grid-split"))
}

#[test]
fn writes_one_gif_per_cell() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("clip.gif");
    fs::write(&input, sample_gif()).unwrap();
    let out = dir.path().join("out");

    let status = bin()
        .arg(&input)
        .args(["-r", "2", "-c", "3", "--naming", "short", "-j", "2"])
        .arg("-o")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    for row in 1..=2 {
        for col in 1..=3 {
            let path = out.join(format!("clip_r{row}_c{col}.gif"));
            let bytes = fs::read(&path).unwrap();
            let mut options = gif::DecodeOptions::new();
            options.set_color_output(gif::ColorOutput::Indexed);
            let mut decoder = options.read_info(&bytes[..]).unwrap();
            assert_eq!((decoder.width(), decoder.height()), (2, 2));
            let mut frames = 0;
            while let Some(frame) = decoder.read_next_frame().unwrap() {
                assert_eq!(frame.delay, 8);
                frames += 1;
            }
            assert_eq!(frames, 2);
        }
    }
}

#[test]
fn dumps_composited_frames_as_png() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("clip.gif");
    fs::write(&input, sample_gif()).unwrap();
    let frames_dir = dir.path().join("frames");

    let status = bin()
        .arg(&input)
        .args(["-r", "1", "-c", "1", "-b", "whole"])
        .arg("--frames-dir")
        .arg(&frames_dir)
        .status()
        .unwrap();
    assert!(status.success());
    assert!(dir.path().join("whole_row1_col1.gif").exists());

    let decoder = png::Decoder::new(fs::File::open(frames_dir.join("frame_0001.png")).unwrap());
    let mut reader = decoder.read_info().unwrap();
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf).unwrap();
    assert_eq!((info.width, info.height), (6, 4));
    assert_eq!(&buf[..4], &[0, 0, 255, 255]);
}

#[test]
fn reports_error_and_fails_on_bad_grid() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("clip.gif");
    fs::write(&input, sample_gif()).unwrap();

    let output = bin().arg(&input).args(["-r", "5"]).output().unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot split 6x4 into 5 rows"), "{stderr}");
    assert!(!dir.path().join("clip_row1_col1.gif").exists());
}
