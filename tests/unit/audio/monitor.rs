use super::*;

#[test]
fn wav_monitor_writes_float_samples() {
    let path = PathBuf::from("target")
        .join("monitor_unit")
        .join("monitor.wav");
    let mut monitor = WavMonitor::create(&path, 48_000, 2).unwrap();
    let block = AudioBlock::new(0, 48_000, 2, vec![0.25, -0.25, 0.5, -0.5]);
    monitor.write_block(&block).unwrap();
    monitor.write_block(&block).unwrap();
    assert_eq!(monitor.frames(), 4);
    assert_eq!(monitor.path(), path.as_path());
    Box::new(monitor).finish().unwrap();

    let mut reader = hound::WavReader::open(&path).unwrap();
    let spec = reader.spec();
    assert_eq!(spec.channels, 2);
    assert_eq!(spec.sample_rate, 48_000);
    assert_eq!(spec.sample_format, SampleFormat::Float);
    let samples: Vec<f32> = reader.samples::<f32>().map(Result::unwrap).collect();
    assert_eq!(samples.len(), 8);
    assert_eq!(samples[2], 0.5);
}

#[test]
fn wav_monitor_rejects_channel_mismatch() {
    let path = PathBuf::from("target")
        .join("monitor_unit")
        .join("mono.wav");
    let mut monitor = WavMonitor::create(&path, 48_000, 1).unwrap();
    let block = AudioBlock::new(0, 48_000, 2, vec![0.0, 0.0]);
    assert!(matches!(
        monitor.write_block(&block),
        Err(SaxcatError::Audio(_))
    ));
}
