/// Formats a sample count as `hh:mm:ss.mmm`.
pub fn duration_str(samples: u64, sample_rate: u32) -> String {
    let ms = samples * 1000 / sample_rate.max(1) as u64;
    let hours = ms / 3_600_000;

    format!(
        "{hours:0width$}:{:02}:{:02}.{:03}",
        ms / 60_000 % 60,
        ms / 1000 % 60,
        ms % 1000,
        width = if hours >= 100 { 0 } else { 2 }
    )
}

#[test]
fn duration_formatting() {
    assert_eq!(duration_str(0, 44100), "00:00:00.000");
    assert_eq!(duration_str(44100 * 61 + 22050, 44100), "00:01:01.500");
    assert_eq!(duration_str(48000 * 3600 * 101, 48000), "101:00:00.000");
}
