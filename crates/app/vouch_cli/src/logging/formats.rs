use flexi_logger::DeferredNow;
use log::Record;

/// `LEVEL message`, coloured by level when the terminal supports it.
pub fn cli_format(
    w: &mut dyn std::io::Write,
    _now: &mut DeferredNow,
    record: &Record,
) -> Result<(), std::io::Error> {
    let level = record.level();
    write!(
        w,
        "{} {}",
        flexi_logger::style(level).paint(level.to_string()),
        record.args()
    )
}
