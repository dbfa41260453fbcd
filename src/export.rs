use std::io;
use std::path::Path;

use crate::game::GameRecord;

/// ゲーム記録を1行ずつCSVに書き出す
pub fn write_game_records<W: io::Write>(
    writer: W,
    records: &[GameRecord],
) -> Result<(), csv::Error> {
    let mut csv = csv::Writer::from_writer(writer);
    for record in records {
        csv.serialize(record)?;
    }
    csv.flush()?;
    Ok(())
}

pub fn export_game_records<P: AsRef<Path>>(path: P, records: &[GameRecord]) -> Result<(), csv::Error> {
    let file = std::fs::File::create(path)?;
    write_game_records(file, records)
}
