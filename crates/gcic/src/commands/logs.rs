//! Tail and follow the collector daemon log

use gcic_core::constants;
use gcic_core::{Error, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use crate::cli::LogsArgs;

pub async fn execute(args: LogsArgs) -> Result<()> {
    let path = constants::log_path();
    if !path.exists() {
        return Err(Error::Service(format!(
            "no collector log at {}; has the daemon ever run?",
            path.display()
        )));
    }

    for line in tail_file(&path, args.lines)? {
        println!("{}", line);
    }

    if args.follow {
        let path = path.clone();
        tokio::task::spawn_blocking(move || follow_file(&path))
            .await
            .map_err(|e| Error::Service(e.to_string()))??;
    }
    Ok(())
}

/// Read the last `n` lines by seeking backwards in chunks, so large logs
/// never load fully into memory.
fn tail_file(path: &Path, n: usize) -> Result<Vec<String>> {
    let mut file = File::open(path)?;
    let file_size = file.metadata()?.len();
    if file_size == 0 || n == 0 {
        return Ok(Vec::new());
    }

    let chunk_size = 8192u64;
    let mut lines: Vec<String> = Vec::new();
    let mut position = file_size;
    let mut partial_line = String::new();

    while position > 0 && lines.len() < n {
        let read_size = chunk_size.min(position);
        position -= read_size;

        file.seek(SeekFrom::Start(position))?;
        let mut buffer = vec![0u8; read_size as usize];
        file.read_exact(&mut buffer)?;

        let chunk = String::from_utf8_lossy(&buffer);
        let chunk_with_partial = format!("{}{}", chunk, partial_line);
        let mut chunk_lines: Vec<&str> = chunk_with_partial.lines().collect();

        // The first element may continue a line from the previous chunk.
        if position > 0 && !chunk_lines.is_empty() {
            partial_line = chunk_lines.remove(0).to_string();
        } else {
            partial_line.clear();
        }

        for line in chunk_lines.into_iter().rev() {
            if lines.len() >= n {
                break;
            }
            lines.push(line.to_string());
        }
    }

    if !partial_line.is_empty() && lines.len() < n {
        lines.push(partial_line);
    }

    lines.reverse();
    Ok(lines)
}

/// Print new lines as they are appended, like `tail -f`
fn follow_file(path: &PathBuf) -> Result<()> {
    use notify::{RecommendedWatcher, RecursiveMode, Watcher};
    use std::sync::mpsc;

    let mut file = File::open(path)?;
    let mut position = file.seek(SeekFrom::End(0))?;

    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res| {
            let _ = tx.send(res);
        },
        notify::Config::default(),
    )
    .map_err(|e| Error::Service(format!("failed to create watcher: {}", e)))?;
    watcher
        .watch(path, RecursiveMode::NonRecursive)
        .map_err(|e| Error::Service(format!("failed to watch log: {}", e)))?;

    loop {
        match rx.recv_timeout(std::time::Duration::from_millis(500)) {
            Ok(Ok(_event)) => {}
            Ok(Err(_)) | Err(mpsc::RecvTimeoutError::Timeout) => continue,
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }

        file.seek(SeekFrom::Start(position))?;
        let reader = BufReader::new(&file);
        for line in reader.lines() {
            println!("{}", line?);
        }
        position = file.seek(SeekFrom::End(0))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_tail_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.log");
        File::create(&path).unwrap();

        assert!(tail_file(&path, 10).unwrap().is_empty());
    }

    #[test]
    fn test_tail_last_lines_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("collector.log");
        {
            let mut file = File::create(&path).unwrap();
            for i in 1..=100 {
                writeln!(file, "line {}", i).unwrap();
            }
        }

        let lines = tail_file(&path, 5).unwrap();
        assert_eq!(lines, vec!["line 96", "line 97", "line 98", "line 99", "line 100"]);
    }

    #[test]
    fn test_tail_more_than_available() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("short.log");
        std::fs::write(&path, "only\ntwo\n").unwrap();

        let lines = tail_file(&path, 30).unwrap();
        assert_eq!(lines, vec!["only", "two"]);
    }

    #[test]
    fn test_tail_spanning_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("long.log");
        {
            let mut file = File::create(&path).unwrap();
            for i in 0..2000 {
                writeln!(file, "entry {} with some padding to cross chunk borders", i).unwrap();
            }
        }

        let lines = tail_file(&path, 50).unwrap();
        assert_eq!(lines.len(), 50);
        assert!(lines[0].starts_with("entry 1950 "));
        assert!(lines[49].starts_with("entry 1999 "));
    }
}
