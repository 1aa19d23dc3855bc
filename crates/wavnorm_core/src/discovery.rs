//! WAV file discovery.
//!
//! Lists the regular `.wav` files directly inside a directory (no
//! recursion), skipping anything carrying the temp artifact marker, and
//! returns them in natural name order.

use std::cmp::Ordering;
use std::fs;
use std::io;
use std::path::Path;

use crate::models::AudioFile;
use crate::temp::is_temp_name;

/// Discover the WAV inputs of a directory.
///
/// The extension match is case-insensitive. An empty result is not an
/// error.
pub fn discover_wav_files(dir: &Path) -> io::Result<Vec<AudioFile>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if is_temp_name(&name) {
            tracing::trace!("Skipping temp artifact {}", name);
            continue;
        }
        if !has_wav_extension(&name) {
            continue;
        }

        // Follows symlinks, so a linked WAV is still an input.
        let metadata = match fs::metadata(entry.path()) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", name, e);
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        files.push(AudioFile::new(entry.path(), metadata.len()));
    }

    files.sort_by(|a, b| natural_cmp(&a.file_name(), &b.file_name()));

    tracing::debug!("Discovered {} WAV file(s) in {}", files.len(), dir.display());
    Ok(files)
}

fn has_wav_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// Compare names so that digit runs sort by value (`track2` < `track10`).
///
/// Text runs compare case-insensitively; ties fall back to a plain
/// comparison so the order is total.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let left = chunks(a);
    let right = chunks(b);

    for (x, y) in left.iter().zip(right.iter()) {
        let ord = match (x, y) {
            (Chunk::Number(p), Chunk::Number(q)) => compare_digits(p, q),
            (Chunk::Number(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Number(_)) => Ordering::Greater,
            (Chunk::Text(p), Chunk::Text(q)) => p.to_lowercase().cmp(&q.to_lowercase()),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    left.len().cmp(&right.len()).then_with(|| a.cmp(b))
}

enum Chunk<'a> {
    Number(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits = None;

    for (i, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != digit => {
                out.push(chunk(&s[start..i], prev));
                start = i;
            }
            _ => {}
        }
        in_digits = Some(digit);
    }
    if let Some(prev) = in_digits {
        out.push(chunk(&s[start..], prev));
    }
    out
}

fn chunk(s: &str, digits: bool) -> Chunk<'_> {
    if digits {
        Chunk::Number(s)
    } else {
        Chunk::Text(s)
    }
}

/// Compare digit strings by value without overflowing.
fn compare_digits(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
